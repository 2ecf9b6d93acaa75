use std::fmt;

use chrono::NaiveDateTime;

/// A two-posting ledger transaction built from one CSV row.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: String,
    pub date2: Option<String>,
    pub status: Option<String>,
    pub code: Option<String>,
    pub description: String,
    pub comment: Option<String>,
    pub account1: String,
    pub account2: String,
    pub amount: f64,
    pub currency: String,
    /// Running balance reported by the bank, written as a balance assertion.
    pub balance: Option<f64>,
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.date)?;
        if let Some(date2) = &self.date2 {
            write!(f, "={date2}")?;
        }
        if let Some(status) = &self.status {
            write!(f, " {status}")?;
        }
        if let Some(code) = &self.code {
            write!(f, " ({code})")?;
        }
        write!(f, " {}", self.description)?;
        if let Some(comment) = &self.comment {
            write!(f, "  ; {comment}")?;
        }
        writeln!(f)?;

        let cur = &self.currency;
        write!(f, "    {}  {cur}{:.2}", self.account1, self.amount)?;
        if let Some(balance) = self.balance {
            write!(f, " = {cur}{balance:.2}")?;
        }
        writeln!(f)?;
        let contra = if self.amount == 0.0 { 0.0 } else { -self.amount };
        write!(f, "    {}  {cur}{contra:.2}", self.account2)
    }
}

/// Comment block written above each batch of converted transactions.
pub fn conversion_header(source: &str, at: NaiveDateTime) -> String {
    format!(
        "; Converted from {source}\n; [{}]\n\n",
        at.format("%Y-%m-%d %H:%M:%S")
    )
}
