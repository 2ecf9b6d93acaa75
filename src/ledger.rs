use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, error, info};

use crate::error::{MergeError, Result};
use crate::models::Transaction;

/// Answers whether a journal already holds a transaction.
pub trait TransactionLookup {
    fn contains(&self, transaction: &Transaction) -> Result<bool>;
}

/// Queries an existing journal through the `hledger` command line tool.
pub struct Hledger {
    binary: String,
    ledger_file: Option<PathBuf>,
}

impl Hledger {
    pub fn new(binary: impl Into<String>, ledger_file: Option<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            ledger_file,
        }
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(file) = &self.ledger_file {
            cmd.arg("-f").arg(file);
        }
        cmd.args(args);
        cmd
    }

    pub fn run(&self, args: &[String]) -> Result<String> {
        let mut cmd = self.command(args);
        debug!(command = ?cmd, "running hledger");
        let output = cmd
            .output()
            .map_err(|e| MergeError::Ledger(format!("failed to run {}: {e}", self.binary)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(status = %output.status, stderr = %stderr.trim(), "hledger failed");
            return Err(MergeError::Ledger(format!(
                "{} exited with {}. Command line: {cmd:?}",
                self.binary, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// `reg` rather than `print`, because queries match postings rather than
/// whole transactions.
pub fn query_args(transaction: &Transaction) -> Vec<String> {
    vec![
        "reg".to_string(),
        format!("date:{}", transaction.date),
        format!("desc:{}", regex::escape(&transaction.description)),
        format!("acct:{}", regex::escape(&transaction.account1)),
        format!("amt:{:+.2}", transaction.amount),
        format!("cur:{}", regex::escape(&transaction.currency)),
    ]
}

impl TransactionLookup for Hledger {
    fn contains(&self, transaction: &Transaction) -> Result<bool> {
        let output = self.run(&query_args(transaction))?;
        Ok(!output.trim().is_empty())
    }
}

/// Drops transactions the lookup already knows about, keeping order.
pub fn deduplicate<L>(transactions: Vec<Transaction>, lookup: &L) -> Result<Vec<Transaction>>
where
    L: TransactionLookup + ?Sized,
{
    let mut fresh = Vec::with_capacity(transactions.len());
    for t in transactions {
        if lookup.contains(&t)? {
            info!(date = %t.date, description = %t.description, amount = t.amount, "skipping duplicate");
            continue;
        }
        fresh.push(t);
    }
    Ok(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Known(Vec<(&'static str, f64)>);

    impl TransactionLookup for Known {
        fn contains(&self, t: &Transaction) -> Result<bool> {
            Ok(self
                .0
                .iter()
                .any(|(desc, amt)| t.description.contains(desc) && *amt == t.amount))
        }
    }

    struct Failing;

    impl TransactionLookup for Failing {
        fn contains(&self, _: &Transaction) -> Result<bool> {
            Err(MergeError::Ledger("boom".to_string()))
        }
    }

    fn txn(description: &str, amount: f64) -> Transaction {
        Transaction {
            date: "2014-09-01".into(),
            date2: None,
            status: None,
            code: None,
            description: description.into(),
            comment: None,
            account1: "assets:bank account".into(),
            account2: "expenses:misc".into(),
            amount,
            currency: "£".into(),
            balance: None,
        }
    }

    #[test]
    fn test_query_args() {
        let args = query_args(&txn("Tesco (Metro) 1.5L", -10.15));
        assert_eq!(
            args,
            vec![
                "reg",
                "date:2014-09-01",
                r"desc:Tesco \(Metro\) 1\.5L",
                "acct:assets:bank account",
                "amt:-10.15",
                "cur:£",
            ]
        );
    }

    #[test]
    fn test_query_amount_sign_is_explicit() {
        let args = query_args(&txn("Deposit", 250.0));
        assert_eq!(args[4], "amt:+250.00");
    }

    #[test]
    fn test_query_amount_uses_journal_precision() {
        let args = query_args(&txn("Refund", 0.30 - 0.10));
        assert_eq!(args[4], "amt:+0.20");
        let args = query_args(&txn("Card payment", -(1.10 + 2.20)));
        assert_eq!(args[4], "amt:-3.30");
    }

    #[test]
    fn test_deduplicate_drops_known_and_keeps_order() {
        let lookup = Known(vec![("Description", -10.15)]);
        let fresh = deduplicate(
            vec![
                txn("First", 1.0),
                txn("Description with multiple words", -10.15),
                txn("Description with multiple words", 10.15),
                txn("Last", 2.0),
            ],
            &lookup,
        )
        .unwrap();
        let descriptions: Vec<(&str, f64)> =
            fresh.iter().map(|t| (t.description.as_str(), t.amount)).collect();
        assert_eq!(
            descriptions,
            vec![
                ("First", 1.0),
                ("Description with multiple words", 10.15),
                ("Last", 2.0),
            ]
        );
    }

    #[test]
    fn test_deduplicate_propagates_lookup_errors() {
        let err = deduplicate(vec![txn("x", 1.0)], &Failing).unwrap_err();
        assert!(matches!(err, MergeError::Ledger(_)));
    }

    #[test]
    fn test_missing_binary_is_a_ledger_error() {
        let hledger = Hledger::new("ledger-csv-merge-no-such-binary", None);
        let err = hledger.contains(&txn("x", 1.0)).unwrap_err();
        assert!(matches!(err, MergeError::Ledger(msg) if msg.contains("failed to run")));
    }
}
