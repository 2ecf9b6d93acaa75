use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::{MergeError, Result};
use crate::models::Transaction;
use crate::rules::{Fields, Ruleset};

const REQUIRED_FIELDS: &[&str] = &["date", "description", "account1", "account2", "amount"];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parses a bank amount such as `1,234.56`, `£-5.00` or `(50.00)`.
pub fn parse_amount(raw: &str) -> Result<f64> {
    let s: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | '(' | ')'))
        .collect();
    let parsed = if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        inner.parse::<f64>().map(|v| -v)
    } else {
        s.parse::<f64>()
    };
    parsed.map_err(|_| MergeError::Amount(raw.trim().to_string()))
}

/// Replaces `{name}` and `{index}` placeholders with values from the row.
/// `{{` and `}}` stand for literal braces.
pub fn interpolate(value: &str, row: &Row) -> Result<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                match row.get(&name) {
                    Some(v) if closed => out.push_str(v),
                    _ => {
                        return Err(MergeError::Placeholder {
                            field: name,
                            value: value.to_string(),
                        })
                    }
                }
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One CSV record, addressable by column name and by position.
#[derive(Debug)]
pub struct Row {
    values: HashMap<String, String>,
}

impl Row {
    pub fn new(names: &[String], record: &csv::StringRecord, number: usize) -> Result<Self> {
        if record.len() < names.len() {
            return Err(MergeError::Validation(format!(
                "row {number} has {} columns, expected {}",
                record.len(),
                names.len()
            )));
        }
        let mut values = HashMap::new();
        for (idx, value) in record.iter().enumerate() {
            values.insert(idx.to_string(), value.to_string());
        }
        for (name, value) in names.iter().zip(record.iter()) {
            values.insert(name.clone(), value.to_string());
        }
        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

fn split_amount(fields: &Fields, row: &Row) -> Result<Option<f64>> {
    let side = |name: &str| fields.get(name).map(String::as_str).or_else(|| row.get(name));
    let (amount_in, amount_out) = (side("amount-in"), side("amount-out"));
    if amount_in.is_none() && amount_out.is_none() {
        return Ok(None);
    }
    let value = |raw: Option<&str>| match raw.map(str::trim) {
        None | Some("") => Ok(0.0),
        Some(s) => parse_amount(s),
    };
    Ok(Some(value(amount_in)? - value(amount_out)?))
}

fn resolve_amount(fields: &Fields, row: &Row) -> Result<Option<f64>> {
    if let Some(raw) = fields.get("amount") {
        return parse_amount(raw).map(Some);
    }
    if let Some(amount) = row.get("amount").and_then(|raw| parse_amount(raw).ok()) {
        return Ok(Some(amount));
    }
    split_amount(fields, row)
}

fn optional(fields: &Fields, name: &str) -> Option<String> {
    fields.get(name).filter(|v| !v.is_empty()).cloned()
}

/// Builds a transaction from one row: match the description, fill gaps from
/// the row, then interpolate placeholders.
pub fn convert_row(row: &Row, rules: &Ruleset) -> Result<Transaction> {
    // A leading * reads as a cleared marker in ledger files.
    let description = row.get("description").unwrap_or("").trim_start_matches('*');

    let mut fields = Fields::new();
    for (key, value) in rules.match_description(description) {
        let value = interpolate(&value, row)?;
        fields.insert(key, value);
    }
    if !fields.contains_key("date") {
        if let Some(date) = row.get("date") {
            fields.insert("date".to_string(), date.to_string());
        }
    }
    if !fields.contains_key("description") && row.get("description").is_some() {
        fields.insert("description".to_string(), description.to_string());
    }
    let amount = resolve_amount(&fields, row)?;
    let balance = row.get("balance").and_then(|raw| parse_amount(raw).ok());

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|name| match *name {
            "amount" => amount.is_none(),
            _ => !fields.contains_key(*name),
        })
        .collect();
    let Some(amount) = amount else {
        return Err(MergeError::MissingField(missing.join(", ")));
    };
    if !missing.is_empty() {
        return Err(MergeError::MissingField(missing.join(", ")));
    }

    Ok(Transaction {
        date2: optional(&fields, "date2"),
        status: optional(&fields, "status"),
        code: optional(&fields, "code"),
        comment: optional(&fields, "comment"),
        date: fields.remove("date").unwrap_or_default(),
        description: fields.remove("description").unwrap_or_default(),
        account1: fields.remove("account1").unwrap_or_default(),
        account2: fields.remove("account2").unwrap_or_default(),
        currency: fields.remove("currency").unwrap_or_default(),
        amount,
        balance,
    })
}

// ---------------------------------------------------------------------------
// read_transactions
// ---------------------------------------------------------------------------

pub fn read_transactions(file_path: &Path, rules: &Ruleset) -> Result<Vec<Transaction>> {
    let file = std::fs::File::open(file_path)?;
    read_transactions_from(BufReader::new(file), rules)
}

pub fn read_transactions_from<R: BufRead>(mut reader: R, rules: &Ruleset) -> Result<Vec<Transaction>> {
    let names = rules.fields().ok_or_else(|| {
        MergeError::Validation("rules do not declare the CSV `fields`".to_string())
    })?;

    let mut discard = String::new();
    for _ in 0..rules.skip() {
        discard.clear();
        if reader.read_line(&mut discard)? == 0 {
            break;
        }
    }

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut transactions = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result?;
        let row = Row::new(names, &record, rules.skip() + idx + 1)?;
        transactions.push(convert_row(&row, rules)?);
    }
    debug!(count = transactions.len(), "read transactions");
    Ok(transactions)
}
