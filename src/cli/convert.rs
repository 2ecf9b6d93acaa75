use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::importer::read_transactions;
use crate::ledger::{deduplicate, Hledger};
use crate::models::conversion_header;
use crate::rules::Ruleset;
use crate::settings::load_settings;

pub fn run(rules_file: &str, csv_file: &str, ledger_file: Option<&str>) -> Result<()> {
    let rules = Ruleset::load(Path::new(rules_file))?;
    let mut transactions = read_transactions(Path::new(csv_file), &rules)?;

    if let Some(ledger_file) = ledger_file {
        let hledger = Hledger::new(load_settings().hledger_bin, Some(PathBuf::from(ledger_file)));
        transactions = deduplicate(transactions, &hledger)?;
    }

    let now = chrono::Local::now().naive_local();
    print!("{}", conversion_header(csv_file, now));
    for t in &transactions {
        println!("{t}\n");
    }
    Ok(())
}
