pub mod config;
pub mod convert;
pub mod merge;
pub mod rules;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ledger-csv-merge",
    version,
    about = "Convert bank CSV exports into ledger transactions."
)]
pub struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert one CSV file and print the transactions.
    Convert {
        /// Rules file describing the CSV layout and classification
        rules: String,
        /// CSV file exported from the bank
        csv: String,
        /// Existing ledger file; transactions already in it are skipped
        #[arg(short = 'f', long = "ledger-file")]
        ledger_file: Option<String>,
    },
    /// Convert CSV files, show the new transactions and append them to the ledger.
    Merge {
        /// Ledger file to deduplicate against and append to
        #[arg(short = 'f', long = "ledger-file")]
        ledger_file: Option<String>,
        /// hledger-compatible rules file
        #[arg(short = 'r', long = "rules-file")]
        rules_file: Option<String>,
        /// Don't ask for confirmation to append to the ledger file
        #[arg(short = 'y', long = "yes-append")]
        yes_append: bool,
        /// CSV files to convert
        #[arg(required = true)]
        csv_files: Vec<String>,
    },
    /// Inspect rules files.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Show or change saved defaults.
    Config {
        /// Default ledger file
        #[arg(long = "ledger-file")]
        ledger_file: Option<String>,
        /// Default rules file
        #[arg(long = "rules-file")]
        rules_file: Option<String>,
        /// Path to the hledger executable
        #[arg(long)]
        hledger: Option<String>,
        /// Account that marks unclassified transactions
        #[arg(long = "unknown-account")]
        unknown_account: Option<String>,
    },
    /// Print a shell completion script.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Parse a rules file and list its options, defaults and rules.
    Check {
        /// Rules file
        rules: String,
    },
    /// Show the fields a description would be assigned.
    Match {
        /// Rules file
        rules: String,
        /// Transaction description to classify
        description: String,
    },
}
