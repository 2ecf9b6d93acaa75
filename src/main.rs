mod cli;
mod error;
mod grammar;
mod importer;
mod ledger;
mod models;
mod parser;
mod rules;
mod settings;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::config::ConfigUpdate;
use cli::{Cli, Commands, RulesCommands};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Convert {
            rules,
            csv,
            ledger_file,
        } => cli::convert::run(&rules, &csv, ledger_file.as_deref()),
        Commands::Merge {
            ledger_file,
            rules_file,
            yes_append,
            csv_files,
        } => cli::merge::run(ledger_file, rules_file, yes_append, &csv_files),
        Commands::Rules { command } => match command {
            RulesCommands::Check { rules } => cli::rules::check(&rules),
            RulesCommands::Match { rules, description } => cli::rules::matches(&rules, &description),
        },
        Commands::Config {
            ledger_file,
            rules_file,
            hledger,
            unknown_account,
        } => cli::config::run(ConfigUpdate {
            ledger_file,
            rules_file,
            hledger,
            unknown_account,
        }),
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "ledger-csv-merge",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
