use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::NaiveDateTime;
use colored::Colorize;
use dialoguer::Confirm;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use crate::error::{MergeError, Result};
use crate::importer::read_transactions;
use crate::ledger::{deduplicate, Hledger, TransactionLookup};
use crate::models::{conversion_header, Transaction};
use crate::rules::Ruleset;
use crate::settings::load_settings;

const PROMPT: &str = "Append these transactions to Ledger file?";

/// Editors tend to save in several writes; wait for them to settle.
const SETTLE: Duration = Duration::from_millis(200);

/// Transactions converted from one CSV file.
pub struct Batch {
    pub source: String,
    pub transactions: Vec<Transaction>,
}

type Lookup = Box<dyn TransactionLookup + Send + Sync>;

/// One merge run: the rules file, the CSV inputs and, when a journal is
/// known, the lookup used to drop transactions it already holds.
pub struct Merger {
    rules_file: PathBuf,
    csv_files: Vec<String>,
    lookup: Option<Lookup>,
    unknown_account: String,
}

impl Merger {
    pub fn new(
        rules_file: PathBuf,
        csv_files: Vec<String>,
        lookup: Option<Lookup>,
        unknown_account: impl Into<String>,
    ) -> Self {
        Self {
            rules_file,
            csv_files,
            lookup,
            unknown_account: unknown_account.into(),
        }
    }

    /// Builds a fresh ruleset from the rules file and converts every CSV
    /// with it. Nothing is shared with earlier loads, so a failed reload
    /// leaves the caller's batches untouched.
    pub fn reload(&self) -> Result<Vec<Batch>> {
        let rules = Ruleset::load(&self.rules_file)?;
        self.csv_files
            .iter()
            .map(|csv_file| {
                let mut transactions = read_transactions(Path::new(csv_file), &rules)?;
                if let Some(lookup) = &self.lookup {
                    transactions = deduplicate(transactions, lookup.as_ref())?;
                }
                Ok(Batch {
                    source: csv_file.clone(),
                    transactions,
                })
            })
            .collect()
    }

    /// Prints every batch plus the unknown-account summary. Returns false
    /// when there is nothing new to append.
    fn show(&self, batches: &[Batch]) -> bool {
        for batch in batches {
            println!("{}", format!(">>> {}", batch.source).blue());
            for t in &batch.transactions {
                println!("{t}\n");
            }
        }

        if batches.iter().all(|b| b.transactions.is_empty()) {
            println!("No new transactions found");
            return false;
        }

        let unknown = unknown_transactions(batches, &self.unknown_account);
        if !unknown.is_empty() {
            println!(
                "{}",
                format!("{} transactions with unknown account:", unknown.len()).yellow()
            );
            for t in unknown {
                println!(
                    "   {}: {} ({}{:.2})",
                    t.date, t.description, t.currency, t.amount
                );
            }
        }
        true
    }
}

pub fn run(
    ledger_file: Option<String>,
    rules_file: Option<String>,
    yes_append: bool,
    csv_files: &[String],
) -> Result<()> {
    let settings = load_settings();
    let rules_file = rules_file.or(settings.rules_file.clone()).ok_or_else(|| {
        MergeError::Other("No rules file given (use -r or `config --rules-file`)".to_string())
    })?;
    let ledger_file = ledger_file.or(settings.ledger_file.clone()).map(PathBuf::from);

    let lookup = ledger_file.as_ref().map(|file| {
        Box::new(Hledger::new(settings.hledger_bin.clone(), Some(file.clone()))) as Lookup
    });
    let merger = Arc::new(Merger::new(
        PathBuf::from(rules_file),
        csv_files.to_vec(),
        lookup,
        settings.unknown_account.clone(),
    ));

    let batches = merger.reload()?;
    if !merger.show(&batches) {
        return Ok(());
    }

    let Some(ledger_file) = ledger_file else {
        return Ok(());
    };
    print_ledger_file(&ledger_file);
    let shared = Arc::new(Mutex::new(batches));
    let append = yes_append || confirm_while_watching(&merger, &shared, &ledger_file);
    if !append {
        return Ok(());
    }

    print!("Appending... ");
    std::io::stdout().flush()?;
    append_batches(
        &ledger_file,
        &lock(&shared),
        chrono::Local::now().naive_local(),
    )?;
    println!("done");
    Ok(())
}

fn print_ledger_file(ledger_file: &Path) {
    println!(
        "\n{}",
        format!("Ledger file: {}", ledger_file.display()).yellow()
    );
}

fn lock(shared: &Mutex<Vec<Batch>>) -> MutexGuard<'_, Vec<Batch>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Asks for confirmation while edits to the rules file re-run the
/// conversion. The answer applies to the latest successful reload.
fn confirm_while_watching(
    merger: &Arc<Merger>,
    shared: &Arc<Mutex<Vec<Batch>>>,
    ledger_file: &Path,
) -> bool {
    let watching = watch_rules(
        Arc::clone(merger),
        Arc::clone(shared),
        ledger_file.to_path_buf(),
    );
    let watching = match watching {
        Ok(watching) => Some(watching),
        Err(e) => {
            warn!(error = %e, "not watching rules file");
            None
        }
    };

    let append = Confirm::new()
        .with_prompt(PROMPT)
        .default(false)
        .interact()
        .unwrap_or(false);

    if let Some((watcher, handle)) = watching {
        // Dropping the watcher closes the channel and ends the reload thread.
        drop(watcher);
        let _ = handle.join();
    }
    append
}

fn watch_rules(
    merger: Arc<Merger>,
    shared: Arc<Mutex<Vec<Batch>>>,
    ledger_file: PathBuf,
) -> Result<(RecommendedWatcher, JoinHandle<()>)> {
    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(watch_dir(&merger.rules_file), RecursiveMode::NonRecursive)?;
    info!(rules_file = %merger.rules_file.display(), "watching rules file");

    let handle = thread::spawn(move || {
        for res in rx.iter() {
            match res {
                Ok(event) if is_rules_change(&event, &merger.rules_file) => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!(error = %e, "watch error");
                    continue;
                }
            }
            thread::sleep(SETTLE);
            rx.try_iter().for_each(drop);

            println!("\n{}", "Rules file changed, reloading".yellow());
            match merger.reload() {
                Ok(batches) => {
                    merger.show(&batches);
                    print_ledger_file(&ledger_file);
                    print!("{PROMPT} [y/N] ");
                    let _ = std::io::stdout().flush();
                    *lock(&shared) = batches;
                }
                Err(e) => eprintln!("{}", format!("Keeping previous rules: {e}").red()),
            }
        }
    });
    Ok((watcher, handle))
}

/// Directory to watch: editors often replace the file rather than write
/// to it in place.
fn watch_dir(rules_file: &Path) -> &Path {
    match rules_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

fn is_rules_change(event: &Event, rules_file: &Path) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == rules_file.file_name())
}

pub fn unknown_transactions<'a>(batches: &'a [Batch], unknown_account: &str) -> Vec<&'a Transaction> {
    batches
        .iter()
        .flat_map(|b| &b.transactions)
        .filter(|t| t.account2 == unknown_account)
        .collect()
}

/// Appends each non-empty batch, under its own header, to the ledger file.
pub fn append_batches(ledger_file: &Path, batches: &[Batch], at: NaiveDateTime) -> Result<()> {
    let mut file = OpenOptions::new().append(true).create(true).open(ledger_file)?;
    for batch in batches.iter().filter(|b| !b.transactions.is_empty()) {
        write!(file, "{}", conversion_header(&batch.source, at))?;
        for t in &batch.transactions {
            writeln!(file, "{t}\n")?;
        }
    }
    Ok(())
}
