use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_path, absolute_path, Settings};

pub struct ConfigUpdate {
    pub ledger_file: Option<String>,
    pub rules_file: Option<String>,
    pub hledger: Option<String>,
    pub unknown_account: Option<String>,
}

impl ConfigUpdate {
    fn is_empty(&self) -> bool {
        self.ledger_file.is_none()
            && self.rules_file.is_none()
            && self.hledger.is_none()
            && self.unknown_account.is_none()
    }

    fn apply(self, settings: &mut Settings) {
        if let Some(file) = self.ledger_file {
            settings.ledger_file = Some(absolute_path(&file));
        }
        if let Some(file) = self.rules_file {
            settings.rules_file = Some(absolute_path(&file));
        }
        if let Some(bin) = self.hledger {
            settings.hledger_bin = bin;
        }
        if let Some(account) = self.unknown_account {
            settings.unknown_account = account;
        }
    }
}

pub fn run(update: ConfigUpdate) -> Result<()> {
    let mut settings = load_settings();
    if !update.is_empty() {
        update.apply(&mut settings);
        save_settings(&settings)?;
        println!("Saved {}", settings_path().display());
    }

    let unset = || "(not set)".to_string();
    println!("ledger file:     {}", settings.ledger_file.clone().unwrap_or_else(unset));
    println!("rules file:      {}", settings.rules_file.clone().unwrap_or_else(unset));
    println!("hledger:         {}", settings.hledger_bin);
    println!("unknown account: {}", settings.unknown_account);
    Ok(())
}
