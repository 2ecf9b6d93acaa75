use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MergeError, Result};

const APP_NAME: &str = "ledger-csv-merge";

/// Defaults for `merge` and `convert`. Keys missing from the file keep
/// their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ledger_file: Option<String>,
    pub rules_file: Option<String>,
    pub hledger_bin: String,
    pub unknown_account: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ledger_file: None,
            rules_file: None,
            hledger_bin: "hledger".to_string(),
            unknown_account: "expenses:unknown".to_string(),
        }
    }
}

/// `~/.config/ledger-csv-merge/settings.json`
pub fn settings_path() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_default();
    path.extend([".config", APP_NAME, "settings.json"]);
    path
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

/// Never fails: a missing file gives the defaults, a malformed one is
/// logged and ignored.
pub fn load_settings_from(path: &Path) -> Settings {
    let Ok(text) = std::fs::read_to_string(path) else {
        return Settings::default();
    };
    serde_json::from_str(&text).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "ignoring malformed settings file");
        Settings::default()
    })
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    let mut json = serde_json::to_string_pretty(settings)
        .map_err(|e| MergeError::Settings(e.to_string()))?;
    json.push('\n');
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, json)?;
    Ok(())
}

/// Expands a leading `~` and anchors relative paths at the working
/// directory, so a saved path means the same thing from anywhere.
pub fn absolute_path(path: &str) -> String {
    let expanded = match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            match rest.trim_start_matches('/') {
                "" => home,
                rest => home.join(rest),
            }
        }
        _ => PathBuf::from(path),
    };
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(expanded),
            Err(_) => expanded,
        }
    };
    absolute.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            ledger_file: Some("/tmp/main.journal".to_string()),
            rules_file: Some("/tmp/bank.rules".to_string()),
            hledger_bin: "/usr/local/bin/hledger".to_string(),
            unknown_account: "expenses:unsorted".to_string(),
        };
        save_settings_to(&settings, &path).unwrap();
        assert_eq!(load_settings_from(&path), settings);
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("nope.json"));
        assert_eq!(s, Settings::default());
        assert_eq!(s.hledger_bin, "hledger");
        assert_eq!(s.unknown_account, "expenses:unknown");
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"ledger_file": "/tmp/main.journal"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.ledger_file.as_deref(), Some("/tmp/main.journal"));
        assert_eq!(s.rules_file, None);
        assert_eq!(s.hledger_bin, "hledger");
    }

    #[test]
    fn test_malformed_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_settings_from(&path), Settings::default());
    }

    #[test]
    fn test_save_creates_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("nested").join("settings.json");
        save_settings_to(&Settings::default(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_settings_path_under_config_dir() {
        let path = settings_path();
        assert!(path.ends_with(".config/ledger-csv-merge/settings.json"));
    }

    #[test]
    fn test_absolute_path_expands_home() {
        if let Some(home) = dirs::home_dir() {
            let expanded = absolute_path("~/ledger/main.journal");
            assert_eq!(expanded, format!("{}/ledger/main.journal", home.to_string_lossy()));
            assert_eq!(absolute_path("~"), home.to_string_lossy());
        }
    }

    #[test]
    fn test_absolute_path_anchors_relative_paths() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            absolute_path("books/bank.rules"),
            cwd.join("books/bank.rules").to_string_lossy()
        );
        assert_eq!(
            absolute_path("~bob/bank.rules"),
            cwd.join("~bob/bank.rules").to_string_lossy()
        );
        assert_eq!(absolute_path("/srv/main.journal"), "/srv/main.journal");
    }
}
