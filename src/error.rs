use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(
        "Syntax error at line {line}, column {column}: {message}\n{text}\n{caret}^",
        caret = " ".repeat(.column.saturating_sub(1))
    )]
    Syntax {
        line: usize,
        column: usize,
        text: String,
        message: String,
    },

    #[error("Invalid rules: {0}")]
    Validation(String),

    #[error("Invalid pattern on line {line}: {pattern}: {source}")]
    Pattern {
        line: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Required field missing: {0}")]
    MissingField(String),

    #[error("Unknown placeholder {{{field}}} in '{value}'")]
    Placeholder { field: String, value: String },

    #[error("Invalid amount: {0}")]
    Amount(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, MergeError>;
