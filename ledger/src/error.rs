//! Ledger error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to prepare ledger directory {path}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Ledger result alias
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_variant_message() {
        let err = LedgerError::UnknownVariant {
            kind: "expense category",
            value: "groceries".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("expense category"));
        assert!(msg.contains("groceries"));
    }
}
