//! Data store seam for generated queries
//!
//! The orchestrator only sees [`DataStore`]; [`SqliteStore`] runs the
//! queries against the ledger database.

use std::fmt;

use async_trait::async_trait;
use ledgerstore::{LedgerError, Row};
use thiserror::Error;

mod guard;
mod sqlite;

pub use guard::{check_statement, strip_wrapping};
pub use sqlite::SqliteStore;

/// Whether a query reads rows or mutates the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Read,
    Write,
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryMode::Read => write!(f, "read"),
            QueryMode::Write => write!(f, "write"),
        }
    }
}

/// What a successful query produced
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows(Vec<Row>),
    Affected(u64),
}

/// Errors from executing a generated query
///
/// These are captured into the request context and narrated, never
/// propagated out of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Database connection not configured")]
    NotConfigured,

    #[error("Query rejected: {0}")]
    Rejected(String),

    #[error("SQL error: {0}")]
    Sql(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Query task failed: {0}")]
    Join(String),
}

impl From<LedgerError> for StoreError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Directory { .. } => StoreError::Io(e.to_string()),
            LedgerError::Sqlite(inner) => StoreError::Sql(inner.to_string()),
            other => StoreError::Sql(other.to_string()),
        }
    }
}

/// Executes one generated query
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn execute(&self, query: &str, mode: QueryMode) -> Result<QueryOutcome, StoreError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Store that records every call and replies with a fixed result
    pub struct MockStore {
        reply: Result<QueryOutcome, StoreError>,
        call_count: AtomicUsize,
        queries: Mutex<Vec<(String, QueryMode)>>,
        delay: Option<Duration>,
    }

    impl MockStore {
        pub fn rows(rows: Vec<Row>) -> Self {
            Self::with_reply(Ok(QueryOutcome::Rows(rows)))
        }

        pub fn affected(n: u64) -> Self {
            Self::with_reply(Ok(QueryOutcome::Affected(n)))
        }

        pub fn failing(error: StoreError) -> Self {
            Self::with_reply(Err(error))
        }

        fn with_reply(reply: Result<QueryOutcome, StoreError>) -> Self {
            Self {
                reply,
                call_count: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        pub fn queries(&self) -> Vec<(String, QueryMode)> {
            self.queries.lock().map(|q| q.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl DataStore for MockStore {
        async fn execute(&self, query: &str, mode: QueryMode) -> Result<QueryOutcome, StoreError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut seen) = self.queries.lock() {
                seen.push((query.to_string(), mode));
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_errors_map_to_store_errors() {
        let err: StoreError = LedgerError::InvalidRecord("amount must be positive".to_string()).into();
        assert!(matches!(err, StoreError::Sql(_)));

        let err: StoreError = LedgerError::Directory {
            path: "/root/x".into(),
            source: std::io::Error::other("denied"),
        }
        .into();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn test_not_configured_message() {
        assert_eq!(StoreError::NotConfigured.to_string(), "Database connection not configured");
    }
}
