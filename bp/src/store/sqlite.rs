//! DataStore backed by the SQLite ledger

use async_trait::async_trait;
use ledgerstore::{Access, Ledger};
use tracing::{debug, error};

use super::guard::check_statement;
use super::{DataStore, QueryMode, QueryOutcome, StoreError};
use crate::config::QueryGuard;

/// Executes generated queries against a [`Ledger`]
///
/// Each call opens its own connection on the blocking pool; the connection
/// lives only inside that closure.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    ledger: Ledger,
    guard: QueryGuard,
}

impl SqliteStore {
    pub fn new(ledger: Ledger, guard: QueryGuard) -> Self {
        debug!(path = ?ledger.path(), ?guard, "SqliteStore::new: called");
        Self { ledger, guard }
    }

    pub fn guard(&self) -> QueryGuard {
        self.guard
    }

    fn run(ledger: &Ledger, guard: QueryGuard, query: &str, mode: QueryMode) -> Result<QueryOutcome, StoreError> {
        if guard == QueryGuard::Statement {
            check_statement(query, mode)?;
        }

        match mode {
            QueryMode::Read => {
                let access = match guard {
                    QueryGuard::Statement => Access::ReadOnly,
                    QueryGuard::Verbatim => Access::ReadWrite,
                };
                Ok(QueryOutcome::Rows(ledger.query_rows(query, access)?))
            }
            QueryMode::Write => Ok(QueryOutcome::Affected(ledger.execute_write(query)?)),
        }
    }
}

#[async_trait]
impl DataStore for SqliteStore {
    async fn execute(&self, query: &str, mode: QueryMode) -> Result<QueryOutcome, StoreError> {
        debug!(?mode, guard = ?self.guard, "SqliteStore::execute: called");
        let ledger = self.ledger.clone();
        let guard = self.guard;
        let query = query.to_string();

        let result = tokio::task::spawn_blocking(move || Self::run(&ledger, guard, &query, mode))
            .await
            .map_err(|e| StoreError::Join(e.to_string()))?;

        if let Err(ref e) = result {
            error!(error = %e, "SqliteStore::execute: query failed");
        }
        result
    }
}
