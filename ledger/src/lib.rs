//! LedgerStore - SQLite budget ledger
//!
//! Holds the relational budget data (users, budgets, expenses, goals and
//! split-bill transactions) in a single SQLite file.
//!
//! # Access model
//!
//! A [`Ledger`] is just a path. Each call opens its own connection and
//! closes it before returning, so callers on worker threads never share a
//! connection.
//!
//! # Example
//!
//! ```ignore
//! use ledgerstore::{Access, Ledger};
//!
//! let ledger = Ledger::open("budget.db")?;
//! ledger.init_schema()?;
//! ledger.seed_demo()?;
//! let rows = ledger.query_rows("SELECT * FROM goals", Access::ReadOnly)?;
//! ```

mod error;
mod model;
pub mod schema;
mod store;

pub use error::{LedgerError, Result};
pub use model::{ExpenseCategory, InputType, NewBudget, NewExpense, NewGoal, NewUser};
pub use store::{Access, Ledger, Row, SeedReport, TableCounts};
