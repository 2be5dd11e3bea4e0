//! Core Ledger implementation

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDateTime};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, params};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{LedgerError, Result};
use crate::model::{ExpenseCategory, InputType, NewBudget, NewExpense, NewGoal, NewUser};
use crate::schema::{SCHEMA, TABLES};

/// One result row: column name to JSON value, in column order
pub type Row = serde_json::Map<String, Value>;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Connection access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// Row counts per ledger table
#[derive(Debug, Clone, Default)]
pub struct TableCounts {
    pub counts: Vec<(String, i64)>,
}

impl TableCounts {
    pub fn get(&self, table: &str) -> Option<i64> {
        self.counts.iter().find(|(t, _)| t == table).map(|(_, n)| *n)
    }
}

/// What `seed_demo` inserted
#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    pub user_id: i64,
    pub expenses: usize,
    pub budgets: usize,
    pub goals: usize,
}

/// SQLite-backed budget ledger
///
/// The ledger holds only the database path. Every operation opens its own
/// connection and drops it before returning, so a `Ledger` can be shared
/// freely between threads.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    /// Open a ledger at the given path, creating the parent directory if needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| LedgerError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        debug!(?path, "Ledger::open: called");
        Ok(Self { path })
    }

    /// Path of the underlying database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh connection
    pub fn connect(&self, access: Access) -> Result<Connection> {
        debug!(?access, path = ?self.path, "Ledger::connect: called");
        let conn = match access {
            Access::ReadOnly => Connection::open_with_flags(
                &self.path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?,
            Access::ReadWrite => Connection::open(&self.path)?,
        };
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Create all tables and indexes (idempotent)
    pub fn init_schema(&self) -> Result<()> {
        let conn = self.connect(Access::ReadWrite)?;
        conn.execute_batch(SCHEMA)?;
        info!(path = ?self.path, "Ledger schema initialized");
        Ok(())
    }

    /// Run a statement and collect every row it returns
    pub fn query_rows(&self, sql: &str, access: Access) -> Result<Vec<Row>> {
        debug!(?access, sql_len = sql.len(), "Ledger::query_rows: called");
        let conn = self.connect(access)?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                record.insert(name.clone(), value_to_json(row.get_ref(idx)?));
            }
            out.push(record);
        }

        debug!(row_count = out.len(), "Ledger::query_rows: done");
        Ok(out)
    }

    /// Run a single mutating statement in a transaction and return the affected row count
    ///
    /// The transaction commits only when the statement succeeds; any error drops
    /// it, which rolls back.
    pub fn execute_write(&self, sql: &str) -> Result<u64> {
        debug!(sql_len = sql.len(), "Ledger::execute_write: called");
        let mut conn = self.connect(Access::ReadWrite)?;
        let tx = conn.transaction()?;
        let affected = tx.execute(sql, [])?;
        tx.commit()?;
        debug!(affected, "Ledger::execute_write: committed");
        Ok(affected as u64)
    }

    /// Insert a user, or return the id of the existing user with that email
    pub fn insert_user(&self, user: &NewUser) -> Result<i64> {
        let conn = self.connect(Access::ReadWrite)?;
        conn.execute(
            "INSERT OR IGNORE INTO users (email, hashed_password, full_name) VALUES (?1, ?2, ?3)",
            params![user.email, user.hashed_password, user.full_name],
        )?;
        let id = conn.query_row("SELECT id FROM users WHERE email = ?1", params![user.email], |row| {
            row.get(0)
        })?;
        Ok(id)
    }

    /// Insert an expense and return its id
    pub fn add_expense(&self, expense: &NewExpense) -> Result<i64> {
        expense.validate()?;
        let conn = self.connect(Access::ReadWrite)?;
        conn.execute(
            "INSERT INTO expenses (user_id, amount, description, category, input_type, merchant, date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                expense.user_id,
                expense.amount,
                expense.description,
                expense.category.as_str(),
                expense.input_type.as_str(),
                expense.merchant,
                expense.date.format(DATETIME_FORMAT).to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a budget line and return its id
    pub fn add_budget(&self, budget: &NewBudget) -> Result<i64> {
        budget.validate()?;
        let conn = self.connect(Access::ReadWrite)?;
        conn.execute(
            "INSERT INTO budgets (expense_category, percentage, amount, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                budget.category.as_str(),
                budget.percentage,
                budget.amount,
                budget.start_date.format(DATE_FORMAT).to_string(),
                budget.end_date.format(DATE_FORMAT).to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a goal and return its id
    pub fn add_goal(&self, goal: &NewGoal) -> Result<i64> {
        let conn = self.connect(Access::ReadWrite)?;
        conn.execute(
            "INSERT INTO goals (name, target_amount, current_amount, deadline) VALUES (?1, ?2, ?3, ?4)",
            params![
                goal.name,
                goal.target_amount,
                goal.current_amount,
                goal.deadline.format(DATE_FORMAT).to_string(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Count rows in every ledger table
    pub fn table_counts(&self) -> Result<TableCounts> {
        let conn = self.connect(Access::ReadOnly)?;
        let mut counts = Vec::with_capacity(TABLES.len());
        for (table, _) in TABLES {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            counts.push((table.to_string(), n));
        }
        Ok(TableCounts { counts })
    }

    /// Insert a demo user with a month of expenses, budgets and goals
    ///
    /// Expenses, budgets and goals are appended on every call; the user is
    /// reused if it already exists.
    pub fn seed_demo(&self) -> Result<SeedReport> {
        let now = Local::now().naive_local();
        let user_id = self.insert_user(&NewUser {
            email: "test@example.com".to_string(),
            full_name: "Test User".to_string(),
            hashed_password: "not-a-real-hash".to_string(),
        })?;

        let expenses = demo_expenses(user_id, now);
        for expense in &expenses {
            self.add_expense(expense)?;
        }

        let month_start = now.date().with_day0(0).unwrap_or(now.date());
        let month_end = month_start + ChronoDuration::days(30);
        let budgets = [
            (ExpenseCategory::Food, 400.0, Some(20.0)),
            (ExpenseCategory::Transportation, 150.0, Some(7.5)),
            (ExpenseCategory::Entertainment, 100.0, Some(5.0)),
            (ExpenseCategory::Healthcare, 200.0, Some(10.0)),
        ];
        for (category, amount, percentage) in budgets {
            self.add_budget(&NewBudget {
                category,
                percentage,
                amount,
                start_date: month_start,
                end_date: month_end,
            })?;
        }

        let goals = [
            ("Emergency fund", 5000.0, 1200.0, 180),
            ("Summer vacation", 2000.0, 350.0, 120),
        ];
        for (name, target_amount, current_amount, days) in goals {
            self.add_goal(&NewGoal {
                name: name.to_string(),
                target_amount,
                current_amount,
                deadline: now.date() + ChronoDuration::days(days),
            })?;
        }

        let report = SeedReport {
            user_id,
            expenses: expenses.len(),
            budgets: budgets.len(),
            goals: goals.len(),
        };
        info!(?report, "Seeded demo ledger");
        Ok(report)
    }
}

fn demo_expenses(user_id: i64, now: NaiveDateTime) -> Vec<NewExpense> {
    let rows = [
        (45.99, "Lunch at Chipotle", ExpenseCategory::Food, "Chipotle", InputType::Text, 1),
        (150.00, "Monthly gym membership", ExpenseCategory::Healthcare, "LA Fitness", InputType::Plaid, 3),
        (89.99, "New headphones", ExpenseCategory::Shopping, "Best Buy", InputType::Image, 5),
        (35.00, "Uber ride to airport", ExpenseCategory::Transportation, "Uber", InputType::Plaid, 6),
        (15.99, "Netflix subscription", ExpenseCategory::Entertainment, "Netflix", InputType::Plaid, 8),
        (62.40, "Weekly groceries", ExpenseCategory::Food, "Trader Joe's", InputType::Text, 9),
    ];
    rows.into_iter()
        .map(|(amount, description, category, merchant, input_type, days_ago)| NewExpense {
            user_id,
            amount,
            description: description.to_string(),
            category,
            input_type,
            merchant: Some(merchant.to_string()),
            date: now - ChronoDuration::days(days_ago),
        })
        .collect()
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
    }
}
