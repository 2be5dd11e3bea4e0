//! Ledger schema
//!
//! The DDL is the source of truth for the tables; [`TABLES`] is the compact
//! column listing handed to query writers (including the LLM prompts).

/// Table name and its columns, in DDL order
pub const TABLES: &[(&str, &[&str])] = &[
    (
        "users",
        &[
            "id",
            "email",
            "hashed_password",
            "full_name",
            "is_active",
            "created_at",
            "updated_at",
        ],
    ),
    (
        "budgets",
        &[
            "id",
            "expense_category",
            "percentage",
            "amount",
            "start_date",
            "end_date",
            "created_at",
        ],
    ),
    (
        "expenses",
        &[
            "id",
            "user_id",
            "amount",
            "description",
            "category",
            "input_type",
            "merchant",
            "date",
            "created_at",
            "raw_data",
            "processed_text",
        ],
    ),
    (
        "goals",
        &["id", "name", "target_amount", "current_amount", "deadline", "created_at"],
    ),
    (
        "transactions",
        &[
            "id",
            "bill_id",
            "user_id",
            "item_name",
            "amount",
            "merchant_name",
            "category",
            "transaction_date",
            "created_at",
        ],
    ),
];

/// SQLite DDL for the ledger
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    email           TEXT NOT NULL UNIQUE,
    hashed_password TEXT NOT NULL,
    full_name       TEXT,
    is_active       INTEGER NOT NULL DEFAULT 1,
    created_at      TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at      TEXT
);

CREATE TABLE IF NOT EXISTS budgets (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    expense_category TEXT NOT NULL CHECK (expense_category IN (
        'food', 'transportation', 'housing', 'utilities', 'entertainment', 'healthcare',
        'shopping', 'education', 'personal', 'savings', 'investments', 'other')),
    percentage       REAL,
    amount           REAL NOT NULL,
    start_date       TEXT NOT NULL,
    end_date         TEXT NOT NULL,
    created_at       TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS expenses (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id        INTEGER NOT NULL REFERENCES users(id),
    amount         REAL NOT NULL,
    description    TEXT NOT NULL,
    category       TEXT NOT NULL CHECK (category IN (
        'food', 'transportation', 'housing', 'utilities', 'entertainment', 'healthcare',
        'shopping', 'education', 'personal', 'savings', 'investments', 'other')),
    input_type     TEXT NOT NULL CHECK (input_type IN ('text', 'audio', 'image', 'plaid')),
    merchant       TEXT,
    date           TEXT NOT NULL,
    created_at     TEXT NOT NULL DEFAULT (datetime('now')),
    raw_data       TEXT,
    processed_text TEXT
);

CREATE INDEX IF NOT EXISTS idx_expenses_user_date ON expenses(user_id, date);

CREATE TABLE IF NOT EXISTS goals (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    name           TEXT NOT NULL,
    target_amount  REAL NOT NULL,
    current_amount REAL NOT NULL DEFAULT 0,
    deadline       TEXT NOT NULL,
    created_at     TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS transactions (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    bill_id          TEXT NOT NULL,
    user_id          INTEGER NOT NULL REFERENCES users(id),
    item_name        TEXT NOT NULL,
    amount           REAL NOT NULL,
    merchant_name    TEXT NOT NULL,
    category         TEXT NOT NULL,
    transaction_date TEXT NOT NULL,
    created_at       TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_transactions_bill ON transactions(bill_id);
"#;

/// Render the table listing as one `- table (col, col, ...)` line per table
pub fn describe() -> String {
    TABLES
        .iter()
        .map(|(table, columns)| format!("- {} ({})", table, columns.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExpenseCategory, InputType};

    #[test]
    fn test_describe_lists_every_table() {
        let text = describe();
        for (table, _) in TABLES {
            assert!(text.contains(&format!("- {} (", table)), "missing {}", table);
        }
        assert!(text.contains("expenses (id, user_id, amount"));
    }

    #[test]
    fn test_schema_check_constraints_cover_vocabularies() {
        for category in ExpenseCategory::ALL {
            assert!(SCHEMA.contains(&format!("'{}'", category)), "missing {}", category);
        }
        for input_type in InputType::ALL {
            assert!(SCHEMA.contains(&format!("'{}'", input_type)), "missing {}", input_type);
        }
    }

    #[test]
    fn test_tables_match_ddl() {
        for (table, columns) in TABLES {
            assert!(SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {} (", table)));
            for column in *columns {
                assert!(SCHEMA.contains(column), "{}.{} not in DDL", table, column);
            }
        }
    }
}
