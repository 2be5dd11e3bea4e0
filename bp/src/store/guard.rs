//! Generated-SQL cleanup and statement checks

use tracing::debug;

use super::{QueryMode, StoreError};

/// Remove the wrapping models put around a query
///
/// Strips a Markdown code fence (with or without a language tag), one pair of
/// surrounding quotes or backticks, and trailing semicolons.
pub fn strip_wrapping(text: &str) -> String {
    debug!(text_len = text.len(), "strip_wrapping: called");
    let mut sql = text.trim();

    if let Some(rest) = sql.strip_prefix("```") {
        // Drop the language tag line, if any
        let body = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => strip_language_tag(rest),
        };
        sql = body.trim_end().strip_suffix("```").unwrap_or(body).trim();
    }

    for quote in ['"', '\'', '`'] {
        if sql.len() >= 2 && sql.starts_with(quote) && sql.ends_with(quote) {
            sql = sql[1..sql.len() - 1].trim();
            break;
        }
    }

    sql.trim_end_matches(|c: char| c == ';' || c.is_whitespace()).to_string()
}

/// Tags models put after an opening fence written on one line
const LANGUAGE_TAGS: &[&str] = &["sql", "sqlite", "postgresql", "postgres", "psql"];

/// Drop a leading language tag from a one-line fence body such as `sql SELECT 1`
fn strip_language_tag(body: &str) -> &str {
    let body = body.trim_start();
    match body.split_once(char::is_whitespace) {
        Some((tag, rest)) if LANGUAGE_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag)) => rest,
        _ => body,
    }
}

/// Check that `sql` is one statement whose verb fits `mode`
///
/// Reads must start with `SELECT` or `WITH`; writes with `INSERT`, `UPDATE`
/// or `DELETE`. A semicolon outside a string literal means a second statement.
pub fn check_statement(sql: &str, mode: QueryMode) -> Result<(), StoreError> {
    debug!(?mode, sql_len = sql.len(), "check_statement: called");
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(StoreError::Rejected("empty query".to_string()));
    }

    if has_statement_separator(sql) {
        return Err(StoreError::Rejected("only a single statement is allowed".to_string()));
    }

    let verb: String = sql
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();
    let allowed: &[&str] = match mode {
        QueryMode::Read => &["SELECT", "WITH"],
        QueryMode::Write => &["INSERT", "UPDATE", "DELETE"],
    };

    if allowed.contains(&verb.as_str()) {
        Ok(())
    } else {
        debug!(%verb, ?mode, "check_statement: verb not allowed");
        Err(StoreError::Rejected(format!(
            "{} queries must start with {}, got '{}'",
            mode,
            allowed.join(" or "),
            verb
        )))
    }
}

/// Whether a `;` appears outside string literals and comments
fn has_statement_separator(sql: &str) -> bool {
    enum Scan {
        Code,
        Quoted(char),
        LineComment,
        BlockComment,
    }

    let mut scan = Scan::Code;
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        scan = match scan {
            Scan::Code => match c {
                '\'' | '"' => Scan::Quoted(c),
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    Scan::LineComment
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    Scan::BlockComment
                }
                ';' => return true,
                _ => Scan::Code,
            },
            Scan::Quoted(q) if c == q => Scan::Code,
            Scan::LineComment if c == '\n' => Scan::Code,
            Scan::BlockComment if c == '*' && chars.peek() == Some(&'/') => {
                chars.next();
                Scan::Code
            }
            other => other,
        };
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        let text = "```sql\nSELECT * FROM expenses;\n```";
        assert_eq!(strip_wrapping(text), "SELECT * FROM expenses");
    }

    #[test]
    fn test_strip_bare_fence_and_quotes() {
        assert_eq!(strip_wrapping("```\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_wrapping("\"SELECT 1;\""), "SELECT 1");
        assert_eq!(strip_wrapping("`SELECT 1`"), "SELECT 1");
    }

    #[test]
    fn test_strip_one_line_fence_with_language_tag() {
        assert_eq!(strip_wrapping("```sql SELECT * FROM goals```"), "SELECT * FROM goals");
        assert_eq!(strip_wrapping("```SQLite SELECT 1;```"), "SELECT 1");
        assert_eq!(strip_wrapping("```SELECT 1```"), "SELECT 1");
        assert!(check_statement(&strip_wrapping("```sql SELECT * FROM goals```"), QueryMode::Read).is_ok());
    }

    #[test]
    fn test_strip_keeps_inner_literals() {
        let sql = "INSERT INTO goals (name) VALUES ('Car');;  ";
        assert_eq!(strip_wrapping(sql), "INSERT INTO goals (name) VALUES ('Car')");
    }

    #[test]
    fn test_read_accepts_select_and_with() {
        assert!(check_statement("SELECT 1", QueryMode::Read).is_ok());
        assert!(check_statement("with t as (select 1) select * from t", QueryMode::Read).is_ok());
    }

    #[test]
    fn test_read_rejects_mutations() {
        let err = check_statement("DELETE FROM expenses", QueryMode::Read).unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[test]
    fn test_write_rejects_ddl() {
        assert!(check_statement("DROP TABLE expenses", QueryMode::Write).is_err());
        assert!(check_statement("UPDATE budgets SET amount = 500", QueryMode::Write).is_ok());
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let err = check_statement("SELECT 1; DROP TABLE users", QueryMode::Read).unwrap_err();
        assert!(err.to_string().contains("single statement"));
    }

    #[test]
    fn test_semicolon_inside_literal_allowed() {
        let sql = "INSERT INTO expenses (description) VALUES ('coffee; bagel')";
        assert!(check_statement(sql, QueryMode::Write).is_ok());
    }

    #[test]
    fn test_semicolon_inside_comment_allowed() {
        assert!(check_statement("SELECT SUM(amount) FROM expenses -- total;", QueryMode::Read).is_ok());
        assert!(check_statement("SELECT /* a; b */ amount FROM expenses", QueryMode::Read).is_ok());
        assert!(check_statement("SELECT 1 -- note\n; DROP TABLE users", QueryMode::Read).is_err());
        assert!(check_statement("SELECT 1 /* open */; DELETE FROM goals", QueryMode::Read).is_err());
    }

    #[test]
    fn test_empty_rejected() {
        assert!(check_statement("   ", QueryMode::Read).is_err());
    }
}
