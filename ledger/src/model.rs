//! Ledger record types and closed vocabularies

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Spending category of an expense or budget line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Food,
    Transportation,
    Housing,
    Utilities,
    Entertainment,
    Healthcare,
    Shopping,
    Education,
    Personal,
    Savings,
    Investments,
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 12] = [
        Self::Food,
        Self::Transportation,
        Self::Housing,
        Self::Utilities,
        Self::Entertainment,
        Self::Healthcare,
        Self::Shopping,
        Self::Education,
        Self::Personal,
        Self::Savings,
        Self::Investments,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Transportation => "transportation",
            Self::Housing => "housing",
            Self::Utilities => "utilities",
            Self::Entertainment => "entertainment",
            Self::Healthcare => "healthcare",
            Self::Shopping => "shopping",
            Self::Education => "education",
            Self::Personal => "personal",
            Self::Savings => "savings",
            Self::Investments => "investments",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == needle)
            .ok_or(LedgerError::UnknownVariant {
                kind: "expense category",
                value: s.to_string(),
            })
    }
}

/// How an expense entered the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Audio,
    Image,
    Plaid,
}

impl InputType {
    pub const ALL: [InputType; 4] = [Self::Text, Self::Audio, Self::Image, Self::Plaid];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Plaid => "plaid",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == needle)
            .ok_or(LedgerError::UnknownVariant {
                kind: "input type",
                value: s.to_string(),
            })
    }
}

/// A user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub hashed_password: String,
}

/// An expense to insert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    pub user_id: i64,
    pub amount: f64,
    pub description: String,
    pub category: ExpenseCategory,
    pub input_type: InputType,
    pub merchant: Option<String>,
    pub date: NaiveDateTime,
}

/// A budget line for one category over a date range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBudget {
    pub category: ExpenseCategory,
    pub percentage: Option<f64>,
    pub amount: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// A savings goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGoal {
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub deadline: NaiveDate,
}

impl NewExpense {
    pub(crate) fn validate(&self) -> Result<(), LedgerError> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(LedgerError::InvalidRecord(format!(
                "expense amount must be a non-negative number, got {}",
                self.amount
            )));
        }
        if self.description.trim().is_empty() {
            return Err(LedgerError::InvalidRecord("expense description is empty".to_string()));
        }
        Ok(())
    }
}

impl NewBudget {
    pub(crate) fn validate(&self) -> Result<(), LedgerError> {
        if self.end_date < self.start_date {
            return Err(LedgerError::InvalidRecord(format!(
                "budget ends ({}) before it starts ({})",
                self.end_date, self.start_date
            )));
        }
        Ok(())
    }
}
