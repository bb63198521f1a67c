//! Respondent answers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One table row keyed by column name
pub type TableRow = BTreeMap<String, String>;

/// Answer map keyed by field id
pub type Answers = BTreeMap<String, AnswerValue>;

/// A single field's answer.
///
/// Text, dropdown and file fields carry a string (a file answer is the
/// upload reference); table fields carry rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Rows(Vec<TableRow>),
}

impl AnswerValue {
    pub fn text(value: impl Into<String>) -> Self {
        AnswerValue::Text(value.into())
    }

    /// Empty string, no rows, or only rows whose cells are all empty
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Text(value) => value.is_empty(),
            AnswerValue::Rows(rows) => rows
                .iter()
                .all(|row| row.values().all(|cell| cell.is_empty())),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(value) => Some(value),
            AnswerValue::Rows(_) => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[TableRow]> {
        match self {
            AnswerValue::Text(_) => None,
            AnswerValue::Rows(rows) => Some(rows),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        AnswerValue::Text(value.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(value: String) -> Self {
        AnswerValue::Text(value)
    }
}

impl From<Vec<TableRow>> for AnswerValue {
    fn from(rows: Vec<TableRow>) -> Self {
        AnswerValue::Rows(rows)
    }
}
