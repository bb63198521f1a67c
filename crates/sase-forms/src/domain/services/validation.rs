//! Answer validation
//!
//! Checks a candidate answer map against a schema, field by field, looking
//! only at fields the respondent can currently see. Produces at most one
//! error per field; an empty result means the answers are submittable.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

use crate::domain::aggregates::FormSchema;
use crate::domain::services::visibility::VisibilityState;
use crate::domain::value_objects::{
    AnswerValue, Answers, ColumnKind, FieldDefinition, FieldKind, OptionDefinition, PatternKind,
    TextConfig, TextValidation,
};

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid format";

static EMAIL: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$"));
static PHONE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"^\d{10}$"));
static NUMBER: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"^\d+$"));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    Required,
    Pattern,
    /// The field's pattern could not be compiled; every answer fails
    InvalidPattern,
    Length,
    UnknownOption,
    UnknownColumn,
    /// Rows given for a scalar field or text for a table
    Shape,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn new(kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

/// Per-field errors keyed by field id
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, FieldError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn len(&self) -> usize { self.0.len() }

    pub fn get(&self, field_id: &str) -> Option<&FieldError> {
        self.0.get(field_id)
    }

    pub fn contains(&self, field_id: &str) -> bool {
        self.0.contains_key(field_id)
    }

    pub fn insert(&mut self, field_id: impl Into<String>, error: FieldError) {
        self.0.insert(field_id.into(), error);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Flattened `field id -> message` map for wire responses
    pub fn messages(&self) -> BTreeMap<String, String> {
        self.0.iter().map(|(k, v)| (k.clone(), v.message.clone())).collect()
    }
}

pub struct ValidationEngine;

impl ValidationEngine {
    /// Validate `answers` for every field `visibility` marks as shown
    pub fn validate(
        schema: &FormSchema,
        visibility: &VisibilityState,
        answers: &Answers,
    ) -> ValidationErrors {
        let mut errors = ValidationErrors::default();

        for field in schema.fields().iter().filter(|f| visibility.is_visible(&f.id)) {
            if let Err(error) = check_field(field, answers.get(&field.id)) {
                errors.insert(field.id.clone(), error);
            }
        }

        debug!(
            form_id = %schema.id(),
            checked = schema.fields().len(),
            errors = errors.len(),
            "validation run"
        );
        errors
    }
}

fn check_field(field: &FieldDefinition, answer: Option<&AnswerValue>) -> Result<(), FieldError> {
    // Resolved before the emptiness check: a broken pattern fails every value
    let pattern = match &field.kind {
        FieldKind::Text(TextConfig { validation: Some(validation), .. }) => {
            Some((resolve_pattern(validation)?, validation))
        }
        _ => None,
    };

    let empty = answer.map(AnswerValue::is_empty).unwrap_or(true);
    if empty {
        return if field.is_required {
            Err(FieldError::new(FieldErrorKind::Required, REQUIRED_MESSAGE))
        } else {
            Ok(())
        };
    }
    let Some(answer) = answer else {
        return Ok(());
    };

    match (&field.kind, answer) {
        (FieldKind::Text(config), AnswerValue::Text(value)) => {
            if let Some((matcher, validation)) = pattern {
                if !matcher.is_match(value) {
                    return Err(FieldError::new(FieldErrorKind::Pattern, format_message(validation)));
                }
            }
            check_length(config, value)
        }
        (FieldKind::Dropdown(config), AnswerValue::Text(value)) => check_option(&config.options, value),
        (FieldKind::File, AnswerValue::Text(_)) => Ok(()),
        (FieldKind::Table(config), AnswerValue::Rows(rows)) => {
            for row in rows {
                for (name, cell) in row {
                    let column = config
                        .columns
                        .iter()
                        .find(|c| &c.name == name)
                        .ok_or_else(|| {
                            FieldError::new(FieldErrorKind::UnknownColumn, format!("Unknown column {}", name))
                        })?;
                    if let ColumnKind::Dropdown { options } = &column.kind {
                        if !cell.is_empty() {
                            check_option(options, cell)?;
                        }
                    }
                }
            }
            Ok(())
        }
        (FieldKind::Table(_), AnswerValue::Text(_)) => {
            Err(FieldError::new(FieldErrorKind::Shape, "Expected table rows"))
        }
        (FieldKind::Text(_) | FieldKind::Dropdown(_) | FieldKind::File, AnswerValue::Rows(_)) => {
            Err(FieldError::new(FieldErrorKind::Shape, "Expected a single value"))
        }
    }
}

/// Compiled pattern of a text field
enum Matcher {
    Builtin(&'static Regex),
    /// Author rules are written for JavaScript `RegExp`, so lookaround and
    /// backreferences must compile
    Custom(fancy_regex::Regex),
}

impl Matcher {
    fn is_match(&self, value: &str) -> bool {
        match self {
            Matcher::Builtin(regex) => regex.is_match(value),
            // Hitting the backtrack limit counts as a mismatch
            Matcher::Custom(regex) => regex.is_match(value).unwrap_or(false),
        }
    }
}

fn resolve_pattern(validation: &TextValidation) -> Result<Matcher, FieldError> {
    let invalid = || FieldError::new(FieldErrorKind::InvalidPattern, format_message(validation));
    let builtin = |regex: &'static Result<Regex, regex::Error>| {
        regex.as_ref().map(Matcher::Builtin).map_err(|_| invalid())
    };

    match validation.pattern {
        PatternKind::Email => builtin(&*EMAIL),
        PatternKind::Phone => builtin(&*PHONE),
        PatternKind::Number => builtin(&*NUMBER),
        PatternKind::Custom => validation
            .custom_rule
            .as_deref()
            .filter(|rule| !rule.is_empty())
            .and_then(|rule| fancy_regex::Regex::new(rule).ok())
            .map(Matcher::Custom)
            .ok_or_else(invalid),
    }
}

fn format_message(validation: &TextValidation) -> String {
    validation
        .error_message
        .clone()
        .unwrap_or_else(|| INVALID_FORMAT_MESSAGE.to_string())
}

fn check_length(config: &TextConfig, value: &str) -> Result<(), FieldError> {
    let length = value.chars().count();
    if let Some(min) = config.min_length {
        if length < min {
            return Err(FieldError::new(
                FieldErrorKind::Length,
                format!("Must be at least {} characters", min),
            ));
        }
    }
    if let Some(max) = config.max_length {
        if length > max {
            return Err(FieldError::new(
                FieldErrorKind::Length,
                format!("Must be at most {} characters", max),
            ));
        }
    }
    Ok(())
}

fn check_option(options: &[OptionDefinition], value: &str) -> Result<(), FieldError> {
    if options.iter().any(|o| o.value == value) {
        Ok(())
    } else {
        Err(FieldError::new(FieldErrorKind::UnknownOption, "Select one of the available options"))
    }
}
