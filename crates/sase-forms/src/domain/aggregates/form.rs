//! Form Schema Aggregate
//!
//! The published description of a form. Respondent sessions only ever read
//! it; the author mutates it through status toggles or a full republish.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use thiserror::Error;

use crate::domain::value_objects::{
    ColumnKind, FieldDefinition, FieldKind, FormId, PatternKind,
};

/// Lifecycle status of a published form
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStatus {
    #[default]
    Active,
    Disabled,
}

impl FormStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, FormStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormStatus::Active => "active",
            FormStatus::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for FormStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(FormStatus::Active),
            "disabled" => Ok(FormStatus::Disabled),
            other => Err(format!("unknown form status: {}", other)),
        }
    }
}

/// Publish-time schema defects. Any of these refuses the publish.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("form title is required")]
    EmptyTitle,

    #[error("form must have at least one field")]
    NoFields,

    #[error("field {index} has an empty id")]
    EmptyFieldId { index: usize },

    #[error("duplicate field id: {field_id}")]
    DuplicateFieldId { field_id: String },

    #[error("field {field_id}: rule targets unknown field {target_id}")]
    UnknownTarget { field_id: String, target_id: String },

    #[error("field {field_id}: rule targets its own field")]
    SelfTarget { field_id: String },

    #[error("field {field_id}: rule references unknown option value {option_value}")]
    UnknownOptionValue { field_id: String, option_value: String },

    #[error("field {field_id}: duplicate option value {value}")]
    DuplicateOptionValue { field_id: String, value: String },

    #[error("dropdown {field_id} must have at least one option")]
    NoOptions { field_id: String },

    #[error("table {field_id} must have at least one column")]
    NoColumns { field_id: String },

    #[error("table {field_id}: duplicate column name {column}")]
    DuplicateColumn { field_id: String, column: String },

    #[error("table {field_id}: dropdown column {column} has no options")]
    ColumnWithoutOptions { field_id: String, column: String },

    #[error("field {field_id}: custom validation requires a regex pattern")]
    MissingCustomRule { field_id: String },

    #[error("field {field_id}: minLength {min} exceeds maxLength {max}")]
    InvalidLengthRange { field_id: String, min: usize, max: usize },
}

/// Wire document of a form schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchemaDocument {
    #[serde(default)]
    pub id: FormId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_code: Option<String>,
    #[serde(default)]
    pub status: FormStatus,
    #[serde(default)]
    pub submission_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,
    #[serde(default = "Utc::now", alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

/// Form schema aggregate root
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "FormSchemaDocument", into = "FormSchemaDocument")]
pub struct FormSchema {
    id: FormId,
    title: String,
    description: Option<String>,
    fields: Vec<FieldDefinition>,
    validation_code: Option<String>,
    status: FormStatus,
    submission_count: u64,
    share_url: Option<String>,
    created_at: DateTime<Utc>,
    // field id -> position of its first occurrence
    index: HashMap<String, usize>,
}

impl From<FormSchemaDocument> for FormSchema {
    fn from(doc: FormSchemaDocument) -> Self {
        let index = build_index(&doc.fields);
        Self {
            id: doc.id,
            title: doc.title,
            description: doc.description,
            fields: doc.fields,
            validation_code: doc.validation_code,
            status: doc.status,
            submission_count: doc.submission_count,
            share_url: doc.share_url,
            created_at: doc.created_at,
            index,
        }
    }
}

impl From<FormSchema> for FormSchemaDocument {
    fn from(schema: FormSchema) -> Self {
        Self {
            id: schema.id,
            title: schema.title,
            description: schema.description,
            fields: schema.fields,
            validation_code: schema.validation_code,
            status: schema.status,
            submission_count: schema.submission_count,
            share_url: schema.share_url,
            created_at: schema.created_at,
        }
    }
}

fn build_index(fields: &[FieldDefinition]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(fields.len());
    for (position, field) in fields.iter().enumerate() {
        index.entry(field.id.clone()).or_insert(position);
    }
    index
}

impl FormSchema {
    /// Create a new active schema with a fresh id
    pub fn create(title: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        FormSchemaDocument {
            id: FormId::new(),
            title: title.into(),
            description: None,
            fields,
            validation_code: None,
            status: FormStatus::Active,
            submission_count: 0,
            share_url: None,
            created_at: Utc::now(),
        }
        .into()
    }

    pub fn with_id(mut self, id: FormId) -> Self {
        self.id = id;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_validation_code(mut self, code: impl Into<String>) -> Self {
        self.validation_code = Some(code.into());
        self
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> &FormId { &self.id }
    pub fn title(&self) -> &str { &self.title }
    pub fn description(&self) -> Option<&str> { self.description.as_deref() }
    pub fn fields(&self) -> &[FieldDefinition] { &self.fields }
    pub fn validation_code(&self) -> Option<&str> { self.validation_code.as_deref() }
    pub fn status(&self) -> FormStatus { self.status }
    pub fn submission_count(&self) -> u64 { self.submission_count }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// Stored share URL, or `{base_url}/form/{id}` when the backend never stored one
    pub fn share_url(&self, base_url: &str) -> String {
        match &self.share_url {
            Some(url) => url.clone(),
            None => derive_share_url(base_url, &self.id),
        }
    }

    pub fn stored_share_url(&self) -> Option<&str> {
        self.share_url.as_deref()
    }

    /// O(1) lookup by field id
    pub fn field_by_id(&self, id: &str) -> Option<&FieldDefinition> {
        self.index.get(id).and_then(|&position| self.fields.get(position))
    }

    /// Dropdown ids whose rules target `field_id`, in schema order
    pub fn controllers_of(&self, field_id: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.conditions().iter().any(|r| r.target_id == field_id))
            .map(|f| f.id.as_str())
            .collect()
    }

    // =========================================================================
    // Mutations owned by the author / storage layer
    // =========================================================================

    pub fn set_status(&mut self, status: FormStatus) {
        self.status = status;
    }

    pub fn set_submission_count(&mut self, count: u64) {
        self.submission_count = count;
    }

    pub fn set_share_url(&mut self, url: impl Into<String>) {
        self.share_url = Some(url.into());
    }

    /// Keep what the store owns across a republish: counter, status, share
    /// URL and creation time
    pub fn with_stored_attributes(mut self, stored: &FormSchema) -> Self {
        self.id = stored.id.clone();
        self.status = stored.status;
        self.submission_count = stored.submission_count;
        self.created_at = stored.created_at;
        if let Some(url) = &stored.share_url {
            self.share_url = Some(url.clone());
        }
        self
    }

    /// Recompute every `isConditional` flag from the rules that target it
    pub fn normalized(mut self) -> Self {
        let targeted: HashSet<String> = self
            .fields
            .iter()
            .flat_map(|f| f.conditions().iter().map(|r| r.target_id.clone()))
            .collect();
        for field in &mut self.fields {
            field.is_conditional = targeted.contains(&field.id);
        }
        self
    }

    // =========================================================================
    // Publish-time checks
    // =========================================================================

    /// Every schema defect found; empty means publishable
    pub fn validate(&self) -> Vec<SchemaError> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push(SchemaError::EmptyTitle);
        }
        if self.fields.is_empty() {
            errors.push(SchemaError::NoFields);
            return errors;
        }

        let mut seen = HashSet::new();
        for (index, field) in self.fields.iter().enumerate() {
            if field.id.is_empty() {
                errors.push(SchemaError::EmptyFieldId { index });
            } else if !seen.insert(field.id.as_str()) {
                errors.push(SchemaError::DuplicateFieldId { field_id: field.id.clone() });
            }
        }

        for field in &self.fields {
            self.validate_field(field, &mut errors);
        }

        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    fn validate_field(&self, field: &FieldDefinition, errors: &mut Vec<SchemaError>) {
        let field_id = || field.id.clone();

        match &field.kind {
            FieldKind::Text(config) => {
                if let (Some(min), Some(max)) = (config.min_length, config.max_length) {
                    if min > max {
                        errors.push(SchemaError::InvalidLengthRange { field_id: field_id(), min, max });
                    }
                }
                if let Some(validation) = &config.validation {
                    let missing_rule = validation
                        .custom_rule
                        .as_deref()
                        .map(str::is_empty)
                        .unwrap_or(true);
                    if validation.pattern == PatternKind::Custom && missing_rule {
                        errors.push(SchemaError::MissingCustomRule { field_id: field_id() });
                    }
                }
            }
            FieldKind::Dropdown(config) => {
                if config.options.is_empty() {
                    errors.push(SchemaError::NoOptions { field_id: field_id() });
                }

                let mut values = HashSet::new();
                for option in &config.options {
                    if !values.insert(option.value.as_str()) {
                        errors.push(SchemaError::DuplicateOptionValue {
                            field_id: field_id(),
                            value: option.value.clone(),
                        });
                    }
                }

                for rule in &config.conditions {
                    if rule.target_id == field.id {
                        errors.push(SchemaError::SelfTarget { field_id: field_id() });
                    } else if !self.index.contains_key(&rule.target_id) {
                        errors.push(SchemaError::UnknownTarget {
                            field_id: field_id(),
                            target_id: rule.target_id.clone(),
                        });
                    }
                    if !values.contains(rule.option_value.as_str()) {
                        errors.push(SchemaError::UnknownOptionValue {
                            field_id: field_id(),
                            option_value: rule.option_value.clone(),
                        });
                    }
                }
            }
            FieldKind::Table(config) => {
                if config.columns.is_empty() {
                    errors.push(SchemaError::NoColumns { field_id: field_id() });
                }

                let mut names = HashSet::new();
                for column in &config.columns {
                    if !names.insert(column.name.as_str()) {
                        errors.push(SchemaError::DuplicateColumn {
                            field_id: field_id(),
                            column: column.name.clone(),
                        });
                    }
                    if let ColumnKind::Dropdown { options } = &column.kind {
                        if options.is_empty() {
                            errors.push(SchemaError::ColumnWithoutOptions {
                                field_id: field_id(),
                                column: column.name.clone(),
                            });
                        }
                    }
                }
            }
            FieldKind::File => {}
        }
    }

    /// Custom patterns that do not compile, as `(field id, compiler message)`.
    ///
    /// Not a publish error: validation rejects every answer for such a field.
    pub fn pattern_warnings(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .filter_map(|field| match &field.kind {
                FieldKind::Text(config) => config.validation.as_ref().and_then(|v| {
                    match (v.pattern, v.custom_rule.as_deref()) {
                        (PatternKind::Custom, Some(rule)) => fancy_regex::Regex::new(rule)
                            .err()
                            .map(|e| (field.id.clone(), e.to_string())),
                        _ => None,
                    }
                }),
                FieldKind::Dropdown(_) | FieldKind::Table(_) | FieldKind::File => None,
            })
            .collect()
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

pub fn derive_share_url(base_url: &str, id: &FormId) -> String {
    format!("{}/form/{}", base_url.trim_end_matches('/'), id)
}
