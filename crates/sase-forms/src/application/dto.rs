//! Data Transfer Objects (DTOs)
//!
//! Wire envelopes and receipts returned across the application boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::application::coordinator::{GateError, Rejection, SubmissionOutcome};
use crate::domain::aggregates::{FormSchema, FormStatus};
use crate::domain::value_objects::{FieldDefinition, FormId, SubmissionId};
use crate::ports::inbound::UseCaseError;

/// Standard API response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self::failure(ErrorBody::new(code, message))
    }

    pub fn failure(error: ErrorBody) -> Self {
        Self { success: false, data: None, error: Some(error) }
    }
}

/// Error envelope body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    /// Per-field messages for validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, String>>,
}

impl ErrorBody {
    pub fn new(code: &str, message: &str) -> Self {
        Self { code: code.to_string(), message: message.to_string(), fields: None }
    }
}

impl From<&UseCaseError> for ErrorBody {
    fn from(e: &UseCaseError) -> Self {
        let code = match e {
            UseCaseError::NotFound(_) => "NOT_FOUND",
            UseCaseError::InvalidSchema(_) => "INVALID_SCHEMA",
            UseCaseError::Repository(_) => "STORAGE_FAILURE",
        };
        Self::new(code, &e.to_string())
    }
}

/// Custom pattern that does not compile, reported at publish time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternWarning {
    pub field_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReceipt {
    pub form: FormSchema,
    pub share_url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PatternWarning>,
}

/// Form as shown to anyone but its author; the validation code is
/// reduced to whether one is required
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicForm {
    pub id: FormId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldDefinition>,
    pub status: FormStatus,
    pub submission_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub requires_code: bool,
}

impl From<&FormSchema> for PublicForm {
    fn from(form: &FormSchema) -> Self {
        Self {
            id: form.id().clone(),
            title: form.title().to_string(),
            description: form.description().map(String::from),
            fields: form.fields().to_vec(),
            status: form.status(),
            submission_count: form.submission_count(),
            share_url: form.stored_share_url().map(String::from),
            created_at: form.created_at(),
            requires_code: form.validation_code().is_some(),
        }
    }
}

impl From<FormSchema> for PublicForm {
    fn from(form: FormSchema) -> Self {
        Self::from(&form)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub submission_id: SubmissionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_count: Option<u64>,
}

impl From<SubmissionOutcome> for ApiResponse<SubmissionReceipt> {
    fn from(outcome: SubmissionOutcome) -> Self {
        match outcome {
            SubmissionOutcome::Committed { submission_id, submission_count } => {
                ApiResponse::success(SubmissionReceipt { submission_id, submission_count })
            }
            SubmissionOutcome::Gated(gate @ GateError::NotFound(_)) => {
                ApiResponse::error("NOT_FOUND", &gate.to_string())
            }
            SubmissionOutcome::Gated(gate @ GateError::Disabled(_)) => {
                ApiResponse::error("FORM_DISABLED", &gate.to_string())
            }
            SubmissionOutcome::Rejected(Rejection::InvalidCode) => {
                ApiResponse::error("INVALID_CODE", "Invalid validation code")
            }
            SubmissionOutcome::Rejected(Rejection::Validation(errors)) => {
                ApiResponse::failure(ErrorBody {
                    code: "VALIDATION_FAILED".to_string(),
                    message: format!("{} field(s) failed validation", errors.len()),
                    fields: Some(errors.messages()),
                })
            }
            SubmissionOutcome::Failed(e) => ApiResponse::error("STORAGE_FAILURE", &e.to_string()),
        }
    }
}
