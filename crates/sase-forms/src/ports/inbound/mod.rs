//! Inbound ports (Use case traits)
//!
//! Hexagonal architecture: application service interfaces.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::coordinator::{SubmissionOutcome, SubmitCommand};
use crate::application::dto::PublishReceipt;
use crate::domain::aggregates::{FormSchema, FormStatus, SchemaError, SubmissionRecord};
use crate::domain::value_objects::{FormId, SubmissionId};
use crate::ports::outbound::RepositoryError;

/// Author and operator use cases
#[async_trait]
pub trait FormAdministration: Send + Sync {
    /// Check and store a schema; refused if any schema error is found
    async fn publish(&self, schema: FormSchema) -> Result<PublishReceipt, UseCaseError>;

    /// Replace the definition of an existing form. Submission counter,
    /// status, share URL and creation time carry over.
    async fn republish(&self, id: &FormId, schema: FormSchema) -> Result<PublishReceipt, UseCaseError>;

    async fn get_form(&self, id: &FormId) -> Result<FormSchema, UseCaseError>;

    async fn list_forms(&self) -> Result<Vec<FormSchema>, UseCaseError>;

    /// Toggle active/disabled
    async fn set_status(&self, id: &FormId, status: FormStatus) -> Result<FormSchema, UseCaseError>;

    async fn list_submissions(&self, form_id: &FormId) -> Result<Vec<SubmissionRecord>, UseCaseError>;

    async fn delete_submission(&self, id: &SubmissionId) -> Result<(), UseCaseError>;

    /// Delete a form and every submission it received
    async fn delete_form(&self, id: &FormId) -> Result<(), UseCaseError>;
}

/// Respondent use cases
#[async_trait]
pub trait SubmissionUseCases: Send + Sync {
    /// One submit attempt; every terminal state is a value, never an error
    async fn submit(&self, command: SubmitCommand) -> SubmissionOutcome;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UseCaseError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid schema: {}", join_errors(.0))]
    InvalidSchema(Vec<SchemaError>),

    #[error("repository error: {0}")]
    Repository(RepositoryError),
}

fn join_errors(errors: &[SchemaError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<RepositoryError> for UseCaseError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(id) => Self::NotFound(id),
            other => Self::Repository(other),
        }
    }
}
