//! Outbound ports (Repository traits)
//!
//! Hexagonal architecture: these are the interfaces that storage backends
//! must implement. Every backend, whether file, memory or a fallback chain of
//! both, satisfies [`FormRepository`] exactly.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::aggregates::{FormSchema, FormStatus, SubmissionRecord};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{Answers, FormId, SubmissionId};

/// Form and submission repository port
#[async_trait]
pub trait FormRepository: Send + Sync {
    /// Store a published schema
    async fn create_form(&self, schema: FormSchema) -> Result<FormId, RepositoryError>;

    /// Fetch a schema; missing optional attributes come back as defaults
    async fn get_form(&self, id: &FormId) -> Result<FormSchema, RepositoryError>;

    async fn list_forms(&self) -> Result<Vec<FormSchema>, RepositoryError>;

    /// Swap in a republished definition. The stored counter, status, share
    /// URL and creation time are kept. `false` when the form does not exist.
    async fn replace_form(&self, schema: FormSchema) -> Result<bool, RepositoryError>;

    /// `false` when the form does not exist
    async fn update_form_status(&self, id: &FormId, status: FormStatus) -> Result<bool, RepositoryError>;

    /// Store one submission.
    ///
    /// Fails with `NotFound` when the form is absent and `Disabled` when it
    /// is not accepting submissions.
    async fn create_submission(
        &self,
        form_id: &FormId,
        answers: Answers,
    ) -> Result<SubmissionId, RepositoryError>;

    /// Atomic increment, returns the new count
    async fn increment_submission_count(&self, form_id: &FormId) -> Result<u64, RepositoryError>;

    /// Newest first
    async fn list_submissions(&self, form_id: &FormId) -> Result<Vec<SubmissionRecord>, RepositoryError>;

    async fn delete_submission(&self, id: &SubmissionId) -> Result<bool, RepositoryError>;

    /// Deletes the form together with its submissions
    async fn delete_form(&self, id: &FormId) -> Result<bool, RepositoryError>;

    /// Storage mode serving requests, e.g. `file` or `memory`
    fn backend_name(&self) -> &str;
}

/// Event publisher port
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish domain events
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), RepositoryError>;
}

/// Repository error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepositoryError {
    #[error("form not found: {0}")]
    NotFound(String),

    #[error("form is disabled: {0}")]
    Disabled(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("all {attempts} storage tiers failed, last error: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<RepositoryError>,
    },
}

impl RepositoryError {
    /// Infrastructure failures may be retried on the next tier; domain
    /// outcomes such as `NotFound` are final.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Serialization(_) | Self::Unavailable(_)
        )
    }
}

impl From<std::io::Error> for RepositoryError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_eligibility() {
        assert!(RepositoryError::Storage("disk full".into()).is_fallback_eligible());
        assert!(RepositoryError::Unavailable("down".into()).is_fallback_eligible());
        assert!(!RepositoryError::NotFound("f".into()).is_fallback_eligible());
        assert!(!RepositoryError::Disabled("f".into()).is_fallback_eligible());

        let exhausted = RepositoryError::Exhausted {
            attempts: 2,
            last: Box::new(RepositoryError::Storage("disk full".into())),
        };
        assert!(!exhausted.is_fallback_eligible());
        assert_eq!(
            exhausted.to_string(),
            "all 2 storage tiers failed, last error: storage error: disk full"
        );
    }
}
