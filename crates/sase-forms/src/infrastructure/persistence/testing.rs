//! Storage doubles for fallback tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::InMemoryFormRepository;
use crate::domain::aggregates::{FormSchema, FormStatus, SubmissionRecord};
use crate::domain::value_objects::{Answers, FormId, SubmissionId};
use crate::ports::outbound::{FormRepository, RepositoryError};

/// Memory tier with switchable faults
#[derive(Default)]
pub(crate) struct FlakyTier {
    pub(crate) inner: InMemoryFormRepository,
    create_form_failures: AtomicUsize,
    fail_submissions: AtomicBool,
    disable_after_get: AtomicBool,
}

impl FlakyTier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` `create_form` calls, then recover
    pub(crate) fn failing_creates(self, count: usize) -> Self {
        self.create_form_failures.store(count, Ordering::SeqCst);
        self
    }

    pub(crate) fn failing_submissions(self) -> Self {
        self.fail_submissions.store(true, Ordering::SeqCst);
        self
    }

    /// Disable the form right after `get_form` handed out an active snapshot
    pub(crate) fn disabling_after_get(self) -> Self {
        self.disable_after_get.store(true, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl FormRepository for FlakyTier {
    async fn create_form(&self, schema: FormSchema) -> Result<FormId, RepositoryError> {
        let failing = self
            .create_form_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RepositoryError::Unavailable("disk offline".into()));
        }
        self.inner.create_form(schema).await
    }

    async fn get_form(&self, id: &FormId) -> Result<FormSchema, RepositoryError> {
        let schema = self.inner.get_form(id).await?;
        if self.disable_after_get.load(Ordering::SeqCst) {
            self.inner.update_form_status(id, FormStatus::Disabled).await?;
        }
        Ok(schema)
    }

    async fn list_forms(&self) -> Result<Vec<FormSchema>, RepositoryError> {
        self.inner.list_forms().await
    }

    async fn replace_form(&self, schema: FormSchema) -> Result<bool, RepositoryError> {
        self.inner.replace_form(schema).await
    }

    async fn update_form_status(&self, id: &FormId, status: FormStatus) -> Result<bool, RepositoryError> {
        self.inner.update_form_status(id, status).await
    }

    async fn create_submission(
        &self,
        form_id: &FormId,
        answers: Answers,
    ) -> Result<SubmissionId, RepositoryError> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("disk full".into()));
        }
        self.inner.create_submission(form_id, answers).await
    }

    async fn increment_submission_count(&self, form_id: &FormId) -> Result<u64, RepositoryError> {
        self.inner.increment_submission_count(form_id).await
    }

    async fn list_submissions(&self, form_id: &FormId) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        self.inner.list_submissions(form_id).await
    }

    async fn delete_submission(&self, id: &SubmissionId) -> Result<bool, RepositoryError> {
        self.inner.delete_submission(id).await
    }

    async fn delete_form(&self, id: &FormId) -> Result<bool, RepositoryError> {
        self.inner.delete_form(id).await
    }

    fn backend_name(&self) -> &str {
        "flaky"
    }
}
