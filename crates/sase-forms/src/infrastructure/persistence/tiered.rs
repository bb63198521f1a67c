//! Tier fallback
//!
//! Wraps an ordered list of backends, most durable first. Calls start at the
//! serving tier; infrastructure failures fall through to the next one.
//!
//! Once a lower tier has served a call the chain stays pinned to it for the
//! rest of the process, so data written during an outage stays readable after
//! the upper tier recovers. A tier is never promoted back automatically.
//!
//! `NotFound` and `Disabled` are final only when they come from the tier the
//! call started on. A lower tier reached by fallback never saw what the
//! failed tier holds, so its domain answers are discarded and the call ends
//! in [`RepositoryError::Exhausted`] carrying the last infrastructure error.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::aggregates::{FormSchema, FormStatus, SubmissionRecord};
use crate::domain::value_objects::{Answers, FormId, SubmissionId};
use crate::ports::outbound::{FormRepository, RepositoryError};

/// Ordered chain of storage tiers
pub struct TieredFormRepository {
    tiers: Vec<Arc<dyn FormRepository>>,
    // index of the serving tier; only ever moves down the chain
    serving: AtomicUsize,
}

impl TieredFormRepository {
    pub fn new(tiers: Vec<Arc<dyn FormRepository>>) -> Self {
        Self {
            tiers,
            serving: AtomicUsize::new(0),
        }
    }

    pub fn tier_names(&self) -> Vec<&str> {
        self.tiers.iter().map(|t| t.backend_name()).collect()
    }

    fn pin(&self, index: usize) {
        let previous = self.serving.fetch_max(index, Ordering::AcqRel);
        if previous < index {
            if let (Some(from), Some(to)) = (self.tiers.get(previous), self.tiers.get(index)) {
                warn!(
                    from = from.backend_name(),
                    to = to.backend_name(),
                    "storage pinned to fallback tier"
                );
            }
        }
    }

    fn exhausted(&self, attempts: usize, last: Option<RepositoryError>) -> RepositoryError {
        RepositoryError::Exhausted {
            attempts,
            last: Box::new(
                last.unwrap_or_else(|| RepositoryError::Unavailable("no storage tiers configured".into())),
            ),
        }
    }
}

/// Run `$call` against the serving tier and then each lower tier until one
/// succeeds or returns a final error. With a `|value| conclusive` filter, a
/// fallback tier's success that fails the filter (e.g. `false` for "no such
/// form") is discarded like its `NotFound` would be.
macro_rules! across_tiers {
    ($self:ident, $operation:literal, |$tier:ident| $call:expr) => {
        across_tiers!($self, $operation, |$tier| $call, |_value| true)
    };
    ($self:ident, $operation:literal, |$tier:ident| $call:expr, |$value:ident| $conclusive:expr) => {{
        let start = $self.serving.load(Ordering::Acquire);
        let mut last_error: Option<RepositoryError> = None;
        let mut attempts = 0;
        for (index, $tier) in $self.tiers.iter().enumerate().skip(start) {
            attempts += 1;
            match $call.await {
                Ok($value) if index == start || $conclusive => {
                    if index != start {
                        $self.pin(index);
                    }
                    return Ok($value);
                }
                Ok(_) => {
                    debug!(
                        tier = $tier.backend_name(),
                        operation = $operation,
                        "inconclusive answer from fallback tier discarded"
                    );
                }
                Err(e) if e.is_fallback_eligible() => {
                    warn!(
                        tier = $tier.backend_name(),
                        operation = $operation,
                        error = %e,
                        "storage tier failed, falling back"
                    );
                    last_error = Some(e);
                }
                Err(e) if last_error.is_some() => {
                    debug!(
                        tier = $tier.backend_name(),
                        operation = $operation,
                        error = %e,
                        "answer from fallback tier discarded"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err($self.exhausted(attempts, last_error))
    }};
}

#[async_trait]
impl FormRepository for TieredFormRepository {
    async fn create_form(&self, schema: FormSchema) -> Result<FormId, RepositoryError> {
        across_tiers!(self, "create_form", |tier| tier.create_form(schema.clone()))
    }

    async fn get_form(&self, id: &FormId) -> Result<FormSchema, RepositoryError> {
        across_tiers!(self, "get_form", |tier| tier.get_form(id))
    }

    async fn list_forms(&self) -> Result<Vec<FormSchema>, RepositoryError> {
        across_tiers!(self, "list_forms", |tier| tier.list_forms())
    }

    async fn replace_form(&self, schema: FormSchema) -> Result<bool, RepositoryError> {
        across_tiers!(self, "replace_form", |tier| tier.replace_form(schema.clone()), |found| found)
    }

    async fn update_form_status(&self, id: &FormId, status: FormStatus) -> Result<bool, RepositoryError> {
        across_tiers!(self, "update_form_status", |tier| tier.update_form_status(id, status), |found| found)
    }

    async fn create_submission(
        &self,
        form_id: &FormId,
        answers: Answers,
    ) -> Result<SubmissionId, RepositoryError> {
        across_tiers!(self, "create_submission", |tier| tier.create_submission(form_id, answers.clone()))
    }

    async fn increment_submission_count(&self, form_id: &FormId) -> Result<u64, RepositoryError> {
        across_tiers!(self, "increment_submission_count", |tier| tier.increment_submission_count(form_id))
    }

    async fn list_submissions(&self, form_id: &FormId) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        across_tiers!(self, "list_submissions", |tier| tier.list_submissions(form_id))
    }

    async fn delete_submission(&self, id: &SubmissionId) -> Result<bool, RepositoryError> {
        across_tiers!(self, "delete_submission", |tier| tier.delete_submission(id), |found| found)
    }

    async fn delete_form(&self, id: &FormId) -> Result<bool, RepositoryError> {
        across_tiers!(self, "delete_form", |tier| tier.delete_form(id), |found| found)
    }

    fn backend_name(&self) -> &str {
        self.tiers
            .get(self.serving.load(Ordering::Acquire))
            .map(|tier| tier.backend_name())
            .unwrap_or("none")
    }
}
