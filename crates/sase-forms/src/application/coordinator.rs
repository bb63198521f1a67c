//! Submission coordinator
//!
//! Runs one submit attempt through the gate, validation and persistence.
//! An attempt ends in exactly one of four terminal states:
//!
//! - `Committed`: one submission record exists for the attempt
//! - `Rejected`: wrong validation code or validation errors, nothing written
//! - `Gated`: form missing or disabled, nothing written
//! - `Failed`: every storage tier failed, nothing written
//!
//! The status check is a point-in-time snapshot taken before validation and
//! is not repeated afterwards. Attempts for the same form run concurrently
//! without any coordinator-level locking; the submission counter is bumped by
//! the storage layer's atomic increment.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::aggregates::FormSchema;
use crate::domain::events::{DomainEvent, FormEvent};
use crate::domain::services::{ValidationEngine, ValidationErrors, VisibilityEngine, VisibilityState};
use crate::domain::value_objects::{Answers, FormId, SubmissionId};
use crate::ports::inbound::SubmissionUseCases;
use crate::ports::outbound::{EventPublisher, FormRepository, RepositoryError};

/// One submit attempt
#[derive(Clone, Debug)]
pub struct SubmitCommand {
    pub form_id: FormId,
    pub answers: Answers,
    /// Respondent's live visibility; recomputed from `answers` when absent
    pub visibility: Option<VisibilityState>,
    /// Shared secret supplied out-of-band; never stored with the answers
    pub validation_code: Option<String>,
}

impl SubmitCommand {
    pub fn new(form_id: FormId, answers: Answers) -> Self {
        Self {
            form_id,
            answers,
            visibility: None,
            validation_code: None,
        }
    }

    /// Submit whatever a respondent session has collected
    pub fn from_session(engine: VisibilityEngine) -> Self {
        let form_id = engine.schema().id().clone();
        let (visibility, answers) = engine.into_parts();
        Self {
            form_id,
            answers,
            visibility: Some(visibility),
            validation_code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.validation_code = Some(code.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Draft,
    Validated,
    Committed,
    Rejected,
    Gated,
    Failed,
}

/// Form missing or closed; terminal for the attempt
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("form not found: {0}")]
    NotFound(FormId),

    #[error("form is not accepting submissions: {0}")]
    Disabled(FormId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    InvalidCode,
    Validation(ValidationErrors),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmissionOutcome {
    Committed {
        submission_id: SubmissionId,
        /// New counter value; `None` when the increment itself failed
        submission_count: Option<u64>,
    },
    Rejected(Rejection),
    Gated(GateError),
    Failed(RepositoryError),
}

impl SubmissionOutcome {
    pub fn state(&self) -> SubmissionState {
        match self {
            Self::Committed { .. } => SubmissionState::Committed,
            Self::Rejected(_) => SubmissionState::Rejected,
            Self::Gated(_) => SubmissionState::Gated,
            Self::Failed(_) => SubmissionState::Failed,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    pub fn submission_id(&self) -> Option<&SubmissionId> {
        match self {
            Self::Committed { submission_id, .. } => Some(submission_id),
            _ => None,
        }
    }
}

/// Submission coordinator
pub struct SubmissionCoordinator {
    repository: Arc<dyn FormRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl SubmissionCoordinator {
    pub fn new(
        repository: Arc<dyn FormRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            event_publisher,
        }
    }

    pub async fn submit(&self, command: SubmitCommand) -> SubmissionOutcome {
        let SubmitCommand {
            form_id,
            answers,
            visibility,
            validation_code,
        } = command;
        debug!(form_id = %form_id, state = ?SubmissionState::Draft, "submit attempt");

        // Gate: existence and status snapshot
        let schema = match self.repository.get_form(&form_id).await {
            Ok(schema) => schema,
            Err(RepositoryError::NotFound(_)) => return self.gated(GateError::NotFound(form_id)),
            Err(e) => return self.failed(&form_id, e),
        };
        if !schema.status().is_active() {
            return self.gated(GateError::Disabled(form_id));
        }

        if let Some(expected) = schema.validation_code() {
            if validation_code.as_deref() != Some(expected) {
                warn!(form_id = %form_id, "submission rejected: validation code mismatch");
                return SubmissionOutcome::Rejected(Rejection::InvalidCode);
            }
        }

        let schema = Arc::new(schema);
        let visibility = visibility
            .unwrap_or_else(|| VisibilityEngine::evaluate(Arc::clone(&schema), &answers));

        let errors = ValidationEngine::validate(&schema, &visibility, &answers);
        if !errors.is_empty() {
            debug!(form_id = %form_id, errors = errors.len(), "submission rejected by validation");
            return SubmissionOutcome::Rejected(Rejection::Validation(errors));
        }
        debug!(form_id = %form_id, state = ?SubmissionState::Validated, "answers validated");

        let answers = retain_visible_answers(&schema, &visibility, answers);

        let submission_id = match self.repository.create_submission(&form_id, answers).await {
            Ok(id) => id,
            Err(RepositoryError::NotFound(_)) => return self.gated(GateError::NotFound(form_id)),
            Err(RepositoryError::Disabled(_)) => return self.gated(GateError::Disabled(form_id)),
            Err(e) => return self.failed(&form_id, e),
        };

        // The record exists from here on; later failures are logged only
        let submission_count = match self.repository.increment_submission_count(&form_id).await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(
                    form_id = %form_id,
                    submission_id = %submission_id,
                    error = %e,
                    "submission stored but counter increment failed"
                );
                None
            }
        };

        let event = DomainEvent::Form(FormEvent::Submitted {
            form_id: form_id.clone(),
            submission_id: submission_id.clone(),
            submitted_at: chrono::Utc::now(),
        });
        if let Err(e) = self.event_publisher.publish(vec![event]).await {
            warn!(form_id = %form_id, error = %e, "failed to publish submission event");
        }

        info!(
            form_id = %form_id,
            submission_id = %submission_id,
            tier = self.repository.backend_name(),
            "submission committed"
        );
        SubmissionOutcome::Committed {
            submission_id,
            submission_count,
        }
    }

    fn gated(&self, gate: GateError) -> SubmissionOutcome {
        warn!(reason = %gate, "submission gated");
        SubmissionOutcome::Gated(gate)
    }

    fn failed(&self, form_id: &FormId, error: RepositoryError) -> SubmissionOutcome {
        warn!(form_id = %form_id, error = %error, "submission failed in storage");
        SubmissionOutcome::Failed(error)
    }
}

#[async_trait]
impl SubmissionUseCases for SubmissionCoordinator {
    async fn submit(&self, command: SubmitCommand) -> SubmissionOutcome {
        SubmissionCoordinator::submit(self, command).await
    }
}

/// Drop answers for hidden or undeclared fields before they are stored
fn retain_visible_answers(schema: &FormSchema, visibility: &VisibilityState, answers: Answers) -> Answers {
    answers
        .into_iter()
        .filter(|(field_id, _)| schema.field_by_id(field_id).is_some() && visibility.is_visible(field_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::FormStatus;
    use crate::domain::services::FieldChange;
    use crate::domain::value_objects::{
        AnswerValue, ConditionAction, ConditionRule, FieldDefinition, OptionDefinition, PatternKind,
        TextValidation,
    };
    use crate::infrastructure::events::RecordingEventPublisher;
    use crate::infrastructure::persistence::testing::FlakyTier;
    use crate::infrastructure::persistence::{InMemoryFormRepository, TieredFormRepository};

    struct Harness {
        repo: Arc<InMemoryFormRepository>,
        events: Arc<RecordingEventPublisher>,
        coordinator: SubmissionCoordinator,
    }

    fn harness() -> Harness {
        let repo = Arc::new(InMemoryFormRepository::new());
        let events = Arc::new(RecordingEventPublisher::new());
        let coordinator = SubmissionCoordinator::new(repo.clone(), events.clone());
        Harness { repo, events, coordinator }
    }

    fn contact_form() -> FormSchema {
        FormSchema::create(
            "Contact",
            vec![
                FieldDefinition::text("name", "Name").required(),
                FieldDefinition::text("email", "Email")
                    .with_validation(TextValidation::builtin(PatternKind::Email)),
            ],
        )
    }

    fn answers(pairs: &[(&str, &str)]) -> Answers {
        pairs.iter().map(|(k, v)| (k.to_string(), AnswerValue::text(*v))).collect()
    }

    #[tokio::test]
    async fn test_commit_increments_counter_and_publishes() {
        let h = harness();
        let form_id = h.repo.create_form(contact_form()).await.unwrap();

        let outcome = h
            .coordinator
            .submit(SubmitCommand::new(form_id.clone(), answers(&[("name", "Ada")])))
            .await;

        assert_eq!(outcome.state(), SubmissionState::Committed);
        assert!(matches!(outcome, SubmissionOutcome::Committed { submission_count: Some(1), .. }));
        assert_eq!(h.repo.list_submissions(&form_id).await.unwrap().len(), 1);
        assert_eq!(h.repo.get_form(&form_id).await.unwrap().submission_count(), 1);
        assert_eq!(h.events.event_types(), vec!["form.submitted"]);
    }

    #[tokio::test]
    async fn test_scenario_b_disabled_form_is_gated() {
        let h = harness();
        let form_id = h.repo.create_form(contact_form()).await.unwrap();
        h.repo.update_form_status(&form_id, FormStatus::Disabled).await.unwrap();

        let outcome = h
            .coordinator
            .submit(SubmitCommand::new(form_id.clone(), answers(&[("name", "Ada")])))
            .await;

        assert_eq!(outcome, SubmissionOutcome::Gated(GateError::Disabled(form_id.clone())));
        assert!(h.repo.list_submissions(&form_id).await.unwrap().is_empty());
        assert_eq!(h.repo.get_form(&form_id).await.unwrap().submission_count(), 0);
        assert!(h.events.events().is_empty());
    }

    #[tokio::test]
    async fn test_missing_form_is_gated() {
        let h = harness();
        let missing = FormId::from_string("missing");
        let outcome = h.coordinator.submit(SubmitCommand::new(missing.clone(), Answers::new())).await;
        assert_eq!(outcome, SubmissionOutcome::Gated(GateError::NotFound(missing)));
    }

    #[tokio::test]
    async fn test_validation_errors_are_returned_verbatim() {
        let h = harness();
        let form_id = h.repo.create_form(contact_form()).await.unwrap();

        let outcome = h
            .coordinator
            .submit(SubmitCommand::new(form_id.clone(), answers(&[("email", "nope")])))
            .await;

        match outcome {
            SubmissionOutcome::Rejected(Rejection::Validation(errors)) => {
                assert!(errors.contains("name"));
                assert!(errors.contains("email"));
            }
            other => panic!("expected validation rejection, got {:?}", other),
        }
        assert!(h.repo.list_submissions(&form_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_code_gate() {
        let h = harness();
        let form_id = h
            .repo
            .create_form(contact_form().with_validation_code("s3cret"))
            .await
            .unwrap();
        let base = || SubmitCommand::new(form_id.clone(), answers(&[("name", "Ada")]));

        assert_eq!(
            h.coordinator.submit(base()).await,
            SubmissionOutcome::Rejected(Rejection::InvalidCode)
        );
        assert_eq!(
            h.coordinator.submit(base().with_code("wrong")).await,
            SubmissionOutcome::Rejected(Rejection::InvalidCode)
        );

        let outcome = h.coordinator.submit(base().with_code("s3cret")).await;
        assert!(outcome.is_committed());

        let stored = h.repo.list_submissions(&form_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].answers.values().all(|v| v.as_text() != Some("s3cret")));
    }

    #[tokio::test]
    async fn test_hidden_answers_are_not_persisted() {
        let h = harness();
        let schema = FormSchema::create(
            "Employment",
            vec![
                FieldDefinition::dropdown("employed", "Employed?", vec![
                    OptionDefinition::new("yes", "Yes"),
                    OptionDefinition::new("no", "No"),
                ])
                .with_rule(ConditionRule::new("no", ConditionAction::Hide, "employer")),
                FieldDefinition::text("employer", "Employer").required().conditional(),
            ],
        );
        let form_id = h.repo.create_form(schema).await.unwrap();
        let stored_schema = Arc::new(h.repo.get_form(&form_id).await.unwrap());

        let mut session = VisibilityEngine::new(stored_schema);
        session.apply(FieldChange::new("employer", "Acme"));
        session.apply(FieldChange::new("employed", "no"));

        let outcome = h.coordinator.submit(SubmitCommand::from_session(session)).await;
        assert!(outcome.is_committed());

        let stored = h.repo.list_submissions(&form_id).await.unwrap();
        assert_eq!(stored[0].answers, answers(&[("employed", "no")]));
    }

    #[tokio::test]
    async fn test_stateless_submit_recomputes_visibility() {
        let h = harness();
        let schema = FormSchema::create(
            "Employment",
            vec![
                FieldDefinition::dropdown("employed", "Employed?", vec![
                    OptionDefinition::new("yes", "Yes"),
                    OptionDefinition::new("no", "No"),
                ])
                .with_rule(ConditionRule::new("no", ConditionAction::Hide, "employer")),
                FieldDefinition::text("employer", "Employer").required().conditional(),
            ],
        );
        let form_id = h.repo.create_form(schema).await.unwrap();

        let outcome = h
            .coordinator
            .submit(SubmitCommand::new(form_id.clone(), answers(&[("employed", "no"), ("stray", "x")])))
            .await;
        assert!(outcome.is_committed());
        assert_eq!(
            h.repo.list_submissions(&form_id).await.unwrap()[0].answers,
            answers(&[("employed", "no")])
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_scenario_c_concurrent_submissions() {
        let h = harness();
        let form_id = h.repo.create_form(contact_form()).await.unwrap();
        let coordinator = Arc::new(h.coordinator);

        let submit = |name: &'static str| {
            let coordinator = Arc::clone(&coordinator);
            let command = SubmitCommand::new(form_id.clone(), answers(&[("name", name)]));
            tokio::spawn(async move { coordinator.submit(command).await })
        };
        let (a, b) = tokio::join!(submit("Ada"), submit("Grace"));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(a.is_committed() && b.is_committed());
        assert_ne!(a.submission_id(), b.submission_id());
        assert_eq!(h.repo.get_form(&form_id).await.unwrap().submission_count(), 2);
        assert_eq!(h.repo.list_submissions(&form_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_storage_failure_on_every_tier_is_failed() {
        let flaky = Arc::new(FlakyTier::new().failing_submissions());
        let form_id = flaky.inner.create_form(contact_form()).await.unwrap();
        let repo = Arc::new(TieredFormRepository::new(vec![
            flaky.clone() as Arc<dyn FormRepository>,
            Arc::new(InMemoryFormRepository::new()) as Arc<dyn FormRepository>,
        ]));
        let events = Arc::new(RecordingEventPublisher::new());
        let coordinator = SubmissionCoordinator::new(repo, events.clone());

        let outcome = coordinator
            .submit(SubmitCommand::new(form_id.clone(), answers(&[("name", "Ada")])))
            .await;

        assert_eq!(outcome.state(), SubmissionState::Failed);
        match outcome {
            SubmissionOutcome::Failed(RepositoryError::Exhausted { last, .. }) => {
                assert_eq!(*last, RepositoryError::Storage("disk full".into()));
            }
            other => panic!("expected exhausted storage, got {:?}", other),
        }
        assert!(flaky.inner.list_submissions(&form_id).await.unwrap().is_empty());
        assert_eq!(flaky.inner.get_form(&form_id).await.unwrap().submission_count(), 0);
        assert!(events.events().is_empty());
    }

    #[tokio::test]
    async fn test_form_disabled_before_write_is_gated() {
        let flaky = Arc::new(FlakyTier::new().disabling_after_get());
        let form_id = flaky.inner.create_form(contact_form()).await.unwrap();
        let events = Arc::new(RecordingEventPublisher::new());
        let coordinator = SubmissionCoordinator::new(flaky.clone(), events.clone());

        // The gate sees an active form; the write sees it disabled
        let outcome = coordinator
            .submit(SubmitCommand::new(form_id.clone(), answers(&[("name", "Ada")])))
            .await;

        assert_eq!(outcome, SubmissionOutcome::Gated(GateError::Disabled(form_id.clone())));
        assert!(flaky.inner.list_submissions(&form_id).await.unwrap().is_empty());
        assert_eq!(flaky.inner.get_form(&form_id).await.unwrap().submission_count(), 0);
        assert!(events.events().is_empty());
    }

    #[tokio::test]
    async fn test_disabling_after_commit_keeps_the_record() {
        let h = harness();
        let form_id = h.repo.create_form(contact_form()).await.unwrap();

        let outcome = h
            .coordinator
            .submit(SubmitCommand::new(form_id.clone(), answers(&[("name", "Ada")])))
            .await;
        h.repo.update_form_status(&form_id, FormStatus::Disabled).await.unwrap();

        assert!(outcome.is_committed());
        assert_eq!(h.repo.list_submissions(&form_id).await.unwrap().len(), 1);
        assert_eq!(h.repo.get_form(&form_id).await.unwrap().submission_count(), 1);
    }
}
