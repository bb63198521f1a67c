//! OpenSASE Forms
//!
//! Self-hosted form builder engine: authors publish a form as structured
//! data, respondents fill it in while the visible field set and validation
//! follow their answers live.
//!
//! ## Architecture
//!
//! - **Domain Layer**: form schema aggregate, field value objects, the
//!   visibility and validation engines, domain events
//! - **Application Layer**: submission coordinator, form administration, DTOs
//! - **Ports Layer**: repository and event publisher traits, use case traits
//! - **Infrastructure Layer**: file and memory storage tiers with fallback
//!
//! ## Submission flow
//!
//! 1. Each answer change is fed to a [`VisibilityEngine`] session
//! 2. On submit the [`SubmissionCoordinator`] checks the form is active and
//!    the validation code matches
//! 3. [`ValidationEngine`] checks only the fields the respondent can see
//! 4. The record is stored and the form's counter bumped atomically
//!
//! ## Example
//!
//! ```rust,ignore
//! use sase_forms::*;
//! use std::sync::Arc;
//!
//! let repo = Arc::new(InMemoryFormRepository::new());
//! let events = Arc::new(TracingEventPublisher);
//! let forms = FormService::new(repo.clone(), events.clone(), "http://localhost:3001");
//! let receipt = forms.publish(schema).await?;
//!
//! let coordinator = SubmissionCoordinator::new(repo, events);
//! let mut session = VisibilityEngine::new(Arc::new(receipt.form));
//! session.apply(FieldChange::new("colour", "blue"));
//! let outcome = coordinator.submit(SubmitCommand::from_session(session)).await;
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ports;
pub mod telemetry;

// Re-exports for convenience
pub use application::{
    ApiResponse, ErrorBody, FormService, GateError, PublicForm, PublishReceipt, Rejection,
    SubmissionCoordinator, SubmissionOutcome, SubmissionReceipt, SubmissionState, SubmitCommand,
};
pub use config::{FormsConfig, StorageConfig, StorageTier};
pub use domain::aggregates::{FormSchema, FormStatus, SchemaError, SubmissionRecord};
pub use domain::events::{DomainEvent, FormEvent};
pub use domain::services::{
    FieldChange, FieldError, FieldErrorKind, ValidationEngine, ValidationErrors,
    VisibilityConflict, VisibilityEffect, VisibilityEngine, VisibilityState,
};
pub use domain::value_objects::{
    AnswerValue, Answers, ColumnDefinition, ConditionAction, ConditionRule, FieldDefinition,
    FieldKind, FormId, OptionDefinition, PatternKind, SubmissionId, TextValidation,
};
pub use error::{FormsError, Result};
pub use infrastructure::events::{RecordingEventPublisher, TracingEventPublisher};
pub use infrastructure::persistence::{
    open_repository, FileFormRepository, InMemoryFormRepository, TieredFormRepository,
};
pub use ports::inbound::{FormAdministration, SubmissionUseCases, UseCaseError};
pub use ports::outbound::{EventPublisher, FormRepository, RepositoryError};
