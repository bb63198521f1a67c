//! Form events
//!
//! Raised by the application services after a write has been persisted.

use chrono::{DateTime, Utc};

use crate::domain::aggregates::FormStatus;
use crate::domain::value_objects::{FormId, SubmissionId};

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Form(FormEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum FormEvent {
    Published {
        form_id: FormId,
        field_count: usize,
        published_at: DateTime<Utc>,
    },
    Republished {
        form_id: FormId,
        field_count: usize,
        republished_at: DateTime<Utc>,
    },
    StatusChanged {
        form_id: FormId,
        status: FormStatus,
    },
    Submitted {
        form_id: FormId,
        submission_id: SubmissionId,
        submitted_at: DateTime<Utc>,
    },
    SubmissionDeleted {
        submission_id: SubmissionId,
    },
    Deleted {
        form_id: FormId,
    },
}

impl DomainEvent {
    /// Form the event belongs to, when known
    pub fn form_id(&self) -> Option<&FormId> {
        match self {
            DomainEvent::Form(e) => match e {
                FormEvent::Published { form_id, .. }
                | FormEvent::Republished { form_id, .. }
                | FormEvent::StatusChanged { form_id, .. }
                | FormEvent::Submitted { form_id, .. }
                | FormEvent::Deleted { form_id } => Some(form_id),
                FormEvent::SubmissionDeleted { .. } => None,
            },
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::Form(e) => match e {
                FormEvent::Published { .. } => "form.published",
                FormEvent::Republished { .. } => "form.republished",
                FormEvent::StatusChanged { .. } => "form.status_changed",
                FormEvent::Submitted { .. } => "form.submitted",
                FormEvent::SubmissionDeleted { .. } => "form.submission_deleted",
                FormEvent::Deleted { .. } => "form.deleted",
            },
        }
    }
}
