//! Submission record
//!
//! Written exactly once per accepted submit and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Answers, FormId, SubmissionId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: SubmissionId,
    pub form_id: FormId,
    #[serde(alias = "data")]
    pub answers: Answers,
    #[serde(alias = "submitted_at")]
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn create(form_id: FormId, answers: Answers) -> Self {
        Self {
            id: SubmissionId::new(),
            form_id,
            answers,
            submitted_at: Utc::now(),
        }
    }
}

/// Newest first, the order every backend returns submissions in
pub fn sort_newest_first(records: &mut [SubmissionRecord]) {
    records.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
}
