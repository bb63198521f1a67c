//! In-process storage tier
//!
//! Least durable tier: everything is lost when the process exits. Also the
//! default repository for tests and embedded use.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::aggregates::{sort_newest_first, FormSchema, FormStatus, SubmissionRecord};
use crate::domain::value_objects::{Answers, FormId, SubmissionId};
use crate::ports::outbound::{FormRepository, RepositoryError};

struct StoredForm {
    schema: FormSchema,
    submission_count: AtomicU64,
}

/// In-memory form repository
#[derive(Default)]
pub struct InMemoryFormRepository {
    forms: DashMap<FormId, StoredForm>,
    submissions: RwLock<Vec<SubmissionRecord>>,
}

impl InMemoryFormRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(stored: &StoredForm) -> FormSchema {
        let mut schema = stored.schema.clone();
        schema.set_submission_count(stored.submission_count.load(Ordering::SeqCst));
        schema
    }
}

#[async_trait]
impl FormRepository for InMemoryFormRepository {
    async fn create_form(&self, schema: FormSchema) -> Result<FormId, RepositoryError> {
        let id = schema.id().clone();
        let stored = StoredForm {
            submission_count: AtomicU64::new(schema.submission_count()),
            schema,
        };
        self.forms.insert(id.clone(), stored);
        Ok(id)
    }

    async fn get_form(&self, id: &FormId) -> Result<FormSchema, RepositoryError> {
        self.forms
            .get(id)
            .map(|stored| Self::snapshot(&stored))
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn list_forms(&self) -> Result<Vec<FormSchema>, RepositoryError> {
        let mut forms: Vec<FormSchema> = self.forms.iter().map(|entry| Self::snapshot(entry.value())).collect();
        forms.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(forms)
    }

    async fn replace_form(&self, schema: FormSchema) -> Result<bool, RepositoryError> {
        match self.forms.get_mut(schema.id()) {
            Some(mut stored) => {
                let replacement = schema.with_stored_attributes(&stored.schema);
                stored.schema = replacement;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_form_status(&self, id: &FormId, status: FormStatus) -> Result<bool, RepositoryError> {
        match self.forms.get_mut(id) {
            Some(mut stored) => {
                stored.schema.set_status(status);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_submission(
        &self,
        form_id: &FormId,
        answers: Answers,
    ) -> Result<SubmissionId, RepositoryError> {
        // Holding the entry keeps a concurrent delete from orphaning the record
        let stored = self
            .forms
            .get(form_id)
            .ok_or_else(|| RepositoryError::NotFound(form_id.to_string()))?;
        if !stored.schema.status().is_active() {
            return Err(RepositoryError::Disabled(form_id.to_string()));
        }

        let record = SubmissionRecord::create(form_id.clone(), answers);
        let id = record.id.clone();
        self.submissions.write().push(record);
        Ok(id)
    }

    async fn increment_submission_count(&self, form_id: &FormId) -> Result<u64, RepositoryError> {
        let stored = self
            .forms
            .get(form_id)
            .ok_or_else(|| RepositoryError::NotFound(form_id.to_string()))?;
        Ok(stored.submission_count.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn list_submissions(&self, form_id: &FormId) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        let mut records: Vec<SubmissionRecord> = self
            .submissions
            .read()
            .iter()
            .rev()
            .filter(|r| &r.form_id == form_id)
            .cloned()
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn delete_submission(&self, id: &SubmissionId) -> Result<bool, RepositoryError> {
        let mut submissions = self.submissions.write();
        match submissions.iter().position(|r| &r.id == id) {
            Some(position) => {
                submissions.remove(position);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_form(&self, id: &FormId) -> Result<bool, RepositoryError> {
        if self.forms.remove(id).is_none() {
            return Ok(false);
        }
        self.submissions.write().retain(|r| &r.form_id != id);
        Ok(true)
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
