//! Flat-file storage tier
//!
//! Forms and submissions live in two JSON array documents inside a data
//! directory. Every read-modify-write cycle runs under one async mutex, which
//! makes the submission counter increment atomic for this process. Files are
//! replaced by write-then-rename so readers never see a partial document.

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::aggregates::{
    derive_share_url, sort_newest_first, FormSchema, FormStatus, SubmissionRecord,
};
use crate::domain::value_objects::{Answers, FormId, SubmissionId};
use crate::ports::outbound::{FormRepository, RepositoryError};

pub const FORMS_FILE: &str = "forms.json";
pub const SUBMISSIONS_FILE: &str = "submissions.json";

/// File-backed form repository
pub struct FileFormRepository {
    forms_path: PathBuf,
    submissions_path: PathBuf,
    base_url: String,
    write_lock: Mutex<()>,
}

impl FileFormRepository {
    /// Open (and initialise if needed) the store under `data_dir`.
    ///
    /// Records written by older versions are upgraded in place on open.
    pub async fn open(data_dir: impl AsRef<Path>, base_url: impl Into<String>) -> Result<Self, RepositoryError> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).await?;

        let repo = Self {
            forms_path: data_dir.join(FORMS_FILE),
            submissions_path: data_dir.join(SUBMISSIONS_FILE),
            base_url: base_url.into(),
            write_lock: Mutex::new(()),
        };

        for path in [&repo.forms_path, &repo.submissions_path] {
            if fs::metadata(path).await.is_err() {
                fs::write(path, b"[]").await?;
                info!(path = %path.display(), "initialised storage file");
            }
        }

        let upgraded = repo.upgrade_storage_shape().await?;
        if upgraded > 0 {
            info!(tier = "file", records = upgraded, "upgraded stored records to the current shape");
        }
        Ok(repo)
    }

    /// Bring records written by older versions to the current shape and
    /// rewrite the files that changed. Returns how many records changed.
    ///
    /// Older forms use `created_at` and lack the counter, status and share
    /// URL; older submissions carry `data` and `submitted_at`.
    async fn upgrade_storage_shape(&self) -> Result<usize, RepositoryError> {
        let _guard = self.write_lock.lock().await;

        let raw_submissions: Vec<Value> = read_json(&self.submissions_path).await?;
        let legacy_submissions = raw_submissions
            .iter()
            .filter(|s| s.get("data").is_some() || s.get("submitted_at").is_some())
            .count();
        let submissions: Vec<SubmissionRecord> = raw_submissions
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()?;
        if legacy_submissions > 0 {
            write_json(&self.submissions_path, &submissions).await?;
        }

        let mut forms: Vec<Value> = read_json(&self.forms_path).await?;
        let mut upgraded_forms = 0;
        for form in forms.iter_mut() {
            let Some(object) = form.as_object_mut() else {
                continue;
            };
            let Some(id) = object.get("id").and_then(Value::as_str).map(FormId::from_string) else {
                continue;
            };

            let mut changed = false;
            if let Some(created) = object.remove("created_at") {
                object.entry("createdAt").or_insert(created);
                changed = true;
            }
            if !object.contains_key("createdAt") {
                object.insert("createdAt".into(), Value::from(Utc::now().to_rfc3339()));
                changed = true;
            }
            if !object.contains_key("submissionCount") {
                let count = submissions.iter().filter(|s| s.form_id == id).count();
                object.insert("submissionCount".into(), Value::from(count as u64));
                changed = true;
            }
            if !object.contains_key("status") {
                object.insert("status".into(), Value::from(FormStatus::Active.as_str()));
                changed = true;
            }
            if !object.contains_key("shareUrl") {
                object.insert("shareUrl".into(), Value::from(derive_share_url(&self.base_url, &id)));
                changed = true;
            }
            if changed {
                upgraded_forms += 1;
            }
        }
        if upgraded_forms > 0 {
            write_json(&self.forms_path, &forms).await?;
        }

        Ok(upgraded_forms + legacy_submissions)
    }

    async fn read_forms(&self) -> Result<Vec<FormSchema>, RepositoryError> {
        read_json(&self.forms_path).await
    }

    async fn read_submissions(&self) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        read_json(&self.submissions_path).await
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, RepositoryError> {
    let raw = fs::read(path).await?;
    Ok(serde_json::from_slice(&raw)?)
}

async fn write_json<T: Serialize>(path: &Path, items: &[T]) -> Result<(), RepositoryError> {
    let raw = serde_json::to_vec_pretty(items)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, raw).await?;
    fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), records = items.len(), "storage file written");
    Ok(())
}

#[async_trait]
impl FormRepository for FileFormRepository {
    async fn create_form(&self, mut schema: FormSchema) -> Result<FormId, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        if schema.stored_share_url().is_none() {
            let url = schema.share_url(&self.base_url);
            schema.set_share_url(url);
        }

        let id = schema.id().clone();
        let mut forms = self.read_forms().await?;
        forms.retain(|f| f.id() != &id);
        forms.push(schema);
        write_json(&self.forms_path, &forms).await?;
        Ok(id)
    }

    async fn get_form(&self, id: &FormId) -> Result<FormSchema, RepositoryError> {
        self.read_forms()
            .await?
            .into_iter()
            .find(|f| f.id() == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn list_forms(&self) -> Result<Vec<FormSchema>, RepositoryError> {
        let mut forms = self.read_forms().await?;
        forms.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(forms)
    }

    async fn replace_form(&self, schema: FormSchema) -> Result<bool, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut forms = self.read_forms().await?;
        let Some(form) = forms.iter_mut().find(|f| f.id() == schema.id()) else {
            return Ok(false);
        };
        *form = schema.with_stored_attributes(form);
        write_json(&self.forms_path, &forms).await?;
        Ok(true)
    }

    async fn update_form_status(&self, id: &FormId, status: FormStatus) -> Result<bool, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut forms = self.read_forms().await?;
        let Some(form) = forms.iter_mut().find(|f| f.id() == id) else {
            return Ok(false);
        };
        form.set_status(status);
        write_json(&self.forms_path, &forms).await?;
        Ok(true)
    }

    async fn create_submission(
        &self,
        form_id: &FormId,
        answers: Answers,
    ) -> Result<SubmissionId, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let form = self
            .read_forms()
            .await?
            .into_iter()
            .find(|f| f.id() == form_id)
            .ok_or_else(|| RepositoryError::NotFound(form_id.to_string()))?;
        if !form.status().is_active() {
            return Err(RepositoryError::Disabled(form_id.to_string()));
        }

        let record = SubmissionRecord::create(form_id.clone(), answers);
        let id = record.id.clone();
        let mut submissions = self.read_submissions().await?;
        submissions.push(record);
        write_json(&self.submissions_path, &submissions).await?;
        Ok(id)
    }

    async fn increment_submission_count(&self, form_id: &FormId) -> Result<u64, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut forms = self.read_forms().await?;
        let form = forms
            .iter_mut()
            .find(|f| f.id() == form_id)
            .ok_or_else(|| RepositoryError::NotFound(form_id.to_string()))?;
        let count = form.submission_count() + 1;
        form.set_submission_count(count);
        write_json(&self.forms_path, &forms).await?;
        Ok(count)
    }

    async fn list_submissions(&self, form_id: &FormId) -> Result<Vec<SubmissionRecord>, RepositoryError> {
        let mut records: Vec<SubmissionRecord> = self
            .read_submissions()
            .await?
            .into_iter()
            .rev()
            .filter(|r| &r.form_id == form_id)
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn delete_submission(&self, id: &SubmissionId) -> Result<bool, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut submissions = self.read_submissions().await?;
        let before = submissions.len();
        submissions.retain(|r| &r.id != id);
        if submissions.len() == before {
            return Ok(false);
        }
        write_json(&self.submissions_path, &submissions).await?;
        Ok(true)
    }

    async fn delete_form(&self, id: &FormId) -> Result<bool, RepositoryError> {
        let _guard = self.write_lock.lock().await;
        let mut forms = self.read_forms().await?;
        let before = forms.len();
        forms.retain(|f| f.id() != id);
        if forms.len() == before {
            return Ok(false);
        }
        write_json(&self.forms_path, &forms).await?;

        let mut submissions = self.read_submissions().await?;
        submissions.retain(|r| &r.form_id != id);
        write_json(&self.submissions_path, &submissions).await?;
        Ok(true)
    }

    fn backend_name(&self) -> &str {
        "file"
    }
}
