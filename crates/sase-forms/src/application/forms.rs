//! Form administration service

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::dto::{PatternWarning, PublishReceipt};
use crate::domain::aggregates::{FormSchema, FormStatus, SubmissionRecord};
use crate::domain::events::{DomainEvent, FormEvent};
use crate::domain::value_objects::{FormId, SubmissionId};
use crate::ports::inbound::{FormAdministration, UseCaseError};
use crate::ports::outbound::{EventPublisher, FormRepository};

/// Form application service
pub struct FormService {
    repository: Arc<dyn FormRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    base_url: String,
}

impl FormService {
    pub fn new(
        repository: Arc<dyn FormRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            event_publisher,
            base_url: base_url.into(),
        }
    }

    /// Fill the share URL in for backends that never stored one
    fn resolve(&self, mut schema: FormSchema) -> FormSchema {
        if schema.stored_share_url().is_none() {
            let url = schema.share_url(&self.base_url);
            schema.set_share_url(url);
        }
        schema
    }

    async fn publish_event(&self, event: FormEvent) {
        let event = DomainEvent::Form(event);
        let event_type = event.event_type();
        if let Err(e) = self.event_publisher.publish(vec![event]).await {
            warn!(event_type, error = %e, "failed to publish form event");
        }
    }
}

/// Refuse a schema with errors; otherwise collect its pattern warnings
fn checked(schema: FormSchema) -> Result<(FormSchema, Vec<PatternWarning>), UseCaseError> {
    let errors = schema.validate();
    if !errors.is_empty() {
        warn!(form_id = %schema.id(), errors = errors.len(), "publish refused");
        return Err(UseCaseError::InvalidSchema(errors));
    }

    let warnings = schema
        .pattern_warnings()
        .into_iter()
        .map(|(field_id, message)| {
            warn!(
                form_id = %schema.id(),
                field_id = %field_id,
                error = %message,
                "custom pattern does not compile, every answer will be rejected"
            );
            PatternWarning { field_id, message }
        })
        .collect();
    Ok((schema, warnings))
}

#[async_trait]
impl FormAdministration for FormService {
    async fn publish(&self, schema: FormSchema) -> Result<PublishReceipt, UseCaseError> {
        let (schema, warnings) = checked(schema.normalized())?;

        let schema = self.resolve(schema);
        let form_id = self.repository.create_form(schema.clone()).await?;

        info!(form_id = %form_id, fields = schema.fields().len(), "form published");
        self.publish_event(FormEvent::Published {
            form_id: form_id.clone(),
            field_count: schema.fields().len(),
            published_at: Utc::now(),
        })
        .await;

        Ok(PublishReceipt {
            share_url: schema.share_url(&self.base_url),
            form: schema,
            warnings,
        })
    }

    async fn republish(&self, id: &FormId, schema: FormSchema) -> Result<PublishReceipt, UseCaseError> {
        let (schema, warnings) = checked(schema.with_id(id.clone()).normalized())?;
        let field_count = schema.fields().len();

        if !self.repository.replace_form(schema).await? {
            return Err(UseCaseError::NotFound(id.to_string()));
        }

        info!(form_id = %id, fields = field_count, "form republished");
        self.publish_event(FormEvent::Republished {
            form_id: id.clone(),
            field_count,
            republished_at: Utc::now(),
        })
        .await;

        let form = self.get_form(id).await?;
        Ok(PublishReceipt {
            share_url: form.share_url(&self.base_url),
            form,
            warnings,
        })
    }

    async fn get_form(&self, id: &FormId) -> Result<FormSchema, UseCaseError> {
        let schema = self.repository.get_form(id).await?;
        Ok(self.resolve(schema))
    }

    async fn list_forms(&self) -> Result<Vec<FormSchema>, UseCaseError> {
        let forms = self.repository.list_forms().await?;
        Ok(forms.into_iter().map(|f| self.resolve(f)).collect())
    }

    async fn set_status(&self, id: &FormId, status: FormStatus) -> Result<FormSchema, UseCaseError> {
        if !self.repository.update_form_status(id, status).await? {
            return Err(UseCaseError::NotFound(id.to_string()));
        }
        info!(form_id = %id, status = %status, "form status changed");
        self.publish_event(FormEvent::StatusChanged { form_id: id.clone(), status })
            .await;
        self.get_form(id).await
    }

    async fn list_submissions(&self, form_id: &FormId) -> Result<Vec<SubmissionRecord>, UseCaseError> {
        // Distinguishes an unknown form from one without submissions
        self.repository.get_form(form_id).await?;
        Ok(self.repository.list_submissions(form_id).await?)
    }

    async fn delete_submission(&self, id: &SubmissionId) -> Result<(), UseCaseError> {
        if !self.repository.delete_submission(id).await? {
            return Err(UseCaseError::NotFound(id.to_string()));
        }
        info!(submission_id = %id, "submission deleted");
        self.publish_event(FormEvent::SubmissionDeleted { submission_id: id.clone() })
            .await;
        Ok(())
    }

    async fn delete_form(&self, id: &FormId) -> Result<(), UseCaseError> {
        if !self.repository.delete_form(id).await? {
            return Err(UseCaseError::NotFound(id.to_string()));
        }
        info!(form_id = %id, "form deleted");
        self.publish_event(FormEvent::Deleted { form_id: id.clone() }).await;
        Ok(())
    }
}
