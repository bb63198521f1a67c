//! Forms commands

use anyhow::Context;
use serde::Serialize;
use std::path::Path;

use sase_forms::{ApiResponse, FormAdministration, FormId, FormSchema, FormStatus, PublicForm};

use super::{emit, App};
use crate::{output::OutputFormat, FormCommands};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub title: String,
    pub field_count: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn for_schema(schema: &FormSchema) -> Self {
        let schema = schema.clone().normalized();
        Self {
            title: schema.title().to_string(),
            field_count: schema.fields().len(),
            errors: schema.validate().iter().map(ToString::to_string).collect(),
            warnings: schema
                .pattern_warnings()
                .into_iter()
                .map(|(field, message)| format!("field {}: pattern does not compile: {}", field, message))
                .collect(),
        }
    }
}

pub fn read_schema(path: &Path) -> anyhow::Result<FormSchema> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    FormSchema::parse(&content).with_context(|| format!("invalid form schema in {}", path.display()))
}

/// Offline check, touches no storage
pub fn validate(path: &Path, format: OutputFormat) -> anyhow::Result<bool> {
    let report = ValidationReport::for_schema(&read_schema(path)?);
    let valid = report.errors.is_empty();
    if valid {
        format.print(&ApiResponse::success(report))?;
    } else {
        let message = report.errors.join("; ");
        format.print(&ApiResponse::<ValidationReport>::error("INVALID_SCHEMA", &message))?;
    }
    Ok(valid)
}

pub async fn handle(action: FormCommands, app: &App, format: OutputFormat) -> anyhow::Result<bool> {
    match action {
        FormCommands::Validate { file } => validate(&file, format),
        FormCommands::Publish { file } => {
            let schema = read_schema(&file)?;
            emit(format, app.forms.publish(schema).await)
        }
        FormCommands::Republish { id, file } => {
            let schema = read_schema(&file)?;
            emit(format, app.forms.republish(&FormId::from_string(id), schema).await)
        }
        FormCommands::Get { id } => {
            let result = app.forms.get_form(&FormId::from_string(id)).await;
            emit(format, result.map(PublicForm::from))
        }
        FormCommands::List => {
            let result = app.forms.list_forms().await;
            emit(format, result.map(|forms| forms.iter().map(PublicForm::from).collect::<Vec<_>>()))
        }
        FormCommands::Status { id, status } => {
            let result = match status.parse::<FormStatus>() {
                Ok(status) => app.forms.set_status(&FormId::from_string(id), status).await,
                Err(e) => {
                    format.print(&ApiResponse::<()>::error("INVALID_STATUS", &e))?;
                    return Ok(false);
                }
            };
            emit(format, result.map(PublicForm::from))
        }
        FormCommands::Delete { id } => {
            let id = FormId::from_string(id);
            let result = app.forms.delete_form(&id).await.map(|()| DeletedForm { id });
            emit::<DeletedForm>(format, result)
        }
    }
}

#[derive(Serialize)]
struct DeletedForm {
    id: FormId,
}
