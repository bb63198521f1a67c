//! Submissions commands

use anyhow::Context;
use std::path::Path;

use sase_forms::{
    Answers, ApiResponse, FormAdministration, FormId, SubmissionId, SubmissionReceipt, SubmitCommand,
};

use super::{emit, App};
use crate::{output::OutputFormat, SubmissionCommands};

fn read_answers(path: &Path) -> anyhow::Result<Answers> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid answers in {}", path.display()))
}

pub async fn handle(
    action: SubmissionCommands,
    app: &App,
    format: OutputFormat,
) -> anyhow::Result<bool> {
    match action {
        SubmissionCommands::Submit { form_id, answers, code } => {
            let mut command = SubmitCommand::new(FormId::from_string(form_id), read_answers(&answers)?);
            if let Some(code) = code {
                command = command.with_code(code);
            }

            let outcome = app.coordinator.submit(command).await;
            let committed = outcome.is_committed();
            format.print(&ApiResponse::<SubmissionReceipt>::from(outcome))?;
            Ok(committed)
        }
        SubmissionCommands::List { form_id } => {
            emit(format, app.forms.list_submissions(&FormId::from_string(form_id)).await)
        }
        SubmissionCommands::Delete { id } => {
            let id = SubmissionId::from_string(id);
            let result = app.forms.delete_submission(&id).await.map(|()| id);
            emit(format, result)
        }
    }
}
