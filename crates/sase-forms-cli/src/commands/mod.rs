//! CLI Commands

pub mod forms;
pub mod submissions;

use serde::Serialize;
use std::sync::Arc;

use sase_forms::{
    open_repository, ApiResponse, ErrorBody, FormRepository, FormService, FormsConfig,
    SubmissionCoordinator, TieredFormRepository, TracingEventPublisher, UseCaseError,
};

use crate::output::OutputFormat;

/// Engine services wired to the configured storage tiers
pub struct App {
    pub repository: Arc<TieredFormRepository>,
    pub forms: FormService,
    pub coordinator: SubmissionCoordinator,
}

impl App {
    pub async fn open(config: &FormsConfig) -> anyhow::Result<Self> {
        let repository = Arc::new(open_repository(config).await?);
        let events = Arc::new(TracingEventPublisher);
        Ok(Self {
            forms: FormService::new(repository.clone(), events.clone(), config.base_url.clone()),
            coordinator: SubmissionCoordinator::new(repository.clone(), events),
            repository,
        })
    }
}

/// Print the result as an envelope; `Ok(false)` when it carried an error
pub fn emit<T: Serialize>(format: OutputFormat, result: Result<T, UseCaseError>) -> anyhow::Result<bool> {
    match result {
        Ok(data) => {
            format.print(&ApiResponse::success(data))?;
            Ok(true)
        }
        Err(e) => {
            format.print(&ApiResponse::<()>::failure(ErrorBody::from(&e)))?;
            Ok(false)
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Health {
    status: &'static str,
    mode: String,
    tiers: Vec<String>,
}

pub fn health(app: &App, format: OutputFormat) -> anyhow::Result<bool> {
    let health = Health {
        status: "ok",
        mode: app.repository.backend_name().to_string(),
        tiers: app.repository.tier_names().into_iter().map(String::from).collect(),
    };
    format.print(&ApiResponse::success(health))?;
    Ok(true)
}
