//! Event publishers

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use crate::domain::events::DomainEvent;
use crate::ports::outbound::{EventPublisher, RepositoryError};

/// Emits every event as a structured log line
#[derive(Default)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
        for event in &events {
            info!(
                event_type = event.event_type(),
                form_id = event.form_id().map(|id| id.as_str()).unwrap_or("-"),
                "domain event"
            );
        }
        Ok(())
    }
}

/// Keeps published events in memory, for tests and embedding hosts
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(DomainEvent::event_type).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
        self.events.lock().extend(events);
        Ok(())
    }
}
