//! Application layer
//!
//! Orchestrates use cases and coordinates domain objects.

pub mod coordinator;
pub mod dto;
pub mod forms;

pub use coordinator::{
    GateError, Rejection, SubmissionCoordinator, SubmissionOutcome, SubmissionState, SubmitCommand,
};
pub use dto::*;
pub use forms::FormService;
