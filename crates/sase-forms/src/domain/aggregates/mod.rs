//! Forms aggregates

pub mod form;
pub mod submission;

pub use form::{derive_share_url, FormSchema, FormSchemaDocument, FormStatus, SchemaError};
pub use submission::{sort_newest_first, SubmissionRecord};
