//! Domain Services

pub mod validation;
pub mod visibility;

pub use validation::{FieldError, FieldErrorKind, ValidationEngine, ValidationErrors};
pub use visibility::{
    FieldChange, VisibilityConflict, VisibilityEffect, VisibilityEngine, VisibilityState,
};
