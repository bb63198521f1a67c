//! Infrastructure layer
//!
//! Concrete storage backends and event publishers.

pub mod events;
pub mod persistence;
