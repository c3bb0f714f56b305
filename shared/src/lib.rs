//! Shared types and models for the School Food Supply platform
//!
//! This crate contains the domain models and pure domain computation shared
//! between the backend services and other components of the system.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
