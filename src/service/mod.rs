//! Service layer for business logic orchestration
//!
//! This module contains the service layer that sequences project intake,
//! flavor resolution, Containerfile generation and engine invocation,
//! separating concerns from the CLI layer in main.rs.

pub mod build;
pub mod platform;

pub use build::{BuildOutcome, BuildRequest, BuildService};
pub use platform::target_platform;
