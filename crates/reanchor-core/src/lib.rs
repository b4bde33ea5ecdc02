//! # reanchor-core
//!
//! Core types, traits, and thresholds for reanchor, the reference drift
//! recovery engine.
//!
//! This crate provides the data model shared by the matchers and the
//! orchestrators, the confidence classification bands, configuration, and
//! the collaborator traits the engine consumes.

pub mod classify;
pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use classify::{clamp_unit, classify_annotation, classify_connection, Classification};
pub use config::{
    AnnotationThresholds, ConfigError, ConnectionThresholds, ExactMatchPolicy, RecoveryConfig,
    ScanConfig,
};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
