//! pulsewatch-state — domain types for the Pulsewatch monitoring engine.
//!
//! Holds the validated registration parameters (`AppSpec`), the health
//! state vocabulary shared by the classifier and the scheduler, immutable
//! snapshots handed back to callers, and the health-report builder used
//! for the engine's own health document.
//!
//! Everything here is plain data: no IO, no clocks, no tasks. The
//! monitoring behavior lives in `pulsewatch-health` and
//! `pulsewatch-monitor`.

pub mod error;
pub mod report;
pub mod types;
pub mod validate;

pub use error::ValidationError;
pub use report::{HealthReport, ReportStatus, Uptime};
pub use types::*;
pub use validate::validate_spec;
