//! Monitoring engine error types.

use thiserror::Error;

use pulsewatch_state::ValidationError;

/// Errors surfaced by lifecycle operations.
///
/// Probe failures are never errors — they are classifier input. A
/// duplicate registration is not an error either; it reports
/// [`crate::controller::RegisterOutcome::AlreadyMonitored`].
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("app `{0}` is not health check monitored")]
    NotFound(String),

    #[error("`{0}` is reserved but not implemented")]
    Unimplemented(&'static str),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
