//! Domain types for monitored applications.
//!
//! These types cross the boundary between the engine and its (external)
//! REST front-end, so they are all serializable. Timestamps are Unix
//! epoch seconds throughout.

use serde::{Deserialize, Serialize};

/// Unique name of a monitored application within the registry.
pub type AppName = String;

// ── Parameter bounds ───────────────────────────────────────────────

/// Response timeout: 5 sec (2–60 sec).
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const MIN_TIMEOUT_SECS: u64 = 2;
pub const MAX_TIMEOUT_SECS: u64 = 60;

/// Health check interval: 30 sec (5–300 sec).
pub const DEFAULT_INTERVAL_SECS: u64 = 30;
pub const MIN_INTERVAL_SECS: u64 = 5;
pub const MAX_INTERVAL_SECS: u64 = 300;

/// Unhealthy threshold: 2 times (2–10).
pub const DEFAULT_UNHEALTHY_THRESHOLD: u32 = 2;
pub const MIN_UNHEALTHY_THRESHOLD: u32 = 2;
pub const MAX_UNHEALTHY_THRESHOLD: u32 = 10;

/// Healthy threshold: 10 times (2–10).
pub const DEFAULT_HEALTHY_THRESHOLD: u32 = 10;
pub const MIN_HEALTHY_THRESHOLD: u32 = 2;
pub const MAX_HEALTHY_THRESHOLD: u32 = 10;

// ── Registration ───────────────────────────────────────────────────

/// Registration parameters for a monitored application.
///
/// An `AppSpec` is accepted into the registry only after
/// [`crate::validate::validate_spec`] passes; the monitoring crates
/// assume the ranges hold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppSpec {
    pub name: AppName,
    /// Base URL of the target; probes go to `{url}/health`.
    /// A bare IPv4/IPv6 literal is also accepted.
    pub url: String,
    /// Email address notified on state transitions, if any.
    pub notify_email: Option<String>,
    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,
    /// Probe interval in seconds.
    pub interval_secs: u64,
    /// Consecutive failures before a degrading app is marked unhealthy.
    pub unhealthy_threshold: u32,
    /// Consecutive successes before an app is marked healthy.
    pub healthy_threshold: u32,
}

impl AppSpec {
    /// Spec with the documented default tuning for `name` and `url`.
    pub fn with_defaults(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            notify_email: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            interval_secs: DEFAULT_INTERVAL_SECS,
            unhealthy_threshold: DEFAULT_UNHEALTHY_THRESHOLD,
            healthy_threshold: DEFAULT_HEALTHY_THRESHOLD,
        }
    }
}

// ── Health vocabulary ──────────────────────────────────────────────

/// Health state as reported by the hysteresis classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// No verdict yet — freshly registered or explicitly reset.
    Unknown,
    Healthy,
    /// Consecutive failures observed, but not enough for unhealthy.
    Degrading,
    Unhealthy,
}

/// Result of a single probe cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// The health endpoint answered 2xx–3xx within the timeout.
    Success,
    /// Anything else: error status, transport failure, or timeout.
    Failure,
}

/// One recorded probe cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unix timestamp (seconds) when the probe completed.
    pub checked_at: u64,
    pub outcome: ProbeOutcome,
}

// ── Snapshot ───────────────────────────────────────────────────────

/// Immutable point-in-time view of a monitored application.
///
/// Returned by the lifecycle controller's `info` operation; safe to hand
/// to callers while the probe cycle keeps mutating the live entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppSnapshot {
    pub spec: AppSpec,
    pub state: HealthState,
    pub healthy_checks: u32,
    pub unhealthy_checks: u32,
    /// Unix timestamp of the most recent probe, if any ran yet.
    pub last_check: Option<u64>,
    /// Unix timestamp of the most recent probe observed in healthy state.
    pub last_healthy: Option<u64>,
    /// Whether the recurring timer is currently suspended.
    pub paused: bool,
    /// Most recent probe cycles, oldest first. Capped at
    /// `spec.healthy_threshold` entries.
    pub history: Vec<HistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_defaults_match_documented_values() {
        let spec = AppSpec::with_defaults("svc1", "http://10.0.0.1:8080");
        assert_eq!(spec.timeout_secs, 5);
        assert_eq!(spec.interval_secs, 30);
        assert_eq!(spec.unhealthy_threshold, 2);
        assert_eq!(spec.healthy_threshold, 10);
        assert_eq!(spec.notify_email, None);
    }

    #[test]
    fn health_state_serializes_snake_case() {
        let json = serde_json::to_string(&HealthState::Degrading).unwrap();
        assert_eq!(json, "\"degrading\"");
        let back: HealthState = serde_json::from_str("\"unhealthy\"").unwrap();
        assert_eq!(back, HealthState::Unhealthy);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let snapshot = AppSnapshot {
            spec: AppSpec::with_defaults("svc1", "http://10.0.0.1"),
            state: HealthState::Healthy,
            healthy_checks: 10,
            unhealthy_checks: 0,
            last_check: Some(1_700_000_000),
            last_healthy: Some(1_700_000_000),
            paused: false,
            history: vec![HistoryEntry {
                checked_at: 1_700_000_000,
                outcome: ProbeOutcome::Success,
            }],
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: AppSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
