//! Health-report document builder and process uptime tracking.
//!
//! The engine's own `/health` endpoint (served by the external REST
//! layer) returns a health+json style document. `HealthReport` builds
//! that document as a `serde_json::Value`; the transport serializes it.

use std::fmt;
use std::time::Instant;

use serde_json::{Map, Value, json};

/// Overall verdict carried in a health report's `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Pass,
    Fail,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStatus::Pass => write!(f, "pass"),
            ReportStatus::Fail => write!(f, "fail"),
        }
    }
}

/// Fluent builder for a health-report document.
///
/// Starts as `{"status": "fail", "version": "1"}`; every setter
/// overwrites its field and returns the builder.
#[derive(Debug, Clone)]
pub struct HealthReport {
    fields: Map<String, Value>,
}

impl HealthReport {
    pub fn new() -> Self {
        let mut fields = Map::new();
        fields.insert("status".into(), json!(ReportStatus::Fail.to_string()));
        fields.insert("version".into(), json!("1"));
        Self { fields }
    }

    pub fn status(self, status: ReportStatus) -> Self {
        self.custom("status", json!(status.to_string()))
    }

    /// Sets `description` to "health of {app} service".
    pub fn description(self, app: &str) -> Self {
        self.custom("description", json!(format!("health of {app} service")))
    }

    pub fn release_id(self, release_id: &str) -> Self {
        self.custom("releaseID", json!(release_id))
    }

    pub fn service_id(self, service_id: &str) -> Self {
        self.custom("serviceID", json!(service_id))
    }

    pub fn notes(self, notes: &str) -> Self {
        self.custom("notes", json!(notes))
    }

    pub fn output(self, output: &str) -> Self {
        self.custom("output", json!(output))
    }

    pub fn details(self, details: Value) -> Self {
        self.custom("details", details)
    }

    /// Set an arbitrary field.
    pub fn custom(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    /// Finish the document.
    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

impl Default for HealthReport {
    fn default() -> Self {
        Self::new()
    }
}

// ── Uptime ─────────────────────────────────────────────────────────

/// Process-lifetime uptime, humanized by `Display`.
#[derive(Debug, Clone)]
pub struct Uptime {
    started: Instant,
}

const PERIODS: [(&str, u64); 6] = [
    ("year", 60 * 60 * 24 * 365),
    ("month", 60 * 60 * 24 * 30),
    ("day", 60 * 60 * 24),
    ("hour", 60 * 60),
    ("minute", 60),
    ("second", 1),
];

impl Uptime {
    /// Start counting from now.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Seconds elapsed since start.
    pub fn current_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Humanize a duration in seconds: "2 days, 3 hours, 1 minute".
    /// Zero-valued periods are omitted; zero seconds renders empty.
    pub fn humanize(total_secs: u64) -> String {
        let mut seconds = total_secs;
        let mut parts = Vec::new();
        for (name, period_secs) in PERIODS {
            if seconds >= period_secs {
                let value = seconds / period_secs;
                seconds %= period_secs;
                let plural = if value > 1 { "s" } else { "" };
                parts.push(format!("{value} {name}{plural}"));
            }
        }
        parts.join(", ")
    }
}

impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::humanize(self.current_secs()))
    }
}
