//! pulsewatch-health — failure classification and HTTP probing.
//!
//! Two halves, deliberately separate:
//!
//! ```text
//! Prober ──────────────► ProbeOutcome ──────────► HealthClassifier
//!   ├── ProbeTransport      (Success | Failure)     ├── pure step fn
//!   │   (injectable GET)                            ├── saturating counters
//!   └── retry + backoff                             └── transition events
//! ```
//!
//! The prober turns a flaky network into a clean `Success | Failure`
//! stream: bounded total time, one retry with exponential backoff on
//! 5xx/transport errors, and no escaping errors. The classifier turns
//! that stream into a stable [`HealthState`] with hysteresis — consecutive
//! confirming observations are required before the state flips, so
//! isolated mixed results never flap the reported health.
//!
//! [`HealthState`]: pulsewatch_state::HealthState

pub mod classifier;
pub mod probe;

pub use classifier::{Counters, HealthClassifier, Thresholds, step};
pub use probe::{
    DEFAULT_PROBE_RETRIES, HttpTransport, ProbeTransport, Prober, TransportError,
    health_endpoint,
};
