//! pulsewatch-monitor — the monitoring engine.
//!
//! Ties the registry, the per-app probe scheduler, and lifecycle
//! control into one unit behind [`MonitorController`].
//!
//! # Architecture
//!
//! ```text
//! MonitorController
//!   ├── Registry: name → Arc<Mutex<MonitoredApp>>
//!   │     └── MonitoredApp: spec + HealthClassifier + history
//!   └── Scheduler
//!         └── Per-app recurring task
//!             ├── Prober (injectable ProbeTransport)
//!             ├── classify outcome, record history/timestamps
//!             ├── staleness auto-pause
//!             └── Notifier dispatch on transitions
//! ```
//!
//! # Concurrency
//!
//! Probe cycles for different apps run as independent tokio tasks,
//! concurrently with each other and with lifecycle calls. The registry
//! map carries its own lock; each app's mutable state sits behind a
//! per-entry mutex, so a pause/resume/reregister serializes against a
//! concurrently executing cycle for the same app. Cancelling a timer
//! never interrupts an in-flight probe — the cycle discards its result
//! when it finds the app deregistered.
//!
//! Everything is in-memory and process-lifetime; nothing survives a
//! restart.

pub mod controller;
pub mod error;
pub mod registry;
pub mod scheduler;

pub use controller::{MonitorController, RegisterOutcome};
pub use error::{MonitorError, MonitorResult};
pub use registry::{MonitoredApp, Registry, SharedApp};
pub use scheduler::{Scheduler, SchedulerConfig};
