//! Lifecycle controller.
//!
//! Single entry point for the engine: wraps registry mutation and timer
//! (de)registration so every successful registration has exactly one
//! live timer and every stop removes both the entry and its timer. A
//! transport-level front-end maps verbs/paths onto these operations.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use pulsewatch_health::{ProbeTransport, Prober};
use pulsewatch_notify::{Notifier, dispatch};
use pulsewatch_state::{AppSnapshot, AppSpec, ProbeOutcome, validate_spec};

use crate::error::{MonitorError, MonitorResult};
use crate::registry::{MonitoredApp, Registry, epoch_secs};
use crate::scheduler::{Scheduler, SchedulerConfig, transition_message};

/// Result of a successful `monitor` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// New app registered and its timer armed.
    Created,
    /// The name was already registered; the existing entry was kept,
    /// degraded by one failure signal, and resumed if paused.
    AlreadyMonitored,
}

/// Coordinates the registry and the scheduler.
pub struct MonitorController {
    registry: Registry,
    scheduler: Scheduler,
    notifier: Arc<dyn Notifier>,
}

impl MonitorController {
    /// Controller with default tuning.
    pub fn new(transport: Arc<dyn ProbeTransport>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_config(transport, notifier, SchedulerConfig::default())
    }

    pub fn with_config(
        transport: Arc<dyn ProbeTransport>,
        notifier: Arc<dyn Notifier>,
        config: SchedulerConfig,
    ) -> Self {
        let registry = Registry::new();
        let prober = Prober::new(transport).with_retries(config.probe_retries);
        let scheduler = Scheduler::new(registry.clone(), prober, notifier.clone(), config);
        Self {
            registry,
            scheduler,
            notifier,
        }
    }

    /// Register an app for monitoring.
    ///
    /// Validates first. A duplicate name is a recoverable conflict: a
    /// re-register usually means the app is erroring out and
    /// restarting, so the existing entry's classifier receives one
    /// failure signal and its schedule is resumed if it was paused —
    /// the entry is never overwritten.
    pub async fn monitor(&self, spec: AppSpec) -> MonitorResult<RegisterOutcome> {
        validate_spec(&spec)?;
        let name = spec.name.clone();

        let candidate = Arc::new(Mutex::new(MonitoredApp::new(spec, epoch_secs())));
        let Some(existing) = self.registry.try_insert(&name, candidate.clone()).await
        else {
            self.scheduler.arm(&name, candidate).await;
            info!(%name, "scheduled for health check monitoring");
            return Ok(RegisterOutcome::Created);
        };

        warn!(%name, "tried to reregister again");
        let (entered, email, healthy_threshold, last_healthy) = {
            let mut app = existing.lock().await;
            let entered = app.classifier.record(ProbeOutcome::Failure);
            (
                entered,
                app.spec.notify_email.clone(),
                app.spec.healthy_threshold,
                app.last_healthy,
            )
        };
        if let Some(entered) = entered {
            if let Some((subject, body)) = transition_message(
                &name,
                entered,
                healthy_threshold,
                epoch_secs(),
                last_healthy,
            ) {
                dispatch(self.notifier.as_ref(), email.as_deref(), &subject, &body).await;
            }
        }
        self.scheduler.resume(&name).await;
        Ok(RegisterOutcome::AlreadyMonitored)
    }

    /// Deregister: remove the entry, then cancel its timer. The entry
    /// is removed first so an in-flight probe discards its result.
    pub async fn stop(&self, name: &str) -> MonitorResult<()> {
        if self.registry.remove(name).await.is_none() {
            return Err(MonitorError::NotFound(name.to_string()));
        }
        self.scheduler.disarm(name).await;
        info!(%name, "health check monitoring stopped");
        Ok(())
    }

    /// Suspend probing; counters and history are kept.
    pub async fn pause(&self, name: &str) -> MonitorResult<()> {
        if self.scheduler.pause(name).await {
            Ok(())
        } else {
            Err(MonitorError::NotFound(name.to_string()))
        }
    }

    /// Re-enable probing after a pause.
    pub async fn resume(&self, name: &str) -> MonitorResult<()> {
        if self.scheduler.resume(name).await {
            Ok(())
        } else {
            Err(MonitorError::NotFound(name.to_string()))
        }
    }

    /// Immutable snapshot of one monitored app.
    pub async fn info(&self, name: &str) -> MonitorResult<AppSnapshot> {
        let app = self
            .registry
            .get(name)
            .await
            .ok_or_else(|| MonitorError::NotFound(name.to_string()))?;
        let snapshot = app.lock().await.snapshot();
        Ok(snapshot)
    }

    /// Aggregate view of every monitored app, keyed by name.
    ///
    /// Reserved for a future interactive status page; answers
    /// `Unimplemented` so a front-end can map it to 501.
    pub async fn status(&self) -> MonitorResult<HashMap<String, AppSnapshot>> {
        Err(MonitorError::Unimplemented("status"))
    }

    /// `(name, url)` of every monitored app, for the engine's own
    /// health report.
    pub async fn monitored_targets(&self) -> Vec<(String, String)> {
        let mut targets = Vec::new();
        for name in self.registry.names().await {
            if let Some(app) = self.registry.get(&name).await {
                let url = app.lock().await.spec.url.clone();
                targets.push((name, url));
            }
        }
        targets
    }

    /// Stop all timers (engine teardown). Registry entries remain
    /// readable until the controller is dropped.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}
