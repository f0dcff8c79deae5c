//! Per-app probe scheduling.
//!
//! Every monitored app owns one recurring task that probes its health
//! endpoint each interval, feeds the outcome into the app's classifier,
//! and dispatches transition notifications. Tasks are signalled through
//! `watch` channels: one for shutdown, one for pause. Cancelling a
//! timer stops future fires but never interrupts an in-flight probe —
//! the cycle re-checks the registry before touching state and discards
//! its result when the app is gone.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use pulsewatch_health::{Prober, health_endpoint};
use pulsewatch_notify::{Notifier, dispatch};
use pulsewatch_state::{HealthState, HistoryEntry, ProbeOutcome, Uptime};

use crate::registry::{MonitoredApp, Registry, SharedApp, epoch_secs};

/// Engine-level tuning shared by all probe loops.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// A fire later than this past its scheduled time is dropped.
    pub grace_window: Duration,
    /// Continuous unhealthy time after which monitoring auto-pauses.
    pub staleness_window: Duration,
    /// Probe retries after the initial attempt (5xx/transport only).
    pub probe_retries: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            grace_window: Duration::from_secs(15 * 60),
            staleness_window: Duration::from_secs(24 * 60 * 60),
            probe_retries: pulsewatch_health::DEFAULT_PROBE_RETRIES,
        }
    }
}

/// Per-app timer state.
struct ScheduleSlot {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
    pause_tx: watch::Sender<bool>,
}

/// Arms, pauses, resumes, and cancels the recurring probe task of each
/// registered app.
pub struct Scheduler {
    registry: Registry,
    prober: Prober,
    notifier: Arc<dyn Notifier>,
    config: SchedulerConfig,
    /// Active timers: app name → slot.
    slots: Arc<RwLock<HashMap<String, ScheduleSlot>>>,
}

impl Scheduler {
    pub fn new(
        registry: Registry,
        prober: Prober,
        notifier: Arc<dyn Notifier>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            registry,
            prober,
            notifier,
            config,
            slots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Arm the recurring probe timer for `app`. The first fire happens
    /// one interval from now.
    pub async fn arm(&self, name: &str, app: SharedApp) {
        let interval_secs = { app.lock().await.spec.interval_secs };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (pause_tx, pause_rx) = watch::channel(false);

        let handle = tokio::spawn(run_probe_loop(
            name.to_string(),
            app,
            self.registry.clone(),
            self.prober.clone(),
            self.notifier.clone(),
            self.config,
            shutdown_rx,
            pause_rx,
            pause_tx.clone(),
        ));

        let mut slots = self.slots.write().await;
        if let Some(old) = slots.insert(
            name.to_string(),
            ScheduleSlot {
                handle,
                shutdown_tx,
                pause_tx,
            },
        ) {
            // Stop the old timer if one was somehow still armed.
            let _ = old.shutdown_tx.send(true);
        }

        info!(%name, interval_secs, "probe timer armed");
    }

    /// Cancel the timer. The task winds down on its next wakeup; an
    /// in-flight probe finishes and discards its result itself.
    pub async fn disarm(&self, name: &str) -> bool {
        let mut slots = self.slots.write().await;
        match slots.remove(name) {
            Some(slot) => {
                let _ = slot.shutdown_tx.send(true);
                info!(%name, "probe timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Suspend fires without touching counters or history.
    pub async fn pause(&self, name: &str) -> bool {
        if !self.set_paused(name, true).await {
            return false;
        }
        info!(%name, "monitoring paused");
        true
    }

    /// Re-enable fires after a pause.
    pub async fn resume(&self, name: &str) -> bool {
        if !self.set_paused(name, false).await {
            return false;
        }
        info!(%name, "monitoring resumed");
        true
    }

    async fn set_paused(&self, name: &str, paused: bool) -> bool {
        {
            let slots = self.slots.read().await;
            let Some(slot) = slots.get(name) else {
                return false;
            };
            let _ = slot.pause_tx.send(paused);
        }
        if let Some(app) = self.registry.get(name).await {
            app.lock().await.paused = paused;
        }
        true
    }

    pub async fn is_armed(&self, name: &str) -> bool {
        self.slots.read().await.contains_key(name)
    }

    pub async fn is_paused(&self, name: &str) -> Option<bool> {
        let slots = self.slots.read().await;
        slots.get(name).map(|slot| *slot.pause_tx.borrow())
    }

    pub async fn armed(&self) -> Vec<String> {
        self.slots.read().await.keys().cloned().collect()
    }

    /// Stop every timer (engine teardown).
    pub async fn shutdown(&self) {
        let mut slots = self.slots.write().await;
        for (name, slot) in slots.drain() {
            let _ = slot.shutdown_tx.send(true);
            slot.handle.abort();
            debug!(%name, "probe timer stopped");
        }
        info!("all probe timers stopped");
    }
}

/// The recurring probe loop for a single app.
#[allow(clippy::too_many_arguments)]
async fn run_probe_loop(
    name: String,
    app: SharedApp,
    registry: Registry,
    prober: Prober,
    notifier: Arc<dyn Notifier>,
    config: SchedulerConfig,
    mut shutdown_rx: watch::Receiver<bool>,
    mut pause_rx: watch::Receiver<bool>,
    pause_tx: watch::Sender<bool>,
) {
    let period = Duration::from_secs({ app.lock().await.spec.interval_secs });
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    debug!(%name, "probe loop starting");

    loop {
        tokio::select! {
            scheduled = ticker.tick() => {
                if *pause_rx.borrow() {
                    continue;
                }
                let late = scheduled.elapsed();
                if late > config.grace_window {
                    warn!(
                        %name,
                        late_secs = late.as_secs(),
                        "dropping probe fire past the grace window"
                    );
                    continue;
                }
                run_cycle(&name, &app, &registry, &prober, notifier.as_ref(), &config, &pause_tx)
                    .await;
            }
            _ = shutdown_rx.changed() => {
                debug!(%name, "probe loop shutting down");
                break;
            }
            _ = pause_rx.changed() => {
                // Wake only; paused fires are skipped above.
            }
        }
    }
}

/// Effects of applying one probe outcome to an app.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct CycleEffects {
    /// State entered by this observation, if it caused a transition.
    pub entered: Option<HealthState>,
    /// The app went stale-unhealthy and its timer must pause.
    pub auto_pause: bool,
}

/// Record one outcome: classify, append history, stamp timestamps, and
/// decide on staleness auto-pause. Pure over the injected `now`.
pub(crate) fn apply_outcome(
    app: &mut MonitoredApp,
    outcome: ProbeOutcome,
    now: u64,
    staleness_window: Duration,
) -> CycleEffects {
    let entered = app.classifier.record(outcome);
    app.push_history(HistoryEntry {
        checked_at: now,
        outcome,
    });
    app.last_check = Some(now);
    if app.classifier.state() == HealthState::Healthy {
        app.last_healthy = Some(now);
    }

    // Staleness counts from the last healthy observation, or from
    // registration when the app has never been healthy.
    let baseline = app.last_healthy.unwrap_or(app.registered_at);
    let auto_pause = app.classifier.state() == HealthState::Unhealthy
        && now.saturating_sub(baseline) > staleness_window.as_secs();
    if auto_pause {
        app.paused = true;
    }

    CycleEffects {
        entered,
        auto_pause,
    }
}

/// One probe cycle: probe, classify, record, notify.
async fn run_cycle(
    name: &str,
    app: &SharedApp,
    registry: &Registry,
    prober: &Prober,
    notifier: &dyn Notifier,
    config: &SchedulerConfig,
    pause_tx: &watch::Sender<bool>,
) {
    let (url, timeout) = {
        let app = app.lock().await;
        (
            app.spec.url.clone(),
            Duration::from_secs(app.spec.timeout_secs),
        )
    };

    let endpoint = health_endpoint(&url);
    debug!(%name, %endpoint, "running health check");
    let outcome = prober.probe(&endpoint, timeout).await;

    // The app may have been deregistered while the probe was in flight.
    if !registry.still_registered(name, app).await {
        debug!(%name, "app deregistered mid-probe, discarding result");
        return;
    }

    let now = epoch_secs();
    let (effects, email, healthy_threshold, last_healthy) = {
        let mut app = app.lock().await;
        let effects = apply_outcome(&mut app, outcome, now, config.staleness_window);
        (
            effects,
            app.spec.notify_email.clone(),
            app.spec.healthy_threshold,
            app.last_healthy,
        )
    };

    if let Some(entered) = effects.entered {
        match entered {
            HealthState::Healthy => info!(%name, "back to healthy"),
            HealthState::Degrading => warn!(%name, "health is degraded"),
            HealthState::Unhealthy => error!(%name, "unhealthy"),
            HealthState::Unknown => {}
        }
        if let Some((subject, body)) =
            transition_message(name, entered, healthy_threshold, now, last_healthy)
        {
            dispatch(notifier, email.as_deref(), &subject, &body).await;
        }
    }

    if effects.auto_pause {
        warn!(%name, "unhealthy past the staleness window, pausing monitoring");
        let _ = pause_tx.send(true);
        let (subject, body) = paused_message(name, now, last_healthy);
        dispatch(notifier, email.as_deref(), &subject, &body).await;
    }
}

/// Subject and body for a state-transition notification. `None` for
/// UNKNOWN, which is never announced.
pub(crate) fn transition_message(
    name: &str,
    entered: HealthState,
    healthy_threshold: u32,
    now: u64,
    last_healthy: Option<u64>,
) -> Option<(String, String)> {
    match entered {
        HealthState::Healthy => Some((
            format!("`{name}` is back to healthy"),
            format!("`{name}` responded HEALTHY to {healthy_threshold} health checks."),
        )),
        HealthState::Degrading => Some((
            format!("`{name}` is degraded"),
            format!("`{name}` has not responded to the last two health checks."),
        )),
        HealthState::Unhealthy => Some((
            format!("`{name}` is unhealthy"),
            last_healthy_line(now, last_healthy),
        )),
        HealthState::Unknown => None,
    }
}

/// Subject and body for the staleness auto-pause notification.
fn paused_message(name: &str, now: u64, last_healthy: Option<u64>) -> (String, String) {
    (
        format!("Monitoring for `{name}` has been paused"),
        last_healthy_line(now, last_healthy),
    )
}

fn last_healthy_line(now: u64, last_healthy: Option<u64>) -> String {
    match last_healthy {
        Some(ts) => {
            let ago = Uptime::humanize(now.saturating_sub(ts));
            if ago.is_empty() {
                "Last healthy check: just now".to_string()
            } else {
                format!("Last healthy check: {ago} ago")
            }
        }
        None => "Never seen healthy since registration".to_string(),
    }
}
