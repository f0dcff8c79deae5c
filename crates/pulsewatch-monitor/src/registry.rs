//! Registry of monitored applications.
//!
//! The registry is the single shared store: a name-keyed map guarded by
//! an `RwLock`, with each entry behind its own `Mutex` so a probe cycle
//! and a lifecycle call for the same app serialize on the entry rather
//! than on the whole map.

use std::collections::{HashMap, VecDeque};
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{Mutex, RwLock};

use pulsewatch_health::HealthClassifier;
use pulsewatch_state::{AppName, AppSnapshot, AppSpec, HistoryEntry};

/// Current Unix epoch in seconds.
pub(crate) fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Live monitoring record for one application.
///
/// Mutated only under its entry lock — by the app's own probe cycle or
/// by a lifecycle operation.
#[derive(Debug)]
pub struct MonitoredApp {
    pub spec: AppSpec,
    pub classifier: HealthClassifier,
    /// Unix timestamp of the most recent probe.
    pub last_check: Option<u64>,
    /// Unix timestamp of the most recent probe observed healthy.
    pub last_healthy: Option<u64>,
    /// Registration time; staleness baseline until first healthy probe.
    pub registered_at: u64,
    /// Mirrors the schedule state so snapshots can report it.
    pub paused: bool,
    history: VecDeque<HistoryEntry>,
}

impl MonitoredApp {
    pub fn new(spec: AppSpec, registered_at: u64) -> Self {
        let classifier =
            HealthClassifier::new(spec.unhealthy_threshold, spec.healthy_threshold);
        Self {
            spec,
            classifier,
            last_check: None,
            last_healthy: None,
            registered_at,
            paused: false,
            history: VecDeque::new(),
        }
    }

    /// Append a probe record, evicting the oldest entries beyond the
    /// healthy-threshold cap.
    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push_back(entry);
        while self.history.len() > self.spec.healthy_threshold as usize {
            self.history.pop_front();
        }
    }

    pub fn history(&self) -> &VecDeque<HistoryEntry> {
        &self.history
    }

    /// Immutable view of the current fields.
    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            spec: self.spec.clone(),
            state: self.classifier.state(),
            healthy_checks: self.classifier.healthy_checks(),
            unhealthy_checks: self.classifier.unhealthy_checks(),
            last_check: self.last_check,
            last_healthy: self.last_healthy,
            paused: self.paused,
            history: self.history.iter().copied().collect(),
        }
    }
}

/// A registry entry: exclusive access per app.
pub type SharedApp = Arc<Mutex<MonitoredApp>>;

/// Shared, name-keyed store of monitored applications.
#[derive(Clone, Default)]
pub struct Registry {
    apps: Arc<RwLock<HashMap<AppName, SharedApp>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `app` under `name` if the name is free. Returns the
    /// existing entry when the name is already taken (the candidate is
    /// dropped), `None` after a successful insert.
    pub async fn try_insert(&self, name: &str, app: SharedApp) -> Option<SharedApp> {
        let mut apps = self.apps.write().await;
        match apps.entry(name.to_string()) {
            Entry::Occupied(occupied) => Some(occupied.get().clone()),
            Entry::Vacant(vacant) => {
                vacant.insert(app);
                None
            }
        }
    }

    pub async fn get(&self, name: &str) -> Option<SharedApp> {
        self.apps.read().await.get(name).cloned()
    }

    pub async fn remove(&self, name: &str) -> Option<SharedApp> {
        self.apps.write().await.remove(name)
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.apps.read().await.contains_key(name)
    }

    pub async fn names(&self) -> Vec<AppName> {
        self.apps.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.apps.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.apps.read().await.is_empty()
    }

    /// Whether `name` still maps to exactly this entry. An in-flight
    /// probe cycle calls this before mutating state, so results for a
    /// deregistered (or replaced) app are discarded.
    pub async fn still_registered(&self, name: &str, app: &SharedApp) -> bool {
        self.apps
            .read()
            .await
            .get(name)
            .is_some_and(|current| Arc::ptr_eq(current, app))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pulsewatch_state::ProbeOutcome;

    fn app(name: &str) -> SharedApp {
        let mut spec = AppSpec::with_defaults(name, "http://10.0.0.1:8080");
        spec.healthy_threshold = 3;
        Arc::new(Mutex::new(MonitoredApp::new(spec, 1000)))
    }

    #[tokio::test]
    async fn insert_get_remove() {
        let registry = Registry::new();
        assert!(registry.is_empty().await);

        assert!(registry.try_insert("svc1", app("svc1")).await.is_none());
        assert!(registry.contains("svc1").await);
        assert_eq!(registry.len().await, 1);
        assert!(registry.get("svc1").await.is_some());

        assert!(registry.remove("svc1").await.is_some());
        assert!(!registry.contains("svc1").await);
        assert!(registry.remove("svc1").await.is_none());
    }

    #[tokio::test]
    async fn try_insert_keeps_the_existing_entry() {
        let registry = Registry::new();
        let first = app("svc1");
        assert!(registry.try_insert("svc1", first.clone()).await.is_none());

        let existing = registry.try_insert("svc1", app("svc1")).await;
        assert!(existing.is_some_and(|e| Arc::ptr_eq(&e, &first)));

        let stored = registry.get("svc1").await.unwrap();
        assert!(Arc::ptr_eq(&stored, &first));
    }

    #[tokio::test]
    async fn still_registered_tracks_identity_not_name() {
        let registry = Registry::new();
        let first = app("svc1");
        registry.try_insert("svc1", first.clone()).await;
        assert!(registry.still_registered("svc1", &first).await);

        // Removed: a cycle holding `first` must discard its result.
        registry.remove("svc1").await;
        assert!(!registry.still_registered("svc1", &first).await);

        // Re-registered under the same name with a fresh entry: still
        // not the cycle's app.
        registry.try_insert("svc1", app("svc1")).await;
        assert!(!registry.still_registered("svc1", &first).await);
    }

    #[tokio::test]
    async fn history_is_capped_at_healthy_threshold() {
        let shared = app("svc1");
        let mut app = shared.lock().await;
        for i in 0..10 {
            app.push_history(HistoryEntry {
                checked_at: i,
                outcome: ProbeOutcome::Failure,
            });
        }
        // healthy_threshold is 3: only the newest three entries remain.
        assert_eq!(app.history().len(), 3);
        assert_eq!(app.history()[0].checked_at, 7);
        assert_eq!(app.history()[2].checked_at, 9);
    }

    #[tokio::test]
    async fn snapshot_reflects_current_fields() {
        let shared = app("svc1");
        let mut app = shared.lock().await;
        app.classifier.record(ProbeOutcome::Success);
        app.last_check = Some(2000);
        app.push_history(HistoryEntry {
            checked_at: 2000,
            outcome: ProbeOutcome::Success,
        });

        let snapshot = app.snapshot();
        assert_eq!(snapshot.spec.name, "svc1");
        assert_eq!(snapshot.healthy_checks, 1);
        assert_eq!(snapshot.unhealthy_checks, 0);
        assert_eq!(snapshot.last_check, Some(2000));
        assert_eq!(snapshot.last_healthy, None);
        assert!(!snapshot.paused);
        assert_eq!(snapshot.history.len(), 1);
    }

    #[test]
    fn epoch_secs_returns_reasonable_value() {
        // Should be after 2024-01-01.
        assert!(epoch_secs() > 1_704_067_200);
    }
}
