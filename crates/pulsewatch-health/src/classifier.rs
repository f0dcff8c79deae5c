//! Hysteresis health classifier.
//!
//! Converts a stream of probe outcomes into a stable health state.
//! The transition logic is a pure function over (state, counters,
//! thresholds, outcome); [`HealthClassifier`] is the thin stateful
//! wrapper a `MonitoredApp` owns.
//!
//! State graph:
//!
//! ```text
//!              h successes                  h successes
//!   UNKNOWN ───────────────► HEALTHY ◄────────────────── UNHEALTHY
//!      │                        │                            ▲
//!      │ 2 failures             │ 2 failures    u failures   │
//!      └──────────► DEGRADING ◄─┘ ───────────────────────────┘
//! ```
//!
//! UNHEALTHY is reachable only through DEGRADING. The DEGRADING entry
//! trigger is fixed at 2 consecutive failures regardless of the
//! configured unhealthy threshold.

use pulsewatch_state::{HealthState, ProbeOutcome};

/// Consecutive failures that move UNKNOWN/HEALTHY into DEGRADING.
/// Fixed by design, independent of the configured unhealthy threshold.
const DEGRADING_TRIGGER: u32 = 2;

/// Confirmation thresholds for a classifier instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Consecutive successes required to report HEALTHY.
    pub healthy: u32,
    /// Consecutive failures required to move DEGRADING to UNHEALTHY.
    pub unhealthy: u32,
}

/// Saturating evidence counters. Each caps at its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    pub healthy: u32,
    pub unhealthy: u32,
}

/// One classification step.
///
/// Returns the next state, the next counters, and — exactly when the
/// outcome causes a transition into HEALTHY, DEGRADING, or UNHEALTHY —
/// the state that was entered. Saturated no-ops and increments that do
/// not cross a threshold report `None`.
///
/// Hysteresis: the healthy counter is zeroed on every recorded failure,
/// but the unhealthy counter is zeroed only at the moment the healthy
/// threshold is satisfied. Accumulated failure evidence survives
/// isolated successes, so mixed results cannot flap the state.
pub fn step(
    state: HealthState,
    counters: Counters,
    thresholds: Thresholds,
    outcome: ProbeOutcome,
) -> (HealthState, Counters, Option<HealthState>) {
    match outcome {
        ProbeOutcome::Success => {
            if state == HealthState::Healthy {
                return (state, counters, None);
            }
            let healthy = (counters.healthy + 1).min(thresholds.healthy);
            if healthy >= thresholds.healthy {
                let counters = Counters {
                    healthy,
                    unhealthy: 0,
                };
                (HealthState::Healthy, counters, Some(HealthState::Healthy))
            } else {
                (state, Counters { healthy, ..counters }, None)
            }
        }
        ProbeOutcome::Failure => {
            if state == HealthState::Unhealthy {
                return (state, counters, None);
            }
            let counters = Counters {
                healthy: 0,
                unhealthy: (counters.unhealthy + 1).min(thresholds.unhealthy),
            };
            match state {
                HealthState::Degrading if counters.unhealthy >= thresholds.unhealthy => (
                    HealthState::Unhealthy,
                    counters,
                    Some(HealthState::Unhealthy),
                ),
                HealthState::Unknown | HealthState::Healthy
                    if counters.unhealthy >= DEGRADING_TRIGGER =>
                {
                    (
                        HealthState::Degrading,
                        counters,
                        Some(HealthState::Degrading),
                    )
                }
                _ => (state, counters, None),
            }
        }
    }
}

/// Stateful hysteresis classifier for one monitored application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthClassifier {
    state: HealthState,
    counters: Counters,
    thresholds: Thresholds,
}

impl HealthClassifier {
    /// New classifier in UNKNOWN with zeroed counters.
    pub fn new(unhealthy_threshold: u32, healthy_threshold: u32) -> Self {
        Self {
            state: HealthState::Unknown,
            counters: Counters::default(),
            thresholds: Thresholds {
                healthy: healthy_threshold,
                unhealthy: unhealthy_threshold,
            },
        }
    }

    /// Record one probe outcome. Returns the state entered when this
    /// observation causes a transition.
    pub fn record(&mut self, outcome: ProbeOutcome) -> Option<HealthState> {
        let (state, counters, entered) =
            step(self.state, self.counters, self.thresholds, outcome);
        self.state = state;
        self.counters = counters;
        entered
    }

    /// Force the reported state back to UNKNOWN. Counters are left as
    /// they are; the state label and the evidence are independent.
    pub fn reset(&mut self) {
        self.state = HealthState::Unknown;
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    pub fn healthy_checks(&self) -> u32 {
        self.counters.healthy
    }

    pub fn unhealthy_checks(&self) -> u32 {
        self.counters.unhealthy
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }
}
