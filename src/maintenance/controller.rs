//! Process-local mode and the ordinary write gate
//!
//! The controller owns the current [`Mode`] and the count of in-flight
//! ordinary writes. Admission and transitions happen under the same lock,
//! so once the mode leaves Normal no further write can be admitted.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;

use crate::observability::{log_event_with_fields, Event, Logger, MetricsRegistry};

use super::errors::WriteRejected;
use super::mode::Mode;

#[derive(Debug)]
struct ControllerState {
    mode: Mode,
    in_flight: usize,
    changed_at: DateTime<Utc>,
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, Serialize)]
pub struct ModeSnapshot {
    pub mode: Mode,
    pub in_flight: usize,
    pub changed_at: DateTime<Utc>,
}

pub struct ModeController {
    state: Mutex<ControllerState>,
    wake: Notify,
    metrics: Arc<MetricsRegistry>,
}

impl ModeController {
    pub fn new(initial: Mode, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            state: Mutex::new(ControllerState {
                mode: initial,
                in_flight: 0,
                changed_at: Utc::now(),
            }),
            wake: Notify::new(),
            metrics,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        // Counters stay consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn mode(&self) -> Mode {
        self.lock().mode
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    pub fn snapshot(&self) -> ModeSnapshot {
        let state = self.lock();
        ModeSnapshot {
            mode: state.mode,
            in_flight: state.in_flight,
            changed_at: state.changed_at,
        }
    }

    /// Admit one ordinary write. The returned permit must be held until the
    /// write has been applied to the store.
    pub fn admit(self: &Arc<Self>) -> Result<WritePermit, WriteRejected> {
        let mut state = self.lock();
        if !state.mode.admits_writes() {
            let mode = state.mode;
            drop(state);
            self.metrics.increment_writes_rejected();
            Logger::warn(Event::WriteRejected.as_str(), &[("mode", mode.name())]);
            return Err(WriteRejected { mode });
        }
        state.in_flight += 1;
        drop(state);

        self.metrics.increment_writes_admitted();
        Ok(WritePermit {
            controller: Arc::clone(self),
        })
    }

    /// Apply one step of the state machine for the given request flag.
    pub fn reconcile(&self, requested: bool) -> Mode {
        let mut state = self.lock();
        let from = state.mode;
        let to = from.next(requested, state.in_flight);
        if to == from {
            return to;
        }

        state.mode = to;
        state.changed_at = Utc::now();
        let in_flight = state.in_flight.to_string();
        drop(state);

        self.metrics.increment_mode_transitions();
        log_event_with_fields(
            Event::ModeTransition,
            &[("from", from.name()), ("to", to.name()), ("in_flight", &in_flight)],
        );
        to
    }

    /// Ask the convergence loop to reconcile now instead of at its next tick
    pub fn nudge(&self) {
        self.wake.notify_one();
    }

    /// Resolves on the next nudge. A nudge sent while nobody is waiting is
    /// kept for the next waiter.
    pub async fn woken(&self) {
        self.wake.notified().await;
    }

    fn release(&self) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        let drained = state.in_flight == 0 && state.mode == Mode::Converging;
        drop(state);

        if drained {
            self.nudge();
        }
    }
}

/// Proof that an ordinary write was admitted. Dropping it marks the write
/// as finished.
pub struct WritePermit {
    controller: Arc<ModeController>,
}

impl Drop for WritePermit {
    fn drop(&mut self) {
        self.controller.release();
    }
}
