//! Background reconciliation of the process mode against the persisted flag
//!
//! Each step reads the flag and applies one [`Mode::next`] transition. The
//! loop wakes on a fixed poll interval, on an explicit nudge (enable/disable
//! in this process, a drained write gate), and exits on shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::observability::{log_event_with_fields, Event};

use super::controller::ModeController;
use super::flag::MaintenanceFlag;
use super::mode::Mode;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

pub struct ConvergenceLoop {
    flag: MaintenanceFlag,
    controller: Arc<ModeController>,
    poll_interval: Duration,
}

impl ConvergenceLoop {
    pub fn new(flag: MaintenanceFlag, controller: Arc<ModeController>) -> Self {
        Self {
            flag,
            controller,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// One reconciliation step. A flag read failure leaves the mode as is.
    pub fn reconcile_once(&self) -> Mode {
        match self.flag.is_requested() {
            Ok(requested) => self.controller.reconcile(requested),
            Err(e) => {
                let mode = self.controller.mode();
                log_event_with_fields(
                    Event::ConvergenceReadFailed,
                    &[("error", &e.to_string()), ("mode", mode.name())],
                );
                mode
            }
        }
    }

    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            self.reconcile_once();
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
                _ = self.controller.woken() => {}
            }
        }
    }
}
