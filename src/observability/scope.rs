//! ObservationScope for begin/complete/failed logging around long operations
//!
//! - Logs the begin event on creation (INFO)
//! - Logs the complete event with `elapsed_ms` on `complete()` (INFO)
//! - Logs the failure event with `reason` on `fail()` (ERROR)
//! - Logs the failure event at WARN if dropped without either

use std::time::Instant;

use super::events::Event;
use super::logger::Logger;

pub struct ObservationScope {
    complete_event: Event,
    failure_event: Event,
    fields: Vec<(&'static str, String)>,
    timer: Timer,
    finished: bool,
}

impl ObservationScope {
    pub fn begin(
        begin_event: Event,
        complete_event: Event,
        failure_event: Event,
        fields: &[(&'static str, &str)],
    ) -> Self {
        Logger::info(begin_event.as_str(), fields);

        Self {
            complete_event,
            failure_event,
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            timer: Timer::new(),
            finished: false,
        }
    }

    fn merged<'a>(&'a self, extra: &[(&'a str, &'a str)], elapsed: &'a str) -> Vec<(&'a str, &'a str)> {
        let mut all: Vec<(&str, &str)> = self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        all.extend(extra.iter().copied());
        all.push(("elapsed_ms", elapsed));
        all
    }

    pub fn complete(mut self, extra: &[(&str, &str)]) {
        self.finished = true;
        let elapsed = self.timer.elapsed_ms();
        Logger::info(self.complete_event.as_str(), &self.merged(extra, &elapsed));
    }

    pub fn fail(mut self, reason: &str, extra: &[(&str, &str)]) {
        self.finished = true;
        let elapsed = self.timer.elapsed_ms();
        let mut fields = self.merged(extra, &elapsed);
        fields.push(("reason", reason));
        Logger::error(self.failure_event.as_str(), &fields);
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.finished {
            Logger::warn(
                self.failure_event.as_str(),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}

/// Elapsed-time helper for log fields
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
