//! Observability subsystem for configstore
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Counter metrics
//! - Begin/complete scopes for long-running operations
//!
//! Observability is read-only: nothing here influences mode transitions,
//! export or import outcomes. Logging failures are swallowed.
//!
//! ```ignore
//! use configstore::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::ModeTransition, &[("from", "Normal"), ("to", "Converging")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::{ObservationScope, Timer};

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields. Failure events are logged at ERROR.
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Error
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::BootStart);
        log_event_with_fields(Event::MaintenanceRequested, &[("enabled", "true")]);
    }
}
