//! Observable lifecycle events
//!
//! Every log line emitted by the core names one of these events.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    BootStart,
    BootComplete,
    ConfigLoaded,
    Serving,
    ShutdownStart,
    ShutdownComplete,

    // Maintenance
    /// Requested mode persisted by enable/disable
    MaintenanceRequested,
    /// Process-local mode changed (Normal/Converging/Maintenance)
    ModeTransition,
    /// Reconciliation could not read the requested flag
    ConvergenceReadFailed,
    /// Mutating operation refused by the write gate
    WriteRejected,

    // Export
    ExportBegin,
    ExportComplete,
    /// Export failed after the stream started; connection will be aborted
    ExportAborted,
    /// Export started while the process is not in maintenance mode
    ExportNotQuiesced,

    // Import
    ImportBegin,
    ImportComplete,
    ImportFailed,
    /// Entity data removed before an import
    StoreReset,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "BOOT_START",
            Event::BootComplete => "BOOT_COMPLETE",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::Serving => "SERVING",
            Event::ShutdownStart => "SHUTDOWN_START",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",
            Event::MaintenanceRequested => "MAINTENANCE_REQUESTED",
            Event::ModeTransition => "MODE_TRANSITION",
            Event::ConvergenceReadFailed => "CONVERGENCE_READ_FAILED",
            Event::WriteRejected => "WRITE_REJECTED",
            Event::ExportBegin => "EXPORT_BEGIN",
            Event::ExportComplete => "EXPORT_COMPLETE",
            Event::ExportAborted => "EXPORT_ABORTED",
            Event::ExportNotQuiesced => "EXPORT_NOT_QUIESCED",
            Event::ImportBegin => "IMPORT_BEGIN",
            Event::ImportComplete => "IMPORT_COMPLETE",
            Event::ImportFailed => "IMPORT_FAILED",
            Event::StoreReset => "STORE_RESET",
        }
    }

    /// Whether this event represents a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::ConvergenceReadFailed | Event::ExportAborted | Event::ImportFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
