//! Maintenance-mode coordination
//!
//! Two pieces of state are kept apart:
//!
//! - The *requested* flag, persisted in the store ([`MaintenanceFlag`]).
//!   Enable/disable only ever write this flag.
//! - The *current* mode, process-local ([`ModeController`]). It moves
//!   towards the requested flag through [`ConvergenceLoop`], and reaches
//!   Maintenance only once every admitted ordinary write has finished.
//!
//! Bulk export and import are gated on the current mode, never on the
//! requested flag.

mod controller;
mod convergence;
mod errors;
mod flag;
mod mode;

use std::sync::Arc;

use serde::Serialize;

use crate::observability::MetricsRegistry;
use crate::storage::StoreResult;

pub use controller::{ModeController, ModeSnapshot, WritePermit};
pub use convergence::{ConvergenceLoop, DEFAULT_POLL_INTERVAL};
pub use errors::{MaintenanceError, MaintenanceResult, WriteRejected};
pub use flag::{MaintenanceFlag, MAINTENANCE_KEY};
pub use mode::Mode;

/// Requested vs current maintenance state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaintenanceStatus {
    pub requested: bool,
    pub current: bool,
}

/// Build a controller whose initial mode is derived from the persisted flag.
///
/// A restart never resumes Converging: with no writes in flight yet, a
/// requested flag maps straight to Maintenance.
pub fn bootstrap_controller(
    flag: &MaintenanceFlag,
    metrics: Arc<MetricsRegistry>,
) -> StoreResult<Arc<ModeController>> {
    let requested = flag.is_requested()?;
    Ok(Arc::new(ModeController::new(
        Mode::at_startup(requested),
        metrics,
    )))
}

/// Read the requested flag fresh and pair it with the current mode
pub fn status(flag: &MaintenanceFlag, controller: &ModeController) -> MaintenanceResult<MaintenanceStatus> {
    Ok(MaintenanceStatus {
        requested: flag.is_requested()?,
        current: controller.mode().is_maintenance(),
    })
}
