//! Operating mode state machine
//!
//! ```text
//!            requested               in_flight == 0
//!   Normal ───────────► Converging ─────────────────► Maintenance
//!     ▲                     │                              │
//!     └─────────────────────┴──────────────────────────────┘
//!                      not requested
//! ```
//!
//! Transitions are a pure function of the persisted request flag and the
//! number of in-flight ordinary writes. Nothing else moves the mode.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    /// Ordinary writes admitted
    Normal,
    /// Maintenance requested; new writes refused, earlier writes draining
    Converging,
    /// Quiescent; bulk export/import may run
    Maintenance,
}

impl Mode {
    /// Next mode given the requested flag and the current in-flight count
    pub fn next(self, requested: bool, in_flight: usize) -> Mode {
        match (self, requested) {
            (_, false) => Mode::Normal,
            (Mode::Normal, true) if in_flight == 0 => Mode::Maintenance,
            (Mode::Normal, true) => Mode::Converging,
            (Mode::Converging, true) if in_flight == 0 => Mode::Maintenance,
            (Mode::Converging, true) => Mode::Converging,
            (Mode::Maintenance, true) => Mode::Maintenance,
        }
    }

    /// Initial mode after a restart
    pub fn at_startup(requested: bool) -> Mode {
        if requested {
            Mode::Maintenance
        } else {
            Mode::Normal
        }
    }

    pub fn admits_writes(&self) -> bool {
        matches!(self, Mode::Normal)
    }

    /// The "current" side of the maintenance status
    pub fn is_maintenance(&self) -> bool {
        matches!(self, Mode::Maintenance)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Normal => "Normal",
            Mode::Converging => "Converging",
            Mode::Maintenance => "Maintenance",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
