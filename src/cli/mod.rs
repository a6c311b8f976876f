//! CLI module for configstore
//!
//! Provides command-line interface for:
//! - init: Create the data directory
//! - serve: Run the HTTP API and convergence loop
//! - maintenance: Request or inspect maintenance mode offline
//! - export / import: Offline dumps

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command, MaintenanceAction};
pub use commands::{export, import, init, maintenance, run, run_command, serve};
pub use config::{Backend, Config};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
