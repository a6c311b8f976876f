//! CLI argument definitions using clap
//!
//! Commands:
//! - configstore init --config <path>
//! - configstore serve --config <path> [--port <port>]
//! - configstore maintenance --config <path> <enable|disable|status>
//! - configstore export --config <path> --output <file>
//! - configstore import --config <path> --input <file> [--reset]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// configstore - configuration metadata store with maintenance-mode dumps
#[derive(Parser, Debug)]
#[command(name = "configstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new data directory
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./configstore.json")]
        config: PathBuf,
    },

    /// Serve the HTTP API and run the convergence loop until Ctrl-C
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./configstore.json")]
        config: PathBuf,

        /// Override the configured HTTP port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Inspect or change the persisted maintenance request
    Maintenance {
        /// Path to configuration file
        #[arg(long, default_value = "./configstore.json")]
        config: PathBuf,

        #[command(subcommand)]
        action: MaintenanceAction,
    },

    /// Write a full dump of the store to a file
    Export {
        /// Path to configuration file
        #[arg(long, default_value = "./configstore.json")]
        config: PathBuf,

        /// Destination file
        #[arg(long)]
        output: PathBuf,
    },

    /// Load a dump file into the store (requires maintenance mode)
    Import {
        /// Path to configuration file
        #[arg(long, default_value = "./configstore.json")]
        config: PathBuf,

        /// Dump file to read
        #[arg(long)]
        input: PathBuf,

        /// Delete existing entity data first
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceAction {
    /// Request maintenance mode
    Enable,
    /// Request normal mode
    Disable,
    /// Show the requested mode
    Status,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import_with_reset() {
        let cli = Cli::parse_from([
            "configstore",
            "import",
            "--config",
            "c.json",
            "--input",
            "d.dump",
            "--reset",
        ]);
        match cli.command {
            Command::Import { input, reset, .. } => {
                assert_eq!(input, PathBuf::from("d.dump"));
                assert!(reset);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_maintenance_action() {
        let cli = Cli::parse_from(["configstore", "maintenance", "enable"]);
        assert!(matches!(
            cli.command,
            Command::Maintenance {
                action: MaintenanceAction::Enable,
                ..
            }
        ));
    }
}
