//! CLI command implementations
//!
//! - init: create the data directory and an empty store file
//! - serve: HTTP API plus convergence loop until Ctrl-C
//! - maintenance: flip or read the persisted flag without a server
//! - export / import: offline dumps against the file backend

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::api::ApiHandler;
use crate::http_server::HttpServer;
use crate::import::ImportOptions;
use crate::observability::{log_event, log_event_with_fields, Event, Logger};
use crate::storage::{FileStore, StoreAccessor};
use crate::stream::CancelFlag;

use super::args::{Command, MaintenanceAction};
use super::config::{is_initialized, Config};
use super::errors::{CliError, CliResult};
use super::io::write_response;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Serve { config, port } => serve(&config, port),
        Command::Maintenance { config, action } => maintenance(&config, action),
        Command::Export { config, output } => export(&config, &output),
        Command::Import {
            config,
            input,
            reset,
        } => import(&config, &input, reset),
    }
}

/// Initialize a new data directory with an empty store file
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let data_dir = config
        .data_path()
        .ok_or_else(|| CliError::config_error("init requires the file backend"))?;

    if is_initialized(data_dir) {
        return Err(CliError::already_initialized());
    }

    FileStore::open(data_dir)?;

    write_response(json!({
        "initialized": true,
        "data_dir": data_dir.display().to_string(),
    }))?;

    Ok(())
}

/// Serve the HTTP API until Ctrl-C
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.log_severity()?);
    log_event(Event::ConfigLoaded);

    log_event(Event::BootStart);
    let api = Arc::new(ApiHandler::bootstrap(config.open_store()?)?);
    log_event_with_fields(
        Event::BootComplete,
        &[("mode", api.controller().mode().name())],
    );

    let mut http_config = config.http.clone();
    if let Some(port) = port {
        http_config.port = port;
    }
    let server = HttpServer::with_config(http_config, api).with_poll_interval(config.poll_interval());

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })?;

    Ok(())
}

/// Read or change the persisted maintenance request.
///
/// A running server picks the change up on its next reconciliation.
pub fn maintenance(config_path: &Path, action: MaintenanceAction) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let api = ApiHandler::bootstrap(open_offline_store(&config)?)?;

    match action {
        MaintenanceAction::Enable => api.set_maintenance(true)?,
        MaintenanceAction::Disable => api.set_maintenance(false)?,
        MaintenanceAction::Status => {}
    }

    let status = api.maintenance_status()?;
    write_response(json!({ "requestedStatus": status.requested }))?;
    Ok(())
}

/// Dump the store to `output`. A failed export leaves no file behind.
pub fn export(config_path: &Path, output: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let api = ApiHandler::bootstrap(open_offline_store(&config)?)?;
    let permit = api.begin_dump()?;

    let file = File::create(output)
        .map_err(|e| CliError::io_error(format!("Failed to create {}: {}", output.display(), e)))?;
    let mut writer = BufWriter::new(file);

    let result = api
        .export(&permit, &mut writer, &CancelFlag::new())
        .map_err(CliError::from)
        .and_then(|summary| {
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
            Ok(summary)
        });

    match result {
        Ok(summary) => {
            write_response(json!({
                "output": output.display().to_string(),
                "export": summary,
            }))?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(output);
            Err(e)
        }
    }
}

/// Load a dump from `input`. The persisted flag must request maintenance.
pub fn import(config_path: &Path, input: &Path, reset: bool) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let api = ApiHandler::bootstrap(open_offline_store(&config)?)?;
    let permit = api.begin_dump()?;

    let file = File::open(input)
        .map_err(|e| CliError::io_error(format!("Failed to open {}: {}", input.display(), e)))?;

    let summary = api.import(
        &permit,
        BufReader::new(file),
        ImportOptions { reset },
        CancelFlag::new(),
    )?;

    write_response(json!({ "import": summary }))?;
    Ok(())
}

fn open_offline_store(config: &Config) -> CliResult<Arc<dyn StoreAccessor>> {
    if config.data_path().is_none() {
        return Err(CliError::config_error(
            "offline commands require the file backend",
        ));
    }
    config.open_store()
}
