//! CLI command implementations

use std::path::Path;

use crate::app::App;
use crate::config::Config;
use crate::observability::{log_event, Event, Logger};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::write_json;

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(&config, port),
        Command::Check { config } => check(&config),
    }
}

fn load(config_path: &Path) -> CliResult<Config> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.log_level);

    let path = config_path.display().to_string();
    log_event(Event::ConfigLoaded, &[("path", path.as_str())]);
    Ok(config)
}

/// Build the application and serve it until the process exits
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = load(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::serve_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let server = App::builder(config)
            .with_bundled_extensions()
            .build()?
            .into_server();
        server
            .start()
            .await
            .map_err(|e| CliError::serve_failed(e.to_string()))
    })
}

/// Validate config and extensions without binding a port
pub fn check(config_path: &Path) -> CliResult<()> {
    let config = load(config_path)?;
    let app = App::builder(config).with_bundled_extensions().build()?;
    write_json(&app.summary())
}
