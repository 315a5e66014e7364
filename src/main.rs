//! Path check entry point.
//!
//! Loads configuration from the environment, then reports for every argument
//! whether the configured guard would allow it.

use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use safe_fs::core::config::LoggingConfig;
use safe_fs::{Config, PathCheck, SafeFs};

/// One line of output per checked path.
#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    path: &'a str,
    resolved: Option<String>,
    allowed: bool,
    error: Option<String>,
}

impl<'a> CheckReport<'a> {
    fn new(path: &'a str, check: &PathCheck) -> Self {
        Self {
            path,
            resolved: check.is_allowed().then(|| check.path.clone()),
            allowed: check.is_allowed(),
            error: check.error.as_ref().map(ToString::to_string),
        }
    }
}

fn main() -> Result<ExitCode> {
    // the subscriber goes first so configuration loading is logged
    init_logging(&LoggingConfig::from_env().level);
    let config = Config::from_env();

    let fs = SafeFs::from_config(&config);
    info!(
        root = fs.guard().root_limit(),
        working_directory = ?fs.guard().working_directory(),
        "guard configured"
    );

    let mut denied = 0usize;
    for path in std::env::args().skip(1) {
        let check = fs.check(&path);
        if !check.is_allowed() {
            denied += 1;
        }
        println!("{}", serde_json::to_string(&CheckReport::new(&path, &check))?);
    }

    if denied > 0 {
        info!(denied, "some paths fall outside the root");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Initialize the logging subsystem.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
