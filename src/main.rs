//! MirrorSync CLI - Periodic One-Way Directory Mirroring
//!
//! Keeps a destination directory an exact mirror of a source directory.

use clap::Parser;
use mirrorsync::config::{prepare_log_file, validate, CliArgs, SyncConfig};
use mirrorsync::core::CycleScheduler;
use mirrorsync::error::{Result, SyncError};
use mirrorsync::logging;
use mirrorsync::sync::ReconciliationEngine;
use std::io::BufRead;
use std::sync::Arc;
use tracing::{error, info};

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Handle result
    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every item of every cycle succeeded in `--once` mode
fn run(args: CliArgs) -> Result<bool> {
    // Build configuration
    let config = SyncConfig::from_cli(&args)?;

    // Logging must be up before validation so its warnings reach the log file
    prepare_log_file(&config.log_file)?;
    let _log_guard = logging::init(&config.log_file)?;

    validate(&config)?;
    print_config(&config);

    let engine = ReconciliationEngine::from_config(&config);

    if config.once {
        let report = engine.run_once()?;
        for (path, e) in report.failures() {
            error!(path = %path.display(), error = %e, "Item failed");
        }
        return Ok(report.is_success());
    }

    let mut scheduler = CycleScheduler::new(Arc::new(engine), config.interval);
    scheduler.start()?;

    println!("Press Enter to stop");
    wait_for_enter()?;

    info!("Stopping, waiting for the current cycle to finish");
    scheduler.stop();
    scheduler.wait_for_in_flight();

    let stats = scheduler.stats();
    info!(
        completed = stats.completed(),
        failed = stats.failed(),
        skipped = stats.skipped(),
        "Synchronization shut down"
    );
    Ok(true)
}

/// Block until a line (or end of input) arrives on stdin
fn wait_for_enter() -> Result<()> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(SyncError::from)?;
    Ok(())
}

fn print_config(config: &SyncConfig) {
    info!(
        source = %config.source.display(),
        destination = %config.destination.display(),
        interval = %humantime::format_duration(config.interval),
        log_file = %config.log_file.display(),
        hash = config.hash.name(),
        path_case = ?config.path_case,
        buffer_size = %humansize::format_size(config.buffer_size as u64, humansize::BINARY),
        once = config.once,
        "Configuration"
    );
}
