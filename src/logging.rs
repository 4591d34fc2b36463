//! Console and file logging
//!
//! Every event goes to stdout and is appended to the configured log file.
//! `RUST_LOG` overrides the default `info` level.

use crate::error::{Result, SyncError};
use std::path::Path;
use tracing_subscriber::fmt::format::{Compact, Format};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::EnvFilter;

/// Keeps the background log writer alive; drop it last
pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Compact console lines prefixed with a local `HH:MM:SS` timestamp
fn console_format() -> Format<Compact, ChronoLocal> {
    tracing_subscriber::fmt::format()
        .compact()
        .with_target(false)
        .with_timer(ChronoLocal::new("%H:%M:%S".to_string()))
}

/// Install the global subscriber writing to the console and to `log_file`.
///
/// The file must be prepared beforehand (see [`crate::config::prepare_log_file`]).
pub fn init(log_file: &Path) -> Result<LogGuard> {
    let directory = log_file
        .parent()
        .ok_or_else(|| SyncError::InvalidPath(format!("Invalid log file path: {}", log_file.display())))?;
    let file_name = log_file
        .file_name()
        .ok_or_else(|| SyncError::InvalidPath(format!("Invalid log file path: {}", log_file.display())))?;

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false);

    let console_layer = tracing_subscriber::fmt::layer()
        .event_format(console_format());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| SyncError::config(format!("Failed to initialize logging: {}", e)))?;

    Ok(LogGuard { _guard: guard })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_console_lines_start_with_short_time() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .event_format(console_format())
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(path = "a.txt", "Copied file (digest OK)");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let stamp: Vec<char> = output.chars().take(8).collect();
        assert_eq!(stamp.len(), 8);
        assert!(stamp.iter().enumerate().all(|(i, c)| match i {
            2 | 5 => *c == ':',
            _ => c.is_ascii_digit(),
        }), "unexpected line: {}", output);
        assert!(output.contains("INFO"));
        assert!(output.contains("Copied file (digest OK)"));
        assert!(output.contains("a.txt"));
    }
}
