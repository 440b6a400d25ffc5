//! Logging system with console and rolling file output.
//!
//! Library crates log through the `log` facade; those records are bridged
//! into tracing here. Log files older than the retention window are removed
//! at start-up.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name prefix of the daily log files.
const LOG_FILE: &str = "cc-monitor.log";

/// Initialize logging.
///
/// # Arguments
/// * `log_dir` - Directory where log files will be stored
/// * `retention_days` - Number of days to keep log files
/// * `verbose` - Default to debug instead of info
/// * `level` - Filter directive from the config file, used when `RUST_LOG`
///   is not set
///
/// Console output goes to stderr so that decoded captions on stdout stay
/// machine readable.
pub fn init_logging(
    log_dir: &Path,
    retention_days: u64,
    verbose: bool,
    level: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(log_dir)?;
    clean_old_logs(log_dir, retention_days)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer thread alive for the program lifetime.
    let _ = Box::leak(Box::new(Arc::new(guard)));

    let default_level = match (verbose, level) {
        (true, _) => "debug",
        (false, Some(level)) => level,
        (false, None) => "info",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_timer(LocalTimeTimer),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_timer(LocalTimeTimer),
        );

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to set default subscriber: {}", e))?;

    // Bridge log:: records from the decoder crates.
    tracing_log::LogTracer::init().map_err(|e| format!("Failed to initialize LogTracer: {}", e))?;

    Ok(())
}

/// Remove log files last modified before the retention window.
fn clean_old_logs(log_dir: &Path, retention_days: u64) -> io::Result<()> {
    if !log_dir.exists() {
        return Ok(());
    }

    let cutoff = Local::now() - chrono::Duration::days(retention_days as i64);

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.contains(LOG_FILE));
        if !path.is_file() || !is_log {
            continue;
        }

        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        let modified: chrono::DateTime<Local> = modified.into();
        if modified < cutoff {
            if let Err(e) = fs::remove_file(&path) {
                eprintln!("Failed to remove old log file {:?}: {}", path, e);
            }
        }
    }

    Ok(())
}

/// Local time stamps for log lines.
#[derive(Debug, Clone, Copy)]
struct LocalTimeTimer;

impl fmt::time::FormatTime for LocalTimeTimer {
    fn format_time(&self, w: &mut fmt::format::Writer) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.6f"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_old_logs_keeps_recent_and_foreign_files() {
        let dir = std::env::temp_dir().join(format!("cc-monitor-logs-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let log = dir.join(format!("{}.2024-01-01", LOG_FILE));
        let other = dir.join("notes.txt");
        fs::write(&log, b"x").unwrap();
        fs::write(&other, b"x").unwrap();

        // Just written, so inside any retention window.
        clean_old_logs(&dir, 7).unwrap();
        assert!(log.exists());
        assert!(other.exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_clean_old_logs_missing_dir() {
        let dir = std::env::temp_dir().join("cc-monitor-logs-missing");
        assert!(clean_old_logs(&dir, 7).is_ok());
    }
}
