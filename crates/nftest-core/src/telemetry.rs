//! Centralised tracing initialisation for the nftest binary.
//!
//! Two sinks: the console, at the configured verbosity, and a log file that
//! records everything at DEBUG and above.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing::{Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Initialise the global tracing subscriber.
///
/// * `json`: emit newline-delimited JSON on the console.
/// * `level`: console verbosity when `RUST_LOG` is not set.
/// * `log_file`: appended to at DEBUG; parent directories are created.
///
/// Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level, log_file: &Path) -> std::io::Result<()> {
    if let Some(parent) = log_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_filter(console_filter))
            .with(file_layer(file))
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_filter(console_filter))
            .with(file_layer(file))
            .try_init()
            .ok();
    }
    Ok(())
}

fn file_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_ansi(false)
        .with_thread_names(true)
        .with_writer(Mutex::new(file))
        .with_filter(LevelFilter::DEBUG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_log_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("nested").join("nftest.log");
        init_tracing(false, Level::INFO, &log).unwrap();
        assert!(log.exists());
    }
}
