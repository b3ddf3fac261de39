//! Tracing subscriber setup: console layer on stderr plus an optional JSON file sink.

use crate::cli::FILE_GUARD;
use eyre::WrapErr;
use std::path::Path;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Install the global subscriber.
///
/// Level precedence: `RUST_LOG`, then `--log-level`, then `logging.level`, then "info".
pub fn init_tracing(
    json: bool,
    cli_level: Option<&str>,
    logging: &loadcell_config::Logging,
) -> eyre::Result<()> {
    let level = cli_level
        .or(logging.level.as_deref())
        .unwrap_or("info")
        .to_string();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    // stdout carries command output; logs go to stderr.
    let console = if json {
        fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file_layer = match logging.file.as_deref() {
        Some(path) => {
            let writer = file_writer(Path::new(path), logging.rotation.as_deref())?;
            Some(fmt::layer().json().with_ansi(false).with_writer(writer).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}

fn file_writer(
    path: &Path,
    rotation: Option<&str>,
) -> eyre::Result<tracing_appender::non_blocking::NonBlocking> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
    std::fs::create_dir_all(dir).wrap_err_with(|| format!("create log dir {}", dir.display()))?;

    let appender = match rotation.unwrap_or("never") {
        "daily" => tracing_appender::rolling::daily(dir, name),
        "hourly" => tracing_appender::rolling::hourly(dir, name),
        _ => tracing_appender::rolling::never(dir, name),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // Flushes on process exit; a second init keeps the first guard.
    let _ = FILE_GUARD.set(guard);
    Ok(writer)
}
