use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Log file prefix; files rotate daily as `configbridge.YYYY-MM-DD`.
pub const LOG_PREFIX: &str = "configbridge";

fn level_filter(debug_mode: bool) -> EnvFilter {
    // RUST_LOG wins when set
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug_mode { "debug" } else { "info" }))
}

/// Create `log_dir` and a non-blocking daily rolling writer inside it.
fn file_writer(log_dir: &Utf8Path, log_prefix: &str) -> Result<(NonBlocking, WorkerGuard)> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }

    let file_appender = rolling::daily(log_dir, log_prefix);
    Ok(tracing_appender::non_blocking(file_appender))
}

/// Setup logging with a rotating file appender and optional console output.
///
/// # Arguments
/// * `log_dir` - Directory for log files (e.g., "logs")
/// * `log_prefix` - Prefix for log files (normally [`LOG_PREFIX`])
/// * `debug_mode` - If true, use debug level; otherwise use info level
/// * `console_output` - If true, also log to stderr
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging(
    log_dir: &Utf8Path,
    log_prefix: &str,
    debug_mode: bool,
    console_output: bool,
) -> Result<WorkerGuard> {
    let (non_blocking, guard) = file_writer(log_dir, log_prefix)?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // stderr keeps stdout clean for command output
    let console_layer = console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(level_filter(debug_mode))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Global tracing subscriber already installed")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}",
        log_dir,
        log_prefix,
        debug_mode,
        console_output
    );

    Ok(guard)
}
