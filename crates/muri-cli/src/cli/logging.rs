//! File logging setup.
//!
//! The unlock form owns the terminal, so log output goes to
//! `${MURI_HOME}/logs` instead of stderr. Filtering follows `RUST_LOG`.

use muri_core::config::paths;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initializes file logging. Returns the guard that flushes the writer;
/// keep it alive for the life of the process.
///
/// Logging is best-effort: a read-only home directory just means no logs.
pub fn init() -> Option<WorkerGuard> {
    let dir = paths::logs_dir();
    std::fs::create_dir_all(&dir).ok()?;

    let appender = tracing_appender::rolling::daily(dir, "muri.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}
