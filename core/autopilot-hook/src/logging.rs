//! File logging for the hook binary.
//!
//! Hooks run with their stdout/stderr owned by the host protocol, so logs
//! go to daily-rolling files under `~/.autopilot/logs/`. Verbosity comes
//! from `AUTOPILOT_LOG` (EnvFilter syntax), defaulting to `warn`.

use fs_err as fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub fn init() -> Option<WorkerGuard> {
    let dir = autopilot_core::storage::log_dir()?;
    fs::create_dir_all(&dir).ok()?;

    let appender = tracing_appender::rolling::daily(dir, "autopilot-hook.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env("AUTOPILOT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}
