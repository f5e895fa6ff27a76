//! Tracing setup.
//!
//! The terminal belongs to the UI, so events go to a file under
//! `${CHIRP_HOME}/logs`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, paths};

/// Env var holding an `EnvFilter` directive that overrides `logging.level`.
pub const LOG_ENV: &str = "CHIRP_LOG";

const LOG_FILE: &str = "chirp.log";

/// Installs the global subscriber writing to the default log directory.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the writer thread.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a subscriber
/// is already installed.
pub fn init(config: &Config) -> Result<WorkerGuard> {
    init_in(&paths::log_dir(), config)
}

/// Like [`init`], writing into `dir`.
///
/// # Errors
/// Returns an error if `dir` cannot be created or a subscriber is already
/// installed.
pub fn init_in(dir: &Path, config: &Config) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(
            std::env::var(LOG_ENV).ok().as_deref(),
            &config.logging.level,
        ))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("Failed to install tracing subscriber: {err}"))?;

    Ok(guard)
}

/// `CHIRP_LOG` wins over the configured level; anything unparsable falls
/// through to the next source and finally to `info`.
fn env_filter(from_env: Option<&str>, default_level: &str) -> EnvFilter {
    from_env
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .or_else(|| EnvFilter::try_new(default_level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
