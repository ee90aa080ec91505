//! Tracing setup.
//!
//! The journal is used when it is reachable, a daily rolling file otherwise.
//! stdout is left alone because exported results go there.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Filter directives, in `EnvFilter` syntax.
pub const LOG_ENV: &str = "EXIFACET_LOG";

const DEFAULT_DIRECTIVES: &str = "info";
const LOG_FILE_PREFIX: &str = "exifacet.log";

/// Kept alive for the whole process so buffered lines reach the file.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where log lines end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Journald,
    File(PathBuf),
}

/// Install the global subscriber.
///
/// `log_dir` only matters for the file backend and defaults to
/// `$XDG_DATA_HOME/exifacet/logs`. Fails if a subscriber is already set.
pub fn init(log_dir: Option<PathBuf>) -> Result<Backend> {
    let filter = filter_from(std::env::var(LOG_ENV).ok().as_deref());

    #[cfg(target_os = "linux")]
    {
        if let Ok(journald) = tracing_journald::layer() {
            install(filter, journald)?;
            tracing::info!("Logging to journald");
            return Ok(Backend::Journald);
        }
    }

    let dir = log_dir.unwrap_or_else(default_log_dir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    install(filter, fmt::layer().with_writer(writer).with_ansi(false))?;
    let _ = FILE_GUARD.set(guard);

    tracing::info!(dir = %dir.display(), "Logging to file");
    Ok(Backend::File(dir))
}

/// Parse `directives`, falling back to `info` when they are missing or
/// malformed.
fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

fn install<L>(filter: EnvFilter, output: L) -> Result<()>
where
    L: Layer<Layered<EnvFilter, Registry>> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .context("A global tracing subscriber is already installed")
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("exifacet")
        .join("logs")
}
