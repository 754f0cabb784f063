//! Shared logging setup for SuperCSV tools.
//!
//! Installs a `tracing` subscriber with a stderr layer and, when a log
//! directory is configured, a size-rotated file layer.

mod rolling;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use rolling::{RollingFile, Rotation, SharedRollingFile};

/// Environment variable that overrides [`LogConfig::log_dir`].
pub const LOG_DIR_ENV: &str = "SUPERCSV_LOG_DIR";

const DEFAULT_LOG_FILTER: &str = "supercsv=info,supercsv_store=info";
const VERBOSE_LOG_FILTER: &str = "supercsv=debug,supercsv_store=debug";
const MAX_LOG_FILES: usize = 5;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging configuration. Missing fields take their defaults when
/// deserialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Used as the log file name.
    pub app_name: String,
    /// Log the SuperCSV crates at debug level, ignoring `RUST_LOG`.
    pub verbose: bool,
    /// Directory for the rolling log file. No file is written when unset.
    pub log_dir: Option<PathBuf>,
}

impl LogConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Self::default()
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }
}

/// Initialize tracing with stderr output and an optional rolling log file.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let env_dir = std::env::var_os(LOG_DIR_ENV);
    let file_layer = match resolve_log_dir(config.log_dir.as_deref(), env_dir) {
        Some(dir) => {
            let file = RollingFile::open(
                &dir,
                &config.app_name,
                Rotation {
                    max_size: MAX_LOG_FILE_SIZE,
                    keep: MAX_LOG_FILES,
                },
            )
            .with_context(|| format!("Failed to open log file in {}", dir.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(SharedRollingFile::new(file))
                    .with_ansi(false)
                    .with_filter(build_filter(config.verbose)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(build_filter(config.verbose)),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

fn build_filter(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new(VERBOSE_LOG_FILTER);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// The environment variable wins over the configured directory. An empty
/// variable counts as unset.
fn resolve_log_dir(configured: Option<&Path>, env: Option<OsString>) -> Option<PathBuf> {
    match env {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => configured.map(Path::to_path_buf),
    }
}
