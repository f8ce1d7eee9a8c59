use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use eyre::eyre;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// `detail` also keeps the storage engine's own trace output.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Detail,
}

impl LogLevel {
    pub fn level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace | LogLevel::Detail => LevelFilter::TRACE,
        }
    }
}

impl FromStr for LogLevel {
    type Err = eyre::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = s.to_ascii_lowercase();
        parse_level(&level).ok_or_else(|| eyre!("Invalid log level: {}", s))
    }
}

fn parse_level(s: &str) -> Option<LogLevel> {
    [
        ("off", LogLevel::Off),
        ("error", LogLevel::Error),
        ("warn", LogLevel::Warn),
        ("info", LogLevel::Info),
        ("debug", LogLevel::Debug),
        ("trace", LogLevel::Trace),
        ("detail", LogLevel::Detail),
    ]
    .into_iter()
    .find(|(name, _)| *name == s)
    .map(|(_, level)| level)
}

/// sqlparser, sled and gluesql are capped at info unless `detail` is asked for
fn build_env_filter(log_level: LogLevel) -> eyre::Result<EnvFilter> {
    let mut filter = EnvFilter::from_default_env().add_directive(log_level.level_filter().into());
    if log_level != LogLevel::Detail {
        for target in ["sqlparser", "sled", "gluesql_core"] {
            filter = filter.add_directive(format!("{target}=info").parse()?);
        }
    }
    Ok(filter)
}

/// Installs the global tracing subscriber and routes panics to it. `off` installs nothing.
pub fn setup_logs(log_level: LogLevel) -> eyre::Result<()> {
    if log_level == LogLevel::Off {
        return Ok(());
    }
    tracing_subscriber::fmt()
        .with_thread_names(true)
        .with_line_number(true)
        .with_env_filter(build_env_filter(log_level)?)
        .try_init()
        .map_err(|e| eyre!("failed setting up logs: {e}"))?;
    log_panics::init();
    Ok(())
}

/// Creates and removes a probe file, the only reliable check of write access.
pub fn can_create_file_in_directory(directory: &Path) -> bool {
    let probe = directory.join(".write_probe");
    if File::create(&probe).is_err() {
        return false;
    }
    if let Err(err) = std::fs::remove_file(&probe) {
        tracing::warn!("Could not remove {}: {err}", probe.display());
    }
    true
}
