//! Logging setup
//!
//! slop logs through the `log` facade and `env_logger`. Output always goes
//! to stderr because stdout carries the selection. `RUST_LOG` wins over the
//! configured level when it is set.

use env_logger::{Builder, Env, Target};

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Trace level (most verbose)
    Trace = 0,
    /// Debug level
    Debug = 1,
    #[default]
    Info = 2,
    Warn = 3,
    /// Error level (least verbose)
    Error = 4,
}

impl LogLevel {
    /// Filter directive understood by `env_logger`
    pub fn filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Level used when `RUST_LOG` is unset
    pub level: LogLevel,
    /// Prefix records with a timestamp
    pub timestamps: bool,
    /// Prefix records with the emitting module
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            timestamps: false,
            module_path: false,
        }
    }
}

impl LogConfig {
    /// Configuration for `--debug`
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
            timestamps: true,
            module_path: true,
        }
    }
}

/// Builder for the configured logger, not yet installed
pub fn builder(config: &LogConfig) -> Builder {
    let mut builder = Builder::from_env(Env::default().default_filter_or(config.level.filter()));
    builder.target(Target::Stderr);
    builder.format_module_path(config.module_path);
    if !config.timestamps {
        builder.format_timestamp(None);
    }
    builder
}

/// Install the global logger
///
/// Fails if a logger is already installed.
pub fn init(config: &LogConfig) -> Result<(), log::SetLoggerError> {
    builder(config).try_init()
}
