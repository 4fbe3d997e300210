//! Structured logging setup.
//!
//! Attack code logs through `tracing` macros with `controller`/`attack`
//! fields. Hosts that already install a subscriber (Bevy's `LogPlugin`) need
//! nothing from here; headless tools call [`init_tracing`] once.
//!
//! Levels are set per layer of the crate: the controller, the combat
//! behaviors, config loading and the balance simulator.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Environment variable that raises or lowers every attack layer at once
pub const ATTACK_LOG_ENV: &str = "ATTACK_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    /// Case-insensitive; accepts `warning` for `warn`
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level `{other}`")),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Subscriber settings. `RUST_LOG` replaces every directive when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Everything outside `attack_core` (Bevy, rayon, ...)
    pub default_level: LogLevel,
    pub controller: LogLevel,
    /// Phase activity of individual attacks; `trace` shows every shot and dash
    pub combat: LogLevel,
    pub config: LogLevel,
    pub balance: LogLevel,
    pub show_targets: bool,
    pub show_file_line: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: LogLevel::Warn,
            controller: LogLevel::Info,
            combat: LogLevel::Info,
            config: LogLevel::Info,
            balance: LogLevel::Info,
            show_targets: true,
            show_file_line: false,
        }
    }
}

impl TracingConfig {
    /// Every attack layer at `level`; the default level is untouched
    pub fn with_attack_level(self, level: LogLevel) -> Self {
        Self {
            controller: level,
            combat: level,
            config: level,
            balance: level,
            ..self
        }
    }

    /// Apply `ATTACK_LOG` if it names a level
    pub fn with_env_override(self) -> Self {
        match std::env::var(ATTACK_LOG_ENV).ok().map(|raw| raw.parse::<LogLevel>()) {
            Some(Ok(level)) => self.with_attack_level(level),
            _ => self,
        }
    }

    fn layers(&self) -> [(&'static str, LogLevel); 4] {
        [
            ("attack_core::controller", self.controller),
            ("attack_core::combat", self.combat),
            ("attack_core::config", self.config),
            ("attack_core::balance", self.balance),
        ]
    }

    /// `EnvFilter` directive string, e.g. `warn,attack_core::controller=info,...`
    pub fn directives(&self) -> String {
        self.layers()
            .iter()
            .fold(self.default_level.as_str().to_string(), |mut acc, (module, level)| {
                acc.push_str(&format!(",{module}={}", level.as_str()));
                acc
            })
    }

    /// Most verbose level any layer will emit
    pub fn max_level(&self) -> LogLevel {
        self.layers()
            .iter()
            .map(|(_, level)| *level)
            .fold(self.default_level, LogLevel::min)
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from(self.default_level).into())
                .parse_lossy(self.directives())
        })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

/// Install a compact fmt subscriber. Returns false when a global subscriber
/// was already set (by an earlier call or by the host); that one stays.
pub fn init_tracing(config: &TracingConfig) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_target(config.show_targets)
        .with_file(config.show_file_line)
        .with_line_number(config.show_file_line)
        .compact()
        .try_init()
        .is_ok()
}

/// Span wrapping one controller's whole session in a headless run
pub fn controller_span(controller: &str) -> tracing::Span {
    tracing::info_span!("controller", name = %controller)
}
