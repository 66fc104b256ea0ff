//! Logging setup for tapi.
//!
//! Library code only emits `tracing` events: cache hits and stores at
//! `debug`, malformed entities at `warn`. The binary installs a subscriber
//! here; `RUST_LOG` overrides the configured level.
//!
//! ```rust
//! use tapi::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::default());
//! tracing::debug!("Rendering");
//! ```

use tracing::Level;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Logging configuration.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct LogConfig {
    /// Minimum log level to display.
    pub level: LogLevel,
    /// Output format for log messages.
    pub format: LogFormat,
    /// Include timestamps in log output.
    pub timestamps: bool,
    /// Include target (module path) in log output.
    pub target: bool,
    /// Include span events (enter/exit).
    pub spans: bool,
    /// Enable ANSI colors in output.
    pub colors: bool,
}

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Errors, warnings, and info messages.
    Info,
    /// All of the above plus debug messages.
    Debug,
    /// Everything including trace messages.
    Trace,
    /// No logging at all.
    Off,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors.
    Pretty,
    /// Compact single-line format.
    Compact,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            timestamps: true,
            target: false,
            spans: false,
            colors: true,
        }
    }
}

impl LogConfig {
    /// Create a config for quiet mode (errors only).
    #[must_use]
    pub const fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            format: LogFormat::Compact,
            timestamps: false,
            target: false,
            spans: false,
            colors: true,
        }
    }

    /// Create a config for verbose mode (debug level).
    #[must_use]
    pub const fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            timestamps: true,
            target: true,
            spans: false,
            colors: true,
        }
    }

    /// Create a config for trace mode (maximum verbosity).
    #[must_use]
    pub const fn trace() -> Self {
        Self {
            level: LogLevel::Trace,
            format: LogFormat::Pretty,
            timestamps: true,
            target: true,
            spans: true,
            colors: true,
        }
    }
}

impl LogLevel {
    /// The matching `tracing` level, `None` for [`LogLevel::Off`].
    #[must_use]
    pub const fn to_tracing_level(self) -> Option<Level> {
        match self {
            Self::Error => Some(Level::ERROR),
            Self::Warn => Some(Level::WARN),
            Self::Info => Some(Level::INFO),
            Self::Debug => Some(Level::DEBUG),
            Self::Trace => Some(Level::TRACE),
            Self::Off => None,
        }
    }

    /// Convert to env filter directive string.
    const fn to_filter_string(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
            Self::Off => "off",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" | "e" => Ok(Self::Error),
            "warn" | "warning" | "w" => Ok(Self::Warn),
            "info" | "i" => Ok(Self::Info),
            "debug" | "d" => Ok(Self::Debug),
            "trace" | "t" => Ok(Self::Trace),
            "off" | "none" | "quiet" => Ok(Self::Off),
            _ => Err(format!("Invalid log level: {s}")),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "p" => Ok(Self::Pretty),
            "compact" | "c" => Ok(Self::Compact),
            _ => Err(format!("Invalid log format: {s}")),
        }
    }
}

/// Install the global subscriber. Events go to stderr so that rendered
/// output on stdout stays clean.
///
/// Only the first call has an effect.
pub fn init_logging(config: &LogConfig) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(format!("tapi={}", config.level.to_filter_string()))
    };

    let span_events = if config.spans {
        FmtSpan::ENTER | FmtSpan::EXIT
    } else {
        FmtSpan::NONE
    };

    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.colors)
        .with_target(config.target)
        .with_span_events(span_events);
    let layer = match (config.format, config.timestamps) {
        (LogFormat::Pretty, true) => base.pretty().boxed(),
        (LogFormat::Pretty, false) => base.pretty().without_time().boxed(),
        (LogFormat::Compact, true) => base.compact().boxed(),
        (LogFormat::Compact, false) => base.compact().without_time().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .try_init()
        .ok();
}

/// Initialize logging for tests (quiet by default).
pub fn init_test_logging() {
    let config = LogConfig {
        level: LogLevel::Off,
        ..Default::default()
    };
    init_logging(&config);
}

/// CLI logging: warnings by default, `-v` for debug, `-vv` for trace.
pub fn init_cli_logging(quiet: bool, verbose: u8, colors: bool) {
    let mut config = match (quiet, verbose) {
        (true, _) => LogConfig::quiet(),
        (false, 0) => LogConfig {
            level: LogLevel::Warn,
            timestamps: false,
            ..LogConfig::default()
        },
        (false, 1) => LogConfig::verbose(),
        _ => LogConfig::trace(),
    };
    config.colors = colors;
    init_logging(&config);
}
