//! Invader Logging
//!
//! Structured logging shared by the payment services. Every crate of the
//! workspace logs through these macros so one set of environment variables
//! controls the whole process.
//!
//! # Usage
//!
//! ```rust
//! use invader_log::{debug, error, info, warn};
//!
//! info!("payment service mounted on {}", "/payment_pagseguro");
//! warn!(target: "invader::notification", "no transaction for reference {}", "CHAR_1");
//!
//! // Key-value fields follow a `;`
//! let tx_id = 42;
//! info!("charge created"; "transaction" => tx_id, "provider" => "pagseguro");
//! ```
//!
//! Values of fields that carry credentials or customer documents (`token`,
//! `card`, `vat`, ...) are masked before they reach the output.
//!
//! # Environment Variables
//!
//! - `INVADER_DEBUG=1` - Enable debug logging
//! - `INVADER_LOG_LEVEL=trace|debug|info|warn|error|off` - Minimum level
//! - `INVADER_LOG_DEPS=...` - Minimum level for records of dependencies
//!   forwarded through the `log` bridge (`warn` by default)
//! - `INVADER_LOG_FORMAT=pretty|json` - Output format (json by default)
//! - `INVADER_LOG_TIMESTAMPS=0` - Drop timestamps from pretty lines

use once_cell::sync::Lazy;
use std::env;
use std::io::Write;
use std::sync::atomic::{AtomicU8, Ordering};

// ============================================================================
// Log Levels
// ============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    /// Nothing is written.
    Off = 5,
}

impl Level {
    /// Parse a level name, case-insensitive.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Trace => Level::Trace,
            log::Level::Debug => Level::Debug,
            log::Level::Info => Level::Info,
            log::Level::Warn => Level::Warn,
            log::Level::Error => Level::Error,
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `2024-05-02 12:00:00.000 INFO  [target] message key=value`
    Pretty,
    /// One JSON object per line, fields nested under `fields`
    Json,
}

impl Format {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Global Configuration
// ============================================================================

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Field keys whose values never reach the output in clear.
pub const MASKED_FIELDS: &[&str] = &[
    "token",
    "access_token",
    "client_secret",
    "authorization",
    "card",
    "vat",
    "cpf",
    "cnpj",
];

/// Logging configuration read once from the environment.
#[derive(Debug)]
pub struct LogConfig {
    pub level: Level,
    /// Floor for records forwarded from other crates
    pub dependency_level: Level,
    pub format: Format,
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            dependency_level: Level::Warn,
            format: Format::Json,
            timestamps: true,
        }
    }
}

fn flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn level_var(name: &str) -> Option<Level> {
    env::var(name).ok().and_then(|s| Level::from_name(&s))
}

impl LogConfig {
    /// Build the configuration from `INVADER_*` variables and publish the
    /// level used by the macros.
    pub fn from_env() -> Self {
        let debug = flag("INVADER_DEBUG").unwrap_or(false);
        let level = level_var("INVADER_LOG_LEVEL").unwrap_or(if debug {
            Level::Debug
        } else {
            Level::Info
        });

        let config = Self {
            level,
            dependency_level: level_var("INVADER_LOG_DEPS").unwrap_or(Level::Warn).max(level),
            format: env::var("INVADER_LOG_FORMAT")
                .ok()
                .and_then(|s| Format::from_name(&s))
                .unwrap_or(Format::Json),
            timestamps: flag("INVADER_LOG_TIMESTAMPS").unwrap_or(true),
        };
        LOG_LEVEL.store(level as u8, Ordering::SeqCst);
        config
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Read the environment eagerly instead of on the first log call.
pub fn init() {
    Lazy::force(&CONFIG);
}

#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    level != Level::Off && level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

pub fn config() -> &'static LogConfig {
    &CONFIG
}

// ============================================================================
// Log Output
// ============================================================================

#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    log_with_fields(level, target, message, &[]);
}

#[doc(hidden)]
pub fn log_with_fields(level: Level, target: &str, message: &str, fields: &[(&str, String)]) {
    if !is_level_enabled(level) {
        return;
    }

    let config = config();
    let fields: Vec<(&str, String)> = fields
        .iter()
        .map(|(key, value)| (*key, mask(key, value)))
        .collect();
    let line = match config.format {
        Format::Pretty => render_pretty(level, target, message, &fields, config.timestamps),
        Format::Json => render_json(level, target, message, &fields),
    };

    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}", line);
}

/// Keep the last four characters of sensitive values
fn mask(key: &str, value: &str) -> String {
    if !MASKED_FIELDS.iter().any(|masked| key.eq_ignore_ascii_case(masked)) {
        return value.to_string();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

fn render_pretty(
    level: Level,
    target: &str,
    message: &str,
    fields: &[(&str, String)],
    timestamps: bool,
) -> String {
    let mut line = String::new();
    if timestamps {
        line.push_str(&chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f ").to_string());
    }
    line.push_str(&format!("{:5} ", level.as_str()));
    if !target.is_empty() {
        line.push_str(&format!("[{}] ", target));
    }
    line.push_str(message);
    for (key, value) in fields {
        line.push_str(&format!(" {}={}", key, value));
    }
    line
}

fn render_json(level: Level, target: &str, message: &str, fields: &[(&str, String)]) -> String {
    let mut entry = serde_json::Map::new();
    entry.insert(
        "timestamp".to_string(),
        chrono::Utc::now().to_rfc3339().into(),
    );
    entry.insert("level".to_string(), level.as_str().into());
    entry.insert("target".to_string(), target.into());
    entry.insert("message".to_string(), message.into());

    if !fields.is_empty() {
        let fields: serde_json::Map<String, serde_json::Value> = fields
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone().into()))
            .collect();
        entry.insert("fields".to_string(), fields.into());
    }

    serde_json::Value::Object(entry).to_string()
}

// ============================================================================
// `log` crate bridge
// ============================================================================

struct LogBridge;

impl LogBridge {
    fn accepts(target: &str, level: Level) -> bool {
        if target.starts_with("invader") {
            is_level_enabled(level)
        } else {
            level >= config().dependency_level && is_level_enabled(level)
        }
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        Self::accepts(metadata.target(), metadata.level().into())
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            log(record.level().into(), record.target(), &record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static LOG_BRIDGE: LogBridge = LogBridge;

/// Forward records emitted through the `log` facade (reqwest, hyper-util)
/// to this logger. Returns false when another logger was already installed.
pub fn install_log_bridge() -> bool {
    init();
    match log::set_logger(&LOG_BRIDGE) {
        Ok(()) => {
            log::set_max_level(log::LevelFilter::Trace);
            true
        }
        Err(_) => false,
    }
}

// ============================================================================
// Macros
// ============================================================================

#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($level:expr, $target:expr, $fmt:literal $(, $arg:expr)* ; $($key:literal => $value:expr),+ $(,)?) => {
        if $crate::is_level_enabled($level) {
            $crate::log_with_fields(
                $level,
                $target,
                &format!($fmt $(, $arg)*),
                &[$(($key, ($value).to_string())),+],
            );
        }
    };
    ($level:expr, $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($level) {
            $crate::log($level, $target, &format!($($arg)+));
        }
    };
}

/// Log a trace message.
#[macro_export]
macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::__log!($crate::Level::Trace, $target, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Trace, module_path!(), $($arg)+)
    };
}

/// Log a debug message.
#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::__log!($crate::Level::Debug, $target, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Debug, module_path!(), $($arg)+)
    };
}

/// Log an info message.
#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::__log!($crate::Level::Info, $target, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Info, module_path!(), $($arg)+)
    };
}

/// Log a warning.
#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::__log!($crate::Level::Warn, $target, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Warn, module_path!(), $($arg)+)
    };
}

/// Log an error.
#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => {
        $crate::__log!($crate::Level::Error, $target, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__log!($crate::Level::Error, module_path!(), $($arg)+)
    };
}
