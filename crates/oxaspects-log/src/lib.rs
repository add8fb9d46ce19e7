//! A minimal, zero-dependency logging crate for the `OxAspects` workspace.
//!
//! Messages carry the module path of the call site and are written to stderr
//! with a colored level tag. The global level is an atomic, so changing it is
//! safe from any thread, including from inside advice callbacks.
//!
//! # Configuration
//!
//! The level defaults to [`Level::Warn`]. It can be set programmatically with
//! [`set_level`] or read once from the environment with [`init_from_env`],
//! which consults the [`ENV_VAR`] variable (`OXASPECTS_LOG=debug`).
//!
//! # Example
//!
//! ```
//! use oxaspects_log::{debug, info, Level};
//!
//! oxaspects_log::set_level(Level::Debug);
//!
//! let selector = "greet";
//! info!("installed trampoline for {}", selector);
//! debug!("chain sizes: {:?}", (1, 0, 2));
//! ```

use std::fmt::{self, Arguments};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Name of the environment variable read by [`init_from_env`].
pub const ENV_VAR: &str = "OXASPECTS_LOG";

/// Severity of a log message.
///
/// Lower numeric values are more severe. `Off` disables all output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Logging disabled.
    Off = 0,
    /// Failures the caller must know about.
    Error = 1,
    /// Rejected requests and suspicious states.
    Warn = 2,
    /// Lifecycle events.
    Info = 3,
    /// Installation and teardown details.
    Debug = 4,
    /// Per-call tracing.
    Trace = 5,
}

impl Level {
    const fn color_code(self) -> &'static str {
        match self {
            Level::Off => "",
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    /// Returns the upper-case tag printed for this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Off => "OFF",
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Off,
            1 => Level::Error,
            2 => Level::Warn,
            3 => Level::Info,
            4 => Level::Debug,
            _ => Level::Trace,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a level name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(String);

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid log level: {}", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Parses a level name, ignoring ASCII case.
    ///
    /// ```
    /// use oxaspects_log::Level;
    ///
    /// assert_eq!("debug".parse::<Level>(), Ok(Level::Debug));
    /// assert!("loud".parse::<Level>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Level::Off),
            "error" => Ok(Level::Error),
            "warn" | "warning" => Ok(Level::Warn),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            "trace" => Ok(Level::Trace),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Global logger state.
pub struct Logger {
    level: AtomicU8,
    color: AtomicBool,
}

impl Logger {
    const fn new(level: Level) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
            color: AtomicBool::new(true),
        }
    }

    /// Sets the most verbose level that is still printed.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Returns the current level.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Enables or disables ANSI colors in the level tag.
    pub fn set_color(&self, enabled: bool) {
        self.color.store(enabled, Ordering::Relaxed);
    }

    /// Returns `true` if a message at `level` would be printed.
    pub fn enabled(&self, level: Level) -> bool {
        level != Level::Off && level as u8 <= self.level.load(Ordering::Relaxed)
    }
}

static LOGGER: Logger = Logger::new(Level::Warn);

/// Returns the process-wide logger.
pub fn get_logger() -> &'static Logger {
    &LOGGER
}

/// Sets the global level.
pub fn set_level(level: Level) {
    LOGGER.set_level(level);
}

/// Reads the level from [`ENV_VAR`].
///
/// Leaves the current level untouched and returns `Ok(None)` when the
/// variable is unset.
///
/// # Errors
///
/// Returns [`ParseLevelError`] if the variable holds an unknown level name.
pub fn init_from_env() -> Result<Option<Level>, ParseLevelError> {
    match std::env::var(ENV_VAR) {
        Ok(raw) => {
            let level = raw.parse::<Level>()?;
            set_level(level);
            Ok(Some(level))
        }
        Err(_) => Ok(None),
    }
}

#[doc(hidden)]
pub fn __log_with_target(level: Level, target: &str, args: Arguments<'_>) {
    const RESET: &str = "\x1b[0m";

    if !LOGGER.enabled(level) {
        return;
    }

    if LOGGER.color.load(Ordering::Relaxed) {
        eprintln!("{}[{}]{RESET} {target}: {args}", level.color_code(), level.as_str());
    } else {
        eprintln!("[{}] {target}: {args}", level.as_str());
    }
}

/// Logs at an explicit level.
///
/// ```
/// use oxaspects_log::{log, Level};
///
/// log!(level: Level::Info, "{} records", 3);
/// ```
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {{
        let level = $level;
        if $crate::get_logger().enabled(level) {
            $crate::__log_with_target(level, module_path!(), format_args!($($arg)*));
        }
    }};
}

/// Logs at [`Level::Error`].
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Error, $($arg)*) };
}

/// Logs at [`Level::Warn`].
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Warn, $($arg)*) };
}

/// Logs at [`Level::Info`].
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Info, $($arg)*) };
}

/// Logs at [`Level::Debug`].
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Debug, $($arg)*) };
}

/// Logs at [`Level::Trace`].
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Trace, $($arg)*) };
}
