//! Internal logging system for the Nebula3D renderer
//!
//! This module provides a flexible logging system with:
//! - Customizable logger via the Logger trait
//! - Severity levels (Trace, Debug, Info, Warn, Error)
//! - Colored console output by default
//! - Thread-safe logging with RwLock
//! - File and line information for detailed ERROR logs
//!
//! There is no engine singleton behind this: the global logger slot lives
//! here, and everything else in the renderer receives its dependencies by
//! construction.

use chrono::{DateTime, Local};
use colored::*;
use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;

/// Logger trait for custom logging implementations
///
/// Implement this trait to create custom loggers (file logging, test capture, etc.)
///
/// # Example
///
/// ```no_run
/// use nebula_3d_renderer::nebula3d::log::{Logger, LogEntry};
///
/// struct FileLogger {
///     file: std::fs::File,
/// }
///
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Log an entry
    fn log(&self, entry: &LogEntry);
}

/// Log entry containing all information about a log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level (Trace, Debug, Info, Warn, Error)
    pub severity: LogSeverity,

    /// Timestamp when the log was created
    pub timestamp: SystemTime,

    /// Source module (e.g., "nebula3d::vulkan", "nebula3d::asset")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (only for detailed ERROR logs)
    pub file: Option<&'static str>,

    /// Source line (only for detailed ERROR logs)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Very verbose debug information (typically disabled in release)
    Trace,

    /// Development/debugging information
    Debug,

    /// Important informational messages
    Info,

    /// Warning messages (potential issues)
    Warn,

    /// Error messages (critical issues with file:line details)
    Error,
}

/// Default logger implementation using colored console output
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
pub struct DefaultLogger;

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        // Format timestamp as YYYY-MM-DD HH:MM:SS.mmm
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        // Color severity string
        let severity_str = match entry.severity {
            LogSeverity::Trace => "TRACE".bright_black(),
            LogSeverity::Debug => "DEBUG".cyan(),
            LogSeverity::Info => "INFO ".green(),
            LogSeverity::Warn => "WARN ".yellow(),
            LogSeverity::Error => "ERROR".red().bold(),
        };

        // Color source
        let source = entry.source.bright_blue();

        // Print with or without file:line
        if let (Some(file), Some(line)) = (entry.file, entry.line) {
            println!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, severity_str, source, entry.message, file, line
            );
        } else {
            println!("[{}] [{}] [{}] {}", timestamp, severity_str, source, entry.message);
        }
    }
}

// ===== GLOBAL LOGGER SLOT =====

/// Global logger (initialized with DefaultLogger on first use)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

fn logger_slot() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

/// Set a custom logger
///
/// Replace the default logger with a custom implementation.
pub fn set_logger<L: Logger + 'static>(logger: L) {
    if let Ok(mut lock) = logger_slot().write() {
        *lock = Box::new(logger);
    }
}

/// Reset logger to default (DefaultLogger)
pub fn reset_logger() {
    if let Ok(mut lock) = logger_slot().write() {
        *lock = Box::new(DefaultLogger);
    }
}

/// Dispatch a simple log entry (no file:line). Used by the nebula_* macros.
pub fn dispatch(severity: LogSeverity, source: &str, message: String) {
    if let Ok(lock) = logger_slot().read() {
        lock.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: None,
            line: None,
        });
    }
}

/// Dispatch a log entry with file:line information (for ERROR logs).
pub fn dispatch_detailed(
    severity: LogSeverity,
    source: &str,
    message: String,
    file: &'static str,
    line: u32,
) {
    if let Ok(lock) = logger_slot().read() {
        lock.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: Some(file),
            line: Some(line),
        });
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message (very verbose, typically disabled)
#[macro_export]
macro_rules! nebula_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::dispatch(
            $crate::nebula3d::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message (development information)
#[macro_export]
macro_rules! nebula_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::dispatch(
            $crate::nebula3d::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message (important events)
#[macro_export]
macro_rules! nebula_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::dispatch(
            $crate::nebula3d::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message (potential issues)
#[macro_export]
macro_rules! nebula_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::dispatch(
            $crate::nebula3d::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! nebula_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::dispatch_detailed(
            $crate::nebula3d::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an ERROR and construct a `BackendError` from the same message.
///
/// # Example
///
/// ```ignore
/// device.wait_idle().map_err(|e| nebula_err!("nebula3d::vulkan", "wait idle failed: {:?}", e))?;
/// ```
#[macro_export]
macro_rules! nebula_err {
    ($source:expr, $($arg:tt)*) => {{
        $crate::nebula_error!($source, $($arg)*);
        $crate::nebula3d::Error::BackendError(format!($($arg)*))
    }};
}

/// Log an ERROR and return early with a `BackendError`.
#[macro_export]
macro_rules! nebula_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::nebula_err!($source, $($arg)*))
    };
}
