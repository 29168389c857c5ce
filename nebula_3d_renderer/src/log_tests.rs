//! Unit tests for log.rs
//!
//! Tests Logger trait, LogEntry, LogSeverity, and the capture of
//! macro-dispatched entries through a custom logger.

use crate::log::{dispatch, dispatch_detailed, LogEntry, LogSeverity, Logger};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_equality() {
    assert_eq!(LogSeverity::Info, LogSeverity::Info);
    assert_ne!(LogSeverity::Trace, LogSeverity::Debug);
    assert_ne!(LogSeverity::Info, LogSeverity::Error);
}

#[test]
fn test_log_severity_copy() {
    let sev1 = LogSeverity::Info;
    let sev2 = sev1; // Copy, not move
    assert_eq!(sev1, sev2);
    assert_eq!(sev1, LogSeverity::Info);
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_creation_without_file_line() {
    let entry = LogEntry {
        severity: LogSeverity::Info,
        timestamp: SystemTime::now(),
        source: "nebula3d::vulkan".to_string(),
        message: "Renderer initialized".to_string(),
        file: None,
        line: None,
    };

    assert_eq!(entry.severity, LogSeverity::Info);
    assert_eq!(entry.source, "nebula3d::vulkan");
    assert_eq!(entry.message, "Renderer initialized");
    assert!(entry.file.is_none());
    assert!(entry.line.is_none());
}

#[test]
fn test_log_entry_creation_with_file_line() {
    let entry = LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "nebula3d::vulkan".to_string(),
        message: "Queue submit failed".to_string(),
        file: Some("vulkan_renderer.rs"),
        line: Some(42),
    };

    assert_eq!(entry.file, Some("vulkan_renderer.rs"));
    assert_eq!(entry.line, Some(42));
}

#[test]
fn test_log_entry_clone() {
    let entry = LogEntry {
        severity: LogSeverity::Warn,
        timestamp: SystemTime::now(),
        source: "nebula3d::asset".to_string(),
        message: "Texture unavailable".to_string(),
        file: None,
        line: None,
    };
    let cloned = entry.clone();
    assert_eq!(cloned.severity, entry.severity);
    assert_eq!(cloned.source, entry.source);
    assert_eq!(cloned.message, entry.message);
}

// ============================================================================
// CUSTOM LOGGER CAPTURE
// ============================================================================

/// Logger that records entries into a shared buffer.
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

#[test]
fn test_custom_logger_receives_dispatched_entries() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    crate::log::set_logger(CaptureLogger {
        entries: entries.clone(),
    });

    dispatch(LogSeverity::Info, "nebula3d::test", "hello".to_string());
    dispatch_detailed(
        LogSeverity::Error,
        "nebula3d::test",
        "boom".to_string(),
        "log_tests.rs",
        7,
    );

    {
        // Other tests may log concurrently; only look at our own source.
        let captured = entries.lock().unwrap();
        let ours: Vec<_> = captured.iter().filter(|e| e.source == "nebula3d::test").collect();
        assert_eq!(ours.len(), 2);
        assert_eq!(ours[0].severity, LogSeverity::Info);
        assert_eq!(ours[0].message, "hello");
        assert!(ours[0].file.is_none());
        assert_eq!(ours[1].severity, LogSeverity::Error);
        assert_eq!(ours[1].file, Some("log_tests.rs"));
        assert_eq!(ours[1].line, Some(7));
    }

    // Restore the console logger for other tests in this binary.
    crate::log::reset_logger();
}
