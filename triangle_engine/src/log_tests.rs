//! Unit tests for log.rs
//!
//! Tests LogSeverity, LogEntry, DefaultLogger and the logging macros.

use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
use std::time::SystemTime;

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "triangle::vulkan".to_string(),
        message: "vkQueueSubmit failed".to_string(),
        file,
        line,
    }
}

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
fn test_log_severity_numeric_order_matches_ord() {
    let all = [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ];
    for pair in all.windows(2) {
        assert!(pair[0].as_u8() < pair[1].as_u8());
    }
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_format_plain_without_file_line() {
    let text = DefaultLogger::format_plain(&entry(LogSeverity::Info, None, None));
    assert!(text.contains("[INFO ]"));
    assert!(text.contains("[triangle::vulkan]"));
    assert!(text.ends_with("vkQueueSubmit failed"));
}

#[test]
fn test_format_plain_with_file_line() {
    let text = DefaultLogger::format_plain(&entry(LogSeverity::Error, Some("vulkan_context.rs"), Some(42)));
    assert!(text.contains("[ERROR]"));
    assert!(text.ends_with("(vulkan_context.rs:42)"));
}

#[test]
fn test_format_plain_ignores_partial_location() {
    let text = DefaultLogger::format_plain(&entry(LogSeverity::Warn, Some("x.rs"), None));
    assert!(!text.contains("x.rs"));
}

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger;
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
    ] {
        logger.log(&entry(severity, None, None));
    }
    logger.log(&entry(LogSeverity::Error, Some("test.rs"), Some(1)));
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
}

// ============================================================================
// MACRO TESTS
// ============================================================================

#[test]
fn test_engine_err_builds_invalid_state() {
    let err = crate::engine_err!("triangle::test", "slot {} out of range", 7);
    assert_eq!(err, crate::error::Error::InvalidState("slot 7 out of range".to_string()));
}

#[test]
fn test_engine_bail_returns_early() {
    fn guarded(value: u32) -> crate::error::Result<u32> {
        if value == 0 {
            crate::engine_bail!("triangle::test", "value must be non-zero");
        }
        Ok(value * 2)
    }

    assert_eq!(guarded(3), Ok(6));
    assert!(matches!(guarded(0), Err(crate::error::Error::InvalidState(_))));
}
