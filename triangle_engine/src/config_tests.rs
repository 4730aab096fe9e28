//! Unit tests for config.rs

use crate::config::{Config, DebugMessageFilter, DebugOutput, DebugSeverity};
use crate::error::Error;
use crate::log::LogSeverity;
use std::path::PathBuf;

#[test]
fn test_default_matches_sample_startup() {
    let config = Config::default();
    assert_eq!(config.width, 1280);
    assert_eq!(config.height, 720);
    assert!(!config.vsync);
    assert!(!config.fullscreen);
    assert!(!config.enable_validation);
    assert_eq!(config.gpu_index, 0);
    assert_eq!(config.shader_dir, PathBuf::from("shaders"));
    assert_eq!(config.max_frames, None);
    assert_eq!(config.log_severity, LogSeverity::Info);
    assert_eq!(config.title, "Vulkan Example - Basic indexed triangle");
}

#[test]
fn test_default_debug_settings() {
    let config = Config::default();
    assert_eq!(config.debug_severity, DebugSeverity::ErrorsAndWarnings);
    assert_eq!(config.debug_output, DebugOutput::Console);
    assert_eq!(config.message_filter, DebugMessageFilter::default());
    assert!(config.enable_validation_stats);
}

#[test]
fn test_message_filter_default_shows_everything() {
    let filter = DebugMessageFilter::default();
    assert!(filter.show_general);
    assert!(filter.show_validation);
    assert!(filter.show_performance);
}

#[test]
fn test_validate_accepts_default() {
    assert!(Config::default().validate().is_ok());
}

#[test]
fn test_validate_rejects_zero_size() {
    let config = Config { width: 0, ..Config::default() };
    assert!(matches!(config.validate(), Err(Error::InitializationFailed(_))));

    let config = Config { height: 0, ..Config::default() };
    assert!(matches!(config.validate(), Err(Error::InitializationFailed(_))));
}

#[test]
fn test_validate_rejects_zero_frame_limit() {
    let config = Config { max_frames: Some(0), ..Config::default() };
    assert!(config.validate().is_err());

    let config = Config { max_frames: Some(1), ..Config::default() };
    assert!(config.validate().is_ok());
}
