//! Application configuration
//!
//! [`Config`] gathers everything the sample can be told from the command
//! line: window size, presentation mode, validation layers, GPU selection
//! and where compiled shaders live.

use std::path::PathBuf;
use crate::error::{Error, Result};
use crate::log::LogSeverity;

/// Debug message severity filter for validation layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Only errors
    ErrorsOnly,
    /// Errors and warnings
    ErrorsAndWarnings,
    /// Everything, including info and verbose messages
    All,
}

/// Where validation messages are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    /// Colored console output (stderr)
    Console,
    /// Plain text appended to a file
    File(PathBuf),
    /// Both console and file
    Both(PathBuf),
}

/// Category filter for validation messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugMessageFilter {
    pub show_general: bool,
    pub show_validation: bool,
    pub show_performance: bool,
}

impl Default for DebugMessageFilter {
    fn default() -> Self {
        Self {
            show_general: true,
            show_validation: true,
            show_performance: true,
        }
    }
}

/// Sample configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Window title (the frame rate is appended at runtime)
    pub title: String,
    /// Requested window width in pixels
    pub width: u32,
    /// Requested window height in pixels
    pub height: u32,
    /// Force FIFO presentation
    pub vsync: bool,
    /// Start in borderless fullscreen
    pub fullscreen: bool,
    /// Enable VK_LAYER_KHRONOS_validation and the debug messenger
    pub enable_validation: bool,
    /// Validation severity filter
    pub debug_severity: DebugSeverity,
    /// Validation message destination
    pub debug_output: DebugOutput,
    /// Validation category filter
    pub message_filter: DebugMessageFilter,
    /// Count validation messages and print a report at shutdown
    pub enable_validation_stats: bool,
    /// Index into the enumerated physical devices
    pub gpu_index: usize,
    /// Directory holding `triangle.vert.spv` and `triangle.frag.spv`
    pub shader_dir: PathBuf,
    /// Stop after this many presented frames (benchmark-style runs)
    pub max_frames: Option<u64>,
    /// Minimum severity for engine logs
    pub log_severity: LogSeverity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Vulkan Example - Basic indexed triangle".to_string(),
            width: 1280,
            height: 720,
            vsync: false,
            fullscreen: false,
            enable_validation: false,
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            message_filter: DebugMessageFilter::default(),
            enable_validation_stats: true,
            gpu_index: 0,
            shader_dir: PathBuf::from("shaders"),
            max_frames: None,
            log_severity: LogSeverity::Info,
        }
    }
}

impl Config {
    /// Reject configurations the sample cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InitializationFailed(format!(
                "Window size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.max_frames == Some(0) {
            return Err(Error::InitializationFailed(
                "Frame limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
