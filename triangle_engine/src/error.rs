//! Error types for the triangle engine
//!
//! Every fatal condition of the sample funnels into [`Error`]. A stale
//! swapchain is not an error: it is reported as an outcome by the
//! presentation engine and absorbed by the frame loop.

use std::fmt;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The surface cannot produce any usable format or present mode
    ConfigurationError(String),

    /// A GPU API call failed with an unexpected result code
    Backend {
        /// Name of the failing operation (e.g. "vkQueueSubmit")
        operation: String,
        /// Raw numeric result code returned by the driver
        code: i32,
    },

    /// The logical device was lost (hung or removed GPU)
    DeviceLost(String),

    /// Initialization failed (instance, device, surface, resources)
    InitializationFailed(String),

    /// A startup asset (compiled shader) could not be loaded
    AssetLoadFailed(String),

    /// An operation was called in a state that does not allow it
    InvalidState(String),
}

impl Error {
    /// Build a [`Error::Backend`] from an operation name and a raw result code
    pub fn backend(operation: impl Into<String>, code: i32) -> Self {
        Error::Backend {
            operation: operation.into(),
            code,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            Error::Backend { operation, code } => {
                write!(f, "Backend error: {} failed with code {}", operation, code)
            }
            Error::DeviceLost(msg) => write!(f, "Device lost: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::AssetLoadFailed(msg) => write!(f, "Asset load failed: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
