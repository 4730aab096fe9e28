/*!
# Triangle Engine

Core traits and types for the indexed-triangle Vulkan sample.

This crate holds everything that does not touch the GPU API directly: the
frame pacing ring, the per-frame submission protocol, the traits a backend
implements, logging, errors and configuration. The Vulkan backend lives in
`triangle_engine_renderer_vulkan`.

## Architecture

- **PresentationEngine**: image chain negotiation, acquire and present
- **FrameDevice**: fences, semaphores, command buffers and queue submission
- **DrawStrategy**: per-sample resources and draw recording
- **FrameRing**: fixed ring of in-flight frame slots
- **FrameLoop**: the `wait -> acquire -> record -> submit -> present` protocol
*/

// Internal modules
mod error;
mod engine;
mod config;
pub mod log;
pub mod render;
pub mod frame;

// Main triangle namespace module
pub mod triangle {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging front door
    pub use crate::engine::Engine;

    // Configuration
    pub use crate::config::{Config, DebugMessageFilter, DebugOutput, DebugSeverity};

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Backend traits and per-frame data
    pub mod render {
        pub use crate::render::{
            AcquireOutcome, DeviceFrameContext, DeviceSlot, DrawStrategy, Extent2D, FrameContext,
            FrameDevice, FrameSlot, PresentOutcome, PresentationEngine, ShaderData, Vertex,
            TRIANGLE_INDICES, TRIANGLE_VERTICES,
        };
    }

    // Frame pacing
    pub mod frame {
        pub use crate::frame::*;
    }
}

// Re-export math library at crate root
pub use glam;
