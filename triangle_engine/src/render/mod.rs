/// Render module - backend-facing traits and per-frame data

pub mod presentation;
pub mod frame_device;
pub mod draw_strategy;
pub mod shader_data;
pub mod geometry;

pub use presentation::*;
pub use frame_device::*;
pub use draw_strategy::*;
pub use shader_data::*;
pub use geometry::*;

// Mock backend for tests (no GPU required)
#[cfg(test)]
pub mod mock_backend;
