/// Triangle geometry uploaded once at prepare time

use bytemuck::{Pod, Zeroable};

/// Interleaved vertex: position at location 0, color at location 1
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    /// Byte offset of `color` inside the vertex
    pub const COLOR_OFFSET: u32 = 12;
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;
}

pub const TRIANGLE_VERTICES: [Vertex; 3] = [
    Vertex { position: [1.0, 1.0, 0.0], color: [1.0, 0.0, 0.0] },
    Vertex { position: [-1.0, 1.0, 0.0], color: [0.0, 1.0, 0.0] },
    Vertex { position: [0.0, -1.0, 0.0], color: [0.0, 0.0, 1.0] },
];

pub const TRIANGLE_INDICES: [u32; 3] = [0, 1, 2];
