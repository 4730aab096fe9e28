/// Per-frame uniform block consumed by the vertex shader

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::f32::consts::TAU;

/// Vertical field of view in degrees
pub const FOV_Y_DEGREES: f32 = 60.0;
pub const Z_NEAR: f32 = 1.0;
pub const Z_FAR: f32 = 256.0;
/// Camera distance from the triangle along -Z
pub const CAMERA_DISTANCE: f32 = 2.5;

/// Uniform block layout, matching `layout(binding = 0) uniform UBO` in the
/// vertex shader: three column-major 4x4 float matrices, 192 bytes total
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShaderData {
    pub projection: Mat4,
    pub model: Mat4,
    pub view: Mat4,
}

impl ShaderData {
    /// Matrices for the fixed camera at the given aspect ratio
    pub fn for_aspect(aspect: f32) -> Self {
        Self {
            projection: Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), aspect, Z_NEAR, Z_FAR),
            model: Mat4::IDENTITY,
            view: Mat4::from_translation(Vec3::new(0.0, 0.0, -CAMERA_DISTANCE)),
        }
    }

    /// Fixed camera with the model spun about Z by `turns` full revolutions
    ///
    /// `turns` is the frame timer's animation clock, so `0.0` is the rest pose.
    pub fn animated(aspect: f32, turns: f32) -> Self {
        Self {
            model: Mat4::from_rotation_z(turns * TAU),
            ..Self::for_aspect(aspect)
        }
    }

    /// Byte view for copying into mapped memory
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Full transform applied to a vertex position
    pub fn model_view_projection(&self) -> Mat4 {
        self.projection * self.view * self.model
    }
}

impl Default for ShaderData {
    fn default() -> Self {
        Self::for_aspect(1.0)
    }
}

#[cfg(test)]
#[path = "shader_data_tests.rs"]
mod tests;
