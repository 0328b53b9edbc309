//! Built-in frames: an orange triangle and a rotated blue square.

use crate::frame::FrameDesc;
use crate::math::rotate_z;
use crate::pipeline::Topology;
use crate::resource::{UniformData, VertexData};

pub const TRIANGLE_WGSL: &str = include_str!("shaders/triangle.wgsl");
pub const ROTATE_WGSL: &str = include_str!("shaders/rotate.wgsl");

/// Apex-up triangle in normalized device coordinates.
pub const TRIANGLE_VERTICES: [[f32; 2]; 3] = [[0.0, 0.5], [-0.5, -0.5], [0.5, -0.5]];

/// Unit square centered on the origin, in strip order:
/// bottom-left, bottom-right, top-left, top-right.
pub const SQUARE_VERTICES: [[f32; 2]; 4] = [[-0.5, -0.5], [0.5, -0.5], [-0.5, 0.5], [0.5, 0.5]];

/// Orange triangle on the default light gray clear color.
pub fn orange_triangle() -> FrameDesc {
    FrameDesc::new(
        "orange triangle",
        TRIANGLE_WGSL,
        VertexData::positions2d(&TRIANGLE_VERTICES),
    )
}

/// Blue square rotated counter-clockwise by `degrees` about the origin.
pub fn rotated_square(degrees: f32) -> FrameDesc {
    FrameDesc::new(
        "rotated square",
        ROTATE_WGSL,
        VertexData::positions2d(&SQUARE_VERTICES),
    )
    .with_topology(Topology::TriangleStrip)
    .with_uniform(UniformData::from_mat4(&rotate_z(degrees.to_radians())))
}
