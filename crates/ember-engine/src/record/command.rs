use std::ops::Range;

use crate::device::Device;
use crate::paint::Color;

/// One recorded render pass operation, holding device handles.
#[derive(Debug)]
pub enum Command<D: Device> {
    SetPipeline(D::Pipeline),
    SetVertexBuffer { slot: u32, buffer: D::Buffer },
    SetBindGroup { index: u32, group: D::BindGroup },
    Draw { vertices: Range<u32> },
    /// Terminates the pass. Always the last command of an ended sequence.
    End,
}

/// Borrowed view of an ended sequence, handed to [`Device::encode`].
#[derive(Debug)]
pub struct RecordedPass<'a, D: Device> {
    pub label: &'a str,
    pub view: &'a D::View,
    pub clear: Color,
    pub commands: &'a [Command<D>],
}
