use std::fmt::Debug;

use crate::error::Result;
use crate::pipeline::{BindGroupLayoutDesc, Topology};
use crate::record::RecordedPass;
use crate::resource::VertexLayout;

/// Parameters of a raw buffer allocation.
#[derive(Debug, Copy, Clone)]
pub struct BufferDescriptor<'a> {
    pub label: &'a str,
    pub size: u64,
    pub usage: wgpu::BufferUsages,
}

/// Fully validated inputs of a render pipeline.
///
/// By the time a backend sees this, the shader has been compiled and its
/// interface checked against `vertex_layout` and `target_format`.
#[derive(Debug, Copy, Clone)]
pub struct PipelineDescriptor<'a> {
    pub label: &'a str,
    pub shader_source: &'a str,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    pub vertex_layout: &'a VertexLayout,
    pub topology: Topology,
    pub target_format: wgpu::TextureFormat,
}

/// Graphics device capability consumed by the frame core.
///
/// The core never touches global GPU state; everything it allocates or
/// submits goes through an implementation of this trait passed in by the
/// caller. Implementations may assume their inputs were validated, but a
/// device that still refuses a call reports it as an error instead of
/// panicking.
pub trait Device: Debug {
    type Buffer: Clone + Debug;
    type Pipeline: Clone + Debug;
    type BindGroupLayout: Clone + Debug;
    type BindGroup: Clone + Debug;
    type View: Clone + Debug;
    type CommandBuffer;

    /// Limits the core validates allocations and bindings against.
    fn limits(&self) -> wgpu::Limits;

    fn create_buffer(&self, desc: &BufferDescriptor<'_>) -> Result<Self::Buffer>;

    /// Enqueues a host-to-device copy. Ordered before any later `submit`.
    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, data: &[u8]) -> Result<()>;

    /// Copies the whole buffer back to the host, blocking until done.
    fn read_buffer(&self, buffer: &Self::Buffer) -> Result<Vec<u8>>;

    /// Creates the device-side layout of one bind group.
    ///
    /// Equal descriptions must give layouts that are interchangeable between
    /// pipelines.
    fn create_bind_group_layout(
        &self,
        desc: &BindGroupLayoutDesc,
    ) -> Result<Self::BindGroupLayout>;

    /// Creates a pipeline over explicit bind group layouts, keyed by group
    /// index. Groups below the highest index that are not listed are empty.
    fn create_render_pipeline(
        &self,
        desc: &PipelineDescriptor<'_>,
        bind_group_layouts: &[(u32, &Self::BindGroupLayout)],
    ) -> Result<Self::Pipeline>;

    fn create_bind_group(
        &self,
        label: &str,
        layout: &Self::BindGroupLayout,
        entries: &[(u32, &Self::Buffer)],
    ) -> Result<Self::BindGroup>;

    /// Encodes a finished recording into a device command buffer.
    fn encode(&self, pass: &RecordedPass<'_, Self>) -> Result<Self::CommandBuffer>
    where
        Self: Sized;

    /// Hands encoded commands to the execution queue. Does not wait for completion.
    fn submit(&self, commands: Self::CommandBuffer) -> Result<()>;
}

/// Presentation capability: where a frame is drawn and in which format.
pub trait Surface<D: Device> {
    fn format(&self) -> wgpu::TextureFormat;

    /// Returns a view of the current render target.
    ///
    /// Failing here aborts the frame before any resource is allocated.
    fn current_view(&self) -> Result<D::View>;
}
