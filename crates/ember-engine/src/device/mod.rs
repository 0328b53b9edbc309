//! Device and surface capabilities.
//!
//! This module is responsible for:
//! - the [`Device`]/[`Surface`] traits consumed by the frame core
//! - the wgpu backend (headless and windowed acquisition, offscreen targets)
//! - the trace backend used for dry runs

mod backend;
mod capability;
mod error;
mod frame;
mod gpu;
mod init;
mod offscreen;
mod surface;
mod trace;

pub use backend::WgpuDevice;
pub use capability::{BufferDescriptor, Device, PipelineDescriptor, Surface};
pub use error::SurfaceErrorAction;
pub use frame::AcquiredFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
pub use offscreen::{OffscreenTarget, PixelSnapshot};
pub use trace::{
    TraceBindGroup, TraceBindGroupLayout, TraceBuffer, TraceDevice, TraceEvent, TracePipeline,
    TraceSurface, TraceView,
};
