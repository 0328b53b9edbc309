//! Ember engine crate.
//!
//! Renders a single frame of simple 2D geometry: buffers are created and
//! uploaded, a WGSL pipeline is linked, its bindings assembled, one render
//! pass recorded and submitted. All GPU access goes through the [`Device`]
//! and [`Surface`] capabilities, so the same frame code drives a real wgpu
//! device, an offscreen texture or the CPU trace device.

pub mod bind;
pub mod device;
pub mod error;
pub mod frame;
pub mod logging;
pub mod math;
pub mod paint;
pub mod pipeline;
pub mod record;
pub mod resource;
pub mod scenes;
pub mod shader;
pub mod submit;

pub use device::{Device, Surface};
pub use error::{RenderError, Result};
pub use frame::{build_frame, FrameDesc, FrameStats};
