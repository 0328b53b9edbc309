//! Resource Builder: buffer allocation and host-to-device uploads.

mod buffer;
mod uniform;
mod vertex;

pub use buffer::{validate_allocation, GpuBuffer, ResourceBuilder, COPY_ALIGNMENT};
pub use uniform::UniformData;
pub use vertex::{VertexData, VertexLayout};
