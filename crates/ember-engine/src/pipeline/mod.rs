//! Render pipeline creation: shader interface checks and bind group layouts.

mod state;
mod topology;

pub use state::{
    create_pipeline, BindGroupLayout, BindGroupLayoutDesc, LayoutEntry, PipelineBuilder,
    PipelineState, FRAGMENT_ENTRY, VERTEX_ENTRY,
};
pub use topology::Topology;
