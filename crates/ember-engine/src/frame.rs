//! Single-shot frame: resources, pipeline, bindings, recording, submission.

use std::borrow::Cow;

use crate::bind::{create_bind_group, BindGroupEntry};
use crate::device::{Device, Surface};
use crate::error::{RenderError, Result};
use crate::paint::Color;
use crate::pipeline::{PipelineBuilder, Topology, FRAGMENT_ENTRY, VERTEX_ENTRY};
use crate::record::CommandSequence;
use crate::resource::{ResourceBuilder, UniformData, VertexData};
use crate::shader::compile_shader;
use crate::submit::Submitter;

/// Everything needed to draw one frame.
#[derive(Debug, Clone)]
pub struct FrameDesc {
    pub label: Cow<'static, str>,
    /// WGSL source with a vertex and a fragment entry point.
    pub shader_source: Cow<'static, str>,
    pub vertices: VertexData,
    /// Bound at group 0, slot 0 when present.
    pub uniform: Option<UniformData>,
    pub topology: Topology,
    pub clear_color: Color,
    pub vertex_entry: Cow<'static, str>,
    pub fragment_entry: Cow<'static, str>,
}

impl FrameDesc {
    pub fn new(
        label: impl Into<Cow<'static, str>>,
        shader_source: impl Into<Cow<'static, str>>,
        vertices: VertexData,
    ) -> Self {
        Self {
            label: label.into(),
            shader_source: shader_source.into(),
            vertices,
            uniform: None,
            topology: Topology::TriangleList,
            clear_color: Color::LIGHT_GRAY,
            vertex_entry: Cow::Borrowed(VERTEX_ENTRY),
            fragment_entry: Cow::Borrowed(FRAGMENT_ENTRY),
        }
    }

    pub fn with_uniform(mut self, uniform: UniformData) -> Self {
        self.uniform = Some(uniform);
        self
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_entry_points(
        mut self,
        vertex: impl Into<Cow<'static, str>>,
        fragment: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.vertex_entry = vertex.into();
        self.fragment_entry = fragment.into();
        self
    }
}

/// What a successful `build_frame` submitted.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    pub vertex_count: u64,
    pub triangle_count: u64,
    pub draw_calls: u64,
    pub uploaded_bytes: u64,
}

/// Builds, records and submits one frame onto `surface`.
///
/// Returns once the commands are queued, not when the GPU finishes. The
/// surface view is acquired first so a missing target fails before anything
/// is allocated. Any failure returns before submission; nothing partial
/// reaches the queue.
pub fn build_frame<D, S>(device: &D, surface: &S, frame: &FrameDesc) -> Result<FrameStats>
where
    D: Device,
    S: Surface<D> + ?Sized,
{
    let view = surface.current_view()?;
    let format = surface.format();
    log::debug!("frame '{}': target {format:?}", frame.label);

    // Uploads are enqueued before submission, so the draw sees them.
    let mut resources = ResourceBuilder::new(device);
    let vertex_buffer =
        resources.create_vertex_buffer(&format!("{} vertices", frame.label), &frame.vertices)?;
    let uniform_buffer = match &frame.uniform {
        Some(data) => {
            Some(resources.create_uniform_buffer(&format!("{} uniform", frame.label), data)?)
        }
        None => None,
    };

    let program = compile_shader(&frame.label, &frame.shader_source)?;
    let pipeline = PipelineBuilder::new(&program, frame.vertices.layout(), format)
        .label(&frame.label)
        .topology(frame.topology)
        .entry_points(&frame.vertex_entry, &frame.fragment_entry)
        .build(device)?;

    let bind_group = match (&uniform_buffer, pipeline.bind_group_layouts()) {
        (Some(buffer), _) => {
            let layout = pipeline.get_bind_group_layout(0)?;
            Some(create_bind_group(device, layout, &[BindGroupEntry::new(0, buffer)])?)
        }
        (None, []) => None,
        (None, [layout, ..]) => {
            return Err(RenderError::IncompleteBinding {
                group: layout.group(),
                missing: layout.desc().slots().collect(),
            });
        }
    };

    let mut sequence = CommandSequence::new(frame.label.to_string());
    sequence.begin_pass(view, frame.clear_color)?;
    sequence.set_pipeline(&pipeline)?;
    sequence.set_vertex_buffer(0, &vertex_buffer)?;
    if let Some(group) = &bind_group {
        sequence.set_bind_group(group.group(), group)?;
    }
    sequence.draw(frame.vertices.vertex_count())?;
    sequence.end_pass()?;

    Submitter::new(device).submit(&mut sequence)?;

    let stats = FrameStats {
        vertex_count: sequence.vertices_drawn(),
        triangle_count: sequence.triangles(),
        draw_calls: sequence.draw_calls(),
        uploaded_bytes: resources.uploaded_bytes(),
    };
    log::debug!("frame '{}' submitted: {stats:?}", frame.label);
    Ok(stats)
}
