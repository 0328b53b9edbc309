use std::collections::BTreeMap;

use crate::bind::BindGroup;
use crate::device::Device;
use crate::error::{RenderError, Result};
use crate::paint::Color;
use crate::pipeline::{BindGroupLayoutDesc, PipelineState, Topology};
use crate::resource::GpuBuffer;

use super::{Command, RecordedPass};

/// Lifecycle of a [`CommandSequence`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SequenceState {
    Idle,
    Recording,
    Ended,
    Submitted,
}

/// What `draw` needs to know about the bound pipeline.
#[derive(Debug, Clone)]
struct BoundPipeline {
    label: String,
    topology: Topology,
    stride: u64,
    groups: Vec<BindGroupLayoutDesc>,
}

/// Write-once recording of a single render pass.
///
/// `Idle -> Recording` on [`begin_pass`](Self::begin_pass), `Recording -> Ended`
/// on [`end_pass`](Self::end_pass). Only an ended sequence can be submitted.
/// A call that fails leaves the sequence exactly as it was.
#[derive(Debug)]
pub struct CommandSequence<D: Device> {
    label: String,
    state: SequenceState,
    view: Option<D::View>,
    clear: Color,
    commands: Vec<Command<D>>,

    pipeline: Option<BoundPipeline>,
    vertex_buffers: BTreeMap<u32, u64>,
    bind_groups: BTreeMap<u32, BindGroupLayoutDesc>,
    // Draws are unbounded, so totals are kept wider than one draw's count.
    draw_calls: u64,
    vertices_drawn: u64,
    triangles: u64,
}

impl<D: Device> CommandSequence<D> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: SequenceState::Idle,
            view: None,
            clear: Color::default(),
            commands: Vec::new(),
            pipeline: None,
            vertex_buffers: BTreeMap::new(),
            bind_groups: BTreeMap::new(),
            draw_calls: 0,
            vertices_drawn: 0,
            triangles: 0,
        }
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn state(&self) -> SequenceState {
        self.state
    }

    #[inline]
    pub fn commands(&self) -> &[Command<D>] {
        &self.commands
    }

    #[inline]
    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    #[inline]
    pub fn vertices_drawn(&self) -> u64 {
        self.vertices_drawn
    }

    /// Triangles assembled across all draws.
    #[inline]
    pub fn triangles(&self) -> u64 {
        self.triangles
    }

    /// Opens the pass against `view`, which is cleared to `clear` before any draw.
    ///
    /// NaN and infinite channels are replaced with 0. Finite values are kept
    /// as given, including those outside `[0, 1]` meant for float targets.
    pub fn begin_pass(&mut self, view: D::View, clear: Color) -> Result<()> {
        match self.state {
            SequenceState::Idle => {}
            SequenceState::Recording => return Err(RenderError::PassAlreadyBegun),
            SequenceState::Ended | SequenceState::Submitted => {
                return Err(RenderError::SequenceClosed);
            }
        }
        if !clear.is_finite() {
            log::warn!(
                "pass '{}': non-finite clear color {clear:?}, zeroing those channels",
                self.label
            );
        }
        self.view = Some(view);
        self.clear = clear.finite_or_zero();
        self.state = SequenceState::Recording;
        log::trace!("pass '{}' begun", self.label);
        Ok(())
    }

    pub fn set_pipeline(&mut self, pipeline: &PipelineState<D>) -> Result<()> {
        self.require_recording()?;
        self.pipeline = Some(BoundPipeline {
            label: pipeline.label().to_string(),
            topology: pipeline.topology(),
            stride: pipeline.vertex_layout().stride(),
            groups: pipeline
                .bind_group_layouts()
                .iter()
                .map(|l| l.desc().clone())
                .collect(),
        });
        self.commands.push(Command::SetPipeline(pipeline.raw().clone()));
        Ok(())
    }

    /// Binds `buffer` as the vertex source for `slot`. Requires `VERTEX` usage.
    pub fn set_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer<D>) -> Result<()> {
        self.require_recording()?;
        buffer.require(wgpu::BufferUsages::VERTEX)?;
        self.vertex_buffers.insert(slot, buffer.size());
        self.commands.push(Command::SetVertexBuffer {
            slot,
            buffer: buffer.raw().clone(),
        });
        Ok(())
    }

    pub fn set_bind_group(&mut self, index: u32, group: &BindGroup<D>) -> Result<()> {
        self.require_recording()?;
        self.bind_groups.insert(index, group.layout().clone());
        self.commands.push(Command::SetBindGroup {
            index,
            group: group.raw().clone(),
        });
        Ok(())
    }

    /// Records a draw of `vertex_count` vertices starting at vertex 0.
    ///
    /// Checks that a pipeline is bound, every group it declares has a
    /// compatible bind group set, and the vertex buffer holds enough vertices.
    pub fn draw(&mut self, vertex_count: u32) -> Result<()> {
        self.require_recording()?;
        let pipeline = self.pipeline.as_ref().ok_or(RenderError::NoPipelineBound)?;

        for desc in &pipeline.groups {
            match self.bind_groups.get(&desc.group) {
                Some(bound) if bound == desc => {}
                Some(_) => {
                    return Err(RenderError::LayoutMismatch(format!(
                        "bind group at index {} does not match the layout of pipeline '{}'",
                        desc.group, pipeline.label
                    )));
                }
                None => {
                    return Err(RenderError::LayoutMismatch(format!(
                        "pipeline '{}' declares group {} but no bind group was set",
                        pipeline.label, desc.group
                    )));
                }
            }
        }

        let buffer_size = *self.vertex_buffers.get(&0).ok_or_else(|| {
            RenderError::LayoutMismatch(format!(
                "pipeline '{}' reads vertex buffer 0 but none was set",
                pipeline.label
            ))
        })?;
        let available = buffer_size / pipeline.stride;
        if u64::from(vertex_count) > available {
            return Err(RenderError::LayoutMismatch(format!(
                "draw of {vertex_count} vertices but the vertex buffer holds {available}"
            )));
        }

        let topology = pipeline.topology;
        let leftover = topology.leftover_vertices(vertex_count);
        if leftover != 0 {
            log::warn!(
                "pass '{}': {leftover} trailing vertex(es) ignored by {topology:?}",
                self.label
            );
        }
        if vertex_count < topology.min_vertices() {
            log::warn!(
                "pass '{}': draw of {vertex_count} vertices produces no triangles",
                self.label
            );
        }

        self.commands.push(Command::Draw {
            vertices: 0..vertex_count,
        });
        self.draw_calls = self.draw_calls.saturating_add(1);
        self.vertices_drawn = self.vertices_drawn.saturating_add(u64::from(vertex_count));
        self.triangles = self
            .triangles
            .saturating_add(u64::from(topology.triangle_count(vertex_count)));
        Ok(())
    }

    /// Freezes the sequence. Nothing more can be recorded.
    pub fn end_pass(&mut self) -> Result<()> {
        self.require_recording()?;
        self.commands.push(Command::End);
        self.state = SequenceState::Ended;
        log::trace!(
            "pass '{}' ended: {} command(s), {} draw(s)",
            self.label,
            self.commands.len(),
            self.draw_calls
        );
        Ok(())
    }

    /// The finished pass, once the sequence has ended.
    pub fn recorded_pass(&self) -> Option<RecordedPass<'_, D>> {
        if self.state != SequenceState::Ended {
            return None;
        }
        Some(RecordedPass {
            label: &self.label,
            view: self.view.as_ref()?,
            clear: self.clear,
            commands: &self.commands,
        })
    }

    pub(crate) fn mark_submitted(&mut self) {
        self.state = SequenceState::Submitted;
    }

    fn require_recording(&self) -> Result<()> {
        match self.state {
            SequenceState::Recording => Ok(()),
            SequenceState::Idle => Err(RenderError::PassNotBegun),
            SequenceState::Ended | SequenceState::Submitted => Err(RenderError::SequenceClosed),
        }
    }
}
