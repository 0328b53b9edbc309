use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::Range;

use crate::error::{RenderError, Result};
use crate::paint::Color;
use crate::pipeline::{BindGroupLayoutDesc, Topology};
use crate::record::{Command, RecordedPass};

use super::capability::{BufferDescriptor, Device, PipelineDescriptor, Surface};

/// One call observed by a [`TraceDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    CreateBuffer {
        id: u64,
        label: String,
        size: u64,
        usage: wgpu::BufferUsages,
    },
    WriteBuffer {
        id: u64,
        offset: u64,
        len: u64,
    },
    CreateBindGroupLayout {
        id: u64,
        group: u32,
        slots: Vec<u32>,
    },
    CreatePipeline {
        id: u64,
        label: String,
        topology: Topology,
        format: wgpu::TextureFormat,
        /// Layout ids by group index.
        layouts: Vec<(u32, u64)>,
    },
    CreateBindGroup {
        id: u64,
        group: u32,
        slots: Vec<u32>,
    },
    BeginPass {
        view: u64,
        clear: Color,
    },
    SetPipeline {
        id: u64,
    },
    SetVertexBuffer {
        slot: u32,
        buffer: u64,
    },
    SetBindGroup {
        index: u32,
        group: u64,
    },
    Draw {
        vertices: Range<u32>,
    },
    EndPass,
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceBuffer {
    pub id: u64,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracePipeline {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceBindGroupLayout {
    pub id: u64,
    pub group: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceBindGroup {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceView {
    pub id: u64,
}

#[derive(Debug, Default)]
struct TraceState {
    next_id: u64,
    buffers: HashMap<u64, Vec<u8>>,
    // Equal descriptions share one layout, as wgpu deduplicates them.
    layouts: HashMap<BindGroupLayoutDesc, u64>,
    events: Vec<TraceEvent>,
}

impl TraceState {
    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// CPU-only [`Device`] that keeps buffer contents in host memory and records
/// every call it receives.
///
/// Nothing is rasterized. It backs dry runs of a frame and makes the order of
/// device calls observable.
#[derive(Debug)]
pub struct TraceDevice {
    limits: wgpu::Limits,
    state: RefCell<TraceState>,
}

impl Default for TraceDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceDevice {
    /// A device with wgpu's default limits.
    pub fn new() -> Self {
        Self::with_limits(wgpu::Limits::default())
    }

    pub fn with_limits(limits: wgpu::Limits) -> Self {
        Self {
            limits,
            state: RefCell::new(TraceState::default()),
        }
    }

    pub fn with_max_buffer_size(max_buffer_size: u64) -> Self {
        Self::with_limits(wgpu::Limits {
            max_buffer_size,
            ..Default::default()
        })
    }

    /// Returns a copy of all events recorded so far.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.state.borrow().events.clone()
    }

    /// Number of command buffers handed to the queue.
    pub fn submissions(&self) -> usize {
        self.state
            .borrow()
            .events
            .iter()
            .filter(|e| matches!(e, TraceEvent::Submit))
            .count()
    }

    /// Current host-side contents of `buffer`.
    pub fn contents(&self, buffer: &TraceBuffer) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&buffer.id).cloned()
    }

    /// Creates a surface whose views belong to this device.
    pub fn surface(&self, format: wgpu::TextureFormat) -> TraceSurface {
        let id = self.state.borrow_mut().alloc_id();
        TraceSurface {
            format,
            view: Some(TraceView { id }),
        }
    }
}

impl Device for TraceDevice {
    type Buffer = TraceBuffer;
    type Pipeline = TracePipeline;
    type BindGroupLayout = TraceBindGroupLayout;
    type BindGroup = TraceBindGroup;
    type View = TraceView;
    type CommandBuffer = Vec<TraceEvent>;

    fn limits(&self) -> wgpu::Limits {
        self.limits.clone()
    }

    fn create_buffer(&self, desc: &BufferDescriptor<'_>) -> Result<TraceBuffer> {
        let mut state = self.state.borrow_mut();
        let id = state.alloc_id();
        state.buffers.insert(id, vec![0; desc.size as usize]);
        state.events.push(TraceEvent::CreateBuffer {
            id,
            label: desc.label.to_string(),
            size: desc.size,
            usage: desc.usage,
        });
        Ok(TraceBuffer { id, size: desc.size })
    }

    fn write_buffer(&self, buffer: &TraceBuffer, offset: u64, data: &[u8]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(bytes) = state.buffers.get_mut(&buffer.id) {
            let start = offset as usize;
            let dst = bytes.get_mut(start..start + data.len());
            debug_assert!(
                dst.is_some(),
                "write of {} bytes at {offset} overruns trace buffer {} of {} bytes",
                data.len(),
                buffer.id,
                buffer.size
            );
            if let Some(dst) = dst {
                dst.copy_from_slice(data);
            }
        }
        state.events.push(TraceEvent::WriteBuffer {
            id: buffer.id,
            offset,
            len: data.len() as u64,
        });
        Ok(())
    }

    fn read_buffer(&self, buffer: &TraceBuffer) -> Result<Vec<u8>> {
        self.contents(buffer)
            .ok_or_else(|| RenderError::Readback(format!("unknown buffer {}", buffer.id)))
    }

    fn create_bind_group_layout(
        &self,
        desc: &BindGroupLayoutDesc,
    ) -> Result<TraceBindGroupLayout> {
        let mut state = self.state.borrow_mut();
        let id = match state.layouts.get(desc) {
            Some(id) => *id,
            None => {
                let id = state.alloc_id();
                state.layouts.insert(desc.clone(), id);
                id
            }
        };
        state.events.push(TraceEvent::CreateBindGroupLayout {
            id,
            group: desc.group,
            slots: desc.slots().collect(),
        });
        Ok(TraceBindGroupLayout {
            id,
            group: desc.group,
        })
    }

    fn create_render_pipeline(
        &self,
        desc: &PipelineDescriptor<'_>,
        bind_group_layouts: &[(u32, &TraceBindGroupLayout)],
    ) -> Result<TracePipeline> {
        let mut state = self.state.borrow_mut();
        let id = state.alloc_id();
        state.events.push(TraceEvent::CreatePipeline {
            id,
            label: desc.label.to_string(),
            topology: desc.topology,
            format: desc.target_format,
            layouts: bind_group_layouts
                .iter()
                .map(|(group, layout)| (*group, layout.id))
                .collect(),
        });
        Ok(TracePipeline { id })
    }

    fn create_bind_group(
        &self,
        _label: &str,
        layout: &TraceBindGroupLayout,
        entries: &[(u32, &TraceBuffer)],
    ) -> Result<TraceBindGroup> {
        let mut state = self.state.borrow_mut();
        let id = state.alloc_id();
        state.events.push(TraceEvent::CreateBindGroup {
            id,
            group: layout.group,
            slots: entries.iter().map(|(slot, _)| *slot).collect(),
        });
        Ok(TraceBindGroup { id })
    }

    fn encode(&self, pass: &RecordedPass<'_, Self>) -> Result<Vec<TraceEvent>> {
        let mut events = vec![TraceEvent::BeginPass {
            view: pass.view.id,
            clear: pass.clear,
        }];
        for cmd in pass.commands {
            events.push(match cmd {
                Command::SetPipeline(p) => TraceEvent::SetPipeline { id: p.id },
                Command::SetVertexBuffer { slot, buffer } => TraceEvent::SetVertexBuffer {
                    slot: *slot,
                    buffer: buffer.id,
                },
                Command::SetBindGroup { index, group } => TraceEvent::SetBindGroup {
                    index: *index,
                    group: group.id,
                },
                Command::Draw { vertices } => TraceEvent::Draw {
                    vertices: vertices.clone(),
                },
                Command::End => TraceEvent::EndPass,
            });
        }
        Ok(events)
    }

    fn submit(&self, commands: Vec<TraceEvent>) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.events.extend(commands);
        state.events.push(TraceEvent::Submit);
        Ok(())
    }
}

/// Render target of a [`TraceDevice`].
#[derive(Debug, Clone)]
pub struct TraceSurface {
    format: wgpu::TextureFormat,
    view: Option<TraceView>,
}

impl TraceSurface {
    /// A surface that cannot produce a view, as when a window has no drawable.
    pub fn unavailable(format: wgpu::TextureFormat) -> Self {
        Self { format, view: None }
    }
}

impl Surface<TraceDevice> for TraceSurface {
    fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn current_view(&self) -> Result<TraceView> {
        self.view
            .clone()
            .ok_or_else(|| RenderError::CapabilityUnavailable("surface has no current view".into()))
    }
}
