use crate::error::{BindingKind, RenderError, Result};
use crate::pipeline::{BindGroupLayoutDesc, LayoutEntry};
use crate::record::{Command, RecordedPass};

use super::capability::{BufferDescriptor, Device, PipelineDescriptor};
use super::GpuInit;

/// wgpu-backed implementation of [`Device`].
///
/// Cheap to clone: wgpu handles are reference counted.
#[derive(Debug, Clone)]
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuDevice {
    /// Wraps an existing device/queue pair.
    pub fn from_raw(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    /// Requests an adapter and a device from `instance`.
    ///
    /// Pass `compatible_surface` when the device will present to a window.
    pub async fn request(
        instance: &wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
        init: &GpuInit,
    ) -> Result<(wgpu::Adapter, Self)> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface,
                force_fallback_adapter: init.force_fallback_adapter,
            })
            .await
            .map_err(|e| {
                RenderError::CapabilityUnavailable(format!("no suitable GPU adapter: {e}"))
            })?;

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("ember device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone().using_resolution(adapter.limits()),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| {
                RenderError::CapabilityUnavailable(format!("failed to create device/queue: {e}"))
            })?;

        Ok((adapter, Self { device, queue }))
    }

    /// Acquires a device with no surface attached, blocking the caller.
    pub fn headless(init: &GpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });
        let (_adapter, device) = pollster::block_on(Self::request(&instance, None, init))?;
        Ok(device)
    }

    /// Returns the logical device.
    pub fn raw(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Maps `buffer` for reading and copies its contents out.
    ///
    /// `buffer` must have been created with `MAP_READ`.
    pub(crate) fn map_read(&self, buffer: &wgpu::Buffer) -> Result<Vec<u8>> {
        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });

        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| RenderError::Readback(e.to_string()))?;

        rx.recv()
            .map_err(|e| RenderError::Readback(e.to_string()))?
            .map_err(|e| RenderError::Readback(e.to_string()))?;

        let data = slice.get_mapped_range().to_vec();
        buffer.unmap();
        Ok(data)
    }

    /// Runs `op` inside validation and out-of-memory error scopes.
    ///
    /// wgpu reports most failures asynchronously through the uncaptured
    /// error handler, which panics by default. Scoping each call turns those
    /// reports into errors for the caller. Validation failures go through
    /// `reject`; running out of memory is always an allocation failure.
    pub(crate) fn scoped<T>(
        &self,
        op: impl FnOnce() -> T,
        reject: impl FnOnce(String) -> RenderError,
    ) -> Result<T> {
        let out_of_memory = self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let validation = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = op();
        // Scopes pop innermost first.
        let invalid = pollster::block_on(validation.pop());
        let oom = pollster::block_on(out_of_memory.pop());

        if let Some(err) = oom {
            return Err(RenderError::Allocation(err.to_string()));
        }
        match invalid {
            Some(err) => {
                log::warn!("wgpu rejected a call: {err}");
                Err(reject(err.to_string()))
            }
            None => Ok(value),
        }
    }
}

fn layout_entry(entry: &LayoutEntry) -> Result<wgpu::BindGroupLayoutEntry> {
    let ty = match entry.info.kind {
        BindingKind::Uniform => wgpu::BufferBindingType::Uniform,
        BindingKind::Storage { read_only } => wgpu::BufferBindingType::Storage { read_only },
        BindingKind::Other => {
            return Err(RenderError::LayoutMismatch(format!(
                "binding {}/{} is not a buffer",
                entry.info.group, entry.info.binding
            )));
        }
    };
    Ok(wgpu::BindGroupLayoutEntry {
        binding: entry.info.binding,
        visibility: entry.visibility,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(entry.info.size),
        },
        count: None,
    })
}

impl Device for WgpuDevice {
    type Buffer = wgpu::Buffer;
    type Pipeline = wgpu::RenderPipeline;
    type BindGroupLayout = wgpu::BindGroupLayout;
    type BindGroup = wgpu::BindGroup;
    type View = wgpu::TextureView;
    type CommandBuffer = wgpu::CommandBuffer;

    fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    fn create_buffer(&self, desc: &BufferDescriptor<'_>) -> Result<wgpu::Buffer> {
        self.scoped(
            || {
                self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(desc.label),
                    size: desc.size,
                    usage: desc.usage,
                    mapped_at_creation: false,
                })
            },
            RenderError::Allocation,
        )
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) -> Result<()> {
        self.scoped(
            || self.queue.write_buffer(buffer, offset, data),
            |e| RenderError::Device(format!("buffer write: {e}")),
        )
    }

    fn read_buffer(&self, buffer: &wgpu::Buffer) -> Result<Vec<u8>> {
        let size = buffer.size();
        let staging = self.scoped(
            || {
                let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("ember readback staging"),
                    size,
                    usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });

                let mut encoder =
                    self.device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("ember readback encoder"),
                        });
                encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
                self.queue.submit(std::iter::once(encoder.finish()));
                staging
            },
            RenderError::Readback,
        )?;

        self.map_read(&staging)
    }

    fn create_bind_group_layout(
        &self,
        desc: &BindGroupLayoutDesc,
    ) -> Result<wgpu::BindGroupLayout> {
        let entries = desc
            .entries
            .iter()
            .map(layout_entry)
            .collect::<Result<Vec<_>>>()?;
        let label = format!("bind group layout {}", desc.group);

        self.scoped(
            || {
                self.device
                    .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some(label.as_str()),
                        entries: &entries,
                    })
            },
            RenderError::LayoutMismatch,
        )
    }

    fn create_render_pipeline(
        &self,
        desc: &PipelineDescriptor<'_>,
        bind_group_layouts: &[(u32, &wgpu::BindGroupLayout)],
    ) -> Result<wgpu::RenderPipeline> {
        self.scoped(
            || {
                let count = bind_group_layouts
                    .iter()
                    .map(|(group, _)| group + 1)
                    .max()
                    .unwrap_or(0);
                // wgpu indexes layouts by position, so gaps need a layout too.
                let empty = (bind_group_layouts.len() < count as usize).then(|| {
                    self.device
                        .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                            label: Some("empty bind group layout"),
                            entries: &[],
                        })
                });
                let ordered: Vec<&wgpu::BindGroupLayout> = (0..count)
                    .filter_map(|group| {
                        bind_group_layouts
                            .iter()
                            .find(|(g, _)| *g == group)
                            .map(|(_, layout)| *layout)
                            .or(empty.as_ref())
                    })
                    .collect();

                let layout = self
                    .device
                    .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some(desc.label),
                        bind_group_layouts: &ordered,
                        immediate_size: 0,
                    });

                let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(desc.label),
                    source: wgpu::ShaderSource::Wgsl(desc.shader_source.into()),
                });

                let attributes = desc.vertex_layout.attributes().to_vec();
                let buffers = [wgpu::VertexBufferLayout {
                    array_stride: desc.vertex_layout.stride(),
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }];

                self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(desc.label),
                    layout: Some(&layout),

                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some(desc.vertex_entry),
                        compilation_options: Default::default(),
                        buffers: &buffers,
                    },

                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some(desc.fragment_entry),
                        compilation_options: Default::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: desc.target_format,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                    }),

                    primitive: wgpu::PrimitiveState {
                        topology: desc.topology.to_wgpu(),
                        strip_index_format: None,
                        front_face: wgpu::FrontFace::Ccw,
                        cull_mode: None,
                        polygon_mode: wgpu::PolygonMode::Fill,
                        unclipped_depth: false,
                        conservative: false,
                    },

                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview_mask: None,
                    cache: None,
                })
            },
            RenderError::LayoutMismatch,
        )
    }

    fn create_bind_group(
        &self,
        label: &str,
        layout: &wgpu::BindGroupLayout,
        entries: &[(u32, &wgpu::Buffer)],
    ) -> Result<wgpu::BindGroup> {
        let entries: Vec<wgpu::BindGroupEntry<'_>> = entries
            .iter()
            .map(|(slot, buffer)| wgpu::BindGroupEntry {
                binding: *slot,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        self.scoped(
            || {
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(label),
                    layout,
                    entries: &entries,
                })
            },
            RenderError::LayoutMismatch,
        )
    }

    fn encode(&self, pass: &RecordedPass<'_, Self>) -> Result<wgpu::CommandBuffer> {
        self.scoped(
            || {
                let mut encoder =
                    self.device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some(pass.label),
                        });

                // The render pass borrows the encoder; it must end before `finish`.
                {
                    let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some(pass.label),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: pass.view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(pass.clear.into()),
                                store: wgpu::StoreOp::Store,
                            },
                            depth_slice: None,
                        })],
                        depth_stencil_attachment: None,
                        timestamp_writes: None,
                        occlusion_query_set: None,
                        multiview_mask: None,
                    });

                    for cmd in pass.commands {
                        match cmd {
                            Command::SetPipeline(pipeline) => rpass.set_pipeline(pipeline),
                            Command::SetVertexBuffer { slot, buffer } => {
                                rpass.set_vertex_buffer(*slot, buffer.slice(..))
                            }
                            Command::SetBindGroup { index, group } => {
                                rpass.set_bind_group(*index, group, &[])
                            }
                            Command::Draw { vertices } => rpass.draw(vertices.clone(), 0..1),
                            Command::End => break,
                        }
                    }
                }

                encoder.finish()
            },
            |e| RenderError::Device(format!("pass '{}': {e}", pass.label)),
        )
    }

    fn submit(&self, commands: wgpu::CommandBuffer) -> Result<()> {
        self.scoped(
            || {
                self.queue.submit(std::iter::once(commands));
            },
            |e| RenderError::Device(format!("submission: {e}")),
        )
    }
}
