//! Bind group assembly: associating buffers with a pipeline's binding slots.

use std::collections::BTreeSet;

use crate::device::Device;
use crate::error::{BindingKind, RenderError, Result};
use crate::pipeline::{BindGroupLayout, BindGroupLayoutDesc};
use crate::resource::GpuBuffer;

/// A buffer offered for one slot of a group.
#[derive(Debug)]
pub struct BindGroupEntry<'a, D: Device> {
    pub slot: u32,
    pub buffer: &'a GpuBuffer<D>,
}

impl<'a, D: Device> BindGroupEntry<'a, D> {
    pub fn new(slot: u32, buffer: &'a GpuBuffer<D>) -> Self {
        Self { slot, buffer }
    }
}

/// Buffers bound to every slot of one group.
#[derive(Debug)]
pub struct BindGroup<D: Device> {
    raw: D::BindGroup,
    desc: BindGroupLayoutDesc,
}

impl<D: Device> BindGroup<D> {
    #[inline]
    pub fn raw(&self) -> &D::BindGroup {
        &self.raw
    }

    #[inline]
    pub fn group(&self) -> u32 {
        self.desc.group
    }

    /// Layout this group was assembled against.
    #[inline]
    pub fn layout(&self) -> &BindGroupLayoutDesc {
        &self.desc
    }
}

/// Assembles a bind group, checking every entry against `layout`.
///
/// Each declared slot must be supplied exactly once with a buffer whose usage
/// matches the declared kind. Fixed-size bindings need a buffer of exactly the
/// declared size; a runtime-sized array takes any whole number of elements.
pub fn create_bind_group<D: Device>(
    device: &D,
    layout: &BindGroupLayout<D>,
    entries: &[BindGroupEntry<'_, D>],
) -> Result<BindGroup<D>> {
    let desc = layout.desc();
    let group = desc.group;

    let mut seen = BTreeSet::new();
    for entry in entries {
        let declared = desc.entry(entry.slot).ok_or(RenderError::BindingSlot {
            group,
            slot: entry.slot,
        })?;
        if !seen.insert(entry.slot) {
            return Err(RenderError::DuplicateBinding {
                group,
                slot: entry.slot,
            });
        }

        let declared = declared.info;
        let found = buffer_kind(entry.buffer.usage(), declared.kind);
        if found != declared.kind {
            return Err(RenderError::BindingType {
                slot: entry.slot,
                expected: declared.kind,
                found,
            });
        }
        if !declared.accepts_len(entry.buffer.size()) {
            let wanted = match declared.array_stride {
                None => format!("declares {}", declared.size),
                Some(stride) => format!(
                    "needs at least {} bytes in steps of {stride}",
                    declared.size
                ),
            };
            return Err(RenderError::LayoutMismatch(format!(
                "buffer '{}' is {} bytes but slot {} of group {group} {wanted}",
                entry.buffer.label(),
                entry.buffer.size(),
                entry.slot,
            )));
        }
    }

    let missing: Vec<u32> = desc.slots().filter(|s| !seen.contains(s)).collect();
    if !missing.is_empty() {
        return Err(RenderError::IncompleteBinding { group, missing });
    }

    let raw_entries: Vec<(u32, &D::Buffer)> =
        entries.iter().map(|e| (e.slot, e.buffer.raw())).collect();
    let label = format!("bind group {group}");
    let raw = device.create_bind_group(&label, layout.raw(), &raw_entries)?;
    log::debug!("{label} assembled: slots {:?}", seen);

    Ok(BindGroup {
        raw,
        desc: desc.clone(),
    })
}

/// What kind of binding a buffer can serve, preferring the kind the slot asks for.
fn buffer_kind(usage: wgpu::BufferUsages, wanted: BindingKind) -> BindingKind {
    let uniform = usage.contains(wgpu::BufferUsages::UNIFORM);
    let storage = usage.contains(wgpu::BufferUsages::STORAGE);
    match wanted {
        BindingKind::Uniform if uniform => BindingKind::Uniform,
        BindingKind::Storage { read_only } if storage => BindingKind::Storage { read_only },
        _ if uniform => BindingKind::Uniform,
        _ if storage => BindingKind::Storage { read_only: false },
        _ => BindingKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{TraceDevice, TraceEvent};
    use crate::math::IDENTITY;
    use crate::pipeline::{create_pipeline, PipelineState, Topology};
    use crate::resource::{ResourceBuilder, UniformData, VertexLayout};
    use crate::shader::compile_shader;

    use wgpu::BufferUsages as U;

    const ROTATE: &str = include_str!("scenes/shaders/rotate.wgsl");

    fn rotate_pipeline(dev: &TraceDevice) -> PipelineState<TraceDevice> {
        let program = compile_shader("rot", ROTATE).unwrap();
        create_pipeline(
            dev,
            &program,
            &VertexLayout::position2d(),
            Topology::TriangleStrip,
            wgpu::TextureFormat::Rgba8Unorm,
        )
        .unwrap()
    }

    #[test]
    fn uniform_at_slot_zero_assembles() {
        let dev = TraceDevice::new();
        let pipeline = rotate_pipeline(&dev);
        let mut rb = ResourceBuilder::new(&dev);
        let uniform = rb
            .create_uniform_buffer("rot", &UniformData::from_mat4(&IDENTITY))
            .unwrap();

        let layout = pipeline.get_bind_group_layout(0).unwrap();
        let group = create_bind_group(&dev, layout, &[BindGroupEntry::new(0, &uniform)]).unwrap();

        assert_eq!(group.group(), 0);
        assert!(matches!(
            dev.events().last(),
            Some(TraceEvent::CreateBindGroup { group: 0, slots, .. }) if slots == &vec![0]
        ));
    }

    #[test]
    fn undeclared_slot_is_rejected() {
        let dev = TraceDevice::new();
        let pipeline = rotate_pipeline(&dev);
        let rb = ResourceBuilder::new(&dev);
        let uniform = rb.create_buffer("u", 64, U::UNIFORM).unwrap();

        let layout = pipeline.get_bind_group_layout(0).unwrap();
        let err = create_bind_group(&dev, layout, &[BindGroupEntry::new(1, &uniform)]).unwrap_err();
        assert!(matches!(err, RenderError::BindingSlot { group: 0, slot: 1 }));
    }

    #[test]
    fn vertex_buffer_in_uniform_slot_is_binding_type_error() {
        let dev = TraceDevice::new();
        let pipeline = rotate_pipeline(&dev);
        let rb = ResourceBuilder::new(&dev);
        let vertices = rb.create_buffer("v", 64, U::VERTEX | U::COPY_DST).unwrap();

        let layout = pipeline.get_bind_group_layout(0).unwrap();
        let err = create_bind_group(&dev, layout, &[BindGroupEntry::new(0, &vertices)]).unwrap_err();
        assert!(matches!(
            err,
            RenderError::BindingType {
                slot: 0,
                expected: BindingKind::Uniform,
                found: BindingKind::Other,
            }
        ));
    }

    #[test]
    fn wrong_size_is_layout_mismatch() {
        let dev = TraceDevice::new();
        let pipeline = rotate_pipeline(&dev);
        let rb = ResourceBuilder::new(&dev);
        let small = rb.create_buffer("u", 32, U::UNIFORM).unwrap();

        let layout = pipeline.get_bind_group_layout(0).unwrap();
        assert!(matches!(
            create_bind_group(&dev, layout, &[BindGroupEntry::new(0, &small)]),
            Err(RenderError::LayoutMismatch(_))
        ));
    }

    #[test]
    fn missing_and_duplicate_slots_are_rejected() {
        let dev = TraceDevice::new();
        let pipeline = rotate_pipeline(&dev);
        let rb = ResourceBuilder::new(&dev);
        let uniform = rb.create_buffer("u", 64, U::UNIFORM).unwrap();
        let layout = pipeline.get_bind_group_layout(0).unwrap();

        assert!(matches!(
            create_bind_group(&dev, layout, &[]),
            Err(RenderError::IncompleteBinding { group: 0, ref missing }) if missing == &vec![0]
        ));
        assert!(matches!(
            create_bind_group(
                &dev,
                layout,
                &[BindGroupEntry::new(0, &uniform), BindGroupEntry::new(0, &uniform)]
            ),
            Err(RenderError::DuplicateBinding { group: 0, slot: 0 })
        ));
    }

    const RUNTIME_ARRAY: &str = r#"
@group(0) @binding(0) var<storage, read> data: array<vec4f>;

@vertex
fn vertexMain(@location(0) p: vec2f) -> @builtin(position) vec4f {
    return vec4f(p, 0.0, 1.0);
}

@fragment
fn fragmentMain() -> @location(0) vec4f {
    return data[0];
}
"#;

    fn runtime_array_pipeline(dev: &TraceDevice) -> PipelineState<TraceDevice> {
        let program = compile_shader("data", RUNTIME_ARRAY).unwrap();
        create_pipeline(
            dev,
            &program,
            &VertexLayout::position2d(),
            Topology::TriangleList,
            wgpu::TextureFormat::Rgba8Unorm,
        )
        .unwrap()
    }

    #[test]
    fn runtime_array_takes_whole_elements() {
        let dev = TraceDevice::new();
        let pipeline = runtime_array_pipeline(&dev);
        let rb = ResourceBuilder::new(&dev);
        let layout = pipeline.get_bind_group_layout(0).unwrap();

        for size in [16, 64, 4096] {
            let data = rb.create_buffer("data", size, U::STORAGE | U::COPY_DST).unwrap();
            assert!(
                create_bind_group(&dev, layout, &[BindGroupEntry::new(0, &data)]).is_ok(),
                "{size} bytes"
            );
        }
    }

    #[test]
    fn runtime_array_rejects_partial_elements() {
        let dev = TraceDevice::new();
        let pipeline = runtime_array_pipeline(&dev);
        let rb = ResourceBuilder::new(&dev);
        let layout = pipeline.get_bind_group_layout(0).unwrap();

        for size in [8, 40] {
            let data = rb.create_buffer("data", size, U::STORAGE).unwrap();
            assert!(
                matches!(
                    create_bind_group(&dev, layout, &[BindGroupEntry::new(0, &data)]),
                    Err(RenderError::LayoutMismatch(_))
                ),
                "{size} bytes"
            );
        }
    }

    #[test]
    fn buffer_kind_prefers_requested_kind() {
        let both = U::UNIFORM | U::STORAGE;
        assert_eq!(buffer_kind(both, BindingKind::Uniform), BindingKind::Uniform);
        assert_eq!(
            buffer_kind(both, BindingKind::Storage { read_only: true }),
            BindingKind::Storage { read_only: true }
        );
        assert_eq!(buffer_kind(U::VERTEX, BindingKind::Uniform), BindingKind::Other);
    }
}
