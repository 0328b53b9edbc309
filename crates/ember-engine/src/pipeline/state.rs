use std::collections::BTreeMap;

use crate::device::{Device, PipelineDescriptor};
use crate::error::{BindingKind, RenderError, Result};
use crate::resource::VertexLayout;
use crate::shader::{BindingInfo, EntryPointInfo, ScalarKind, ShaderProgram, ShaderStage};

use super::Topology;

/// Default vertex entry point name.
pub const VERTEX_ENTRY: &str = "vertexMain";
/// Default fragment entry point name.
pub const FRAGMENT_ENTRY: &str = "fragmentMain";

/// One slot of a bind group layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LayoutEntry {
    pub info: BindingInfo,
    /// Stages whose entry points use the binding.
    pub visibility: wgpu::ShaderStages,
}

/// Bindings one group of a pipeline expects, sorted by slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindGroupLayoutDesc {
    pub group: u32,
    pub entries: Vec<LayoutEntry>,
}

impl BindGroupLayoutDesc {
    pub fn entry(&self, slot: u32) -> Option<&LayoutEntry> {
        self.entries.iter().find(|e| e.info.binding == slot)
    }

    pub fn slots(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|e| e.info.binding)
    }
}

/// A bind group layout derived from a pipeline's shaders.
#[derive(Debug)]
pub struct BindGroupLayout<D: Device> {
    desc: BindGroupLayoutDesc,
    raw: D::BindGroupLayout,
}

impl<D: Device> Clone for BindGroupLayout<D> {
    fn clone(&self) -> Self {
        Self {
            desc: self.desc.clone(),
            raw: self.raw.clone(),
        }
    }
}

impl<D: Device> BindGroupLayout<D> {
    #[inline]
    pub fn desc(&self) -> &BindGroupLayoutDesc {
        &self.desc
    }

    #[inline]
    pub fn group(&self) -> u32 {
        self.desc.group
    }

    #[inline]
    pub fn raw(&self) -> &D::BindGroupLayout {
        &self.raw
    }
}

/// A linked render pipeline plus everything recording needs to validate draws.
#[derive(Debug)]
pub struct PipelineState<D: Device> {
    raw: D::Pipeline,
    label: String,
    topology: Topology,
    vertex_layout: VertexLayout,
    target_format: wgpu::TextureFormat,
    bind_group_layouts: Vec<BindGroupLayout<D>>,
}

impl<D: Device> PipelineState<D> {
    #[inline]
    pub fn raw(&self) -> &D::Pipeline {
        &self.raw
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    #[inline]
    pub fn vertex_layout(&self) -> &VertexLayout {
        &self.vertex_layout
    }

    #[inline]
    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    /// Layouts of every group the shaders use, sorted by group index.
    #[inline]
    pub fn bind_group_layouts(&self) -> &[BindGroupLayout<D>] {
        &self.bind_group_layouts
    }

    /// Returns the layout of group `index`, or `NoBindings` when the shaders
    /// use nothing there.
    pub fn get_bind_group_layout(&self, index: u32) -> Result<&BindGroupLayout<D>> {
        self.bind_group_layouts
            .iter()
            .find(|l| l.group() == index)
            .ok_or(RenderError::NoBindings { group: index })
    }
}

/// Links a compiled shader with a vertex layout, topology and target format.
///
/// The shader interface is checked here so the device only ever sees
/// pipelines that will link.
#[derive(Debug, Clone)]
pub struct PipelineBuilder<'a> {
    label: &'a str,
    program: &'a ShaderProgram,
    vertex_layout: &'a VertexLayout,
    topology: Topology,
    target_format: wgpu::TextureFormat,
    vertex_entry: &'a str,
    fragment_entry: &'a str,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(
        program: &'a ShaderProgram,
        vertex_layout: &'a VertexLayout,
        target_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            label: program.label(),
            program,
            vertex_layout,
            topology: Topology::TriangleList,
            target_format,
            vertex_entry: VERTEX_ENTRY,
            fragment_entry: FRAGMENT_ENTRY,
        }
    }

    pub fn label(mut self, label: &'a str) -> Self {
        self.label = label;
        self
    }

    pub fn topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn entry_points(mut self, vertex: &'a str, fragment: &'a str) -> Self {
        self.vertex_entry = vertex;
        self.fragment_entry = fragment;
        self
    }

    /// Validates the shader interface and derives the bind group layouts
    /// without touching a device.
    pub fn layout_descs(&self) -> Result<Vec<BindGroupLayoutDesc>> {
        let vs = self.entry(self.vertex_entry, ShaderStage::Vertex)?;
        let fs = self.entry(self.fragment_entry, ShaderStage::Fragment)?;

        check_vertex_inputs(vs, self.vertex_layout)?;
        check_fragment_output(fs, self.target_format)?;

        let staged = vs
            .bindings
            .iter()
            .map(|b| (b, wgpu::ShaderStages::VERTEX))
            .chain(fs.bindings.iter().map(|b| (b, wgpu::ShaderStages::FRAGMENT)));

        let mut groups: BTreeMap<u32, BTreeMap<u32, LayoutEntry>> = BTreeMap::new();
        for (binding, stage) in staged {
            if binding.kind == BindingKind::Other {
                return Err(RenderError::LayoutMismatch(format!(
                    "binding {}/{} is not a buffer",
                    binding.group, binding.binding
                )));
            }
            groups
                .entry(binding.group)
                .or_default()
                .entry(binding.binding)
                .and_modify(|e| e.visibility |= stage)
                .or_insert(LayoutEntry {
                    info: *binding,
                    visibility: stage,
                });
        }

        Ok(groups
            .into_iter()
            .map(|(group, entries)| BindGroupLayoutDesc {
                group,
                entries: entries.into_values().collect(),
            })
            .collect())
    }

    /// Creates the bind group layouts, then the pipeline over them.
    ///
    /// Layouts come from the reflected descriptions alone, so pipelines built
    /// from equal inputs accept each other's bind groups.
    pub fn build<D: Device>(&self, device: &D) -> Result<PipelineState<D>> {
        let descs = self.layout_descs()?;
        check_limits(&descs, &device.limits())?;

        let bind_group_layouts = descs
            .into_iter()
            .map(|desc| {
                Ok(BindGroupLayout {
                    raw: device.create_bind_group_layout(&desc)?,
                    desc,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let raw_layouts: Vec<(u32, &D::BindGroupLayout)> = bind_group_layouts
            .iter()
            .map(|l| (l.group(), l.raw()))
            .collect();
        let raw = device.create_render_pipeline(
            &PipelineDescriptor {
                label: self.label,
                shader_source: self.program.source(),
                vertex_entry: self.vertex_entry,
                fragment_entry: self.fragment_entry,
                vertex_layout: self.vertex_layout,
                topology: self.topology,
                target_format: self.target_format,
            },
            &raw_layouts,
        )?;

        log::debug!(
            "pipeline '{}' created: {:?}, {:?}, {} bind group(s)",
            self.label,
            self.topology,
            self.target_format,
            bind_group_layouts.len()
        );

        Ok(PipelineState {
            raw,
            label: self.label.to_string(),
            topology: self.topology,
            vertex_layout: self.vertex_layout.clone(),
            target_format: self.target_format,
            bind_group_layouts,
        })
    }

    fn entry(&self, name: &str, stage: ShaderStage) -> Result<&'a EntryPointInfo> {
        let program: &'a ShaderProgram = self.program;
        match program.entry_point(name) {
            Some(ep) if ep.stage == stage => Ok(ep),
            Some(ep) => Err(RenderError::LayoutMismatch(format!(
                "entry point '{name}' is a {:?} shader, expected {stage:?}",
                ep.stage
            ))),
            None => Err(RenderError::LayoutMismatch(format!(
                "shader '{}' has no entry point '{name}'",
                program.label()
            ))),
        }
    }
}

/// Creates a pipeline with the default entry point names.
pub fn create_pipeline<D: Device>(
    device: &D,
    program: &ShaderProgram,
    vertex_layout: &VertexLayout,
    topology: Topology,
    target_format: wgpu::TextureFormat,
) -> Result<PipelineState<D>> {
    PipelineBuilder::new(program, vertex_layout, target_format)
        .topology(topology)
        .build(device)
}

/// Rejects layouts the device could never bind.
fn check_limits(descs: &[BindGroupLayoutDesc], limits: &wgpu::Limits) -> Result<()> {
    for desc in descs {
        if desc.group >= limits.max_bind_groups {
            return Err(RenderError::LayoutMismatch(format!(
                "group {} exceeds the device limit of {} bind groups",
                desc.group, limits.max_bind_groups
            )));
        }
        for entry in &desc.entries {
            let max = match entry.info.kind {
                BindingKind::Uniform => limits.max_uniform_buffer_binding_size,
                BindingKind::Storage { .. } => limits.max_storage_buffer_binding_size,
                BindingKind::Other => continue,
            };
            if entry.info.size > u64::from(max) {
                return Err(RenderError::LayoutMismatch(format!(
                    "{} binding {}/{} needs {} bytes, device allows {max}",
                    entry.info.kind, desc.group, entry.info.binding, entry.info.size
                )));
            }
        }
    }
    Ok(())
}

fn check_vertex_inputs(vs: &EntryPointInfo, layout: &VertexLayout) -> Result<()> {
    for input in &vs.inputs {
        let attr = layout.attribute(input.location).ok_or_else(|| {
            RenderError::LayoutMismatch(format!(
                "vertex input @location({}) has no attribute in the vertex layout",
                input.location
            ))
        })?;
        let kind = vertex_format_kind(attr.format);
        if kind != input.kind {
            return Err(RenderError::LayoutMismatch(format!(
                "vertex input @location({}) is {:?} but the attribute format {:?} is {kind:?}",
                input.location, input.kind, attr.format
            )));
        }
    }
    Ok(())
}

fn check_fragment_output(fs: &EntryPointInfo, format: wgpu::TextureFormat) -> Result<()> {
    if format.is_depth_stencil_format() {
        return Err(RenderError::LayoutMismatch(format!(
            "{format:?} is not a color format"
        )));
    }
    let out = fs.output(0).ok_or_else(|| {
        RenderError::LayoutMismatch("fragment shader writes no @location(0) color".into())
    })?;

    let expected = match format.sample_type(None, None) {
        Some(wgpu::TextureSampleType::Float { .. }) => ScalarKind::Float,
        Some(wgpu::TextureSampleType::Sint) => ScalarKind::Sint,
        Some(wgpu::TextureSampleType::Uint) => ScalarKind::Uint,
        _ => {
            return Err(RenderError::LayoutMismatch(format!(
                "{format:?} cannot be a render target"
            )));
        }
    };
    if out.kind != expected {
        return Err(RenderError::LayoutMismatch(format!(
            "fragment output is {:?} but {format:?} stores {expected:?}",
            out.kind
        )));
    }
    if out.components < u32::from(format.components()) {
        return Err(RenderError::LayoutMismatch(format!(
            "fragment output has {} component(s), {format:?} needs {}",
            out.components,
            format.components()
        )));
    }
    Ok(())
}

/// Scalar class a vertex attribute format presents to the shader.
fn vertex_format_kind(format: wgpu::VertexFormat) -> ScalarKind {
    use wgpu::VertexFormat as F;
    match format {
        F::Uint8 | F::Uint8x2 | F::Uint8x4 | F::Uint16 | F::Uint16x2 | F::Uint16x4
        | F::Uint32 | F::Uint32x2 | F::Uint32x3 | F::Uint32x4 => ScalarKind::Uint,
        F::Sint8 | F::Sint8x2 | F::Sint8x4 | F::Sint16 | F::Sint16x2 | F::Sint16x4
        | F::Sint32 | F::Sint32x2 | F::Sint32x3 | F::Sint32x4 => ScalarKind::Sint,
        // float, normalized and packed formats
        _ => ScalarKind::Float,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{TraceDevice, TraceEvent};
    use crate::shader::compile_shader;

    const TRIANGLE: &str = include_str!("../scenes/shaders/triangle.wgsl");
    const ROTATE: &str = include_str!("../scenes/shaders/rotate.wgsl");
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8UnormSrgb;

    fn uint_layout() -> VertexLayout {
        VertexLayout::new(
            8,
            vec![wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Uint32x2,
                offset: 0,
                shader_location: 0,
            }],
        )
        .unwrap()
    }

    // ── creation ──────────────────────────────────────────────────────────

    #[test]
    fn triangle_pipeline_has_no_bind_groups() {
        let dev = TraceDevice::new();
        let program = compile_shader("tri", TRIANGLE).unwrap();
        let layout = VertexLayout::position2d();

        let p = create_pipeline(&dev, &program, &layout, Topology::TriangleList, FORMAT).unwrap();

        assert!(p.bind_group_layouts().is_empty());
        assert!(matches!(
            p.get_bind_group_layout(0),
            Err(RenderError::NoBindings { group: 0 })
        ));
        assert!(matches!(
            dev.events()[0],
            TraceEvent::CreatePipeline { topology: Topology::TriangleList, format: FORMAT, .. }
        ));
    }

    #[test]
    fn rotate_pipeline_exposes_uniform_group() {
        let dev = TraceDevice::new();
        let program = compile_shader("rot", ROTATE).unwrap();
        let layout = VertexLayout::position2d();

        let p = create_pipeline(&dev, &program, &layout, Topology::TriangleStrip, FORMAT).unwrap();

        let group = p.get_bind_group_layout(0).unwrap();
        assert_eq!(group.desc().entries.len(), 1);
        let entry = group.desc().entry(0).unwrap();
        assert_eq!(entry.info.kind, BindingKind::Uniform);
        assert_eq!(entry.info.size, 64);
        // Only the vertex stage reads the matrix.
        assert_eq!(entry.visibility, wgpu::ShaderStages::VERTEX);
        assert!(matches!(
            p.get_bind_group_layout(1),
            Err(RenderError::NoBindings { group: 1 })
        ));
    }

    #[test]
    fn identical_inputs_give_identical_layouts() {
        let dev = TraceDevice::new();
        let program = compile_shader("rot", ROTATE).unwrap();
        let layout = VertexLayout::position2d();

        let a = create_pipeline(&dev, &program, &layout, Topology::TriangleStrip, FORMAT).unwrap();
        let b = create_pipeline(&dev, &program, &layout, Topology::TriangleStrip, FORMAT).unwrap();

        let descs = |p: &PipelineState<TraceDevice>| {
            p.bind_group_layouts()
                .iter()
                .map(|l| l.desc().clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(descs(&a), descs(&b));
        assert_eq!(a.vertex_layout(), b.vertex_layout());
        assert_eq!(a.topology(), b.topology());
        // Both pipelines were created over the same device layout.
        assert_eq!(
            a.get_bind_group_layout(0).unwrap().raw(),
            b.get_bind_group_layout(0).unwrap().raw()
        );
    }

    #[test]
    fn layouts_are_created_before_the_pipeline() {
        let dev = TraceDevice::new();
        let program = compile_shader("rot", ROTATE).unwrap();
        let layout = VertexLayout::position2d();

        create_pipeline(&dev, &program, &layout, Topology::TriangleStrip, FORMAT).unwrap();

        let events = dev.events();
        let TraceEvent::CreateBindGroupLayout { id, group: 0, slots } = &events[0] else {
            panic!("expected a layout first, got {:?}", events[0]);
        };
        assert_eq!(slots, &vec![0]);
        assert!(matches!(
            &events[1],
            TraceEvent::CreatePipeline { layouts, .. } if layouts == &vec![(0, *id)]
        ));
    }

    #[test]
    fn binding_used_by_both_stages_is_visible_to_both() {
        let src = r#"
@group(0) @binding(0) var<uniform> tint: vec4f;

@vertex
fn vertexMain(@location(0) p: vec2f) -> @builtin(position) vec4f {
    return vec4f(p * tint.w, 0.0, 1.0);
}

@fragment
fn fragmentMain() -> @location(0) vec4f {
    return tint;
}
"#;
        let program = compile_shader("tint", src).unwrap();
        let layout = VertexLayout::position2d();
        let descs = PipelineBuilder::new(&program, &layout, FORMAT).layout_descs().unwrap();

        assert_eq!(descs.len(), 1);
        assert_eq!(descs[0].entries.len(), 1);
        assert_eq!(descs[0].entries[0].visibility, wgpu::ShaderStages::VERTEX_FRAGMENT);
    }

    // ── device limits ─────────────────────────────────────────────────────

    const LARGE_UNIFORM: &str = r#"
struct Palette {
    colors: array<vec4f, 4200>,
};

@group(0) @binding(0) var<uniform> palette: Palette;

@vertex
fn vertexMain(@location(0) p: vec2f) -> @builtin(position) vec4f {
    return vec4f(p, 0.0, 1.0);
}

@fragment
fn fragmentMain() -> @location(0) vec4f {
    return palette.colors[7];
}
"#;

    #[test]
    fn uniform_larger_than_device_limit_is_layout_mismatch() {
        // 4200 * 16 = 67200 bytes, over the default 64 KiB uniform limit.
        let dev = TraceDevice::new();
        let program = compile_shader("palette", LARGE_UNIFORM).unwrap();
        let layout = VertexLayout::position2d();

        let err = create_pipeline(&dev, &program, &layout, Topology::TriangleList, FORMAT)
            .unwrap_err();

        let RenderError::LayoutMismatch(msg) = err else {
            panic!("expected a layout mismatch, got {err:?}");
        };
        assert!(msg.contains("67200"), "{msg}");
        assert!(dev.events().is_empty());
    }

    #[test]
    fn uniform_within_a_raised_limit_builds() {
        let dev = TraceDevice::with_limits(wgpu::Limits {
            max_uniform_buffer_binding_size: 1 << 17,
            ..Default::default()
        });
        let program = compile_shader("palette", LARGE_UNIFORM).unwrap();
        let layout = VertexLayout::position2d();

        let p = create_pipeline(&dev, &program, &layout, Topology::TriangleList, FORMAT).unwrap();
        assert_eq!(p.get_bind_group_layout(0).unwrap().desc().entries[0].info.size, 67200);
    }

    #[test]
    fn group_beyond_bind_group_limit_is_layout_mismatch() {
        let src = ROTATE.replace("@group(0)", "@group(3)");
        let program = compile_shader("rot", &src).unwrap();
        let layout = VertexLayout::position2d();
        let dev = TraceDevice::with_limits(wgpu::Limits {
            max_bind_groups: 2,
            ..Default::default()
        });

        assert!(matches!(
            create_pipeline(&dev, &program, &layout, Topology::TriangleStrip, FORMAT),
            Err(RenderError::LayoutMismatch(_))
        ));
    }

    // ── interface checks ──────────────────────────────────────────────────

    #[test]
    fn missing_entry_point_is_layout_mismatch() {
        let dev = TraceDevice::new();
        let program = compile_shader("tri", TRIANGLE).unwrap();
        let layout = VertexLayout::position2d();

        let err = PipelineBuilder::new(&program, &layout, FORMAT)
            .entry_points("vs_main", FRAGMENT_ENTRY)
            .build(&dev)
            .unwrap_err();

        assert!(matches!(err, RenderError::LayoutMismatch(_)));
        assert!(dev.events().is_empty());
    }

    #[test]
    fn swapped_entry_points_are_rejected() {
        let program = compile_shader("tri", TRIANGLE).unwrap();
        let layout = VertexLayout::position2d();
        let err = PipelineBuilder::new(&program, &layout, FORMAT)
            .entry_points(FRAGMENT_ENTRY, VERTEX_ENTRY)
            .layout_descs()
            .unwrap_err();
        assert!(matches!(err, RenderError::LayoutMismatch(_)));
    }

    #[test]
    fn input_without_attribute_is_layout_mismatch() {
        let program = compile_shader("tri", TRIANGLE).unwrap();
        let layout = VertexLayout::new(
            8,
            vec![wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 0,
                shader_location: 1,
            }],
        )
        .unwrap();
        assert!(matches!(
            PipelineBuilder::new(&program, &layout, FORMAT).layout_descs(),
            Err(RenderError::LayoutMismatch(_))
        ));
    }

    #[test]
    fn integer_attribute_for_float_input_is_layout_mismatch() {
        let program = compile_shader("tri", TRIANGLE).unwrap();
        let layout = uint_layout();
        assert!(matches!(
            PipelineBuilder::new(&program, &layout, FORMAT).layout_descs(),
            Err(RenderError::LayoutMismatch(_))
        ));
    }

    #[test]
    fn float_output_into_integer_target_is_layout_mismatch() {
        let program = compile_shader("tri", TRIANGLE).unwrap();
        let layout = VertexLayout::position2d();
        assert!(matches!(
            PipelineBuilder::new(&program, &layout, wgpu::TextureFormat::Rgba8Uint)
                .layout_descs(),
            Err(RenderError::LayoutMismatch(_))
        ));
    }

    #[test]
    fn depth_target_is_layout_mismatch() {
        let program = compile_shader("tri", TRIANGLE).unwrap();
        let layout = VertexLayout::position2d();
        assert!(matches!(
            PipelineBuilder::new(&program, &layout, wgpu::TextureFormat::Depth32Float)
                .layout_descs(),
            Err(RenderError::LayoutMismatch(_))
        ));
    }

    #[test]
    fn too_few_output_components_is_layout_mismatch() {
        let src = "@vertex\nfn vertexMain(@location(0) p: vec2f) -> @builtin(position) vec4f {\n    return vec4f(p, 0.0, 1.0);\n}\n\n@fragment\nfn fragmentMain() -> @location(0) vec2f {\n    return vec2f(1.0, 0.0);\n}\n";
        let program = compile_shader("rg", src).unwrap();
        let layout = VertexLayout::position2d();

        assert!(matches!(
            PipelineBuilder::new(&program, &layout, FORMAT).layout_descs(),
            Err(RenderError::LayoutMismatch(_))
        ));
        // A two-channel target is fine.
        assert!(
            PipelineBuilder::new(&program, &layout, wgpu::TextureFormat::Rg8Unorm)
                .layout_descs()
                .is_ok()
        );
    }

    #[test]
    fn vertex_formats_classify_by_scalar() {
        assert_eq!(vertex_format_kind(wgpu::VertexFormat::Float32x2), ScalarKind::Float);
        assert_eq!(vertex_format_kind(wgpu::VertexFormat::Unorm8x4), ScalarKind::Float);
        assert_eq!(vertex_format_kind(wgpu::VertexFormat::Uint16x2), ScalarKind::Uint);
        assert_eq!(vertex_format_kind(wgpu::VertexFormat::Sint32), ScalarKind::Sint);
    }
}
