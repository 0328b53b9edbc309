//! Entry-point and binding reflection of a validated naga module.

use crate::error::BindingKind;

/// Scalar type of a shader interface value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScalarKind {
    Float,
    Sint,
    Uint,
    Bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
    Other,
}

/// A `@location(n)` input or output of an entry point.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct InterfaceSlot {
    pub location: u32,
    pub kind: ScalarKind,
    pub components: u32,
}

/// A `@group(g) @binding(b)` resource declared by the module.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BindingInfo {
    pub group: u32,
    pub binding: u32,
    pub kind: BindingKind,
    /// Byte size of the declared type. For a runtime-sized array this is the
    /// minimum binding size: everything before the array plus one element.
    pub size: u64,
    /// Element stride of a trailing runtime-sized array, if the type ends in one.
    pub array_stride: Option<u64>,
}

impl BindingInfo {
    /// Whether a buffer of `len` bytes can back this binding.
    ///
    /// Fixed-size types need exactly `size` bytes. Runtime-sized arrays take
    /// any whole number of elements, at least one.
    pub fn accepts_len(&self, len: u64) -> bool {
        match self.array_stride {
            None => len == self.size,
            Some(stride) => {
                let base = self.size - stride;
                len >= self.size && (len - base) % stride == 0
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPointInfo {
    pub name: String,
    pub stage: ShaderStage,
    pub inputs: Vec<InterfaceSlot>,
    pub outputs: Vec<InterfaceSlot>,
    /// Bindings this entry point (transitively) uses, sorted by group then binding.
    pub bindings: Vec<BindingInfo>,
}

impl EntryPointInfo {
    pub fn input(&self, location: u32) -> Option<&InterfaceSlot> {
        self.inputs.iter().find(|s| s.location == location)
    }

    pub fn output(&self, location: u32) -> Option<&InterfaceSlot> {
        self.outputs.iter().find(|s| s.location == location)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderReflection {
    pub entry_points: Vec<EntryPointInfo>,
    /// Every binding declared at module scope, used or not.
    pub bindings: Vec<BindingInfo>,
}

impl ShaderReflection {
    pub fn from_module(module: &naga::Module, info: &naga::valid::ModuleInfo) -> Self {
        let mut declared: Vec<(naga::Handle<naga::GlobalVariable>, BindingInfo)> = module
            .global_variables
            .iter()
            .filter_map(|(handle, var)| {
                let rb = var.binding.as_ref()?;
                let kind = match var.space {
                    naga::AddressSpace::Uniform => BindingKind::Uniform,
                    naga::AddressSpace::Storage { access } => BindingKind::Storage {
                        read_only: !access.contains(naga::StorageAccess::STORE),
                    },
                    _ => BindingKind::Other,
                };
                let (size, array_stride) = binding_size(module, var.ty);
                Some((
                    handle,
                    BindingInfo {
                        group: rb.group,
                        binding: rb.binding,
                        kind,
                        size,
                        array_stride,
                    },
                ))
            })
            .collect();
        declared.sort_by_key(|(_, b)| (b.group, b.binding));

        let entry_points = module
            .entry_points
            .iter()
            .enumerate()
            .map(|(i, ep)| {
                let usage = info.get_entry_point(i);

                let mut inputs = Vec::new();
                for arg in &ep.function.arguments {
                    collect_slots(module, arg.ty, arg.binding.as_ref(), &mut inputs);
                }
                let mut outputs = Vec::new();
                if let Some(result) = &ep.function.result {
                    collect_slots(module, result.ty, result.binding.as_ref(), &mut outputs);
                }

                EntryPointInfo {
                    name: ep.name.clone(),
                    stage: match ep.stage {
                        naga::ShaderStage::Vertex => ShaderStage::Vertex,
                        naga::ShaderStage::Fragment => ShaderStage::Fragment,
                        naga::ShaderStage::Compute => ShaderStage::Compute,
                        _ => ShaderStage::Other,
                    },
                    inputs,
                    outputs,
                    bindings: declared
                        .iter()
                        .filter(|(handle, _)| !usage[*handle].is_empty())
                        .map(|(_, b)| *b)
                        .collect(),
                }
            })
            .collect();

        Self {
            entry_points,
            bindings: declared.into_iter().map(|(_, b)| b).collect(),
        }
    }

    pub fn entry_point(&self, name: &str) -> Option<&EntryPointInfo> {
        self.entry_points.iter().find(|ep| ep.name == name)
    }
}

/// Minimum size and runtime-array stride of a bound type.
///
/// naga sizes a runtime-sized array as a single element, so the trailing
/// array of a struct is measured from its member offset instead.
fn binding_size(module: &naga::Module, ty: naga::Handle<naga::Type>) -> (u64, Option<u64>) {
    let runtime_stride = |ty: naga::Handle<naga::Type>| match module.types[ty].inner {
        naga::TypeInner::Array {
            size: naga::ArraySize::Dynamic,
            stride,
            ..
        } => Some(u64::from(stride)),
        _ => None,
    };

    let inner = &module.types[ty].inner;
    if let Some(stride) = runtime_stride(ty) {
        return (stride, Some(stride));
    }
    if let naga::TypeInner::Struct { members, .. } = inner {
        if let Some(last) = members.last() {
            if let Some(stride) = runtime_stride(last.ty) {
                return (u64::from(last.offset) + stride, Some(stride));
            }
        }
    }
    (u64::from(inner.size(module.to_ctx())), None)
}

fn collect_slots(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<InterfaceSlot>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            if let Some((kind, components)) = value_shape(&module.types[ty].inner) {
                out.push(InterfaceSlot {
                    location: *location,
                    kind,
                    components,
                });
            }
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        // Structs carry bindings on their members.
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_slots(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn value_shape(inner: &naga::TypeInner) -> Option<(ScalarKind, u32)> {
    match inner {
        naga::TypeInner::Scalar(scalar) => Some((scalar_kind(scalar.kind)?, 1)),
        naga::TypeInner::Vector { size, scalar } => Some((scalar_kind(scalar.kind)?, *size as u32)),
        _ => None,
    }
}

fn scalar_kind(kind: naga::ScalarKind) -> Option<ScalarKind> {
    match kind {
        naga::ScalarKind::Float => Some(ScalarKind::Float),
        naga::ScalarKind::Sint => Some(ScalarKind::Sint),
        naga::ScalarKind::Uint => Some(ScalarKind::Uint),
        naga::ScalarKind::Bool => Some(ScalarKind::Bool),
        _ => None,
    }
}
