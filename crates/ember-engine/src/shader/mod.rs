//! Shader compilation (WGSL via naga) and interface reflection.

mod compile;
mod reflect;

pub use compile::{compile_shader, ShaderProgram};
pub use reflect::{
    BindingInfo, EntryPointInfo, InterfaceSlot, ScalarKind, ShaderReflection, ShaderStage,
};
