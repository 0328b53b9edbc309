use std::fmt;

/// Errors surfaced by frame construction.
///
/// Every step of `build_frame` returns one of these immediately; nothing is
/// retried and no command sequence reaches the queue after a failure.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("allocation failed: {0}")]
    Allocation(String),

    #[error("write of {len} bytes at offset {offset} exceeds buffer size {size}")]
    Range { offset: u64, len: u64, size: u64 },

    #[error("write of {len} bytes at offset {offset} is not 4-byte aligned")]
    UnalignedWrite { offset: u64, len: u64 },

    #[error("buffer usage {actual:?} does not include {required:?}")]
    Usage {
        required: wgpu::BufferUsages,
        actual: wgpu::BufferUsages,
    },

    #[error("shader compile error: {0}")]
    ShaderCompile(ShaderDiagnostic),

    #[error("layout mismatch: {0}")]
    LayoutMismatch(String),

    #[error("pipeline declares no bindings in group {group}")]
    NoBindings { group: u32 },

    #[error("binding slot {slot} is not declared in group {group}")]
    BindingSlot { group: u32, slot: u32 },

    #[error("binding slot {slot} expects a {expected} buffer, got {found}")]
    BindingType {
        slot: u32,
        expected: BindingKind,
        found: BindingKind,
    },

    #[error("binding slot {slot} supplied more than once in group {group}")]
    DuplicateBinding { group: u32, slot: u32 },

    #[error("group {group} is missing bindings for slots {missing:?}")]
    IncompleteBinding { group: u32, missing: Vec<u32> },

    #[error("no render pass has been begun")]
    PassNotBegun,

    #[error("a render pass is already being recorded")]
    PassAlreadyBegun,

    #[error("command sequence is closed")]
    SequenceClosed,

    #[error("command sequence has not been ended")]
    SequenceNotEnded,

    #[error("command sequence has already been submitted")]
    SequenceAlreadySubmitted,

    #[error("draw issued with no pipeline bound")]
    NoPipelineBound,

    #[error("read-back failed: {0}")]
    Readback(String),

    /// The device refused a call the core had already validated.
    #[error("device rejected {0}")]
    Device(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Resource kind of a buffer binding.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BindingKind {
    Uniform,
    Storage { read_only: bool },
    /// Textures, samplers and anything else this renderer does not bind.
    Other,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingKind::Uniform => f.write_str("uniform"),
            BindingKind::Storage { read_only: true } => f.write_str("read-only storage"),
            BindingKind::Storage { read_only: false } => f.write_str("storage"),
            BindingKind::Other => f.write_str("non-buffer"),
        }
    }
}

/// 1-based position inside shader source.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

/// Message and optional location of a shader compilation failure.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ShaderDiagnostic {
    pub label: String,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ShaderDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(f, "{}:{}:{}: {}", self.label, loc.line, loc.column, self.message),
            None => write!(f, "{}: {}", self.label, self.message),
        }
    }
}
