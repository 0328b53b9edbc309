use crate::error::{RenderError, Result, ShaderDiagnostic, SourceLocation};

use super::reflect::{EntryPointInfo, ShaderReflection};

/// WGSL source that parsed and validated, with its reflected interface.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    label: String,
    source: String,
    reflection: ShaderReflection,
}

impl ShaderProgram {
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[inline]
    pub fn reflection(&self) -> &ShaderReflection {
        &self.reflection
    }

    pub fn entry_point(&self, name: &str) -> Option<&EntryPointInfo> {
        self.reflection.entry_point(name)
    }
}

/// Compiles WGSL source: parse, then full validation.
///
/// Fails with `ShaderCompile` carrying the first diagnostic and its
/// 1-based line/column when naga can attribute it to a span.
pub fn compile_shader(label: &str, source: &str) -> Result<ShaderProgram> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| {
        compile_error(label, e.message().to_string(), e.location(source))
    })?;

    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .map_err(|e| compile_error(label, error_chain(e.as_inner()), e.location(source)))?;

    let reflection = ShaderReflection::from_module(&module, &info);
    log::debug!(
        "shader '{label}' compiled: {} entry point(s), {} binding(s)",
        reflection.entry_points.len(),
        reflection.bindings.len()
    );

    Ok(ShaderProgram {
        label: label.to_string(),
        source: source.to_string(),
        reflection,
    })
}

fn compile_error(label: &str, message: String, location: Option<naga::SourceLocation>) -> RenderError {
    RenderError::ShaderCompile(ShaderDiagnostic {
        label: label.to_string(),
        message,
        location: location.map(|loc| SourceLocation {
            line: loc.line_number,
            column: loc.line_position,
        }),
    })
}

/// Joins an error with its sources; naga's validation errors nest the useful part.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        source = inner.source();
    }
    msg
}
