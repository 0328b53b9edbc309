use crate::math::Mat4;

/// Host-side uniform block.
///
/// The byte size must equal the size of the shader's declared binding type;
/// the bind group assembler rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformData {
    bytes: Vec<u8>,
}

impl UniformData {
    /// Copies the bytes of any plain-old-data value.
    pub fn from_pod<T: bytemuck::Pod>(value: &T) -> Self {
        Self::from_slice(std::slice::from_ref(value))
    }

    /// Copies a run of plain-old-data values, as for a block holding an array.
    pub fn from_slice<T: bytemuck::Pod>(values: &[T]) -> Self {
        Self {
            bytes: bytemuck::cast_slice(values).to_vec(),
        }
    }

    /// A column-major `mat4x4f` block (64 bytes).
    pub fn from_mat4(m: &Mat4) -> Self {
        Self::from_pod(m)
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
