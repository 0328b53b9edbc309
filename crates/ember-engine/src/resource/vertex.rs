use crate::error::{RenderError, Result};

/// Interpretation of a vertex buffer: stride plus attribute list.
///
/// Invariants (checked by [`VertexLayout::new`]):
/// - stride is non-zero and a multiple of 4
/// - every `offset + format.size() <= stride`, offsets 4-byte aligned
/// - shader locations are unique
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    stride: u64,
    attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexLayout {
    pub fn new(stride: u64, attributes: Vec<wgpu::VertexAttribute>) -> Result<Self> {
        if stride == 0 || stride % 4 != 0 {
            return Err(RenderError::LayoutMismatch(format!(
                "vertex stride must be a non-zero multiple of 4, got {stride}"
            )));
        }

        for (i, attr) in attributes.iter().enumerate() {
            let end = attr.offset + attr.format.size();
            if end > stride {
                return Err(RenderError::LayoutMismatch(format!(
                    "attribute @location({}) ends at byte {end}, past stride {stride}",
                    attr.shader_location
                )));
            }
            if attr.offset % 4 != 0 {
                return Err(RenderError::LayoutMismatch(format!(
                    "attribute @location({}) offset {} is not 4-byte aligned",
                    attr.shader_location, attr.offset
                )));
            }
            if attributes[..i]
                .iter()
                .any(|a| a.shader_location == attr.shader_location)
            {
                return Err(RenderError::LayoutMismatch(format!(
                    "shader location {} appears twice in the vertex layout",
                    attr.shader_location
                )));
            }
        }

        Ok(Self { stride, attributes })
    }

    /// One `vec2f` position per vertex at `@location(0)`, stride 8.
    pub fn position2d() -> Self {
        Self {
            stride: 8,
            attributes: wgpu::vertex_attr_array![0 => Float32x2].to_vec(),
        }
    }

    #[inline]
    pub fn stride(&self) -> u64 {
        self.stride
    }

    #[inline]
    pub fn attributes(&self) -> &[wgpu::VertexAttribute] {
        &self.attributes
    }

    pub fn attribute(&self, location: u32) -> Option<&wgpu::VertexAttribute> {
        self.attributes.iter().find(|a| a.shader_location == location)
    }

    /// Number of whole vertices in `byte_len` bytes.
    ///
    /// Fails unless `byte_len` is an exact multiple of the stride.
    pub fn vertex_count(&self, byte_len: u64) -> Result<u32> {
        if byte_len % self.stride != 0 {
            return Err(RenderError::LayoutMismatch(format!(
                "{byte_len} bytes is not a whole number of {}-byte vertices",
                self.stride
            )));
        }
        u32::try_from(byte_len / self.stride)
            .map_err(|_| RenderError::LayoutMismatch("vertex count exceeds u32".into()))
    }
}

/// Host-side vertex components paired with their layout.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexData {
    components: Vec<f32>,
    layout: VertexLayout,
    count: u32,
}

impl VertexData {
    /// Fails with `LayoutMismatch` unless `stride * count == byte length`.
    pub fn new(components: Vec<f32>, layout: VertexLayout) -> Result<Self> {
        let byte_len = std::mem::size_of_val(components.as_slice()) as u64;
        let count = layout.vertex_count(byte_len)?;
        Ok(Self {
            components,
            layout,
            count,
        })
    }

    /// Tightly packed 2D positions using [`VertexLayout::position2d`].
    pub fn positions2d(points: &[[f32; 2]]) -> Self {
        let components: Vec<f32> = points.iter().flatten().copied().collect();
        Self {
            count: points.len() as u32,
            components,
            layout: VertexLayout::position2d(),
        }
    }

    #[inline]
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn components(&self) -> &[f32] {
        &self.components
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(format: wgpu::VertexFormat, offset: u64, location: u32) -> wgpu::VertexAttribute {
        wgpu::VertexAttribute {
            format,
            offset,
            shader_location: location,
        }
    }

    // ── layout ────────────────────────────────────────────────────────────

    #[test]
    fn position2d_layout_is_valid() {
        let l = VertexLayout::position2d();
        let rebuilt = VertexLayout::new(l.stride(), l.attributes().to_vec()).unwrap();
        assert_eq!(rebuilt, l);
    }

    #[test]
    fn zero_stride_is_rejected() {
        assert!(matches!(
            VertexLayout::new(0, vec![]),
            Err(RenderError::LayoutMismatch(_))
        ));
    }

    #[test]
    fn attribute_past_stride_is_rejected() {
        let err = VertexLayout::new(8, vec![attr(wgpu::VertexFormat::Float32x3, 0, 0)]);
        assert!(matches!(err, Err(RenderError::LayoutMismatch(_))));
    }

    #[test]
    fn attribute_ending_exactly_at_stride_is_accepted() {
        let l = VertexLayout::new(
            24,
            vec![
                attr(wgpu::VertexFormat::Float32x2, 0, 0),
                attr(wgpu::VertexFormat::Float32x4, 8, 1),
            ],
        );
        assert!(l.is_ok());
    }

    #[test]
    fn duplicate_locations_are_rejected() {
        let err = VertexLayout::new(
            16,
            vec![
                attr(wgpu::VertexFormat::Float32x2, 0, 0),
                attr(wgpu::VertexFormat::Float32x2, 8, 0),
            ],
        );
        assert!(matches!(err, Err(RenderError::LayoutMismatch(_))));
    }

    #[test]
    fn vertex_count_requires_whole_vertices() {
        let l = VertexLayout::position2d();
        assert_eq!(l.vertex_count(24).unwrap(), 3);
        assert!(l.vertex_count(20).is_err());
    }

    // ── data ──────────────────────────────────────────────────────────────

    #[test]
    fn data_size_matches_stride_times_count() {
        let d = VertexData::new(vec![0.0, 0.5, -0.5, -0.5, 0.5, -0.5], VertexLayout::position2d())
            .unwrap();
        assert_eq!(d.vertex_count(), 3);
        assert_eq!(
            d.as_bytes().len() as u64,
            d.layout().stride() * d.vertex_count() as u64
        );
    }

    #[test]
    fn odd_component_count_is_rejected() {
        let err = VertexData::new(vec![0.0, 0.5, 1.0], VertexLayout::position2d());
        assert!(matches!(err, Err(RenderError::LayoutMismatch(_))));
    }

    #[test]
    fn components_follow_stride() {
        let d = VertexData::positions2d(&[[1.0, 2.0], [3.0, 4.0]]);
        let per_vertex = (d.layout().stride() / 4) as usize;
        assert_eq!(&d.components()[per_vertex..], &[3.0, 4.0]);
    }

    #[test]
    fn bytes_are_native_endian_f32() {
        let d = VertexData::positions2d(&[[1.0, 0.0]]);
        assert_eq!(&d.as_bytes()[..4], &1.0f32.to_ne_bytes());
    }
}
