/// How consecutive vertices assemble into triangles.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Topology {
    /// Every 3 vertices form an independent triangle.
    #[default]
    TriangleList,
    /// Each vertex after the first two forms a triangle with the previous two.
    TriangleStrip,
}

impl Topology {
    pub fn to_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }

    /// Number of triangles `vertices` vertices produce. Leftovers are ignored.
    pub fn triangle_count(self, vertices: u32) -> u32 {
        match self {
            Topology::TriangleList => vertices / 3,
            Topology::TriangleStrip => vertices.saturating_sub(2),
        }
    }

    /// Vertices a list draw would leave unassembled.
    pub fn leftover_vertices(self, vertices: u32) -> u32 {
        match self {
            Topology::TriangleList => vertices % 3,
            Topology::TriangleStrip => 0,
        }
    }

    /// Smallest vertex count that produces one triangle.
    #[inline]
    pub fn min_vertices(self) -> u32 {
        3
    }
}
