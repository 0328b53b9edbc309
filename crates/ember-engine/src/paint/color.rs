/// Straight-alpha RGBA color with `f32` channels.
///
/// Used for clear colors. Fragment colors live in the shaders. Channels are
/// usually in `[0, 1]`, but float targets store values outside that range.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Default clear color of a frame.
    pub const LIGHT_GRAY: Self = Self::new(0.9, 0.9, 0.9, 1.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }

    /// Replaces NaN and infinite channels with 0, keeping every finite value.
    #[inline]
    pub fn finite_or_zero(self) -> Self {
        let c = |v: f32| if v.is_finite() { v } else { 0.0 };
        Self {
            r: c(self.r),
            g: c(self.g),
            b: c(self.b),
            a: c(self.a),
        }
    }
}

impl From<Color> for wgpu::Color {
    fn from(c: Color) -> Self {
        wgpu::Color {
            r: c.r as f64,
            g: c.g as f64,
            b: c.b as f64,
            a: c.a as f64,
        }
    }
}
