/// Initialization parameters for device acquisition.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Backends wgpu may choose from.
    ///
    /// `WGPU_BACKEND` (e.g. "vulkan", "metal,gl") overrides this at startup
    /// through [`GpuInit::from_env`].
    pub backends: wgpu::Backends,

    /// Adapter power preference.
    pub power_preference: wgpu::PowerPreference,

    /// Request a software (fallback) adapter.
    ///
    /// Useful on CI machines without a hardware GPU.
    pub force_fallback_adapter: bool,

    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior) for windowed surfaces.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features.
    ///
    /// Favor an empty set for portability unless a feature is strictly necessary.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            // Texture dimensions are raised to the adapter's at request time.
            required_limits: wgpu::Limits::downlevel_defaults(),
            desired_maximum_frame_latency: 2,
        }
    }
}

impl GpuInit {
    /// Defaults, with the backend set taken from `WGPU_BACKEND` when present.
    pub fn from_env() -> Self {
        let mut init = Self::default();
        if let Some(backends) = wgpu::Backends::from_env() {
            init.backends = backends;
        }
        init
    }

    /// Configuration for offscreen rendering: linear target formats.
    pub fn headless() -> Self {
        Self {
            prefer_srgb: false,
            ..Self::from_env()
        }
    }
}
