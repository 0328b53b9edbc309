use crate::error::{RenderError, Result};

use super::{surface, AcquiredFrame, GpuInit, SurfaceErrorAction, WgpuDevice};

/// Owns the wgpu objects needed to present to a window.
///
/// This type is the windowed rendering context:
/// - creates and stores Instance/Adapter/Device/Queue
/// - creates and configures the Surface (swapchain)
/// - acquires frames that act as the [`Surface`](super::Surface) of `build_frame`
pub struct Gpu<'w> {
    /// wgpu instance used to create the adapter and surface.
    _instance: wgpu::Instance,

    /// Surface bound to the window.
    surface: wgpu::Surface<'w>,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Device capability handed to the frame core.
    device: WgpuDevice,

    /// Active surface configuration.
    config: wgpu::SurfaceConfiguration,
}

impl<'w> Gpu<'w> {
    /// Creates a GPU context bound to a window.
    ///
    /// `size` is the drawable size in physical pixels. Adapter/device
    /// acquisition is asynchronous under wgpu.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'w>>,
        size: (u32, u32),
        init: GpuInit,
    ) -> Result<Self> {
        let (width, height) = size;
        if width == 0 || height == 0 {
            return Err(RenderError::CapabilityUnavailable("window has zero size".into()));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });

        let surface = instance.create_surface(target).map_err(|e| {
            RenderError::CapabilityUnavailable(format!("failed to create wgpu surface: {e}"))
        })?;

        let (adapter, device) = WgpuDevice::request(&instance, Some(&surface), &init).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&surface_caps, init.prefer_srgb)
            .ok_or_else(|| RenderError::CapabilityUnavailable("no supported surface formats".into()))?;

        let alpha_mode = surface::choose_alpha_mode(&surface_caps, init.alpha_mode);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: init.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };

        surface.configure(device.raw(), &config);
        log::debug!("surface configured: {format:?} {width}x{height}");

        Ok(Self {
            _instance: instance,
            surface,
            adapter,
            device,
            config,
        })
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the configured drawable size (physical pixels).
    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Returns the selected adapter.
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Returns the device capability.
    pub fn device(&self) -> &WgpuDevice {
        &self.device
    }

    /// Reconfigures the surface after a resize.
    ///
    /// wgpu does not support configuring a surface with a 0x0 size; such
    /// resizes are ignored until the window becomes visible again.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(self.device.raw(), &self.config);
    }

    /// Acquires the next surface texture.
    ///
    /// The returned frame is the render target of one `build_frame` call and
    /// must be presented (or dropped) promptly.
    pub fn acquire_frame(&self) -> std::result::Result<AcquiredFrame, wgpu::SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        Ok(AcquiredFrame {
            surface_texture,
            view,
            format: self.config.format,
        })
    }

    /// Converts a `SurfaceError` into a higher-level action.
    pub fn handle_surface_error(&mut self, err: wgpu::SurfaceError) -> SurfaceErrorAction {
        surface::map_surface_error(&self.surface, self.device.raw(), &self.config, err)
    }
}
