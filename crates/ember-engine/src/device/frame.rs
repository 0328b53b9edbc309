use crate::error::Result;

use super::{Surface, WgpuDevice};

/// A swapchain texture acquired for one frame.
///
/// Holding it blocks acquisition of subsequent frames; present it right after
/// `build_frame` returns.
pub struct AcquiredFrame {
    pub(crate) surface_texture: wgpu::SurfaceTexture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) format: wgpu::TextureFormat,
}

impl AcquiredFrame {
    /// Schedules the texture for presentation.
    pub fn present(self) {
        drop(self.view);
        self.surface_texture.present();
    }
}

impl Surface<WgpuDevice> for AcquiredFrame {
    fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn current_view(&self) -> Result<wgpu::TextureView> {
        Ok(self.view.clone())
    }
}
