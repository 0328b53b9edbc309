use crate::error::{RenderError, Result};

use super::{Surface, WgpuDevice};

/// A texture used as render target when no window is involved.
///
/// Only 4-byte RGBA/BGRA formats are accepted so the result can be read back
/// as a [`PixelSnapshot`].
#[derive(Debug)]
pub struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
}

impl OffscreenTarget {
    pub fn new(
        device: &WgpuDevice,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::Allocation(format!(
                "offscreen target must be non-empty, got {width}x{height}"
            )));
        }
        if !is_readable_rgba8(format) {
            return Err(RenderError::Allocation(format!(
                "offscreen format {format:?} is not an 8-bit RGBA/BGRA format"
            )));
        }

        let texture = device.scoped(
            || {
                device.raw().create_texture(&wgpu::TextureDescriptor {
                    label: Some("ember offscreen target"),
                    size: wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                        | wgpu::TextureUsages::COPY_SRC,
                    view_formats: &[],
                })
            },
            RenderError::Allocation,
        )?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            texture,
            view,
            format,
            width,
            height,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Copies the target back to the host, blocking until the GPU is done.
    pub fn read_pixels(&self, device: &WgpuDevice) -> Result<PixelSnapshot> {
        let unpadded = self.width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let staging = device.scoped(
            || {
                let staging = device.raw().create_buffer(&wgpu::BufferDescriptor {
                    label: Some("ember offscreen readback"),
                    size: padded as u64 * self.height as u64,
                    usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });

                let mut encoder = device
                    .raw()
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("ember offscreen readback encoder"),
                    });
                encoder.copy_texture_to_buffer(
                    wgpu::TexelCopyTextureInfo {
                        texture: &self.texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d::ZERO,
                        aspect: wgpu::TextureAspect::All,
                    },
                    wgpu::TexelCopyBufferInfo {
                        buffer: &staging,
                        layout: wgpu::TexelCopyBufferLayout {
                            offset: 0,
                            bytes_per_row: Some(padded),
                            rows_per_image: Some(self.height),
                        },
                    },
                    wgpu::Extent3d {
                        width: self.width,
                        height: self.height,
                        depth_or_array_layers: 1,
                    },
                );
                device.queue().submit(std::iter::once(encoder.finish()));
                staging
            },
            RenderError::Readback,
        )?;

        let raw = device.map_read(&staging)?;

        let bgra = matches!(
            self.format,
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
        );
        let mut rgba = Vec::with_capacity((unpadded * self.height) as usize);
        for row in raw.chunks(padded as usize).take(self.height as usize) {
            for px in row[..unpadded as usize].chunks_exact(4) {
                if bgra {
                    rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                } else {
                    rgba.extend_from_slice(px);
                }
            }
        }

        Ok(PixelSnapshot {
            width: self.width,
            height: self.height,
            rgba,
        })
    }
}

impl Surface<WgpuDevice> for OffscreenTarget {
    fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    fn current_view(&self) -> Result<wgpu::TextureView> {
        Ok(self.view.clone())
    }
}

fn is_readable_rgba8(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::Rgba8Unorm
            | wgpu::TextureFormat::Rgba8UnormSrgb
            | wgpu::TextureFormat::Bgra8Unorm
            | wgpu::TextureFormat::Bgra8UnormSrgb
    )
}

/// Tightly packed RGBA8 copy of a rendered frame, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelSnapshot {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl PixelSnapshot {
    /// Returns the pixel at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        let px = self.rgba.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Maps normalized device coordinates (+Y up) to the pixel whose center
    /// is nearest.
    pub fn ndc_to_pixel(&self, ndc: [f32; 2]) -> (u32, u32) {
        let fx = (ndc[0] * 0.5 + 0.5) * self.width as f32;
        let fy = (0.5 - ndc[1] * 0.5) * self.height as f32;
        let x = (fx.floor().max(0.0) as u32).min(self.width.saturating_sub(1));
        let y = (fy.floor().max(0.0) as u32).min(self.height.saturating_sub(1));
        (x, y)
    }

    /// Counts pixels for which `pred` holds.
    pub fn count(&self, mut pred: impl FnMut([u8; 4]) -> bool) -> usize {
        self.rgba
            .chunks_exact(4)
            .filter(|px| pred([px[0], px[1], px[2], px[3]]))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> PixelSnapshot {
        // 2x2: red, green / blue, white
        PixelSnapshot {
            width: 2,
            height: 2,
            rgba: vec![
                255, 0, 0, 255, 0, 255, 0, 255, //
                0, 0, 255, 255, 255, 255, 255, 255,
            ],
        }
    }

    #[test]
    fn pixel_reads_row_major() {
        let s = checker();
        assert_eq!(s.pixel(1, 0), Some([0, 255, 0, 255]));
        assert_eq!(s.pixel(0, 1), Some([0, 0, 255, 255]));
        assert_eq!(s.pixel(2, 0), None);
    }

    #[test]
    fn ndc_corners_map_to_image_corners() {
        let s = PixelSnapshot { width: 100, height: 50, rgba: vec![0; 100 * 50 * 4] };
        assert_eq!(s.ndc_to_pixel([-1.0, 1.0]), (0, 0));
        assert_eq!(s.ndc_to_pixel([1.0, -1.0]), (99, 49));
        assert_eq!(s.ndc_to_pixel([0.0, 0.0]), (50, 25));
    }

    #[test]
    fn count_filters_pixels() {
        let s = checker();
        assert_eq!(s.count(|px| px[3] == 255), 4);
        assert_eq!(s.count(|px| px == [255, 255, 255, 255]), 1);
    }

    #[test]
    fn only_rgba8_formats_are_readable() {
        assert!(is_readable_rgba8(wgpu::TextureFormat::Rgba8Unorm));
        assert!(is_readable_rgba8(wgpu::TextureFormat::Bgra8UnormSrgb));
        assert!(!is_readable_rgba8(wgpu::TextureFormat::Rgba16Float));
    }
}
