use std::path::Path;

use anyhow::{Context, Result};
use ember_engine::device::{GpuInit, OffscreenTarget, WgpuDevice};
use ember_engine::{build_frame, FrameDesc};

/// Renders `frame` into an offscreen texture and writes it to `output` as PNG.
pub fn render_png(frame: &FrameDesc, size: (u32, u32), output: &Path) -> Result<()> {
    let (width, height) = size;

    let device = WgpuDevice::headless(&GpuInit::headless())
        .context("failed to acquire a headless GPU device")?;
    let target = OffscreenTarget::new(&device, width, height, wgpu::TextureFormat::Rgba8Unorm)
        .context("failed to create offscreen target")?;

    let stats = build_frame(&device, &target, frame)
        .with_context(|| format!("failed to build frame '{}'", frame.label))?;
    log::info!(
        "'{}': {} triangle(s) from {} vertices",
        frame.label,
        stats.triangle_count,
        stats.vertex_count
    );

    let pixels = target.read_pixels(&device).context("failed to read back frame")?;
    let image = image::RgbaImage::from_raw(pixels.width, pixels.height, pixels.rgba)
        .context("read-back size does not match the target")?;
    image
        .save(output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    log::info!("wrote {width}x{height} frame to {}", output.display());
    Ok(())
}
