use anyhow::{Context, Result};
use ember_engine::device::TraceDevice;
use ember_engine::{build_frame, FrameDesc};

/// Runs `frame` against the trace device and prints every device call.
pub fn dry_run(frame: &FrameDesc) -> Result<()> {
    let device = TraceDevice::new();
    let surface = device.surface(wgpu::TextureFormat::Bgra8UnormSrgb);

    let stats = build_frame(&device, &surface, frame)
        .with_context(|| format!("dry run of '{}' failed", frame.label))?;

    for (i, event) in device.events().iter().enumerate() {
        println!("{i:>3}  {event:?}");
    }
    println!(
        "{} draw(s), {} triangle(s), {} bytes uploaded",
        stats.draw_calls, stats.triangle_count, stats.uploaded_bytes
    );
    Ok(())
}
