use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use ember_engine::device::{Gpu, GpuInit, SurfaceErrorAction};
use ember_engine::{build_frame, FrameDesc};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

/// Opens a window and presents `frame` until the window is closed.
///
/// The frame is rebuilt on every redraw request (initial show, resize,
/// expose); a failed frame is logged and the previous image stays up.
pub fn run(frame: FrameDesc, size: (u32, u32), gpu_init: GpuInit) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut viewer = Viewer {
        frame,
        size,
        gpu_init,
        window: None,
        fatal: None,
    };
    event_loop
        .run_app(&mut viewer)
        .context("event loop terminated with an error")?;

    match viewer.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct WindowEntry {
    // Dropped before the window it presents to.
    gpu: Gpu<'static>,
    window: Arc<Window>,
}

struct Viewer {
    frame: FrameDesc,
    size: (u32, u32),
    gpu_init: GpuInit,
    window: Option<WindowEntry>,
    fatal: Option<anyhow::Error>,
}

impl Viewer {
    fn create_window(&self, event_loop: &ActiveEventLoop) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(format!("ember: {}", self.frame.label))
            .with_inner_size(PhysicalSize::new(self.size.0, self.size.1));

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let inner = window.inner_size();
        let gpu = pollster::block_on(Gpu::new(
            Arc::clone(&window),
            (inner.width, inner.height),
            self.gpu_init.clone(),
        ))
        .context("GPU initialization failed for window")?;
        log::info!("presenting as {:?}", gpu.surface_format());

        Ok(WindowEntry { gpu, window })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(entry) = self.window.as_mut() else {
            return;
        };

        let acquired = match entry.gpu.acquire_frame() {
            Ok(acquired) => acquired,
            Err(err) => {
                let reason = err.to_string();
                match entry.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Reconfigured => entry.window.request_redraw(),
                    SurfaceErrorAction::SkipFrame => log::warn!("skipping frame: {reason}"),
                    SurfaceErrorAction::Fatal => {
                        self.fail(event_loop, anyhow!("surface lost: {reason}"));
                    }
                }
                return;
            }
        };

        match build_frame(entry.gpu.device(), &acquired, &self.frame) {
            Ok(stats) => {
                log::debug!("frame presented: {stats:?}");
                entry.window.pre_present_notify();
                acquired.present();
            }
            // Not presenting keeps the last good image on screen.
            Err(err) => log::error!("frame '{}' failed: {err}", self.frame.label),
        }
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match self.create_window(event_loop) {
            Ok(entry) => {
                entry.window.request_redraw();
                self.window = Some(entry);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.window = None;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(entry) = self.window.as_mut() {
                    entry.gpu.resize(size.width, size.height);
                    entry.window.request_redraw();
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}
