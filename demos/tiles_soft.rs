//! Tile terminal demo rendered on the CPU and shown through softbuffer.
//!
//! Run: cargo run --bin tiles-soft

use std::num::NonZeroU32;
use std::sync::Arc;

use rlterm_core::Atlas;
use rlterm_demos::{DemoConfig, DemoError, Scene};
use rlterm_soft::SoftBackend;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

struct SoftState {
    window: Arc<Window>,
    surface: softbuffer::Surface<Arc<Window>, Arc<Window>>,
    backend: SoftBackend,
    atlas: Atlas<SoftBackend>,
    scene: Scene,
}

struct SoftApp {
    config: DemoConfig,
    state: Option<SoftState>,
}

impl SoftApp {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Box<dyn std::error::Error>> {
        let (sheet, glyphs) = self.config.load_sheet()?;
        let (width, height) = self.config.window_size(sheet.tile_size());

        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(true);
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let context = softbuffer::Context::new(window.clone())?;
        let surface = softbuffer::Surface::new(&context, window.clone())?;

        let size = window.inner_size();
        let mut backend = SoftBackend::new(size.width.max(1), size.height.max(1))?;
        let atlas = Atlas::new(&mut backend, &sheet.atlas_data())?;
        let scene = Scene::new(&self.config, sheet.tile_size(), glyphs)?;

        let mut state = SoftState {
            window,
            surface,
            backend,
            atlas,
            scene,
        };
        resize_surface(&mut state, size.width, size.height)?;
        self.state = Some(state);
        Ok(())
    }

    fn render(&mut self) -> Result<(), DemoError> {
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };
        let (width, height) = state.backend.dimensions();
        state.scene.tick()?;
        state
            .scene
            .render(&mut state.backend, &state.atlas, width, height)?;

        let Ok(mut buf) = state.surface.buffer_mut() else {
            log::warn!("softbuffer surface unavailable, frame dropped");
            return Ok(());
        };
        state
            .backend
            .blit_to_buffer(&mut buf, width as usize, height as usize);
        if let Err(e) = buf.present() {
            log::warn!("present failed: {e}");
        }
        Ok(())
    }
}

fn resize_surface(state: &mut SoftState, width: u32, height: u32) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) else {
        return Ok(());
    };
    state.surface.resize(w, h)?;
    state.backend.resize(width, height)?;
    Ok(())
}

impl ApplicationHandler for SoftApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            log::error!("startup failed: {e}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(state) = self.state.as_mut() {
                    if let Err(e) = resize_surface(state, width, height) {
                        log::error!("resize failed: {e}");
                        event_loop.exit();
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    log::error!("render failed: {e}");
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.as_ref() {
            state.window.request_redraw();
        }
    }
}

fn main() {
    rlterm_demos::init_logging();
    let mut app = SoftApp {
        config: DemoConfig::from_env("rlterm (softbuffer)"),
        state: None,
    };
    let result = EventLoop::new().map_err(Box::<dyn std::error::Error>::from).and_then(|event_loop| {
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut app).map_err(Into::into)
    });
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
