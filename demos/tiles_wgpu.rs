//! Tile terminal demo rendered with wgpu.
//!
//! Run: cargo run --bin tiles-wgpu

use std::sync::Arc;

use rlterm_core::Atlas;
use rlterm_demos::{DemoConfig, Scene};
use rlterm_wgpu::{WgpuBackend, WgpuBackendConfig};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

type BoxError = Box<dyn std::error::Error>;

struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    backend: WgpuBackend,
    atlas: Atlas<WgpuBackend>,
    scene: Scene,
}

struct WgpuApp {
    config: DemoConfig,
    gpu: Option<Gpu>,
}

impl WgpuApp {
    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<(), BoxError> {
        let (sheet, glyphs) = self.config.load_sheet()?;
        let (width, height) = self.config.window_size(sheet.tile_size());

        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(true);
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or("no suitable GPU adapter found")?;
        if !adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::VERTEX_STORAGE)
        {
            return Err("adapter cannot read storage buffers from vertex shaders".into());
        }
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default(), None))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or("surface reports no formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let size = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let mut backend = WgpuBackend::new(
            device,
            queue,
            &WgpuBackendConfig {
                target_format: surface_format,
                ..Default::default()
            },
        );
        let atlas = Atlas::new(&mut backend, &sheet.atlas_data())?;
        let scene = Scene::new(&self.config, sheet.tile_size(), glyphs)?;

        self.gpu = Some(Gpu {
            window,
            surface,
            surface_config,
            backend,
            atlas,
            scene,
        });
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        if width == 0 || height == 0 {
            return;
        }
        gpu.surface_config.width = width;
        gpu.surface_config.height = height;
        gpu.surface.configure(gpu.backend.device(), &gpu.surface_config);
    }

    fn render(&mut self) -> Result<(), BoxError> {
        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(());
        };
        let (width, height) = (gpu.surface_config.width, gpu.surface_config.height);

        let surface_texture = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(gpu.backend.device(), &gpu.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        gpu.backend.begin_frame(view, width, height);
        gpu.scene.tick()?;
        let drawn = gpu.scene.render(&mut gpu.backend, &gpu.atlas, width, height);
        gpu.backend.end_frame();
        drawn?;

        surface_texture.present();
        Ok(())
    }
}

impl ApplicationHandler for WgpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        if let Err(e) = self.init_gpu(event_loop) {
            log::error!("startup failed: {e}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(PhysicalSize { width, height }) => self.resize(width, height),

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
        if let Some(gpu) = self.gpu.as_ref() {
            gpu.window.request_redraw();
        }
    }
}

fn main() {
    rlterm_demos::init_logging();
    let mut app = WgpuApp {
        config: DemoConfig::from_env("rlterm (wgpu)"),
        gpu: None,
    };
    let result = EventLoop::new().map_err(BoxError::from).and_then(|event_loop| {
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut app).map_err(Into::into)
    });
    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
