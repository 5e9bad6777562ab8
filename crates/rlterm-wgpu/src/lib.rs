//! GPU backend for rlterm terminals using wgpu.
//!
//! Every draw is a single non-indexed draw call of `6 * count` vertices.
//! The vertex shader reads the encoded tile batch straight from a storage
//! buffer, so the batch is uploaded as-is with no per-tile CPU work. Glyph
//! bitmaps live in a texture array, one layer per atlas page.
//!
//! The adapter must support storage buffers in the vertex stage
//! ([`wgpu::DownlevelFlags::VERTEX_STORAGE`]).
//!
//! Render targets are bound per frame:
//!
//! ```ignore
//! backend.begin_frame(view, width, height);
//! backend.clear(Color::BLACK);
//! terminal.draw_centered(&mut backend, &atlas, width as i32, height as i32)?;
//! backend.end_frame();
//! ```

mod pipeline;

use rlterm_core::{AtlasData, ClipRect, Color, Error, RenderBackend, Result, TileDraw, Viewport};

use pipeline::{TilePipeline, Uniforms, INITIAL_TILE_BUFFER};

pub use pipeline::WgpuAtlas;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for [`WgpuBackend`].
#[derive(Clone, Debug)]
pub struct WgpuBackendConfig {
    /// Format of the textures later bound with [`WgpuBackend::begin_frame`].
    pub target_format: wgpu::TextureFormat,
    /// Label prefix for the pipeline and shader.
    pub label: String,
}

impl Default for WgpuBackendConfig {
    fn default() -> Self {
        Self {
            target_format: wgpu::TextureFormat::Bgra8Unorm,
            label: "rlterm tiles".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// WgpuBackend
// ---------------------------------------------------------------------------

struct FrameTarget {
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

/// A [`RenderBackend`] drawing into wgpu textures.
///
/// Owns the device and queue; everything the pipeline needs is created once
/// in [`new`](Self::new) and shared by all terminals and atlases.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: TilePipeline,
    uniform_buffer: wgpu::Buffer,
    tile_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    /// Tile bytes padded to the buffer copy alignment.
    staging: Vec<u8>,
    target: Option<FrameTarget>,
    viewport: Viewport,
    clip: Option<ClipRect>,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, config: &WgpuBackendConfig) -> Self {
        let pipeline = TilePipeline::new(&device, config.target_format, &config.label);
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rlterm uniforms"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let tile_buffer = pipeline::tile_buffer(&device, INITIAL_TILE_BUFFER);
        let frame_bind_group = pipeline.frame_bind_group(&device, &uniform_buffer, &tile_buffer);
        log::debug!("wgpu backend ready, target format {:?}", config.target_format);
        Self {
            device,
            queue,
            pipeline,
            uniform_buffer,
            tile_buffer,
            frame_bind_group,
            staging: Vec::new(),
            target: None,
            viewport: Viewport::default(),
            clip: None,
        }
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Bind the texture later clears and draws render into. The viewport is
    /// reset to the whole target.
    pub fn begin_frame(&mut self, view: wgpu::TextureView, width: u32, height: u32) {
        self.target = Some(FrameTarget {
            view,
            width: width.max(1),
            height: height.max(1),
        });
        self.viewport = Viewport::default();
    }

    /// Unbind the current target.
    pub fn end_frame(&mut self) {
        self.target = None;
    }

    /// Current tile storage buffer size in bytes.
    pub fn tile_buffer_size(&self) -> u64 {
        self.tile_buffer.size()
    }

    fn ensure_tile_buffer(&mut self, needed: u64) {
        let current = self.tile_buffer.size();
        if needed <= current {
            return;
        }
        let mut size = current.max(4);
        while size < needed {
            size *= 2;
        }
        self.tile_buffer = pipeline::tile_buffer(&self.device, size);
        self.frame_bind_group =
            self.pipeline
                .frame_bind_group(&self.device, &self.uniform_buffer, &self.tile_buffer);
        log::debug!("tile buffer grew to {} bytes (was {})", size, current);
    }

    /// NDC scale and offset placing the viewport inside the target.
    fn viewport_transform(viewport: Viewport, width: u32, height: u32) -> [f32; 4] {
        let (tw, th) = (width as f32, height as f32);
        let (x, y) = (viewport.x as f32, viewport.y as f32);
        let (w, h) = (viewport.width as f32, viewport.height as f32);
        [
            w / tw,
            h / th,
            (2.0 * x + w) / tw - 1.0,
            1.0 - (2.0 * y + h) / th,
        ]
    }
}

impl RenderBackend for WgpuBackend {
    type Atlas = WgpuAtlas;

    fn create_atlas(&mut self, data: &AtlasData<'_>) -> Result<WgpuAtlas> {
        Ok(WgpuAtlas::upload(&self.device, &self.queue, &self.pipeline, data))
    }

    fn replace_atlas(&mut self, atlas: &mut WgpuAtlas, data: &AtlasData<'_>) -> Result<()> {
        *atlas = WgpuAtlas::upload(&self.device, &self.queue, &self.pipeline, data);
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn clear(&mut self, color: Color) {
        let Some(target) = self.target.as_ref() else {
            log::warn!("clear without a frame target");
            return;
        };
        let [r, g, b, a] = color.to_f32();
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("rlterm clear"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("rlterm clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn set_clip(&mut self, clip: Option<ClipRect>) {
        self.clip = clip;
    }

    fn draw_tiles(&mut self, atlas: &WgpuAtlas, draw: &TileDraw<'_>) -> Result<()> {
        let Some((width, height)) = self.target.as_ref().map(|t| (t.width, t.height)) else {
            log::warn!("draw without a frame target");
            return Err(Error::NullArgument);
        };
        if draw.count == 0 {
            return Ok(());
        }
        let viewport = self.viewport.or_full(width, height);
        let scissor = viewport.scissor(self.clip, width, height);
        if scissor.is_empty() {
            log::trace!("scissor outside the target, skipping draw");
            return Ok(());
        }
        let vertices = u32::try_from(draw.vertex_count()).map_err(|_| Error::OutOfMemory)?;

        // Buffer writes must be a multiple of four bytes.
        let padded = draw.tiles.len().next_multiple_of(4);
        self.staging.clear();
        self.staging
            .try_reserve(padded)
            .map_err(|_| Error::OutOfMemory)?;
        self.staging.extend_from_slice(draw.tiles);
        self.staging.resize(padded, 0);
        self.ensure_tile_buffer(padded as u64);

        let uniforms = Uniforms {
            matrix: draw.matrix,
            pixel_unit: draw.pixel_unit,
            glyph_count: atlas.glyph_count,
            _pad: 0,
            viewport: Self::viewport_transform(viewport, width, height),
        };
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        self.queue.write_buffer(&self.tile_buffer, 0, &self.staging);

        let Some(target) = self.target.as_ref() else {
            return Err(Error::NullArgument);
        };
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("rlterm draw"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("rlterm tile pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_scissor_rect(scissor.x, scissor.y, scissor.width, scissor.height);
            pass.set_pipeline(&self.pipeline.pipeline);
            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            pass.set_bind_group(1, &atlas.bind_group, &[]);
            pass.draw(0..vertices, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlterm_core::{Atlas, GlyphAtlas, PixelFormat, Terminal};

    const SIZE: u32 = 16;

    fn device() -> Option<(wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;
        let flags = adapter.get_downlevel_capabilities().flags;
        if !flags.contains(wgpu::DownlevelFlags::VERTEX_STORAGE) {
            return None;
        }
        pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default(), None)).ok()
    }

    fn target(device: &wgpu::Device) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test target"),
            size: wgpu::Extent3d {
                width: SIZE,
                height: SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    fn read_back(backend: &WgpuBackend, texture: &wgpu::Texture) -> Vec<u8> {
        let row = 256u32;
        let buffer = backend.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback"),
            size: (row * SIZE) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = backend
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(row),
                    rows_per_image: Some(SIZE),
                },
            },
            texture.size(),
        );
        backend.queue().submit(std::iter::once(encoder.finish()));
        let slice = buffer.slice(..);
        slice.map_async(wgpu::MapMode::Read, |r| r.unwrap());
        let _ = backend.device().poll(wgpu::Maintain::Wait);
        let data = slice.get_mapped_range();
        let mut pixels = Vec::new();
        for y in 0..SIZE as usize {
            let start = y * row as usize;
            pixels.extend_from_slice(&data[start..start + SIZE as usize * 4]);
        }
        pixels
    }

    fn pixel(pixels: &[u8], x: u32, y: u32) -> [u8; 4] {
        let i = ((y * SIZE + x) * 4) as usize;
        [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
    }

    fn setup() -> Option<(WgpuBackend, Atlas<WgpuBackend>, wgpu::Texture)> {
        let Some((device, queue)) = device() else {
            eprintln!("no suitable adapter, skipping");
            return None;
        };
        let config = WgpuBackendConfig {
            target_format: wgpu::TextureFormat::Rgba8Unorm,
            ..Default::default()
        };
        let mut backend = WgpuBackend::new(device, queue, &config);
        // Glyph 0 is empty, glyph 1 is solid.
        let glyphs = GlyphAtlas::uniform_grid(2, 1, 1, 2, 1).unwrap();
        let pixels = [0u8, 255];
        let atlas = Atlas::new(
            &mut backend,
            &AtlasData {
                width: 2,
                height: 1,
                pages: 1,
                format: PixelFormat::Gray,
                pixels: &pixels,
                glyphs: glyphs.glyphs(),
            },
        )
        .unwrap();
        let texture = target(backend.device());
        Some((backend, atlas, texture))
    }

    #[test]
    fn draw_without_target_is_null_argument() {
        let Some((mut backend, atlas, _)) = setup() else {
            return;
        };
        let mut term = Terminal::with_tile_dimensions(2, 2, 1.0, 8, 8).unwrap();
        term.push_fill(0, Color::RED, Color::BLUE).unwrap();
        assert_eq!(term.draw(&mut backend, &atlas), Err(Error::NullArgument));
    }

    #[test]
    fn fills_and_glyphs_reach_the_target() {
        let Some((mut backend, atlas, texture)) = setup() else {
            return;
        };
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        backend.begin_frame(view, SIZE, SIZE);
        backend.clear(Color::BLACK);

        let mut term = Terminal::with_tile_dimensions(2, 2, 1.0, 8, 8).unwrap();
        term.push_fill(0, Color::WHITE, Color::BLUE).unwrap();
        term.push_grid(1, 1, 1, Color::RED, Color::BLACK).unwrap();
        // Out-of-range glyph: background only.
        term.push_grid(0, 1, 99, Color::RED, Color::LIME).unwrap();
        term.draw(&mut backend, &atlas).unwrap();
        backend.end_frame();

        let pixels = read_back(&backend, &texture);
        assert_eq!(pixel(&pixels, 4, 4), Color::BLUE.to_array());
        assert_eq!(pixel(&pixels, 12, 12), Color::RED.to_array());
        assert_eq!(pixel(&pixels, 4, 12), Color::LIME.to_array());
    }

    #[test]
    fn viewport_confines_overhanging_tiles() {
        let Some((mut backend, atlas, texture)) = setup() else {
            return;
        };
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        backend.begin_frame(view, SIZE, SIZE);
        backend.clear(Color::BLACK);
        backend.set_viewport(Viewport::new(0, 0, 8, 8));

        let mut term = Terminal::with_tile_dimensions(1, 1, 1.0, 8, 8).unwrap();
        term.push_free_sized(4, 4, 8, 8, 1, Color::RED, Color::BLACK)
            .unwrap();
        term.draw(&mut backend, &atlas).unwrap();
        backend.end_frame();

        let pixels = read_back(&backend, &texture);
        assert_eq!(pixel(&pixels, 6, 6), Color::RED.to_array());
        assert_eq!(pixel(&pixels, 10, 10), Color::BLACK.to_array());
    }

    #[test]
    fn tile_buffer_grows_with_the_batch() {
        let Some((mut backend, atlas, texture)) = setup() else {
            return;
        };
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        backend.begin_frame(view, SIZE, SIZE);
        let before = backend.tile_buffer_size();
        let mut term = Terminal::with_tile_dimensions(2, 2, 1.0, 8, 8).unwrap();
        for _ in 0..1000 {
            term.push_free(0, 0, 1, Color::WHITE, Color::BLACK).unwrap();
        }
        term.draw(&mut backend, &atlas).unwrap();
        assert!(backend.tile_buffer_size() >= 18 * 1000);
        assert!(backend.tile_buffer_size() > before);
    }
}
