//! CPU backend for rlterm terminals.
//!
//! [`SoftBackend`] renders into an RGBA8 pixel buffer with the same
//! geometry, sampling and blending rules as the GPU backend: two triangles
//! per tile, nearest-neighbour atlas sampling, and src-alpha /
//! one-minus-src-alpha blending. Use it for headless rendering, pixel tests,
//! or to feed a `softbuffer` surface via [`SoftBackend::blit_to_buffer`].

mod raster;

use rlterm_core::{
    AtlasData, ClipRect, Color, Error, GlyphUv, RenderBackend, Result, TileDraw, TileRecord, Viewport,
};

use raster::{Shade, Target, Texture, Vertex, CORNERS};

/// A glyph atlas held in memory as RGBA8.
#[derive(Clone, Debug)]
pub struct SoftAtlas {
    width: u32,
    height: u32,
    pages: u32,
    rgba: Vec<u8>,
    glyphs: Vec<GlyphUv>,
}

impl SoftAtlas {
    fn from_data(data: &AtlasData<'_>) -> Self {
        Self {
            width: data.width,
            height: data.height,
            pages: data.pages,
            rgba: data.rgba_pixels(),
            glyphs: data.glyphs.to_vec(),
        }
    }

    fn texture(&self) -> Texture<'_> {
        Texture {
            width: self.width,
            height: self.height,
            pages: self.pages,
            rgba: &self.rgba,
        }
    }
}

/// A [`RenderBackend`] rasterizing on the CPU.
#[derive(Clone, Debug)]
pub struct SoftBackend {
    width: u32,
    height: u32,
    /// RGBA8, row-major, origin top-left.
    pixels: Vec<u8>,
    viewport: Viewport,
    clip: Option<ClipRect>,
}

fn alloc_pixels(width: u32, height: u32) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidValue);
    }
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or(Error::OutOfMemory)?;
    let mut pixels = Vec::new();
    pixels.try_reserve_exact(len).map_err(|_| Error::OutOfMemory)?;
    pixels.resize(len, 0);
    Ok(pixels)
}

impl SoftBackend {
    /// A transparent black `width` x `height` target.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            width,
            height,
            pixels: alloc_pixels(width, height)?,
            viewport: Viewport::default(),
            clip: None,
        })
    }

    /// Reallocate the target. Contents are lost.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.pixels = alloc_pixels(width, height)?;
        self.width = width;
        self.height = height;
        log::debug!("soft target resized to {}x{}", width, height);
        Ok(())
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The rendered RGBA8 pixels.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        let p = &self.pixels[i..i + 4];
        Some(Color::rgba(p[0], p[1], p[2], p[3]))
    }

    /// Copy the target into a `0RGB` softbuffer surface buffer of
    /// `buf_width` x `buf_height`. Area outside the target is black.
    pub fn blit_to_buffer(&self, buf: &mut [u32], buf_width: usize, buf_height: usize) {
        let src_w = self.width as usize;
        let src_h = self.height as usize;
        let copy_w = src_w.min(buf_width);
        let copy_h = src_h.min(buf_height);

        if buf_width > src_w || buf_height > src_h {
            buf.fill(0);
        }

        for y in 0..copy_h {
            let src = &self.pixels[y * src_w * 4..(y * src_w + copy_w) * 4];
            let dst_start = y * buf_width;
            let Some(dst) = buf.get_mut(dst_start..dst_start + copy_w) else {
                break;
            };
            for (d, p) in dst.iter_mut().zip(src.chunks_exact(4)) {
                *d = ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32;
            }
        }
    }

    fn target(&mut self) -> Target<'_> {
        Target {
            width: self.width,
            height: self.height,
            pixels: &mut self.pixels,
        }
    }
}

impl RenderBackend for SoftBackend {
    type Atlas = SoftAtlas;

    fn create_atlas(&mut self, data: &AtlasData<'_>) -> Result<SoftAtlas> {
        Ok(SoftAtlas::from_data(data))
    }

    fn replace_atlas(&mut self, atlas: &mut SoftAtlas, data: &AtlasData<'_>) -> Result<()> {
        *atlas = SoftAtlas::from_data(data);
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn clear(&mut self, color: Color) {
        self.target().fill(color);
    }

    fn set_clip(&mut self, clip: Option<ClipRect>) {
        self.clip = clip;
    }

    fn draw_tiles(&mut self, atlas: &SoftAtlas, draw: &TileDraw<'_>) -> Result<()> {
        let (width, height) = (self.width, self.height);
        let viewport = self.viewport.or_full(width, height);
        let scissor = viewport.scissor(self.clip, width, height);
        if scissor.is_empty() {
            log::trace!("scissor outside the target, skipping draw");
            return Ok(());
        }

        let texture = atlas.texture();
        let [ux, uy] = draw.pixel_unit;
        let mut target = self.target();
        for record in TileRecord::decode_all(draw.tiles).take(draw.count) {
            let glyph = atlas.glyphs.get(record.glyph as usize).map(|g| (*g, &texture));
            let shade = Shade::new(&record, glyph);
            let corners = CORNERS.map(|[fx, fy]| {
                let unit = [
                    (record.x as f32 + fx * record.width as f32) * ux,
                    (record.y as f32 + fy * record.height as f32) * uy,
                ];
                let uv = match glyph {
                    Some((g, _)) => {
                        let (u, v) = g.sample_uv(fx, fy);
                        [u, v]
                    }
                    None => [0.0, 0.0],
                };
                Vertex {
                    pos: viewport.ndc_to_pixels(draw.matrix.transform_point(unit[0], unit[1])),
                    uv,
                }
            });
            raster::triangle(&mut target, scissor, [corners[0], corners[1], corners[2]], &shade);
            raster::triangle(&mut target, scissor, [corners[3], corners[4], corners[5]], &shade);
        }
        Ok(())
    }
}
