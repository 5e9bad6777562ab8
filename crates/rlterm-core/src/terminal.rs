//! The [`Terminal`]: sizing state, tile placement and drawing.

use crate::atlas::Atlas;
use crate::backend::{RenderBackend, TileDraw};
use crate::batch::TileBatch;
use crate::color::Color;
use crate::error::{Error, Result};
use crate::record::{TileRecord, MAX_TILE_SIZE};
use crate::transform::{Mat4, Placement};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// How the caller sizes a terminal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sizing {
    /// A grid of `wide` x `tall` tiles; pixel size follows.
    Tiles { wide: u32, tall: u32 },
    /// A pixel area; the grid is as many whole tiles as fit. With
    /// `floor_to_tiles` the pixel size shrinks to exactly that grid.
    Pixels {
        width: u32,
        height: u32,
        floor_to_tiles: bool,
    },
}

/// Terminal construction parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TerminalConfig {
    pub sizing: Sizing,
    /// Screen pixels per terminal pixel.
    pub pixel_scale: f32,
    /// Default tile width in terminal pixels.
    pub tile_width: u32,
    /// Default tile height in terminal pixels.
    pub tile_height: u32,
    /// Keep tiles across draws until [`Terminal::clear`]. When `false` the
    /// batch is cleared after every successful draw.
    pub retained: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            sizing: Sizing::Tiles { wide: 80, tall: 24 },
            pixel_scale: 1.0,
            tile_width: 8,
            tile_height: 16,
            retained: true,
        }
    }
}

/// Derived sizing state.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Layout {
    pixel_width: u32,
    pixel_height: u32,
    tiles_wide: u32,
    tiles_tall: u32,
    pixel_scale: f32,
    tile_width: u32,
    tile_height: u32,
}

impl Layout {
    fn compute(config: &TerminalConfig) -> Result<Self> {
        let scale = config.pixel_scale;
        let tile_ok = |v: u32| v >= 1 && v as i32 <= MAX_TILE_SIZE;
        if !(scale.is_finite() && scale > 0.0)
            || !tile_ok(config.tile_width)
            || !tile_ok(config.tile_height)
        {
            return Err(Error::InvalidValue);
        }
        let (tw, th) = (config.tile_width, config.tile_height);
        let scaled = |tiles: u32, tile: u32| (tiles as f64 * tile as f64 * scale as f64) as u64;

        let (pixel_width, pixel_height, tiles_wide, tiles_tall) = match config.sizing {
            Sizing::Tiles { wide, tall } => {
                if wide == 0 || tall == 0 {
                    return Err(Error::InvalidValue);
                }
                (scaled(wide, tw), scaled(tall, th), wide, tall)
            }
            Sizing::Pixels {
                width,
                height,
                floor_to_tiles,
            } => {
                if width == 0 || height == 0 {
                    return Err(Error::InvalidValue);
                }
                let fit = |px: u32, tile: u32| (px as f32 / (tile as f32 * scale)).floor() as u32;
                let wide = fit(width, tw);
                let tall = fit(height, th);
                if floor_to_tiles {
                    (scaled(wide, tw), scaled(tall, th), wide, tall)
                } else {
                    (width as u64, height as u64, wide, tall)
                }
            }
        };

        let px_ok = |v: u64| v >= 1 && v <= MAX_TILE_SIZE as u64;
        if !px_ok(pixel_width) || !px_ok(pixel_height) {
            return Err(Error::InvalidValue);
        }
        Ok(Self {
            pixel_width: pixel_width as u32,
            pixel_height: pixel_height as u32,
            tiles_wide,
            tiles_tall,
            pixel_scale: scale,
            tile_width: tw,
            tile_height: th,
        })
    }

    fn cell_count(&self) -> usize {
        self.tiles_wide as usize * self.tiles_tall as usize
    }
}

// ---------------------------------------------------------------------------
// Terminal
// ---------------------------------------------------------------------------

/// A grid of tiles plus the batch of tiles pushed since the last clear.
///
/// Per frame: [`clear`](Self::clear), push tiles, then call one of the draw
/// methods. Tiles draw in push order, later tiles over earlier ones.
#[derive(Debug, Clone)]
pub struct Terminal {
    layout: Layout,
    retained: bool,
    batch: TileBatch,
}

impl Terminal {
    pub fn new(config: &TerminalConfig) -> Result<Self> {
        let layout = Layout::compute(config)?;
        let batch = TileBatch::with_capacity(layout.cell_count())?;
        log::debug!(
            "terminal created: {}x{} tiles, {}x{} px",
            layout.tiles_wide,
            layout.tiles_tall,
            layout.pixel_width,
            layout.pixel_height
        );
        Ok(Self {
            layout,
            retained: config.retained,
            batch,
        })
    }

    /// A terminal `tiles_wide` x `tiles_tall` tiles in size.
    pub fn with_tile_dimensions(
        tiles_wide: u32,
        tiles_tall: u32,
        pixel_scale: f32,
        tile_width: u32,
        tile_height: u32,
    ) -> Result<Self> {
        Self::new(&TerminalConfig {
            sizing: Sizing::Tiles {
                wide: tiles_wide,
                tall: tiles_tall,
            },
            pixel_scale,
            tile_width,
            tile_height,
            ..Default::default()
        })
    }

    /// A terminal covering `pixel_width` x `pixel_height` screen pixels.
    pub fn with_pixel_dimensions(
        pixel_width: u32,
        pixel_height: u32,
        pixel_scale: f32,
        tile_width: u32,
        tile_height: u32,
        floor_to_tiles: bool,
    ) -> Result<Self> {
        Self::new(&TerminalConfig {
            sizing: Sizing::Pixels {
                width: pixel_width,
                height: pixel_height,
                floor_to_tiles,
            },
            pixel_scale,
            tile_width,
            tile_height,
            ..Default::default()
        })
    }

    /// Resize in place. Always empties the batch; capacity grows to the new
    /// cell count if that is larger. On error nothing changes.
    pub fn resize(&mut self, sizing: Sizing, pixel_scale: f32, tile_width: u32, tile_height: u32) -> Result<()> {
        let layout = Layout::compute(&TerminalConfig {
            sizing,
            pixel_scale,
            tile_width,
            tile_height,
            retained: self.retained,
        })?;
        if layout.cell_count() > self.batch.capacity() {
            self.batch = TileBatch::with_capacity(layout.cell_count())?;
        } else {
            self.batch.clear();
        }
        log::debug!(
            "terminal resized: {}x{} tiles, {}x{} px",
            layout.tiles_wide,
            layout.tiles_tall,
            layout.pixel_width,
            layout.pixel_height
        );
        self.layout = layout;
        Ok(())
    }

    pub fn resize_tile_dimensions(
        &mut self,
        tiles_wide: u32,
        tiles_tall: u32,
        pixel_scale: f32,
        tile_width: u32,
        tile_height: u32,
    ) -> Result<()> {
        let sizing = Sizing::Tiles {
            wide: tiles_wide,
            tall: tiles_tall,
        };
        self.resize(sizing, pixel_scale, tile_width, tile_height)
    }

    pub fn resize_pixel_dimensions(
        &mut self,
        pixel_width: u32,
        pixel_height: u32,
        pixel_scale: f32,
        tile_width: u32,
        tile_height: u32,
        floor_to_tiles: bool,
    ) -> Result<()> {
        let sizing = Sizing::Pixels {
            width: pixel_width,
            height: pixel_height,
            floor_to_tiles,
        };
        self.resize(sizing, pixel_scale, tile_width, tile_height)
    }

    // --- queries ---

    /// Screen pixels per terminal pixel.
    #[inline]
    pub fn pixel_scale(&self) -> f32 {
        self.layout.pixel_scale
    }

    /// `(tiles_wide, tiles_tall)`.
    #[inline]
    pub fn tile_grid_dimensions(&self) -> (u32, u32) {
        (self.layout.tiles_wide, self.layout.tiles_tall)
    }

    /// `(width, height)` in screen pixels.
    #[inline]
    pub fn pixel_dimensions(&self) -> (u32, u32) {
        (self.layout.pixel_width, self.layout.pixel_height)
    }

    /// Default tile `(width, height)` in terminal pixels.
    #[inline]
    pub fn tile_pixel_dimensions(&self) -> (u32, u32) {
        (self.layout.tile_width, self.layout.tile_height)
    }

    /// Tiles pushed since the last clear.
    #[inline]
    pub fn tile_count(&self) -> usize {
        self.batch.count()
    }

    #[inline]
    pub fn batch(&self) -> &TileBatch {
        &self.batch
    }

    #[inline]
    pub fn is_retained(&self) -> bool {
        self.retained
    }

    pub fn set_retained(&mut self, retained: bool) {
        self.retained = retained;
    }

    /// Drop every pushed tile.
    pub fn clear(&mut self) {
        self.batch.clear();
    }

    // --- placement ---

    /// A tile stretched over the whole terminal.
    ///
    /// The rect is `(0, 0, pixel_width, pixel_height)` in screen pixels, so at
    /// a pixel scale other than 1 the tile covers `pixel_scale` times the
    /// terminal. Backends cut it at the clip rectangle or the viewport.
    pub fn push_fill(&mut self, glyph: u16, fg: Color, bg: Color) -> Result<()> {
        let (w, h) = self.pixel_dimensions();
        self.push_rect(0, 0, w as i64, h as i64, glyph, fg, bg)
    }

    /// A default-sized tile in grid cell `(grid_x, grid_y)`.
    pub fn push_grid(&mut self, grid_x: i32, grid_y: i32, glyph: u16, fg: Color, bg: Color) -> Result<()> {
        self.check_grid(grid_x, grid_y)?;
        let (tw, th) = self.tile_pixel_dimensions();
        self.push_rect(
            grid_x as i64 * tw as i64,
            grid_y as i64 * th as i64,
            tw as i64,
            th as i64,
            glyph,
            fg,
            bg,
        )
    }

    /// A `width` x `height` tile anchored at grid cell `(grid_x, grid_y)`.
    #[allow(clippy::too_many_arguments)]
    pub fn push_grid_sized(
        &mut self,
        grid_x: i32,
        grid_y: i32,
        width: i32,
        height: i32,
        glyph: u16,
        fg: Color,
        bg: Color,
    ) -> Result<()> {
        self.check_grid(grid_x, grid_y)?;
        check_size(width, height)?;
        let (tw, th) = self.tile_pixel_dimensions();
        self.push_rect(
            grid_x as i64 * tw as i64,
            grid_y as i64 * th as i64,
            width as i64,
            height as i64,
            glyph,
            fg,
            bg,
        )
    }

    /// A default-sized tile at a pixel position. The position must stay
    /// within one default tile of the terminal origin.
    pub fn push_free(&mut self, x: i32, y: i32, glyph: u16, fg: Color, bg: Color) -> Result<()> {
        let (tw, th) = self.tile_pixel_dimensions();
        let (tw, th) = (tw as i64, th as i64);
        let (x, y) = (x as i64, y as i64);
        if x < -tw || y < -th || x > tw || y > th {
            return Err(self.reject("free", x, y));
        }
        self.push_rect(x, y, tw, th, glyph, fg, bg)
    }

    /// A `width` x `height` tile at a pixel position; it may hang off any
    /// edge as long as it could still overlap the terminal.
    #[allow(clippy::too_many_arguments)]
    pub fn push_free_sized(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        glyph: u16,
        fg: Color,
        bg: Color,
    ) -> Result<()> {
        let (pw, ph) = self.pixel_dimensions();
        let (x, y) = (x as i64, y as i64);
        if x < -(width as i64) || y < -(height as i64) || x > pw as i64 || y > ph as i64 {
            return Err(self.reject("free sized", x, y));
        }
        check_size(width, height)?;
        self.push_rect(x, y, width as i64, height as i64, glyph, fg, bg)
    }

    fn check_grid(&self, grid_x: i32, grid_y: i32) -> Result<()> {
        let (wide, tall) = self.tile_grid_dimensions();
        if grid_x < 0 || grid_y < 0 || grid_x as u32 > wide || grid_y as u32 > tall {
            return Err(self.reject("grid", grid_x as i64, grid_y as i64));
        }
        Ok(())
    }

    fn reject(&self, kind: &str, x: i64, y: i64) -> Error {
        log::trace!("{kind} tile at ({x}, {y}) rejected: out of terminal");
        Error::TileOutOfTerminal
    }

    #[allow(clippy::too_many_arguments)]
    fn push_rect(&mut self, x: i64, y: i64, width: i64, height: i64, glyph: u16, fg: Color, bg: Color) -> Result<()> {
        let narrow = |v: i64| i32::try_from(v).map_err(|_| Error::TileOutOfTerminal);
        let record = TileRecord {
            x: narrow(x)?,
            y: narrow(y)?,
            width: narrow(width)?,
            height: narrow(height)?,
            glyph,
            fg,
            bg,
        };
        self.batch.push(&record)
    }

    // --- drawing ---

    fn pixel_unit(&self) -> [f32; 2] {
        let (pw, ph) = self.pixel_dimensions();
        [
            self.layout.pixel_scale / pw as f32,
            self.layout.pixel_scale / ph as f32,
        ]
    }

    /// Stretch the terminal over the whole viewport.
    pub fn draw<B: RenderBackend>(&mut self, backend: &mut B, atlas: &Atlas<B>) -> Result<()> {
        self.draw_placed(backend, atlas, Placement::Direct)
    }

    /// Pixel-perfect, centred in a `viewport_width` x `viewport_height` target.
    pub fn draw_centered<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        atlas: &Atlas<B>,
        viewport_width: i32,
        viewport_height: i32,
    ) -> Result<()> {
        let placement = Placement::Centered {
            viewport_width,
            viewport_height,
        };
        self.draw_placed(backend, atlas, placement)
    }

    /// Pixel-perfect with the top-left corner at `(x, y)`.
    pub fn draw_translated<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        atlas: &Atlas<B>,
        x: i32,
        y: i32,
        viewport_width: i32,
        viewport_height: i32,
    ) -> Result<()> {
        let placement = Placement::Translated {
            x,
            y,
            viewport_width,
            viewport_height,
        };
        self.draw_placed(backend, atlas, placement)
    }

    /// Top-left corner at `(x, y)`, stretched by `scale_x` / `scale_y`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_transformed<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        atlas: &Atlas<B>,
        x: i32,
        y: i32,
        scale_x: f32,
        scale_y: f32,
        viewport_width: i32,
        viewport_height: i32,
    ) -> Result<()> {
        let placement = Placement::Transformed {
            x,
            y,
            scale_x,
            scale_y,
            viewport_width,
            viewport_height,
        };
        self.draw_placed(backend, atlas, placement)
    }

    /// Draw through a caller-supplied matrix, without clipping.
    pub fn draw_matrix<B: RenderBackend>(&mut self, backend: &mut B, atlas: &Atlas<B>, matrix: &Mat4) -> Result<()> {
        self.draw_placed(backend, atlas, Placement::Matrix(*matrix))
    }

    /// Draw the batch with any [`Placement`]. Does nothing when the batch
    /// is empty. Clipping, if the placement has any, is switched off again
    /// whatever the draw returns.
    pub fn draw_placed<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        atlas: &Atlas<B>,
        placement: Placement,
    ) -> Result<()> {
        if self.batch.is_empty() {
            log::trace!("empty batch, skipping draw");
            return Ok(());
        }
        let (pw, ph) = self.pixel_dimensions();
        let (matrix, clip) = placement.resolve(pw, ph)?;
        let draw = TileDraw {
            tiles: self.batch.as_bytes(),
            count: self.batch.count(),
            pixel_unit: self.pixel_unit(),
            matrix,
        };
        let result = match clip {
            Some(clip) => {
                backend.set_clip(Some(clip));
                let result = backend.draw_tiles(atlas.handle(), &draw);
                backend.set_clip(None);
                result
            }
            None => backend.draw_tiles(atlas.handle(), &draw),
        };
        if result.is_ok() && !self.retained {
            self.batch.clear();
        }
        result
    }
}

fn check_size(width: i32, height: i32) -> Result<()> {
    let ok = |v: i32| v > 0 && v <= MAX_TILE_SIZE;
    if ok(width) && ok(height) {
        Ok(())
    } else {
        log::trace!("tile size {width}x{height} rejected");
        Err(Error::TileOutOfTerminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::{AtlasData, GlyphUv, PixelFormat};
    use crate::backend::testing::{Call, RecordingBackend};
    use crate::record::{MIN_TILE_POSITION, TILE_RECORD_SIZE};
    use crate::transform::ClipRect;

    fn term() -> Terminal {
        Terminal::with_tile_dimensions(10, 5, 1.0, 8, 8).unwrap()
    }

    fn atlas(backend: &mut RecordingBackend) -> Atlas<RecordingBackend> {
        let glyphs = [GlyphUv::new(0.0, 0.0, 1.0, 1.0, 0.0)];
        let pixels = [0u8; 4];
        Atlas::new(
            backend,
            &AtlasData {
                width: 1,
                height: 1,
                pages: 1,
                format: PixelFormat::Rgba,
                pixels: &pixels,
                glyphs: &glyphs,
            },
        )
        .unwrap()
    }

    fn last(term: &Terminal) -> TileRecord {
        term.batch().records().last().unwrap()
    }

    #[test]
    fn tile_sized_terminal() {
        let t = term();
        assert_eq!(t.pixel_dimensions(), (80, 40));
        assert_eq!(t.tile_grid_dimensions(), (10, 5));
        assert_eq!(t.tile_pixel_dimensions(), (8, 8));
        assert_eq!(t.pixel_scale(), 1.0);
        assert_eq!(t.batch().capacity(), 50);
    }

    #[test]
    fn pixel_sized_terminal() {
        let t = Terminal::with_pixel_dimensions(85, 43, 2.0, 8, 8, false).unwrap();
        assert_eq!(t.tile_grid_dimensions(), (5, 2));
        assert_eq!(t.pixel_dimensions(), (85, 43));

        let t = Terminal::with_pixel_dimensions(85, 43, 2.0, 8, 8, true).unwrap();
        assert_eq!(t.tile_grid_dimensions(), (5, 2));
        assert_eq!(t.pixel_dimensions(), (80, 32));
    }

    #[test]
    fn invalid_sizes() {
        assert_eq!(
            Terminal::with_tile_dimensions(0, 5, 1.0, 8, 8).err(),
            Some(Error::InvalidValue)
        );
        assert_eq!(
            Terminal::with_tile_dimensions(10, 5, 0.0, 8, 8).err(),
            Some(Error::InvalidValue)
        );
        assert_eq!(
            Terminal::with_tile_dimensions(10, 5, 1.0, 0, 8).err(),
            Some(Error::InvalidValue)
        );
        assert_eq!(
            Terminal::with_pixel_dimensions(4, 4, 1.0, 8, 8, true).err(),
            Some(Error::InvalidValue)
        );
        assert_eq!(
            Terminal::with_tile_dimensions(10_000, 5, 1.0, 8, 8).err(),
            Some(Error::InvalidValue)
        );
    }

    #[test]
    fn grid_scenario() {
        let mut t = term();
        t.push_grid(0, 0, 1, Color::WHITE, Color::BLACK).unwrap();
        t.push_grid(9, 4, 2, Color::WHITE, Color::BLACK).unwrap();
        let r = last(&t);
        assert_eq!((r.x, r.y, r.width, r.height), (72, 32, 8, 8));

        // The grid bound is inclusive.
        t.push_grid(10, 5, 3, Color::WHITE, Color::BLACK).unwrap();
        assert_eq!(
            t.push_grid(11, 5, 4, Color::WHITE, Color::BLACK),
            Err(Error::TileOutOfTerminal)
        );
        assert_eq!(
            t.push_grid(0, 6, 4, Color::WHITE, Color::BLACK),
            Err(Error::TileOutOfTerminal)
        );
        assert_eq!(
            t.push_grid(-1, 0, 4, Color::WHITE, Color::BLACK),
            Err(Error::TileOutOfTerminal)
        );
        assert_eq!(t.tile_count(), 3);

        t.clear();
        assert_eq!(t.tile_count(), 0);

        t.push_fill(7, Color::RED, Color::BLUE).unwrap();
        assert_eq!(t.tile_count(), 1);
        let r = last(&t);
        assert_eq!((r.x, r.y, r.width, r.height), (0, 0, 80, 40));
        assert_eq!((r.glyph, r.fg, r.bg), (7, Color::RED, Color::BLUE));
    }

    #[test]
    fn scaled_fill_uses_screen_pixels() {
        let mut t = Terminal::with_tile_dimensions(10, 5, 2.0, 8, 8).unwrap();
        t.push_fill(0, Color::WHITE, Color::BLACK).unwrap();
        let r = last(&t);
        assert_eq!((r.x, r.y, r.width, r.height), (0, 0, 160, 80));
        // In unit space the fill reaches pixel_scale, past the terminal's edge.
        assert!((r.width as f32 * t.pixel_unit()[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn grid_sized() {
        let mut t = term();
        t.push_grid_sized(2, 1, 24, 3, 0, Color::WHITE, Color::BLACK).unwrap();
        let r = last(&t);
        assert_eq!((r.x, r.y, r.width, r.height), (16, 8, 24, 3));
        for (w, h) in [(0, 8), (8, -1), (MAX_TILE_SIZE + 1, 8)] {
            assert_eq!(
                t.push_grid_sized(0, 0, w, h, 0, Color::WHITE, Color::BLACK),
                Err(Error::TileOutOfTerminal)
            );
        }
        assert_eq!(
            t.push_grid_sized(11, 0, 8, 8, 0, Color::WHITE, Color::BLACK),
            Err(Error::TileOutOfTerminal)
        );
    }

    #[test]
    fn free_envelope_is_one_default_tile() {
        let mut t = term();
        for (x, y) in [(-8, -8), (8, 8), (0, 0), (-3, 5)] {
            t.push_free(x, y, 0, Color::WHITE, Color::BLACK).unwrap();
            let r = last(&t);
            assert_eq!((r.x, r.y, r.width, r.height), (x, y, 8, 8));
        }
        for (x, y) in [(-9, 0), (9, 0), (0, -9), (0, 9), (40, 20)] {
            assert_eq!(
                t.push_free(x, y, 0, Color::WHITE, Color::BLACK),
                Err(Error::TileOutOfTerminal)
            );
        }
        assert_eq!(t.tile_count(), 4);
    }

    #[test]
    fn free_sized_envelope() {
        let mut t = term();
        t.push_free_sized(-16, -4, 16, 4, 0, Color::WHITE, Color::BLACK).unwrap();
        t.push_free_sized(80, 40, 16, 4, 0, Color::WHITE, Color::BLACK).unwrap();
        let r = last(&t);
        assert_eq!((r.x, r.y, r.width, r.height), (80, 40, 16, 4));
        for (x, y, w, h) in [(-17, 0, 16, 4), (81, 0, 16, 4), (0, 41, 16, 4), (0, 0, 0, 4)] {
            assert_eq!(
                t.push_free_sized(x, y, w, h, 0, Color::WHITE, Color::BLACK),
                Err(Error::TileOutOfTerminal)
            );
        }
        assert_eq!(t.tile_count(), 2);
    }

    #[test]
    fn unencodable_position_is_rejected() {
        let mut t = term();
        let w = 30_000;
        assert_eq!(
            t.push_free_sized(-w, 0, w, 8, 0, Color::WHITE, Color::BLACK),
            Err(Error::TileOutOfTerminal)
        );
        t.push_free_sized(MIN_TILE_POSITION, 0, w, 8, 0, Color::WHITE, Color::BLACK)
            .unwrap();
    }

    #[test]
    fn rejected_push_leaves_state_unchanged() {
        let mut t = term();
        t.push_grid(1, 1, 5, Color::WHITE, Color::BLACK).unwrap();
        let bytes = t.batch().as_bytes().to_vec();
        let cap = t.batch().capacity();
        let _ = t.push_grid(100, 0, 5, Color::WHITE, Color::BLACK);
        let _ = t.push_free(100, 0, 5, Color::WHITE, Color::BLACK);
        assert_eq!(t.batch().as_bytes(), &bytes[..]);
        assert_eq!(t.batch().capacity(), cap);
    }

    #[test]
    fn pushes_grow_past_cell_count() {
        let mut t = Terminal::with_tile_dimensions(2, 2, 1.0, 8, 8).unwrap();
        for i in 0..9 {
            t.push_grid(i % 3, i / 3, 0, Color::WHITE, Color::BLACK).unwrap();
        }
        assert_eq!(t.tile_count(), 9);
        assert_eq!(t.batch().byte_length(), 9 * TILE_RECORD_SIZE);
        assert_eq!(t.batch().capacity(), 16);
    }

    #[test]
    fn resize_always_empties_batch() {
        let mut t = term();
        t.push_fill(0, Color::WHITE, Color::BLACK).unwrap();
        t.resize_tile_dimensions(20, 10, 2.0, 8, 8).unwrap();
        assert_eq!(t.tile_count(), 0);
        assert_eq!(t.pixel_dimensions(), (320, 160));
        assert_eq!(t.batch().capacity(), 200);

        t.push_fill(0, Color::WHITE, Color::BLACK).unwrap();
        t.resize_pixel_dimensions(64, 64, 1.0, 8, 8, false).unwrap();
        assert_eq!(t.tile_count(), 0);
        assert_eq!(t.tile_grid_dimensions(), (8, 8));
        assert_eq!(t.batch().capacity(), 200);
    }

    #[test]
    fn failed_resize_changes_nothing() {
        let mut t = term();
        t.push_fill(0, Color::WHITE, Color::BLACK).unwrap();
        assert_eq!(
            t.resize_tile_dimensions(20, 10, -1.0, 8, 8),
            Err(Error::InvalidValue)
        );
        assert_eq!(t.tile_count(), 1);
        assert_eq!(t.pixel_dimensions(), (80, 40));
    }

    #[test]
    fn empty_batch_draws_nothing() {
        let mut backend = RecordingBackend::default();
        let atlas = atlas(&mut backend);
        backend.calls.clear();
        let mut t = term();
        t.push_fill(0, Color::WHITE, Color::BLACK).unwrap();
        t.clear();
        t.draw(&mut backend, &atlas).unwrap();
        t.draw_centered(&mut backend, &atlas, 0, 0).unwrap();
        t.draw_translated(&mut backend, &atlas, 5, 5, 100, 100).unwrap();
        t.draw_transformed(&mut backend, &atlas, 5, 5, 2.0, 2.0, 100, 100)
            .unwrap();
        t.draw_matrix(&mut backend, &atlas, &Mat4::IDENTITY).unwrap();
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn direct_draw_hands_over_the_batch() {
        let mut backend = RecordingBackend::default();
        let atlas = atlas(&mut backend);
        backend.calls.clear();
        let mut t = Terminal::with_tile_dimensions(10, 5, 2.0, 8, 8).unwrap();
        t.push_grid(1, 1, 9, Color::WHITE, Color::BLACK).unwrap();
        t.push_fill(0, Color::WHITE, Color::BLACK).unwrap();
        t.draw(&mut backend, &atlas).unwrap();

        assert_eq!(backend.calls.len(), 1);
        let Call::Draw {
            count,
            bytes,
            pixel_unit,
            matrix,
        } = &backend.calls[0]
        else {
            panic!("expected a draw, got {:?}", backend.calls[0]);
        };
        assert_eq!(*count, 2);
        assert_eq!(bytes.as_slice(), t.batch().as_bytes());
        assert_eq!(*pixel_unit, [2.0 / 160.0, 2.0 / 80.0]);
        assert_eq!(*matrix, Mat4::SCREEN);
        // Retained by default.
        assert_eq!(t.tile_count(), 2);
    }

    #[test]
    fn clipped_draws_bracket_the_draw() {
        let mut backend = RecordingBackend::default();
        let atlas = atlas(&mut backend);
        backend.calls.clear();
        let mut t = term();
        t.push_fill(0, Color::WHITE, Color::BLACK).unwrap();
        t.draw_translated(&mut backend, &atlas, -10, 4, 200, 100).unwrap();

        assert_eq!(backend.calls.len(), 3);
        assert_eq!(
            backend.calls[0],
            Call::Clip(Some(ClipRect {
                x: 0,
                y: 4,
                width: 70,
                height: 40
            }))
        );
        assert!(matches!(backend.calls[1], Call::Draw { .. }));
        assert_eq!(backend.calls[2], Call::Clip(None));
    }

    #[test]
    fn clip_is_released_when_draw_fails() {
        let mut backend = RecordingBackend::default();
        let atlas = atlas(&mut backend);
        backend.calls.clear();
        let mut t = term();
        t.push_fill(0, Color::WHITE, Color::BLACK).unwrap();
        backend.fail_next = Some(Error::OutOfMemory);
        assert_eq!(
            t.draw_centered(&mut backend, &atlas, 100, 100),
            Err(Error::OutOfMemory)
        );
        assert_eq!(backend.calls.last(), Some(&Call::Clip(None)));
        assert!(backend.draws().is_empty());
    }

    #[test]
    fn matrix_draw_has_no_clip() {
        let mut backend = RecordingBackend::default();
        let atlas = atlas(&mut backend);
        backend.calls.clear();
        let mut t = term();
        t.push_fill(0, Color::WHITE, Color::BLACK).unwrap();
        t.draw_matrix(&mut backend, &atlas, &Mat4::IDENTITY).unwrap();
        assert_eq!(backend.calls.len(), 1);
        match &backend.calls[0] {
            Call::Draw { matrix, .. } => assert_eq!(*matrix, Mat4::IDENTITY),
            other => panic!("expected a draw, got {other:?}"),
        }
    }

    #[test]
    fn immediate_mode_clears_after_draw() {
        let mut backend = RecordingBackend::default();
        let atlas = atlas(&mut backend);
        let mut t = Terminal::new(&TerminalConfig {
            retained: false,
            ..Default::default()
        })
        .unwrap();
        t.push_fill(0, Color::WHITE, Color::BLACK).unwrap();

        backend.fail_next = Some(Error::OutOfMemory);
        assert!(t.draw(&mut backend, &atlas).is_err());
        assert_eq!(t.tile_count(), 1);

        t.draw(&mut backend, &atlas).unwrap();
        assert_eq!(t.tile_count(), 0);
        assert_eq!(backend.draws().len(), 1);
    }

    #[test]
    fn invalid_viewport_is_reported_before_any_call() {
        let mut backend = RecordingBackend::default();
        let atlas = atlas(&mut backend);
        backend.calls.clear();
        let mut t = term();
        t.push_fill(0, Color::WHITE, Color::BLACK).unwrap();
        assert_eq!(
            t.draw_translated(&mut backend, &atlas, 0, 0, 0, 100),
            Err(Error::InvalidValue)
        );
        assert!(backend.calls.is_empty());
    }
}
