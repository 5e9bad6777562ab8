//! Glyph sheets for the demos: rasterized from a TTF with fontdue, or
//! generated procedurally when no font is configured.

use fontdue::{Font, FontSettings};
use rlterm_core::{AtlasData, GlyphAtlas, PixelFormat};

use crate::DemoError;

/// Sheets are a 16 x 16 grid of glyphs, one per byte value.
pub const SHEET_COLS: u32 = 16;
pub const SHEET_ROWS: u32 = 16;

/// Glyph ids in the procedural sheet.
pub mod glyph {
    pub const EMPTY: u16 = 0;
    pub const SOLID: u16 = 1;
    pub const FRAME: u16 = 2;
    pub const CHECKER: u16 = 3;
    pub const HSTRIPES: u16 = 4;
    pub const VSTRIPES: u16 = 5;
    pub const DIAGONAL: u16 = 6;
    pub const DOT: u16 = 7;
}

/// A single-page coverage atlas plus its UV table.
pub struct GlyphSheet {
    tile_width: u32,
    tile_height: u32,
    /// One coverage byte per pixel.
    pixels: Vec<u8>,
    glyphs: GlyphAtlas,
}

impl GlyphSheet {
    fn blank(tile_width: u32, tile_height: u32) -> Result<Self, DemoError> {
        let (w, h) = (tile_width * SHEET_COLS, tile_height * SHEET_ROWS);
        let glyphs = GlyphAtlas::uniform_grid(w, h, 1, SHEET_COLS, SHEET_ROWS)?;
        Ok(Self {
            tile_width,
            tile_height,
            pixels: vec![0; (w * h) as usize],
            glyphs,
        })
    }

    /// Rasterize byte values 0..=255 (as Latin-1) from a TTF/OTF font.
    ///
    /// The tile size follows the font metrics: line height for the height,
    /// the advance of 'M' for the width.
    pub fn from_font(font_data: &[u8], font_size: f32) -> Result<Self, DemoError> {
        let font = Font::from_bytes(font_data, FontSettings::default())
            .map_err(|e| DemoError::InvalidFont(e.to_string()))?;
        let metrics = font
            .horizontal_line_metrics(font_size)
            .unwrap_or(fontdue::LineMetrics {
                ascent: font_size * 0.8,
                descent: -(font_size * 0.2),
                line_gap: 0.0,
                new_line_size: font_size,
            });
        let tile_height = ((metrics.ascent - metrics.descent).ceil() as u32).max(1);
        let (m_metrics, _) = font.rasterize('M', font_size);
        let tile_width = (m_metrics.advance_width.ceil() as u32).max(1);
        let ascent = metrics.ascent.ceil() as i32;

        let mut sheet = Self::blank(tile_width, tile_height)?;
        for id in 0..=255u8 {
            let ch = char::from(id);
            if ch.is_control() || ch == ' ' {
                continue;
            }
            let (m, bitmap) = font.rasterize(ch, font_size);
            let top = ascent - m.ymin - m.height as i32;
            sheet.blit(id as u16, m.xmin, top, m.width, m.height, &bitmap);
        }
        log::debug!(
            "glyph sheet rasterized at {}px, tiles {}x{}",
            font_size,
            tile_width,
            tile_height
        );
        Ok(sheet)
    }

    /// A sheet of simple patterns. Ids 0..=7 are named in [`glyph`]; the
    /// rest are dithered blocks whose density grows with the id.
    pub fn procedural(tile_width: u32, tile_height: u32) -> Result<Self, DemoError> {
        let mut sheet = Self::blank(tile_width, tile_height)?;
        let (tw, th) = (tile_width, tile_height);
        for id in 0..(SHEET_COLS * SHEET_ROWS) as u16 {
            let id_u = id as u32;
            sheet.paint(id, |x, y| match id {
                glyph::EMPTY => false,
                glyph::SOLID => true,
                glyph::FRAME => x == 0 || y == 0 || x + 1 == tw || y + 1 == th,
                glyph::CHECKER => (x + y) % 2 == 0,
                glyph::HSTRIPES => y % 2 == 0,
                glyph::VSTRIPES => x % 2 == 0,
                glyph::DIAGONAL => x * th / tw.max(1) == y,
                glyph::DOT => {
                    let (dx, dy) = (2 * x as i32 - tw as i32 + 1, 2 * y as i32 - th as i32 + 1);
                    dx * dx + dy * dy <= (tw.min(th) as i32).pow(2) / 4
                }
                _ => (x * 7 + y * 13 + id_u * 5) % 256 < id_u,
            });
        }
        Ok(sheet)
    }

    #[inline]
    pub fn tile_size(&self) -> (u32, u32) {
        (self.tile_width, self.tile_height)
    }

    #[inline]
    pub fn glyphs(&self) -> &GlyphAtlas {
        &self.glyphs
    }

    /// Upload description for [`rlterm_core::Atlas::new`].
    pub fn atlas_data(&self) -> AtlasData<'_> {
        let (width, height, pages) = self.glyphs.dimensions();
        AtlasData {
            width,
            height,
            pages,
            format: PixelFormat::Gray,
            pixels: &self.pixels,
            glyphs: self.glyphs.glyphs(),
        }
    }

    fn cell_origin(&self, id: u16) -> (u32, u32) {
        let id = id as u32;
        (
            (id % SHEET_COLS) * self.tile_width,
            (id / SHEET_COLS) * self.tile_height,
        )
    }

    fn paint(&mut self, id: u16, covered: impl Fn(u32, u32) -> bool) {
        let (ox, oy) = self.cell_origin(id);
        let stride = self.tile_width * SHEET_COLS;
        for y in 0..self.tile_height {
            for x in 0..self.tile_width {
                if covered(x, y) {
                    self.pixels[((oy + y) * stride + ox + x) as usize] = 255;
                }
            }
        }
    }

    /// Copy a coverage bitmap into glyph `id`'s cell, clipped to the cell.
    fn blit(&mut self, id: u16, left: i32, top: i32, width: usize, height: usize, bitmap: &[u8]) {
        let (ox, oy) = self.cell_origin(id);
        let stride = self.tile_width * SHEET_COLS;
        for gy in 0..height {
            for gx in 0..width {
                let (px, py) = (left + gx as i32, top + gy as i32);
                if px < 0 || py < 0 || px >= self.tile_width as i32 || py >= self.tile_height as i32 {
                    continue;
                }
                let dst = ((oy + py as u32) * stride + ox + px as u32) as usize;
                self.pixels[dst] = bitmap[gy * width + gx];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn procedural_sheet_layout() {
        let sheet = GlyphSheet::procedural(8, 12).unwrap();
        let data = sheet.atlas_data();
        data.validate().unwrap();
        assert_eq!((data.width, data.height, data.pages), (128, 192, 1));
        assert_eq!(sheet.glyphs().glyph_count(), 256);

        let stride = 128usize;
        let at = |id: u16, x: usize, y: usize| {
            let (ox, oy) = sheet.cell_origin(id);
            data.pixels[(oy as usize + y) * stride + ox as usize + x]
        };
        assert_eq!(at(glyph::EMPTY, 3, 3), 0);
        assert_eq!(at(glyph::SOLID, 3, 3), 255);
        assert_eq!(at(glyph::FRAME, 0, 5), 255);
        assert_eq!(at(glyph::FRAME, 3, 5), 0);
        assert_eq!(at(glyph::CHECKER, 1, 1), 255);
        assert_eq!(at(glyph::CHECKER, 1, 0), 0);
    }

    #[test]
    fn invalid_font_is_reported() {
        assert!(matches!(
            GlyphSheet::from_font(b"not a font", 16.0),
            Err(DemoError::InvalidFont(_))
        ));
    }
}
