//! Glyph atlases: the UV table ([`GlyphAtlas`]) and the backend-owned
//! [`Atlas`] resource built from it.

use crate::backend::RenderBackend;
use crate::error::{Error, Result};

/// Number of floats per glyph in the flat `stpqp` layout.
pub const FLOATS_PER_GLYPH: usize = 5;

// ---------------------------------------------------------------------------
// GlyphUv
// ---------------------------------------------------------------------------

/// Where one glyph lives in the atlas.
///
/// `s`/`t` are the texture u coordinates of the tile's left/right edges and
/// `p`/`q` the v coordinates of its bottom/top edges, all normalised to the
/// page size. `page` selects the texture layer.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlyphUv {
    pub s: f32,
    pub t: f32,
    pub p: f32,
    pub q: f32,
    pub page: f32,
}

impl GlyphUv {
    #[inline]
    pub const fn new(s: f32, t: f32, p: f32, q: f32, page: f32) -> Self {
        Self { s, t, p, q, page }
    }

    /// The UV of a tile-local point, `fx`/`fy` in `0.0..=1.0` measured from
    /// the tile's top-left corner.
    #[inline]
    pub fn sample_uv(&self, fx: f32, fy: f32) -> (f32, f32) {
        (self.s + (self.t - self.s) * fx, self.q + (self.p - self.q) * fy)
    }
}

// ---------------------------------------------------------------------------
// PixelFormat
// ---------------------------------------------------------------------------

/// Channel layout of the atlas pixel data.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PixelFormat {
    /// One byte of glyph coverage per pixel.
    Gray,
    /// Gray value plus alpha.
    GrayAlpha,
    #[default]
    Rgba,
    Bgra,
}

impl PixelFormat {
    /// Bytes per pixel.
    #[inline]
    pub const fn channels(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::GrayAlpha => 2,
            Self::Rgba | Self::Bgra => 4,
        }
    }

    /// Convert pixel data in this format to tightly packed RGBA.
    ///
    /// Gray data is a coverage mask and becomes white with that alpha, so
    /// glyphs take the tile's foreground colour.
    pub fn expand_to_rgba(self, pixels: &[u8]) -> Vec<u8> {
        match self {
            Self::Rgba => pixels.to_vec(),
            Self::Bgra => pixels
                .chunks_exact(4)
                .flat_map(|p| [p[2], p[1], p[0], p[3]])
                .collect(),
            Self::Gray => pixels.iter().flat_map(|&g| [255, 255, 255, g]).collect(),
            Self::GrayAlpha => pixels
                .chunks_exact(2)
                .flat_map(|p| [p[0], p[0], p[0], p[1]])
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// GlyphAtlas
// ---------------------------------------------------------------------------

/// Atlas dimensions plus the glyph UV table, indexed by glyph id.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphAtlas {
    width: u32,
    height: u32,
    pages: u32,
    glyphs: Vec<GlyphUv>,
}

impl GlyphAtlas {
    /// Every dimension and the glyph count must be positive.
    pub fn new(width: u32, height: u32, pages: u32, glyphs: Vec<GlyphUv>) -> Result<Self> {
        if width == 0 || height == 0 || pages == 0 || glyphs.is_empty() {
            return Err(Error::InvalidValue);
        }
        Ok(Self {
            width,
            height,
            pages,
            glyphs,
        })
    }

    /// Build from the flat `s, t, p, q, page, s, t, ...` float layout.
    pub fn from_stpqp(width: u32, height: u32, pages: u32, stpqp: &[f32]) -> Result<Self> {
        if stpqp.len() % FLOATS_PER_GLYPH != 0 {
            return Err(Error::InvalidValue);
        }
        let glyphs = stpqp
            .chunks_exact(FLOATS_PER_GLYPH)
            .map(|g| GlyphUv::new(g[0], g[1], g[2], g[3], g[4]))
            .collect();
        Self::new(width, height, pages, glyphs)
    }

    /// UV table for sheets where every page is cut into a regular
    /// `cols` x `rows` grid. Glyph ids run left to right, top to bottom,
    /// page after page.
    pub fn uniform_grid(width: u32, height: u32, pages: u32, cols: u32, rows: u32) -> Result<Self> {
        if cols == 0 || rows == 0 {
            return Err(Error::InvalidValue);
        }
        let per_page = (cols * rows) as usize;
        let mut glyphs = Vec::new();
        glyphs
            .try_reserve_exact(per_page * pages as usize)
            .map_err(|_| Error::OutOfMemory)?;
        for page in 0..pages {
            for row in 0..rows {
                for col in 0..cols {
                    glyphs.push(GlyphUv {
                        s: col as f32 / cols as f32,
                        t: (col + 1) as f32 / cols as f32,
                        p: (row + 1) as f32 / rows as f32,
                        q: row as f32 / rows as f32,
                        page: page as f32,
                    });
                }
            }
        }
        Self::new(width, height, pages, glyphs)
    }

    /// `(width, height, pages)` in pixels / layers.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32, u32) {
        (self.width, self.height, self.pages)
    }

    #[inline]
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    #[inline]
    pub fn glyph(&self, id: u16) -> Option<GlyphUv> {
        self.glyphs.get(id as usize).copied()
    }

    #[inline]
    pub fn glyphs(&self) -> &[GlyphUv] {
        &self.glyphs
    }
}

// ---------------------------------------------------------------------------
// AtlasData
// ---------------------------------------------------------------------------

/// Everything a backend needs to build an atlas resource.
#[derive(Copy, Clone, Debug)]
pub struct AtlasData<'a> {
    pub width: u32,
    pub height: u32,
    pub pages: u32,
    pub format: PixelFormat,
    /// Page after page, row after row, `format.channels()` bytes per pixel.
    pub pixels: &'a [u8],
    pub glyphs: &'a [GlyphUv],
}

impl AtlasData<'_> {
    /// Check dimensions, glyph count and pixel byte length.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.pages == 0 || self.glyphs.is_empty() {
            return Err(Error::InvalidValue);
        }
        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(self.pages as usize))
            .and_then(|n| n.checked_mul(self.format.channels()))
            .ok_or(Error::InvalidValue)?;
        if self.pixels.len() != expected {
            return Err(Error::InvalidValue);
        }
        Ok(())
    }

    /// Pixel data converted to RGBA, one page after another.
    pub fn rgba_pixels(&self) -> Vec<u8> {
        self.format.expand_to_rgba(self.pixels)
    }

    fn glyph_atlas(&self) -> Result<GlyphAtlas> {
        GlyphAtlas::new(self.width, self.height, self.pages, self.glyphs.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Atlas
// ---------------------------------------------------------------------------

/// A glyph atlas uploaded to a backend.
///
/// Created with [`Atlas::new`], replaced wholesale with
/// [`set_data`](Atlas::set_data) and released with
/// [`destroy`](Atlas::destroy).
pub struct Atlas<B: RenderBackend> {
    glyphs: GlyphAtlas,
    format: PixelFormat,
    handle: B::Atlas,
}

impl<B: RenderBackend> Atlas<B> {
    pub fn new(backend: &mut B, data: &AtlasData<'_>) -> Result<Self> {
        data.validate()?;
        let glyphs = data.glyph_atlas()?;
        let handle = backend.create_atlas(data)?;
        log::debug!(
            "atlas created: {}x{}x{} {:?}, {} glyphs",
            data.width,
            data.height,
            data.pages,
            data.format,
            glyphs.glyph_count()
        );
        Ok(Self {
            glyphs,
            format: data.format,
            handle,
        })
    }

    /// Replace dimensions, pixels and glyph table in one go. On error the
    /// atlas keeps its previous contents.
    pub fn set_data(&mut self, backend: &mut B, data: &AtlasData<'_>) -> Result<()> {
        data.validate()?;
        let glyphs = data.glyph_atlas()?;
        backend.replace_atlas(&mut self.handle, data)?;
        log::debug!(
            "atlas replaced: {}x{}x{}, {} glyphs",
            data.width,
            data.height,
            data.pages,
            glyphs.glyph_count()
        );
        self.glyphs = glyphs;
        self.format = data.format;
        Ok(())
    }

    /// Release the backend resources.
    pub fn destroy(self, backend: &mut B) {
        backend.destroy_atlas(self.handle);
    }

    /// `(width, height, pages)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32, u32) {
        self.glyphs.dimensions()
    }

    #[inline]
    pub fn glyph_count(&self) -> usize {
        self.glyphs.glyph_count()
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn glyph_atlas(&self) -> &GlyphAtlas {
        &self.glyphs
    }

    #[inline]
    pub fn handle(&self) -> &B::Atlas {
        &self.handle
    }
}
