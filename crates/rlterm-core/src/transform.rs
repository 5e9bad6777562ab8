//! Screen transforms for a whole batch: [`Mat4`], [`ClipRect`] and the
//! [`Placement`] variants that produce them.
//!
//! Backends place tiles in *unit* space, where `(0, 0)` is the terminal's
//! top-left corner and `(1, 1)` its bottom-right. The matrix maps unit space
//! to normalised device coordinates.

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Mat4
// ---------------------------------------------------------------------------

/// A row-major 4x4 matrix applied to column vectors.
///
/// Uploaded verbatim, a WGSL/GLSL `mat4` sees the transpose, so shaders
/// multiply with the vector on the left (`v * m`).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Mat4(pub [f32; 16]);

impl Mat4 {
    /// Unit space to NDC with Y flipped: the terminal fills the viewport.
    pub const SCREEN: Self = Self([
        2.0, 0.0, 0.0, -1.0, //
        0.0, -2.0, 0.0, 1.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// Build from a slice of exactly 16 floats.
    pub fn from_slice(m: &[f32]) -> Result<Self> {
        let arr: [f32; 16] = m.try_into().map_err(|_| Error::InvalidValue)?;
        Ok(Self(arr))
    }

    /// The screen matrix rescaled so a `size` pixel terminal lands at
    /// `translate` inside a `viewport` pixel target.
    pub fn fitted(viewport: (i32, i32), translate: (i32, i32), size: (i32, i32)) -> Self {
        let (vw, vh) = (viewport.0 as f32, viewport.1 as f32);
        let mut m = Self::SCREEN;
        m.0[0] *= size.0 as f32 / vw;
        m.0[5] *= size.1 as f32 / vh;
        m.0[3] += translate.0 as f32 / vw * 2.0;
        m.0[7] -= translate.1 as f32 / vh * 2.0;
        m
    }

    /// Transform `(x, y, 0, 1)`, returning the resulting x and y.
    pub fn transform_point(&self, x: f32, y: f32) -> [f32; 2] {
        let m = &self.0;
        let w = m[12] * x + m[13] * y + m[15];
        let w = if w == 0.0 { 1.0 } else { w };
        [
            (m[0] * x + m[1] * y + m[3]) / w,
            (m[4] * x + m[5] * y + m[7]) / w,
        ]
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::SCREEN
    }
}

// ---------------------------------------------------------------------------
// ClipRect
// ---------------------------------------------------------------------------

/// A scissor rectangle in target pixels, origin top-left.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ClipRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ClipRect {
    /// Clip to `(x, y, width, height)`, cropping a negative origin to zero
    /// while keeping the right and bottom edges where they were.
    pub fn cropped(x: i32, y: i32, width: i32, height: i32) -> Self {
        // (start, length) along one axis, in i64 so no input overflows.
        let crop = |pos: i32, len: i32| {
            let start = i64::from(pos).max(0);
            let end = (i64::from(pos) + i64::from(len)).max(start);
            (start as u32, (end - start).min(i64::from(u32::MAX)) as u32)
        };
        let (cx, cw) = crop(x, width);
        let (cy, ch) = crop(y, height);
        Self {
            x: cx,
            y: cy,
            width: cw,
            height: ch,
        }
    }

    /// The overlap of two rectangles; empty if they are disjoint.
    pub fn intersect(&self, other: &ClipRect) -> Self {
        let span = |a: u32, a_len: u32, b: u32, b_len: u32| {
            let start = a.max(b);
            let end = (u64::from(a) + u64::from(a_len)).min(u64::from(b) + u64::from(b_len));
            (start, end.saturating_sub(u64::from(start)) as u32)
        };
        let (x, width) = span(self.x, self.width, other.x, other.width);
        let (y, height) = span(self.y, self.height, other.y, other.height);
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The part of the rectangle inside a `width` x `height` target.
    pub fn within(&self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        }
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x - self.x < self.width && y - self.y < self.height
    }
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// How a terminal is positioned in the render target.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Placement {
    /// Stretch the terminal over the whole viewport.
    Direct,
    /// Pixel-perfect, centred in the viewport.
    Centered {
        viewport_width: i32,
        viewport_height: i32,
    },
    /// Pixel-perfect, top-left corner at `(x, y)`.
    Translated {
        x: i32,
        y: i32,
        viewport_width: i32,
        viewport_height: i32,
    },
    /// Top-left corner at `(x, y)`, stretched by `scale_x` / `scale_y`.
    Transformed {
        x: i32,
        y: i32,
        scale_x: f32,
        scale_y: f32,
        viewport_width: i32,
        viewport_height: i32,
    },
    /// A caller-supplied matrix. No clipping is applied.
    Matrix(Mat4),
}

impl Placement {
    /// Matrix and clip rectangle for a terminal of `pixel_width` x
    /// `pixel_height` screen pixels.
    pub fn resolve(&self, pixel_width: u32, pixel_height: u32) -> Result<(Mat4, Option<ClipRect>)> {
        let size = (pixel_width as i32, pixel_height as i32);
        match *self {
            Self::Direct => Ok((Mat4::SCREEN, None)),
            Self::Matrix(m) => Ok((m, None)),
            Self::Centered {
                viewport_width,
                viewport_height,
            } => {
                check_viewport(viewport_width, viewport_height)?;
                let centre = |view: i32, len: i32| ((i64::from(view) - i64::from(len)) / 2) as i32;
                let x = centre(viewport_width, size.0);
                let y = centre(viewport_height, size.1);
                fit(viewport_width, viewport_height, x, y, size)
            }
            Self::Translated {
                x,
                y,
                viewport_width,
                viewport_height,
            } => fit(viewport_width, viewport_height, x, y, size),
            Self::Transformed {
                x,
                y,
                scale_x,
                scale_y,
                viewport_width,
                viewport_height,
            } => {
                if !(scale_x.is_finite() && scale_x > 0.0 && scale_y.is_finite() && scale_y > 0.0) {
                    return Err(Error::InvalidValue);
                }
                // Whole pixels, so the clip rectangle and the matrix agree.
                let scaled = (
                    (size.0 as f32 * scale_x) as i32,
                    (size.1 as f32 * scale_y) as i32,
                );
                fit(viewport_width, viewport_height, x, y, scaled)
            }
        }
    }
}

fn check_viewport(vw: i32, vh: i32) -> Result<()> {
    if vw <= 0 || vh <= 0 {
        return Err(Error::InvalidValue);
    }
    Ok(())
}

fn fit(vw: i32, vh: i32, x: i32, y: i32, size: (i32, i32)) -> Result<(Mat4, Option<ClipRect>)> {
    check_viewport(vw, vh)?;
    let m = Mat4::fitted((vw, vh), (x, y), size);
    Ok((m, Some(ClipRect::cropped(x, y, size.0, size.1))))
}
