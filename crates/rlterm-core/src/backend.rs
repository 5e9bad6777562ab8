//! The [`RenderBackend`] trait: everything a renderer must provide to draw
//! terminals.

use crate::atlas::AtlasData;
use crate::color::Color;
use crate::error::Result;
use crate::transform::{ClipRect, Mat4};

/// Target area, in target pixels with the origin at the top-left.
///
/// An empty viewport (the default) stands for the whole render target.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// This viewport, or the whole `width` x `height` target if empty.
    pub fn or_full(self, width: u32, height: u32) -> Self {
        if self.is_empty() {
            Self::new(0, 0, width as i32, height as i32)
        } else {
            self
        }
    }

    /// Map normalised device coordinates to target pixels.
    pub fn ndc_to_pixels(&self, ndc: [f32; 2]) -> [f32; 2] {
        [
            self.x as f32 + (ndc[0] + 1.0) * 0.5 * self.width as f32,
            self.y as f32 + (1.0 - ndc[1]) * 0.5 * self.height as f32,
        ]
    }

    /// A clip rectangle given relative to this viewport, moved into target
    /// pixels and cut down to a `width` x `height` target.
    pub fn clip_to_target(&self, clip: ClipRect, width: u32, height: u32) -> ClipRect {
        let to_i32 = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);
        ClipRect::cropped(
            self.x.saturating_add(to_i32(clip.x)),
            self.y.saturating_add(to_i32(clip.y)),
            to_i32(clip.width),
            to_i32(clip.height),
        )
        .within(width, height)
    }

    /// Pixels a draw may touch: the viewport cut down to the target, and
    /// further to `clip` when one is set.
    pub fn scissor(&self, clip: Option<ClipRect>, width: u32, height: u32) -> ClipRect {
        let bounds = ClipRect::cropped(self.x, self.y, self.width, self.height).within(width, height);
        match clip {
            Some(clip) => self.clip_to_target(clip, width, height).intersect(&bounds),
            None => bounds,
        }
    }
}

/// One batched draw.
#[derive(Copy, Clone, Debug)]
pub struct TileDraw<'a> {
    /// `count` encoded tile records, see [`crate::record`].
    pub tiles: &'a [u8],
    pub count: usize,
    /// Multiply a tile pixel coordinate by this to get unit space.
    pub pixel_unit: [f32; 2],
    pub matrix: Mat4,
}

impl TileDraw<'_> {
    /// Vertices the draw covers: two triangles per tile.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.count * 6
    }
}

/// A renderer able to hold atlases and draw tile batches.
///
/// Calls are made in order from a single thread. Clipping set through
/// [`set_clip`](Self::set_clip) stays in effect until it is set again.
pub trait RenderBackend {
    /// Backend-side atlas resource.
    type Atlas;

    /// Upload an atlas. `data` has already been validated.
    fn create_atlas(&mut self, data: &AtlasData<'_>) -> Result<Self::Atlas>;

    /// Replace an atlas wholesale. On error `atlas` must still be usable.
    fn replace_atlas(&mut self, atlas: &mut Self::Atlas, data: &AtlasData<'_>) -> Result<()>;

    /// Release an atlas.
    fn destroy_atlas(&mut self, atlas: Self::Atlas) {
        drop(atlas);
    }

    /// Area of the target later draws map to.
    fn set_viewport(&mut self, viewport: Viewport);

    /// Fill the whole target with one colour.
    fn clear(&mut self, color: Color);

    /// Enable (`Some`) or disable (`None`) scissoring.
    fn set_clip(&mut self, clip: Option<ClipRect>);

    /// Draw `draw.count` tiles with alpha blending.
    fn draw_tiles(&mut self, atlas: &Self::Atlas, draw: &TileDraw<'_>) -> Result<()>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_viewport_means_whole_target() {
        assert_eq!(
            Viewport::default().or_full(640, 480),
            Viewport::new(0, 0, 640, 480)
        );
        let vp = Viewport::new(10, 20, 100, 50);
        assert_eq!(vp.or_full(640, 480), vp);
    }

    #[test]
    fn ndc_corners_map_to_viewport_corners() {
        let vp = Viewport::new(10, 20, 100, 50);
        assert_eq!(vp.ndc_to_pixels([-1.0, 1.0]), [10.0, 20.0]);
        assert_eq!(vp.ndc_to_pixels([1.0, -1.0]), [110.0, 70.0]);
    }

    #[test]
    fn scissor_stays_inside_the_viewport() {
        let vp = Viewport::new(4, 4, 8, 8);
        assert_eq!(
            vp.scissor(None, 64, 64),
            ClipRect {
                x: 4,
                y: 4,
                width: 8,
                height: 8
            }
        );
        // A clip reaching past the viewport is cut at its edge.
        let clip = ClipRect {
            x: 2,
            y: 0,
            width: 100,
            height: 3,
        };
        assert_eq!(
            vp.scissor(Some(clip), 64, 64),
            ClipRect {
                x: 6,
                y: 4,
                width: 6,
                height: 3
            }
        );
        // A viewport hanging off the target is cut at the target.
        let vp = Viewport::new(-4, 60, 16, 16);
        assert_eq!(
            vp.scissor(None, 64, 64),
            ClipRect {
                x: 0,
                y: 60,
                width: 12,
                height: 4
            }
        );
    }

    #[test]
    fn clip_moves_with_viewport_and_stays_in_target() {
        let vp = Viewport::new(-20, 10, 200, 200);
        let clip = ClipRect {
            x: 5,
            y: 5,
            width: 100,
            height: 100,
        };
        assert_eq!(
            vp.clip_to_target(clip, 64, 64),
            ClipRect {
                x: 0,
                y: 15,
                width: 64,
                height: 49
            }
        );
    }
}
