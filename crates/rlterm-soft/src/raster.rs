//! Triangle rasterization and glyph shading.

use rlterm_core::{ClipRect, Color, GlyphUv, TileRecord};

/// A transformed corner: target pixel position plus atlas UV.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Vertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

/// Tile-local corners, y measured down from the tile's top edge.
pub(crate) const CORNERS: [[f32; 2]; 6] = [
    [0.0, 1.0],
    [0.0, 0.0],
    [1.0, 0.0],
    [0.0, 1.0],
    [1.0, 0.0],
    [1.0, 1.0],
];

/// Atlas pixels as the rasterizer samples them.
pub(crate) struct Texture<'a> {
    pub width: u32,
    pub height: u32,
    pub pages: u32,
    pub rgba: &'a [u8],
}

impl Texture<'_> {
    /// Nearest-neighbour sample, clamped to the page edges.
    pub fn sample(&self, uv: [f32; 2], page: u32) -> [f32; 4] {
        let x = ((uv[0] * self.width as f32).floor().max(0.0) as u32).min(self.width - 1);
        let y = ((uv[1] * self.height as f32).floor().max(0.0) as u32).min(self.height - 1);
        let page = page.min(self.pages - 1);
        let i = (((page * self.height + y) * self.width + x) * 4) as usize;
        let p = &self.rgba[i..i + 4];
        [
            p[0] as f32 / 255.0,
            p[1] as f32 / 255.0,
            p[2] as f32 / 255.0,
            p[3] as f32 / 255.0,
        ]
    }
}

/// Shading inputs shared by both triangles of a tile.
pub(crate) struct Shade<'a> {
    pub fg: [f32; 4],
    pub bg: [f32; 4],
    pub glyph: Option<(GlyphUv, &'a Texture<'a>)>,
}

impl<'a> Shade<'a> {
    pub fn new(record: &TileRecord, glyph: Option<(GlyphUv, &'a Texture<'a>)>) -> Self {
        Self {
            fg: record.fg.to_f32(),
            bg: record.bg.to_f32(),
            glyph,
        }
    }

    /// `mix(bg, fg * (c.rgb, 1), c.a)` for the atlas colour `c` at `uv`.
    fn color(&self, uv: [f32; 2]) -> [f32; 4] {
        let Some((glyph, texture)) = self.glyph else {
            return self.bg;
        };
        let c = texture.sample(uv, glyph.page as u32);
        let tinted = [self.fg[0] * c[0], self.fg[1] * c[1], self.fg[2] * c[2], self.fg[3]];
        let mut out = [0.0; 4];
        for k in 0..4 {
            out[k] = self.bg[k] + (tinted[k] - self.bg[k]) * c[3];
        }
        out
    }
}

/// An RGBA8 render target.
pub(crate) struct Target<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a mut [u8],
}

impl Target<'_> {
    /// Blend `src` over the pixel at `(x, y)` with src-alpha /
    /// one-minus-src-alpha on every channel.
    fn blend(&mut self, x: u32, y: u32, src: [f32; 4]) {
        debug_assert!(x < self.width && y < self.height, "blend outside target at ({x}, {y})");
        let i = ((y * self.width + x) * 4) as usize;
        let a = src[3].clamp(0.0, 1.0);
        for k in 0..4 {
            let dst = self.pixels[i + k] as f32 / 255.0;
            let v = src[k].clamp(0.0, 1.0) * a + dst * (1.0 - a);
            self.pixels[i + k] = (v * 255.0).round() as u8;
        }
    }

    pub fn fill(&mut self, color: Color) {
        let c = color.to_array();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&c);
        }
    }
}

fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Whether a pixel centre lying exactly on edge `a -> b` belongs to this
/// triangle. Two triangles sharing an edge walk it in opposite directions,
/// so exactly one of them owns it.
fn owns_edge(a: [f32; 2], b: [f32; 2]) -> bool {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    dy > 0.0 || (dy == 0.0 && dx < 0.0)
}

/// Rasterize one triangle into `target`, limited to `scissor`. Pixels are
/// covered when their centre is inside.
pub(crate) fn triangle(target: &mut Target<'_>, scissor: ClipRect, tri: [Vertex; 3], shade: &Shade<'_>) {
    let [v0, mut v1, mut v2] = tri;
    let mut area = edge(v0.pos, v1.pos, v2.pos);
    if area == 0.0 || !area.is_finite() {
        return;
    }
    if area < 0.0 {
        std::mem::swap(&mut v1, &mut v2);
        area = -area;
    }

    let xs = [v0.pos[0], v1.pos[0], v2.pos[0]];
    let ys = [v0.pos[1], v1.pos[1], v2.pos[1]];
    let min = |v: [f32; 3]| v[0].min(v[1]).min(v[2]);
    let max = |v: [f32; 3]| v[0].max(v[1]).max(v[2]);
    let clamp = |v: f32, lo: u32, hi: u32| (v.max(lo as f32) as u32).min(hi);

    let right = scissor.x + scissor.width;
    let bottom = scissor.y + scissor.height;
    let x0 = clamp(min(xs).floor(), scissor.x, right);
    let x1 = clamp(max(xs).ceil(), scissor.x, right);
    let y0 = clamp(min(ys).floor(), scissor.y, bottom);
    let y1 = clamp(max(ys).ceil(), scissor.y, bottom);

    let own = [
        owns_edge(v1.pos, v2.pos),
        owns_edge(v2.pos, v0.pos),
        owns_edge(v0.pos, v1.pos),
    ];

    for y in y0..y1 {
        for x in x0..x1 {
            let p = [x as f32 + 0.5, y as f32 + 0.5];
            let w = [
                edge(v1.pos, v2.pos, p),
                edge(v2.pos, v0.pos, p),
                edge(v0.pos, v1.pos, p),
            ];
            let inside = w
                .iter()
                .zip(own)
                .all(|(&w, own)| w > 0.0 || (w == 0.0 && own));
            if !inside {
                continue;
            }
            let (l0, l1, l2) = (w[0] / area, w[1] / area, w[2] / area);
            let uv = [
                l0 * v0.uv[0] + l1 * v1.uv[0] + l2 * v2.uv[0],
                l0 * v0.uv[1] + l1 * v1.uv[1] + l2 * v2.uv[1],
            ];
            target.blend(x, y, shade.color(uv));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32, y: f32) -> Vertex {
        Vertex {
            pos: [x, y],
            uv: [0.0, 0.0],
        }
    }

    fn solid(color: Color) -> Shade<'static> {
        Shade {
            fg: color.to_f32(),
            bg: color.to_f32(),
            glyph: None,
        }
    }

    fn covered(pixels: &[u8]) -> usize {
        pixels.chunks_exact(4).filter(|p| p[3] != 0).count()
    }

    #[test]
    fn quad_diagonal_is_covered_once() {
        let mut pixels = vec![0u8; 8 * 8 * 4];
        let mut target = Target {
            width: 8,
            height: 8,
            pixels: &mut pixels,
        };
        let full = ClipRect {
            x: 0,
            y: 0,
            width: 8,
            height: 8,
        };
        let half = Shade {
            fg: [1.0, 1.0, 1.0, 0.5],
            bg: [1.0, 1.0, 1.0, 0.5],
            glyph: None,
        };
        let (a, b, c, d) = (vertex(0.0, 8.0), vertex(0.0, 0.0), vertex(8.0, 0.0), vertex(8.0, 8.0));
        triangle(&mut target, full, [a, b, c], &half);
        triangle(&mut target, full, [a, c, d], &half);
        // Every pixel blended exactly once: rgb 0.5, alpha 0.5 * 0.5.
        assert!(pixels.chunks_exact(4).all(|p| p[0] == 128 && p[3] == 64));
    }

    #[test]
    fn scissor_limits_coverage() {
        let mut pixels = vec![0u8; 8 * 8 * 4];
        let mut target = Target {
            width: 8,
            height: 8,
            pixels: &mut pixels,
        };
        let clip = ClipRect {
            x: 2,
            y: 2,
            width: 3,
            height: 2,
        };
        let (a, b, c, d) = (vertex(0.0, 8.0), vertex(0.0, 0.0), vertex(8.0, 0.0), vertex(8.0, 8.0));
        triangle(&mut target, clip, [a, b, c], &solid(Color::RED));
        triangle(&mut target, clip, [a, c, d], &solid(Color::RED));
        assert_eq!(covered(&pixels), 6);
    }

    #[test]
    fn degenerate_triangle_draws_nothing() {
        let mut pixels = vec![0u8; 4 * 4 * 4];
        let mut target = Target {
            width: 4,
            height: 4,
            pixels: &mut pixels,
        };
        let full = ClipRect {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
        };
        let tri = [vertex(0.0, 0.0), vertex(2.0, 2.0), vertex(4.0, 4.0)];
        triangle(&mut target, full, tri, &solid(Color::WHITE));
        assert_eq!(covered(&pixels), 0);
    }
}
