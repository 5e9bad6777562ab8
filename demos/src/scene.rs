//! The demo scene: a small dungeon map with a wandering player, a
//! translucent message panel, a sliding free-positioned sprite, a scaled
//! minimap and a status bar.

use rlterm_core::{Atlas, Color, Mat4, RenderBackend, Result, Terminal, TerminalConfig, Viewport};

use crate::sheet::glyph;
use crate::DemoConfig;

const WALL: Color = Color::rgb(120, 110, 100);
const FLOOR: Color = Color::rgb(40, 36, 32);
const PANEL: Color = Color::rgba(0, 0, 40, 180);

/// Glyph ids that differ between font and procedural sheets.
#[derive(Copy, Clone, Debug)]
pub struct Glyphs {
    pub wall: u16,
    pub floor: u16,
    pub player: u16,
    pub sprite: u16,
    pub panel: u16,
}

impl Glyphs {
    pub const FONT: Self = Self {
        wall: b'#' as u16,
        floor: b'.' as u16,
        player: b'@' as u16,
        sprite: b'*' as u16,
        panel: b' ' as u16,
    };

    pub const PROCEDURAL: Self = Self {
        wall: glyph::CHECKER,
        floor: glyph::DOT,
        player: glyph::SOLID,
        sprite: glyph::FRAME,
        panel: glyph::EMPTY,
    };
}

/// All terminals of the demo plus animation state.
pub struct Scene {
    map: Terminal,
    /// Immediate mode: rebuilt every frame.
    overlay: Terminal,
    status: Terminal,
    /// One map tile, placed over the player through a raw matrix.
    highlight: Terminal,
    glyphs: Glyphs,
    frame: u64,
    player: (i32, i32),
}

impl Scene {
    pub fn new(config: &DemoConfig, tile_size: (u32, u32), glyphs: Glyphs) -> Result<Self> {
        let (tile_width, tile_height) = tile_size;
        let map = Terminal::with_tile_dimensions(
            config.grid_width,
            config.grid_height,
            config.pixel_scale,
            tile_width,
            tile_height,
        )?;
        let (map_w, _) = map.pixel_dimensions();
        let overlay = Terminal::new(&TerminalConfig {
            retained: false,
            ..map_config(config, tile_size)
        })?;
        let status = Terminal::with_pixel_dimensions(map_w, tile_height, 1.0, tile_width, tile_height, true)?;
        let mut highlight = Terminal::with_tile_dimensions(1, 1, config.pixel_scale, tile_width, tile_height)?;
        highlight.push_fill(glyphs.sprite, Color::rgba(255, 255, 0, 160), Color::TRANSPARENT)?;
        let mut scene = Self {
            map,
            overlay,
            status,
            highlight,
            glyphs,
            frame: 0,
            player: (2, 2),
        };
        scene.rebuild_map()?;
        Ok(scene)
    }

    #[inline]
    pub fn map(&self) -> &Terminal {
        &self.map
    }

    /// Advance the animation by one frame.
    pub fn tick(&mut self) -> Result<()> {
        self.frame += 1;
        if self.frame % 15 == 0 {
            let (wide, tall) = self.map.tile_grid_dimensions();
            let step = (self.frame / 15) as i32;
            self.player = (
                1 + step % (wide as i32 - 2).max(1),
                1 + (step / 3) % (tall as i32 - 2).max(1),
            );
            self.rebuild_map()?;
        }
        Ok(())
    }

    fn rebuild_map(&mut self) -> Result<()> {
        let g = self.glyphs;
        let (wide, tall) = self.map.tile_grid_dimensions();
        let (wide, tall) = (wide as i32, tall as i32);
        self.map.clear();
        self.map.push_fill(g.panel, Color::BLACK, Color::BLACK)?;
        for y in 0..tall {
            for x in 0..wide {
                let wall = x == 0 || y == 0 || x == wide - 1 || y == tall - 1 || (x % 7 == 3 && y % 5 != 2);
                let (glyph, fg) = if wall { (g.wall, WALL) } else { (g.floor, Color::GRAY) };
                self.map.push_grid(x, y, glyph, fg, FLOOR)?;
            }
        }
        let (px, py) = self.player;
        self.map.push_grid(px, py, g.player, Color::YELLOW, FLOOR)?;
        Ok(())
    }

    fn build_overlay(&mut self) -> Result<()> {
        let g = self.glyphs;
        let (tw, th) = self.overlay.tile_pixel_dimensions();
        let (pw, _) = self.overlay.pixel_dimensions();
        let (tw_i, th_i) = (tw as i32, th as i32);

        // Message panel two tiles high across the top.
        skip_rejected(self.overlay.push_grid_sized(
            1,
            1,
            pw as i32 - 2 * tw_i,
            2 * th_i,
            g.panel,
            Color::WHITE,
            PANEL,
        ))?;
        // A sprite sliding smoothly along the top edge. Positions past the
        // right edge are rejected and simply skipped.
        let x = (self.frame as i32 * 2) % (pw as i32 + 2 * tw_i) - tw_i;
        skip_rejected(self.overlay.push_free_sized(
            x,
            th_i / 2,
            tw_i,
            th_i,
            g.sprite,
            Color::AQUA,
            Color::TRANSPARENT,
        ))?;
        // A wobbling marker next to the origin.
        let wobble = ((self.frame / 4) % 5) as i32 - 2;
        skip_rejected(self.overlay.push_free(
            wobble,
            wobble,
            g.sprite,
            Color::FUCHSIA,
            Color::TRANSPARENT,
        ))
    }

    fn build_status(&mut self) -> Result<()> {
        let g = self.glyphs;
        let (wide, _) = self.status.tile_grid_dimensions();
        self.status.clear();
        self.status.push_fill(g.panel, Color::WHITE, Color::NAVY)?;
        let lit = (self.frame / 10) as u32 % wide.max(1);
        for x in 0..wide {
            let color = if x <= lit { Color::LIME } else { Color::GREEN };
            self.status.push_grid(x as i32, 0, g.player, color, Color::TRANSPARENT)?;
        }
        Ok(())
    }

    /// Draw a frame into a `width` x `height` target.
    pub fn render<B: RenderBackend>(&mut self, backend: &mut B, atlas: &Atlas<B>, width: u32, height: u32) -> Result<()> {
        let (vw, vh) = (width as i32, height as i32);
        let (_, status_h) = self.status.pixel_dimensions();

        backend.set_viewport(Viewport::new(0, 0, vw, vh));
        backend.clear(Color::BLACK);

        self.map.draw_centered(backend, atlas, vw, vh)?;

        self.build_overlay()?;
        let (map_w, map_h) = self.map.pixel_dimensions();
        let origin = ((vw - map_w as i32) / 2, (vh - map_h as i32) / 2);
        self.overlay.draw_translated(backend, atlas, origin.0, origin.1, vw, vh)?;

        // Minimap in the top-right corner.
        let scale = 0.25;
        let mini_w = (map_w as f32 * scale) as i32;
        self.map
            .draw_transformed(backend, atlas, vw - mini_w - 4, 4, scale, scale, vw, vh)?;

        // Highlight bobbing over the player, placed through a raw matrix.
        let (hw, hh) = self.highlight.pixel_dimensions();
        let (px, py) = self.player;
        let at = (origin.0 + px * hw as i32, origin.1 + py * hh as i32);
        let bob = ((self.frame % 60) as f32 / 60.0 * std::f32::consts::TAU).sin() * 2.0 / vh as f32;
        let mut matrix = Mat4::fitted((vw, vh), at, (hw as i32, hh as i32));
        matrix.0[7] += bob;
        self.highlight.draw_matrix(backend, atlas, &matrix)?;

        // Status bar stretched over a viewport strip at the bottom.
        self.build_status()?;
        let bar_h = status_h as i32;
        backend.set_viewport(Viewport::new(0, vh - bar_h, vw, bar_h));
        self.status.draw(backend, atlas)?;
        backend.set_viewport(Viewport::new(0, 0, vw, vh));
        Ok(())
    }
}

/// Treat a rejected tile as nothing to draw.
fn skip_rejected(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if !e.is_failure() => Ok(()),
        other => other,
    }
}

fn map_config(config: &DemoConfig, tile_size: (u32, u32)) -> TerminalConfig {
    TerminalConfig {
        sizing: rlterm_core::Sizing::Tiles {
            wide: config.grid_width,
            tall: config.grid_height,
        },
        pixel_scale: config.pixel_scale,
        tile_width: tile_size.0,
        tile_height: tile_size.1,
        retained: true,
    }
}
