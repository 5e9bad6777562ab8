//! Shared code for the rlterm demo binaries.
//!
//! Run: `cargo run --bin tiles-wgpu` or `cargo run --bin tiles-soft`.
//! Set `RLTERM_FONT` to a TTF/OTF path to draw with a real font instead of
//! the procedural glyph sheet, and `RLTERM_SCALE` to change the pixel scale.

pub mod scene;
pub mod sheet;

use std::path::PathBuf;

pub use scene::{Glyphs, Scene};
pub use sheet::GlyphSheet;

/// Errors the demos can run into before or while drawing.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("invalid font: {0}")]
    InvalidFont(String),
    #[error("cannot read font: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Terminal(#[from] rlterm_core::Error),
}

/// Demo settings.
#[derive(Clone, Debug)]
pub struct DemoConfig {
    /// Window title.
    pub title: String,
    /// TTF/OTF to rasterize glyphs from. `None` uses the procedural sheet.
    pub font_path: Option<PathBuf>,
    /// Font size in pixels.
    pub font_size: f32,
    /// Tile size of the procedural sheet.
    pub tile_size: (u32, u32),
    /// Map size in tiles.
    pub grid_width: u32,
    pub grid_height: u32,
    /// Screen pixels per terminal pixel.
    pub pixel_scale: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            title: "rlterm".into(),
            font_path: None,
            font_size: 16.0,
            tile_size: (8, 8),
            grid_width: 60,
            grid_height: 30,
            pixel_scale: 1.0,
        }
    }
}

impl DemoConfig {
    /// Defaults overridden by `RLTERM_FONT` and `RLTERM_SCALE`.
    pub fn from_env(title: &str) -> Self {
        let mut config = Self {
            title: title.into(),
            ..Default::default()
        };
        if let Some(path) = std::env::var_os("RLTERM_FONT") {
            config.font_path = Some(path.into());
        }
        if let Ok(scale) = std::env::var("RLTERM_SCALE") {
            match scale.parse::<f32>() {
                Ok(s) if s.is_finite() && s > 0.0 => config.pixel_scale = s,
                _ => log::warn!("ignoring RLTERM_SCALE={scale:?}"),
            }
        }
        config
    }

    /// The glyph sheet and matching glyph ids for this configuration.
    pub fn load_sheet(&self) -> Result<(GlyphSheet, Glyphs), DemoError> {
        match &self.font_path {
            Some(path) => {
                let data = std::fs::read(path)?;
                log::info!("rasterizing glyphs from {}", path.display());
                Ok((GlyphSheet::from_font(&data, self.font_size)?, Glyphs::FONT))
            }
            None => {
                let (w, h) = self.tile_size;
                Ok((GlyphSheet::procedural(w, h)?, Glyphs::PROCEDURAL))
            }
        }
    }

    /// Window size that fits the map exactly, plus one row for the status bar.
    pub fn window_size(&self, tile_size: (u32, u32)) -> (u32, u32) {
        let w = (self.grid_width * tile_size.0) as f32 * self.pixel_scale;
        let h = (self.grid_height * tile_size.1) as f32 * self.pixel_scale;
        (w as u32, h as u32 + tile_size.1)
    }
}

/// Initialise logging for a demo binary.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn procedural_sheet_by_default() {
        let config = DemoConfig::default();
        let (sheet, glyphs) = config.load_sheet().unwrap();
        assert_eq!(sheet.tile_size(), (8, 8));
        assert_eq!(glyphs.player, Glyphs::PROCEDURAL.player);
        assert_eq!(config.window_size(sheet.tile_size()), (480, 248));
    }

    #[test]
    fn missing_font_is_io_error() {
        let config = DemoConfig {
            font_path: Some("/nonexistent/font.ttf".into()),
            ..Default::default()
        };
        assert!(matches!(config.load_sheet(), Err(DemoError::Io(_))));
    }
}
