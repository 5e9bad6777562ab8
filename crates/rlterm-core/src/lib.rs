//! **rlterm-core**: batched tile terminals for roguelike rendering.
//!
//! A [`Terminal`] accumulates tile placements (position, size, glyph,
//! foreground/background colour) into a compact 18-byte-per-tile batch,
//! validates them against the terminal bounds and hands the whole batch to a
//! [`RenderBackend`] in a single draw, positioned by one of the transform
//! variants in [`transform`].
//!
//! This crate is backend-agnostic: GPU and CPU renderers live in
//! `rlterm-wgpu` and `rlterm-soft`.
//!
//! ```
//! use rlterm_core::{Color, Terminal};
//!
//! let mut term = Terminal::with_tile_dimensions(10, 5, 1.0, 8, 8).unwrap();
//! term.push_grid(0, 0, b'@' as u16, Color::YELLOW, Color::BLACK).unwrap();
//! term.push_grid(9, 4, b'#' as u16, Color::GRAY, Color::BLACK).unwrap();
//! assert_eq!(term.tile_count(), 2);
//! ```

pub mod atlas;
pub mod backend;
pub mod batch;
pub mod color;
pub mod error;
pub mod record;
pub mod terminal;
pub mod transform;

pub use atlas::{Atlas, AtlasData, GlyphAtlas, GlyphUv, PixelFormat};
pub use backend::{RenderBackend, TileDraw, Viewport};
pub use batch::TileBatch;
pub use color::Color;
pub use error::{Error, Result};
pub use record::{TileRecord, MAX_TILE_SIZE, TILE_POSITION_OFFSET, TILE_RECORD_SIZE};
pub use terminal::{Sizing, Terminal, TerminalConfig};
pub use transform::{ClipRect, Mat4, Placement};
