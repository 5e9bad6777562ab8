//! The 18-byte wire layout of a single tile.
//!
//! ```text
//! offset  size  field
//!      0     2  x + TILE_POSITION_OFFSET   (u16, little-endian)
//!      2     2  y + TILE_POSITION_OFFSET   (u16, little-endian)
//!      4     2  width in pixels            (u16, little-endian)
//!      6     2  height in pixels           (u16, little-endian)
//!      8     2  glyph id                   (u16, little-endian)
//!     10     4  foreground r, g, b, a
//!     14     4  background r, g, b, a
//! ```
//!
//! Positions are biased so tiles may hang off the top/left edge of a
//! terminal without a sign bit in the encoding. Backends undo the bias when
//! they build vertices.

use crate::color::Color;
use crate::error::{Error, Result};

/// Encoded size of one tile.
pub const TILE_RECORD_SIZE: usize = 18;

/// Bias added to pixel positions before they are stored unsigned.
pub const TILE_POSITION_OFFSET: i32 = 16384;

/// Largest width or height a tile may have.
pub const MAX_TILE_SIZE: i32 = u16::MAX as i32;

/// Smallest pixel position that survives the bias.
pub const MIN_TILE_POSITION: i32 = -TILE_POSITION_OFFSET;

/// Largest pixel position that survives the bias.
pub const MAX_TILE_POSITION: i32 = u16::MAX as i32 - TILE_POSITION_OFFSET;

/// A tile placement before encoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TileRecord {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub glyph: u16,
    pub fg: Color,
    pub bg: Color,
}

impl TileRecord {
    /// Whether the record fits the encoding: position within
    /// [`MIN_TILE_POSITION`]..=[`MAX_TILE_POSITION`] and a size within
    /// `1..=MAX_TILE_SIZE`.
    pub fn check(&self) -> Result<()> {
        let pos_ok = |v: i32| (MIN_TILE_POSITION..=MAX_TILE_POSITION).contains(&v);
        let size_ok = |v: i32| (1..=MAX_TILE_SIZE).contains(&v);
        if pos_ok(self.x) && pos_ok(self.y) && size_ok(self.width) && size_ok(self.height) {
            Ok(())
        } else {
            Err(Error::TileOutOfTerminal)
        }
    }

    /// Encode into the wire layout. The record must have passed
    /// [`check`](Self::check).
    pub fn encode(&self) -> [u8; TILE_RECORD_SIZE] {
        debug_assert!(self.check().is_ok(), "encoding unchecked tile {self:?}");
        let x = ((self.x + TILE_POSITION_OFFSET) as u16).to_le_bytes();
        let y = ((self.y + TILE_POSITION_OFFSET) as u16).to_le_bytes();
        let w = (self.width as u16).to_le_bytes();
        let h = (self.height as u16).to_le_bytes();
        let g = self.glyph.to_le_bytes();
        let fg = self.fg.to_array();
        let bg = self.bg.to_array();
        [
            x[0], x[1], y[0], y[1], w[0], w[1], h[0], h[1], g[0], g[1], fg[0], fg[1], fg[2], fg[3],
            bg[0], bg[1], bg[2], bg[3],
        ]
    }

    /// Decode one record from the wire layout.
    pub fn decode(bytes: &[u8; TILE_RECORD_SIZE]) -> Self {
        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        Self {
            x: u16_at(0) as i32 - TILE_POSITION_OFFSET,
            y: u16_at(2) as i32 - TILE_POSITION_OFFSET,
            width: u16_at(4) as i32,
            height: u16_at(6) as i32,
            glyph: u16_at(8),
            fg: Color::rgba(bytes[10], bytes[11], bytes[12], bytes[13]),
            bg: Color::rgba(bytes[14], bytes[15], bytes[16], bytes[17]),
        }
    }

    /// Decode every whole record in `bytes`. Trailing bytes are ignored.
    pub fn decode_all(bytes: &[u8]) -> impl Iterator<Item = TileRecord> + '_ {
        bytes.chunks_exact(TILE_RECORD_SIZE).map(|chunk| {
            let mut rec = [0u8; TILE_RECORD_SIZE];
            rec.copy_from_slice(chunk);
            Self::decode(&rec)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(x: i32, y: i32) -> TileRecord {
        TileRecord {
            x,
            y,
            width: 8,
            height: 12,
            glyph: 0x0140,
            fg: Color::rgba(1, 2, 3, 4),
            bg: Color::rgba(5, 6, 7, 8),
        }
    }

    #[test]
    fn layout_is_little_endian() {
        let bytes = tile(-1, 2).encode();
        // 16383 = 0x3FFF, 16386 = 0x4002
        assert_eq!(&bytes[0..4], &[0xFF, 0x3F, 0x02, 0x40]);
        assert_eq!(&bytes[4..8], &[8, 0, 12, 0]);
        assert_eq!(&bytes[8..10], &[0x40, 0x01]);
        assert_eq!(&bytes[10..], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn bias_round_trips_at_the_extremes() {
        for (x, y) in [
            (MIN_TILE_POSITION, MAX_TILE_POSITION),
            (0, 0),
            (-8, 8),
            (MAX_TILE_POSITION, MIN_TILE_POSITION),
        ] {
            let t = tile(x, y);
            assert_eq!(TileRecord::decode(&t.encode()), t);
        }
    }

    #[test]
    fn check_rejects_unrepresentable() {
        assert!(tile(MIN_TILE_POSITION - 1, 0).check().is_err());
        assert!(tile(0, MAX_TILE_POSITION + 1).check().is_err());
        let mut t = tile(0, 0);
        t.width = 0;
        assert_eq!(t.check(), Err(Error::TileOutOfTerminal));
        t.width = MAX_TILE_SIZE;
        assert!(t.check().is_ok());
        t.height = MAX_TILE_SIZE + 1;
        assert!(t.check().is_err());
    }

    #[test]
    fn decode_all_ignores_partial_tail() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&tile(0, 0).encode());
        bytes.extend_from_slice(&tile(1, 1).encode());
        bytes.extend_from_slice(&[0; 5]);
        let tiles: Vec<_> = TileRecord::decode_all(&bytes).collect();
        assert_eq!(tiles, vec![tile(0, 0), tile(1, 1)]);
    }
}
