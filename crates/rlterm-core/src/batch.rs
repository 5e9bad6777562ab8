//! The [`TileBatch`]: encoded tiles waiting to be drawn.

use crate::error::{Error, Result};
use crate::record::{TileRecord, TILE_RECORD_SIZE};

/// A growable, ordered run of encoded [`TileRecord`]s.
///
/// Capacity is tracked in tiles and doubles whenever a push finds the batch
/// full. Clearing keeps the allocation.
#[derive(Debug, Clone, Default)]
pub struct TileBatch {
    /// Always `count * TILE_RECORD_SIZE` bytes long.
    data: Vec<u8>,
    count: usize,
    capacity: usize,
}

impl TileBatch {
    /// Create a batch with room for `capacity` tiles.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut data = Vec::new();
        let bytes = capacity
            .checked_mul(TILE_RECORD_SIZE)
            .ok_or(Error::OutOfMemory)?;
        data.try_reserve_exact(bytes)
            .map_err(|_| Error::OutOfMemory)?;
        Ok(Self {
            data,
            count: 0,
            capacity,
        })
    }

    /// Number of tiles pushed since the last clear.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Reserved room, in tiles.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Length of the encoded data in bytes.
    #[inline]
    pub fn byte_length(&self) -> usize {
        self.count * TILE_RECORD_SIZE
    }

    /// The encoded tiles, in push order.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Forget every tile. Never reallocates.
    pub fn clear(&mut self) {
        self.data.clear();
        self.count = 0;
    }

    /// Make sure one more tile fits, doubling the capacity if the batch is
    /// full. On failure nothing changes.
    pub fn reserve_one(&mut self) -> Result<()> {
        if self.count < self.capacity {
            return Ok(());
        }
        let new_capacity = self.capacity.checked_mul(2).ok_or(Error::OutOfMemory)?.max(1);
        let new_bytes = new_capacity
            .checked_mul(TILE_RECORD_SIZE)
            .ok_or(Error::OutOfMemory)?;
        self.data
            .try_reserve_exact(new_bytes - self.data.len())
            .map_err(|_| Error::OutOfMemory)?;
        log::debug!(
            "tile batch grew to {} tiles (was {})",
            new_capacity,
            self.capacity
        );
        self.capacity = new_capacity;
        Ok(())
    }

    /// Append an already-checked record. Call [`reserve_one`](Self::reserve_one)
    /// first so the append stays within the reserved capacity.
    pub fn append(&mut self, record: &TileRecord) {
        debug_assert!(self.count < self.capacity, "append without reserve_one");
        self.data.extend_from_slice(&record.encode());
        self.count += 1;
    }

    /// Check, reserve and append in one step.
    pub fn push(&mut self, record: &TileRecord) -> Result<()> {
        record.check()?;
        self.reserve_one()?;
        self.append(record);
        Ok(())
    }

    /// Decode the tiles back into records.
    pub fn records(&self) -> impl Iterator<Item = TileRecord> + '_ {
        TileRecord::decode_all(&self.data)
    }
}
