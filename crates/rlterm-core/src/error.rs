//! The crate-wide [`Error`] type.

/// Everything that can go wrong while building or drawing a tile batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Error {
    /// A pushed tile falls outside the placement envelope of its operation.
    ///
    /// This is a soft outcome: the batch is untouched and the caller may
    /// simply skip the tile.
    #[error("tile out of terminal")]
    TileOutOfTerminal,
    /// A required handle or target was absent.
    #[error("unexpected null argument")]
    NullArgument,
    /// A numeric argument violated a documented precondition.
    #[error("unexpected argument value")]
    InvalidValue,
    /// An allocation or reallocation failed.
    #[error("out of memory")]
    OutOfMemory,
}

impl Error {
    /// Whether this is a hard failure rather than a rejected tile.
    #[inline]
    pub const fn is_failure(self) -> bool {
        !matches!(self, Self::TileOutOfTerminal)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
