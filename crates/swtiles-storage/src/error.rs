//! Storage Error Types
//!
//! Parsing errors surface at `open` and abort the call without side
//! effects. Writer errors are fatal for the archive under construction;
//! the partial file should be discarded. Reader errors on a tile fetch are
//! local to that call and leave the reader usable.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("format error: {0}")]
    Format(#[from] swtiles_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} fetching {length} bytes at offset {offset}")]
    HttpStatus { status: u16, offset: u64, length: u64 },

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("truncated read at offset {offset}: wanted {expected} bytes, got {actual}")]
    Truncated {
        offset: u64,
        expected: u64,
        actual: u64,
    },

    #[error("level {0} not found")]
    LevelNotFound(u8),

    #[error("cell ({row}, {col}) is outside the grid of level {level}")]
    OutOfGrid { level: u8, row: u32, col: u32 },

    #[error("duplicate tile at ({row}, {col}) on level {level}")]
    DuplicateCell { level: u8, row: u32, col: u32 },

    #[error("tile ({row}, {col}) does not fit the {cols}x{rows} grid of level {level}")]
    CellOutOfGrid {
        level: u8,
        row: u32,
        col: u32,
        rows: u32,
        cols: u32,
    },

    #[error("payload of {len} bytes at ({row}, {col}) exceeds the 24-bit tile limit")]
    PayloadTooLarge { row: u32, col: u32, len: usize },

    #[error("payload region of level {0} exceeds the 40-bit offset limit")]
    LevelPayloadTooLarge(u8),

    #[error("level id {0} written twice")]
    DuplicateLevel(u8),

    #[error("archive declared {declared} levels but {written} were written")]
    LevelCountMismatch { declared: u8, written: usize },

    #[error("an archive must declare at least one level")]
    NoLevels,

    #[error("archive cannot hold {0} levels; the format allows at most 255")]
    TooManyLevels(usize),
}
