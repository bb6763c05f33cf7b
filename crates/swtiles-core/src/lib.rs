//! SWTILES Format Layer
//!
//! A `.swtiles` archive is a single file holding a georeferenced raster
//! tile pyramid: a fixed header, a level table, and per level a dense
//! spatial index followed by concatenated opaque image payloads. The
//! layout is designed so any tile is reachable in two byte-range reads:
//! one for its 8-byte index cell, one for the payload.
//!
//! This crate is the pure part of the stack: the byte-exact codec for the
//! three record kinds, the header and level types, and the coordinate
//! arithmetic mapping georeferenced positions to grid cells and back.
//! No I/O happens here; the writer and readers live in `swtiles-storage`.

pub mod error;
pub mod format;
pub mod header;
pub mod level;

pub use error::{Error, Result};
pub use format::{
    decode_header, decode_index_cell, decode_level_entry, encode_header, encode_index_cell,
    encode_level_entry, ARCHIVE_EXTENSION, ARCHIVE_MEDIA_TYPE, HEADER_SIZE, INDEX_CELL_SIZE,
    LEVEL_ENTRY_SIZE, MAGIC, MAX_PAYLOAD_LENGTH, MAX_PAYLOAD_OFFSET, VERSION,
};
pub use header::{DataType, Header, ImageFormat};
pub use level::{CellBounds, Level};
