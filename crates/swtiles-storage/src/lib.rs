//! SWTILES Storage Layer
//!
//! The I/O side of the SWTILES stack: assembling archives and reading
//! tiles back out of them, locally or across the network.
//!
//! ```text
//! tile source (encoded payloads + grid coords)
//!        |
//!        v
//! +----------------+
//! | ArchiveWriter  |  one streaming pass: header, level table,
//! |                |  per level an index then packed payloads
//! +-------+--------+
//!         | .swtiles file
//!         v
//!   object storage / disk
//!         |
//!         v
//! +----------------+
//! | ArchiveReader  |  two range fetches per tile:
//! | over ByteSource|  8-byte index cell, then the payload
//! +-------+--------+
//!         | opaque image bytes + media type + bounds
//!         v
//!      consumers
//! ```
//!
//! The format codec itself lives in `swtiles-core`; this crate adds the
//! writer, the byte-source implementations (local file, range HTTP,
//! `object_store` backends, memory), the optional tile cache, and an
//! archive validator.

pub mod cache;
pub mod error;
pub mod plan;
pub mod reader;
pub mod source;
pub mod validate;
pub mod writer;

pub use cache::{CacheStats, TileCache};
pub use error::{Error, Result};
pub use plan::{LevelGrid, LevelPlan, TileIter, TileRecord, TileSource};
pub use reader::{ArchiveReader, CoverageInfo, Tile, TileLocation};
pub use source::{ByteSource, FileSource, HttpSource, MemorySource, ObjectStoreSource};
pub use validate::{validate_archive, ValidationReport, Violation};
pub use writer::{write_archive, ArchiveConfig, ArchiveWriter};
