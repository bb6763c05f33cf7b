//! Writer-Side Tile Plans
//!
//! The writer consumes an ordered list of level plans: grid geometry plus
//! an iterator over the level's non-empty tiles. Payload bytes are opaque;
//! whatever produced them (an encoder, a retiling pipeline, a test) sits
//! behind the [`TileSource`] trait.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Grid geometry of a level to be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelGrid {
    pub level_id: u8,
    /// Ground meters per pixel.
    pub resolution_m: f32,
    /// Ground meters per tile edge.
    pub tile_extent_m: f32,
    /// Easting of the north-west corner of cell (0, 0).
    pub origin_e: f64,
    /// Northing of the north-west corner of cell (0, 0).
    pub origin_n: f64,
    pub grid_cols: u32,
    pub grid_rows: u32,
}

/// One non-empty tile, bound for a cell of the level being written.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRecord {
    pub row: u32,
    pub col: u32,
    pub payload: Bytes,
}

impl TileRecord {
    pub fn new(row: u32, col: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            row,
            col,
            payload: payload.into(),
        }
    }
}

/// Stream of a level's non-empty tiles, in the order they are laid out on
/// disk. Iteration order determines the archive's byte layout.
pub type TileIter = Box<dyn Iterator<Item = Result<TileRecord>> + Send>;

/// A level's grid geometry plus its tile stream.
pub struct LevelPlan {
    pub grid: LevelGrid,
    pub tiles: TileIter,
}

impl LevelPlan {
    pub fn new(grid: LevelGrid, tiles: TileIter) -> Self {
        Self { grid, tiles }
    }

    /// Plan over an in-memory tile list.
    pub fn from_records(grid: LevelGrid, records: Vec<TileRecord>) -> Self {
        Self {
            grid,
            tiles: Box::new(records.into_iter().map(Ok)),
        }
    }
}

impl std::fmt::Debug for LevelPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelPlan")
            .field("grid", &self.grid)
            .finish_non_exhaustive()
    }
}

/// Produces the ordered level plans consumed by the writer.
pub trait TileSource {
    fn levels(&mut self) -> Result<Vec<LevelPlan>>;
}
