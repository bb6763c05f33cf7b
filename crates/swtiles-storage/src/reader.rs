//! Archive Reader
//!
//! Random access over an archive behind any [`ByteSource`]. Opening costs
//! two fetches (header, level table); a tile lookup costs at most two more
//! (its 8-byte index cell at a computed offset, then the payload). Nothing
//! else ever touches the byte source, so serving a tile from object
//! storage stays at two range requests.
//!
//! ```text
//! get_tile(level, row, col)
//!     |
//!     v
//! index cell at index_offset + (row * cols + col) * 8   (fetch, 8 bytes)
//!     |
//!     v
//! length == 0?  -> absent
//!     |
//!     v
//! payload at data_offset + offset                       (fetch, length bytes)
//! ```
//!
//! The reader holds only parsed metadata and an `Arc` of the source, so
//! clones are cheap and concurrent `get_tile` calls are independent. An
//! optional [`TileCache`] short-circuits both fetches for hot tiles; the
//! cache lock is never held across a fetch.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use swtiles_core::format::{
    decode_header, decode_index_cell, decode_level_entry, HEADER_SIZE, INDEX_CELL_SIZE,
    LEVEL_ENTRY_SIZE,
};
use swtiles_core::{CellBounds, Header, Level};

use crate::cache::TileCache;
use crate::error::{Error, Result};
use crate::source::{ByteSource, FileSource, HttpSource};

/// One tile as served to consumers: verbatim payload bytes, the media type
/// advertised by the header, and the cell's ground bounds.
#[derive(Debug, Clone)]
pub struct Tile {
    pub bytes: Bytes,
    pub media_type: &'static str,
    pub bounds: CellBounds,
}

/// Location of a non-empty cell within its level's payload region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileLocation {
    pub row: u32,
    pub col: u32,
    /// Payload offset relative to the level's `data_offset`.
    pub offset: u64,
    pub length: u32,
}

/// Actual coverage of a level, recomputed from its index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageInfo {
    pub non_empty_count: u64,
    pub total_payload_bytes: u64,
    /// Min and max occupied row, if any cell is occupied.
    pub row_range: Option<(u32, u32)>,
    /// Min and max occupied column, if any cell is occupied.
    pub col_range: Option<(u32, u32)>,
    /// Width and height in cells of the occupied bounding box.
    pub grid_extent: Option<(u32, u32)>,
    /// Ground bounds of the occupied bounding box.
    pub bounds: Option<CellBounds>,
}

/// Random-access reader over a `.swtiles` archive.
#[derive(Clone)]
pub struct ArchiveReader {
    source: Arc<dyn ByteSource>,
    header: Header,
    levels: Arc<Vec<Level>>,
    cache: Option<Arc<TileCache>>,
}

impl std::fmt::Debug for ArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("header", &self.header)
            .field("levels", &self.levels)
            .finish()
    }
}

impl ArchiveReader {
    /// Open an archive: fetch and decode the header, then the level table.
    pub async fn open(source: Arc<dyn ByteSource>) -> Result<Self> {
        let raw = source.fetch_exact(0, HEADER_SIZE as u64).await?;
        let mut buf = [0u8; HEADER_SIZE];
        buf.copy_from_slice(&raw);
        let header = decode_header(&buf).map_err(Error::Format)?;

        let table_len = u64::from(header.num_levels) * LEVEL_ENTRY_SIZE as u64;
        let table = source
            .fetch_exact(header.level_table_offset, table_len)
            .await?;
        let mut levels = Vec::with_capacity(usize::from(header.num_levels));
        for chunk in table.chunks_exact(LEVEL_ENTRY_SIZE) {
            let mut entry = [0u8; LEVEL_ENTRY_SIZE];
            entry.copy_from_slice(chunk);
            levels.push(decode_level_entry(&entry));
        }

        tracing::debug!(
            levels = levels.len(),
            crs_epsg = header.crs_epsg,
            "opened archive"
        );

        Ok(Self {
            source,
            header,
            levels: Arc::new(levels),
            cache: None,
        })
    }

    /// Open a local archive file.
    pub async fn open_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let source = FileSource::open(path).await?;
        Self::open(Arc::new(source)).await
    }

    /// Open an archive behind a range-capable HTTP URL.
    pub async fn open_http(url: impl Into<String>) -> Result<Self> {
        Self::open(Arc::new(HttpSource::new(url))).await
    }

    /// Attach a tile cache. Cached tiles skip both fetches.
    pub fn with_cache(mut self, cache: TileCache) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Level by id. Levels are keyed by id, never by table position.
    pub fn level(&self, level_id: u8) -> Result<&Level> {
        self.levels
            .iter()
            .find(|l| l.level_id == level_id)
            .ok_or(Error::LevelNotFound(level_id))
    }

    /// Level with the smallest ground resolution (most detail).
    pub fn finest_level(&self) -> Option<&Level> {
        self.levels
            .iter()
            .min_by(|a, b| a.resolution_m.total_cmp(&b.resolution_m))
    }

    /// Level with the largest ground resolution (least detail).
    pub fn coarsest_level(&self) -> Option<&Level> {
        self.levels
            .iter()
            .max_by(|a, b| a.resolution_m.total_cmp(&b.resolution_m))
    }

    /// Fetch one index cell at its computed offset.
    ///
    /// Returns the raw (offset, length) pair; a zero length marks an empty
    /// cell. Out-of-range cells are an error here, unlike [`Self::get_tile`]
    /// which treats them as absent.
    pub async fn fetch_index_cell(&self, level_id: u8, row: u32, col: u32) -> Result<(u64, u32)> {
        let level = self.level(level_id)?;
        if row >= level.grid_rows || col >= level.grid_cols {
            return Err(Error::OutOfGrid {
                level: level_id,
                row,
                col,
            });
        }
        let pos = level.index_offset + level.cell_index(row, col) * INDEX_CELL_SIZE as u64;
        let raw = self.source.fetch_exact(pos, INDEX_CELL_SIZE as u64).await?;
        let mut cell = [0u8; INDEX_CELL_SIZE];
        cell.copy_from_slice(&raw);
        Ok(decode_index_cell(&cell))
    }

    /// Retrieve a tile by grid cell.
    ///
    /// `None` for cells outside the grid and for empty cells. Payload
    /// bytes come back verbatim; the container never decodes them.
    pub async fn get_tile(&self, level_id: u8, row: u32, col: u32) -> Result<Option<Tile>> {
        let level = self.level(level_id)?;
        if row >= level.grid_rows || col >= level.grid_cols {
            return Ok(None);
        }

        if let Some(cache) = &self.cache {
            if let Some(bytes) = cache.get(level_id, row, col).await {
                tracing::debug!(level = level_id, row, col, "tile cache hit");
                return Ok(Some(self.tile(level, row, col, bytes)));
            }
        }

        let (offset, length) = self.fetch_index_cell(level_id, row, col).await?;
        if length == 0 {
            return Ok(None);
        }

        let bytes = self
            .source
            .fetch_exact(level.data_offset + offset, u64::from(length))
            .await?;

        if let Some(cache) = &self.cache {
            cache.put(level_id, row, col, bytes.clone()).await;
        }

        Ok(Some(self.tile(level, row, col, bytes)))
    }

    /// Retrieve the tile covering a coordinate.
    ///
    /// Out-of-grid coordinates are absent, not errors.
    pub async fn get_tile_by_coord(
        &self,
        level_id: u8,
        easting: f64,
        northing: f64,
    ) -> Result<Option<Tile>> {
        let level = self.level(level_id)?;
        let (row, col) = level.cell_for_coord(easting, northing);
        if !level.contains_cell(row, col) {
            return Ok(None);
        }
        self.get_tile(level_id, row as u32, col as u32).await
    }

    /// Cells of a level overlapping a view rectangle, with their bounds.
    ///
    /// Pure metadata arithmetic; touches no I/O.
    pub fn tiles_in_view(
        &self,
        level_id: u8,
        min_e: f64,
        min_n: f64,
        max_e: f64,
        max_n: f64,
    ) -> Result<Vec<(u32, u32, CellBounds)>> {
        Ok(self.level(level_id)?.cells_in_view(min_e, min_n, max_e, max_n))
    }

    /// Every non-empty cell of a level, from one scan of its index region.
    pub async fn non_empty_tiles(&self, level_id: u8) -> Result<Vec<TileLocation>> {
        let level = self.level(level_id)?.clone();
        self.scan_index(&level).await
    }

    /// Recompute a level's actual coverage from its index.
    ///
    /// The level entry's `tile_count` is advisory; this scan is the source
    /// of truth.
    pub async fn level_coverage(&self, level_id: u8) -> Result<CoverageInfo> {
        let level = self.level(level_id)?.clone();
        let tiles = self.scan_index(&level).await?;

        let mut total_payload_bytes = 0u64;
        let mut extent: Option<(u32, u32, u32, u32)> = None;
        for t in &tiles {
            total_payload_bytes += u64::from(t.length);
            extent = Some(match extent {
                None => (t.row, t.row, t.col, t.col),
                Some((r0, r1, c0, c1)) => {
                    (r0.min(t.row), r1.max(t.row), c0.min(t.col), c1.max(t.col))
                }
            });
        }

        let info = match extent {
            None => CoverageInfo {
                non_empty_count: 0,
                total_payload_bytes: 0,
                row_range: None,
                col_range: None,
                grid_extent: None,
                bounds: None,
            },
            Some((r0, r1, c0, c1)) => {
                let nw = level.cell_bounds(r0, c0);
                let se = level.cell_bounds(r1, c1);
                CoverageInfo {
                    non_empty_count: tiles.len() as u64,
                    total_payload_bytes,
                    row_range: Some((r0, r1)),
                    col_range: Some((c0, c1)),
                    grid_extent: Some((c1 - c0 + 1, r1 - r0 + 1)),
                    bounds: Some(CellBounds {
                        min_e: nw.min_e,
                        min_n: se.min_n,
                        max_e: se.max_e,
                        max_n: nw.max_n,
                    }),
                }
            }
        };

        tracing::debug!(
            level = level_id,
            non_empty = info.non_empty_count,
            "scanned level coverage"
        );
        Ok(info)
    }

    async fn scan_index(&self, level: &Level) -> Result<Vec<TileLocation>> {
        let index = self
            .source
            .fetch_exact(level.index_offset, level.index_len())
            .await?;

        let mut tiles = Vec::new();
        for (idx, chunk) in index.chunks_exact(INDEX_CELL_SIZE).enumerate() {
            let mut cell = [0u8; INDEX_CELL_SIZE];
            cell.copy_from_slice(chunk);
            let (offset, length) = decode_index_cell(&cell);
            if length == 0 {
                continue;
            }
            let idx = idx as u64;
            tiles.push(TileLocation {
                row: (idx / u64::from(level.grid_cols)) as u32,
                col: (idx % u64::from(level.grid_cols)) as u32,
                offset,
                length,
            });
        }
        Ok(tiles)
    }

    fn tile(&self, level: &Level, row: u32, col: u32, bytes: Bytes) -> Tile {
        Tile {
            bytes,
            media_type: self.header.image_format.media_type(),
            bounds: level.cell_bounds(row, col),
        }
    }
}
