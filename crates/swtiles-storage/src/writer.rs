//! Archive Writer
//!
//! Assembles a `.swtiles` file from an ordered list of level plans in one
//! streaming pass. Regions are emitted in file order: header, level table,
//! then per level a dense index followed by packed payloads.
//!
//! The header and level table are written first as zeros and patched at
//! the end; each level's index is reserved as zeros, accumulated in
//! memory while payloads stream to the sink, and patched once the level's
//! last tile is in. Per level the writer moves through
//! `reserve index -> append payloads -> patch index -> record entry`,
//! strictly sequentially.
//!
//! Two runs over the same plans with the same iteration order produce
//! byte-identical archives.
//!
//! Writer errors are fatal: the sink is left in a bounded but undefined
//! state and the partial archive should be discarded.

use std::io::{Seek, SeekFrom, Write};

use serde::{Deserialize, Serialize};
use swtiles_core::format::{
    encode_header, encode_index_cell, encode_level_entry, HEADER_SIZE, INDEX_CELL_SIZE,
    LEVEL_ENTRY_SIZE, MAX_PAYLOAD_LENGTH, MAX_PAYLOAD_OFFSET,
};
use swtiles_core::{DataType, Header, ImageFormat, Level};

use crate::error::{Error, Result};
use crate::plan::{LevelPlan, TileSource};

/// Header fields fixed for the whole archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    pub data_type: DataType,
    pub image_format: ImageFormat,
    pub crs_epsg: u32,
    pub tile_size_px: u16,
}

/// Streaming writer over a seekable sink.
///
/// The number of levels is declared up front because the level table is
/// reserved before any level data is written. `finish` fails if the count
/// does not match.
#[derive(Debug)]
pub struct ArchiveWriter<W: Write + Seek> {
    sink: W,
    config: ArchiveConfig,
    declared_levels: u8,
    levels: Vec<Level>,
    bounds: Option<(f64, f64, f64, f64)>,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    /// Start an archive, reserving the header and level table as zeros.
    pub fn new(mut sink: W, config: ArchiveConfig, num_levels: u8) -> Result<Self> {
        if num_levels == 0 {
            return Err(Error::NoLevels);
        }
        write_zeros(
            &mut sink,
            (HEADER_SIZE + usize::from(num_levels) * LEVEL_ENTRY_SIZE) as u64,
        )?;
        Ok(Self {
            sink,
            config,
            declared_levels: num_levels,
            levels: Vec::with_capacity(usize::from(num_levels)),
            bounds: None,
        })
    }

    /// Write one level: reserve its index, stream its payloads, patch the
    /// index, and record the level table entry.
    pub fn write_level(&mut self, plan: LevelPlan) -> Result<()> {
        if self.levels.len() >= usize::from(self.declared_levels) {
            return Err(Error::LevelCountMismatch {
                declared: self.declared_levels,
                written: self.levels.len() + 1,
            });
        }
        let grid = plan.grid;
        if self.levels.iter().any(|l| l.level_id == grid.level_id) {
            return Err(Error::DuplicateLevel(grid.level_id));
        }

        let cell_count = u64::from(grid.grid_cols) * u64::from(grid.grid_rows);
        let index_length = cell_count * INDEX_CELL_SIZE as u64;
        let index_offset = self.sink.stream_position()?;
        write_zeros(&mut self.sink, index_length)?;
        let data_offset = index_offset + index_length;

        // The dense index accumulates in memory, already packed, and gets
        // patched over the reserved region once the level's payloads are
        // all streamed out.
        let mut index_buf = vec![0u8; index_length as usize];
        let mut occupied = vec![false; cell_count as usize];
        let mut cursor = 0u64;
        let mut tile_count = 0u32;
        let mut extent: Option<(u32, u32, u32, u32)> = None;

        for record in plan.tiles {
            let record = record?;
            if record.row >= grid.grid_rows || record.col >= grid.grid_cols {
                return Err(Error::CellOutOfGrid {
                    level: grid.level_id,
                    row: record.row,
                    col: record.col,
                    rows: grid.grid_rows,
                    cols: grid.grid_cols,
                });
            }
            let idx =
                (u64::from(record.row) * u64::from(grid.grid_cols) + u64::from(record.col)) as usize;
            if occupied[idx] {
                return Err(Error::DuplicateCell {
                    level: grid.level_id,
                    row: record.row,
                    col: record.col,
                });
            }
            occupied[idx] = true;

            let len = record.payload.len();
            if len as u64 >= u64::from(MAX_PAYLOAD_LENGTH) {
                return Err(Error::PayloadTooLarge {
                    row: record.row,
                    col: record.col,
                    len,
                });
            }
            if len == 0 {
                // The plan contract is non-empty cells only; a zero-length
                // record leaves the cell's all-zero index entry in place.
                continue;
            }
            if cursor >= MAX_PAYLOAD_OFFSET {
                return Err(Error::LevelPayloadTooLarge(grid.level_id));
            }

            let cell = encode_index_cell(cursor, len as u32).map_err(Error::Format)?;
            index_buf[idx * INDEX_CELL_SIZE..(idx + 1) * INDEX_CELL_SIZE].copy_from_slice(&cell);
            self.sink.write_all(&record.payload)?;
            cursor += len as u64;
            tile_count += 1;

            extent = Some(match extent {
                None => (record.row, record.row, record.col, record.col),
                Some((r0, r1, c0, c1)) => (
                    r0.min(record.row),
                    r1.max(record.row),
                    c0.min(record.col),
                    c1.max(record.col),
                ),
            });
        }

        self.sink.seek(SeekFrom::Start(index_offset))?;
        self.sink.write_all(&index_buf)?;
        self.sink.seek(SeekFrom::Start(data_offset + cursor))?;

        if let Some((r0, r1, c0, c1)) = extent {
            let e = f64::from(grid.tile_extent_m);
            self.merge_bounds(
                grid.origin_e + f64::from(c0) * e,
                grid.origin_n - f64::from(r1 + 1) * e,
                grid.origin_e + f64::from(c1 + 1) * e,
                grid.origin_n - f64::from(r0) * e,
            );
        }

        tracing::debug!(
            level = grid.level_id,
            tiles = tile_count,
            payload_bytes = cursor,
            "level written"
        );

        self.levels.push(Level {
            level_id: grid.level_id,
            resolution_m: grid.resolution_m,
            tile_extent_m: grid.tile_extent_m,
            origin_e: grid.origin_e,
            origin_n: grid.origin_n,
            grid_cols: grid.grid_cols,
            grid_rows: grid.grid_rows,
            tile_count,
            index_offset,
            index_length,
            data_offset,
        });
        Ok(())
    }

    /// Patch the level table and header, flush, and hand the sink back.
    pub fn finish(mut self) -> Result<W> {
        if self.levels.len() != usize::from(self.declared_levels) {
            return Err(Error::LevelCountMismatch {
                declared: self.declared_levels,
                written: self.levels.len(),
            });
        }

        let end = self.sink.stream_position()?;

        self.sink.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        for level in &self.levels {
            self.sink.write_all(&encode_level_entry(level))?;
        }

        let (bounds_min_e, bounds_min_n, bounds_max_e, bounds_max_n) =
            self.bounds.unwrap_or((0.0, 0.0, 0.0, 0.0));
        let header = Header {
            data_type: self.config.data_type,
            image_format: self.config.image_format,
            crs_epsg: self.config.crs_epsg,
            bounds_min_e,
            bounds_min_n,
            bounds_max_e,
            bounds_max_n,
            tile_size_px: self.config.tile_size_px,
            num_levels: self.declared_levels,
            level_table_offset: HEADER_SIZE as u64,
        };
        self.sink.seek(SeekFrom::Start(0))?;
        self.sink.write_all(&encode_header(&header))?;

        self.sink.seek(SeekFrom::Start(end))?;
        self.sink.flush()?;

        tracing::info!(
            levels = self.levels.len(),
            size = end,
            "archive finished"
        );
        Ok(self.sink)
    }

    fn merge_bounds(&mut self, min_e: f64, min_n: f64, max_e: f64, max_n: f64) {
        self.bounds = Some(match self.bounds {
            None => (min_e, min_n, max_e, max_n),
            Some((e0, n0, e1, n1)) => (e0.min(min_e), n0.min(min_n), e1.max(max_e), n1.max(max_n)),
        });
    }
}

/// Drain a tile source into a sink and return the finished sink.
pub fn write_archive<W: Write + Seek, S: TileSource>(
    sink: W,
    config: ArchiveConfig,
    source: &mut S,
) -> Result<W> {
    let plans = source.levels()?;
    if plans.len() > 255 {
        return Err(Error::TooManyLevels(plans.len()));
    }
    let mut writer = ArchiveWriter::new(sink, config, plans.len() as u8)?;
    for plan in plans {
        writer.write_level(plan)?;
    }
    writer.finish()
}

fn write_zeros<W: Write>(sink: &mut W, mut remaining: u64) -> Result<()> {
    const ZEROS: [u8; 64 * 1024] = [0u8; 64 * 1024];
    while remaining > 0 {
        let chunk = remaining.min(ZEROS.len() as u64) as usize;
        sink.write_all(&ZEROS[..chunk])?;
        remaining -= chunk as u64;
    }
    Ok(())
}
