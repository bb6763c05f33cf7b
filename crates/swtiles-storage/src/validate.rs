//! Archive Validation
//!
//! Recomputes what a well-formed archive must satisfy: index geometry,
//! advisory tile counts, payload disjointness, level region separation,
//! and the header's bounds envelope. Findings are collected into a report
//! instead of failing on the first problem, so one pass over a suspect
//! archive tells the whole story.
//!
//! `tile_count` is advisory in the format; this module is where it gets
//! checked against the index.

use std::fmt;

use serde::Serialize;
use swtiles_core::format::LEVEL_ENTRY_SIZE;
use swtiles_core::Level;

use crate::error::Result;
use crate::reader::{ArchiveReader, TileLocation};

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Violation {
    /// `index_offset + index_length` does not equal `data_offset`.
    IndexRegionMismatch { level: u8 },
    /// `index_length` does not equal `grid_cols * grid_rows * 8`.
    IndexLengthMismatch {
        level: u8,
        expected: u64,
        actual: u64,
    },
    /// Declared `tile_count` differs from the number of non-empty cells.
    TileCountMismatch {
        level: u8,
        declared: u32,
        actual: u64,
    },
    /// Two level ids collide in the level table.
    DuplicateLevelId { level: u8 },
    /// A level region starts inside the header or level table.
    RegionBeforeTable { level: u8 },
    /// Two level regions overlap.
    RegionOverlap { level: u8, other: u8 },
    /// A cell's payload extends past its level's region.
    PayloadOutOfRegion { level: u8, row: u32, col: u32 },
    /// Two cells' payload ranges overlap within a level.
    OverlappingPayloads {
        level: u8,
        first: (u32, u32),
        second: (u32, u32),
    },
    /// A non-empty cell's ground extent falls outside the header bounds.
    TileOutsideBounds { level: u8, row: u32, col: u32 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::IndexRegionMismatch { level } => {
                write!(f, "level {level}: index region does not abut the data region")
            }
            Violation::IndexLengthMismatch {
                level,
                expected,
                actual,
            } => write!(
                f,
                "level {level}: index length {actual} does not match grid size {expected}"
            ),
            Violation::TileCountMismatch {
                level,
                declared,
                actual,
            } => write!(
                f,
                "level {level}: declared {declared} tiles, index holds {actual}"
            ),
            Violation::DuplicateLevelId { level } => {
                write!(f, "level id {level} appears more than once")
            }
            Violation::RegionBeforeTable { level } => {
                write!(f, "level {level}: region starts inside the header or level table")
            }
            Violation::RegionOverlap { level, other } => {
                write!(f, "levels {level} and {other} have overlapping regions")
            }
            Violation::PayloadOutOfRegion { level, row, col } => {
                write!(f, "level {level}: payload at ({row}, {col}) leaves the level region")
            }
            Violation::OverlappingPayloads {
                level,
                first,
                second,
            } => write!(
                f,
                "level {level}: payloads at {first:?} and {second:?} overlap"
            ),
            Violation::TileOutsideBounds { level, row, col } => {
                write!(f, "level {level}: tile ({row}, {col}) lies outside the header bounds")
            }
        }
    }
}

/// Outcome of a validation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check an opened archive against the format invariants.
pub async fn validate_archive(reader: &ArchiveReader) -> Result<ValidationReport> {
    let header = reader.header();
    let mut violations = Vec::new();

    let table_end = header.level_table_offset
        + u64::from(header.num_levels) * LEVEL_ENTRY_SIZE as u64;

    for (i, level) in reader.levels().iter().enumerate() {
        if reader.levels()[..i]
            .iter()
            .any(|l| l.level_id == level.level_id)
        {
            violations.push(Violation::DuplicateLevelId {
                level: level.level_id,
            });
        }
    }

    // First pass: scan every level's index once.
    let mut scanned: Vec<(Level, Vec<TileLocation>, u64)> = Vec::new();
    for level in reader.levels() {
        let tiles = reader.non_empty_tiles(level.level_id).await?;
        let payload_extent = tiles
            .iter()
            .map(|t| t.offset + u64::from(t.length))
            .max()
            .unwrap_or(0);
        scanned.push((level.clone(), tiles, payload_extent));
    }

    for (level, tiles, _) in &scanned {
        let expected_index_len = level.index_len();
        if level.index_length != expected_index_len {
            violations.push(Violation::IndexLengthMismatch {
                level: level.level_id,
                expected: expected_index_len,
                actual: level.index_length,
            });
        }
        if level.index_offset + level.index_length != level.data_offset {
            violations.push(Violation::IndexRegionMismatch {
                level: level.level_id,
            });
        }
        if level.index_offset < table_end {
            violations.push(Violation::RegionBeforeTable {
                level: level.level_id,
            });
        }
        if u64::from(level.tile_count) != tiles.len() as u64 {
            violations.push(Violation::TileCountMismatch {
                level: level.level_id,
                declared: level.tile_count,
                actual: tiles.len() as u64,
            });
        }

        // Payload disjointness within the level.
        let mut by_offset: Vec<&TileLocation> = tiles.iter().collect();
        by_offset.sort_by_key(|t| t.offset);
        for pair in by_offset.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a.offset + u64::from(a.length) > b.offset {
                violations.push(Violation::OverlappingPayloads {
                    level: level.level_id,
                    first: (a.row, a.col),
                    second: (b.row, b.col),
                });
            }
        }

        // Bounds envelope. Tolerance absorbs the one-ulp difference between
        // the writer's and the grid arithmetic's summation order.
        let eps = f64::from(level.tile_extent_m) * 1e-9;
        for t in tiles {
            let b = level.cell_bounds(t.row, t.col);
            if b.min_e < header.bounds_min_e - eps
                || b.max_e > header.bounds_max_e + eps
                || b.min_n < header.bounds_min_n - eps
                || b.max_n > header.bounds_max_n + eps
            {
                violations.push(Violation::TileOutsideBounds {
                    level: level.level_id,
                    row: t.row,
                    col: t.col,
                });
            }
        }
    }

    // Cross-level region checks, in file order.
    let mut regions: Vec<(u8, u64, u64, u64)> = scanned
        .iter()
        .map(|(level, _, extent)| {
            (
                level.level_id,
                level.index_offset,
                level.data_offset + extent,
                level.data_offset,
            )
        })
        .collect();
    regions.sort_by_key(|r| r.1);
    for pair in regions.windows(2) {
        let (id_a, _, end_a, _) = pair[0];
        let (id_b, start_b, _, _) = pair[1];
        if end_a > start_b {
            violations.push(Violation::RegionOverlap {
                level: id_a,
                other: id_b,
            });
        }
    }

    // Payloads must stay inside their level's slot when a later region
    // bounds it.
    for (idx, &(id, _, _, data_offset)) in regions.iter().enumerate() {
        let Some(&(_, next_start, _, _)) = regions.get(idx + 1) else {
            continue;
        };
        let capacity = next_start.saturating_sub(data_offset);
        if let Some((_, tiles, _)) = scanned.iter().find(|(l, _, _)| l.level_id == id) {
            for t in tiles {
                if t.offset + u64::from(t.length) > capacity {
                    violations.push(Violation::PayloadOutOfRegion {
                        level: id,
                        row: t.row,
                        col: t.col,
                    });
                }
            }
        }
    }

    tracing::debug!(violations = violations.len(), "validated archive");
    Ok(ValidationReport { violations })
}
