//! Edge-case tests for the codec and the grid arithmetic.

use swtiles_core::{
    decode_header, decode_index_cell, decode_level_entry, encode_header, encode_index_cell,
    encode_level_entry, DataType, Header, ImageFormat, Level, MAX_PAYLOAD_LENGTH,
    MAX_PAYLOAD_OFFSET,
};

// Small deterministic generator so the round-trip corpora cover the value
// space without pulling in a rand dependency.
struct Lcg(u64);

impl Lcg {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0
    }
}

// ---------------------------------------------------------------
// Index cell round-trip over a generated corpus
// ---------------------------------------------------------------

#[test]
fn index_cell_roundtrip_corpus() {
    let mut rng = Lcg(0x5157_494C_4553_0002);
    for _ in 0..10_000 {
        let offset = rng.next_u64() % MAX_PAYLOAD_OFFSET;
        let length = (rng.next_u64() % u64::from(MAX_PAYLOAD_LENGTH)) as u32;
        let buf = encode_index_cell(offset, length).unwrap();
        assert_eq!(decode_index_cell(&buf), (offset, length));
    }
}

#[test]
fn index_cell_reencode_arbitrary_buffers() {
    // Every 8-byte buffer is a valid cell; decode then encode must give
    // the buffer back.
    let mut rng = Lcg(42);
    for _ in 0..10_000 {
        let raw = rng.next_u64().to_le_bytes();
        let (offset, length) = decode_index_cell(&raw);
        assert_eq!(encode_index_cell(offset, length).unwrap(), raw);
    }
}

#[test]
fn index_cell_boundary_values() {
    for offset in [0u64, 1, 0xFF, 0xFFFF_FFFF, MAX_PAYLOAD_OFFSET - 1] {
        for length in [0u32, 1, 0xFF, 0xFFFF, MAX_PAYLOAD_LENGTH - 1] {
            let buf = encode_index_cell(offset, length).unwrap();
            assert_eq!(decode_index_cell(&buf), (offset, length));
        }
    }
}

// ---------------------------------------------------------------
// Header round-trip over generated field values
// ---------------------------------------------------------------

#[test]
fn header_roundtrip_corpus() {
    let data_types = [DataType::Raster, DataType::Terrain, DataType::Other];
    let formats = [
        ImageFormat::Webp,
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Avif,
    ];
    let mut rng = Lcg(7);
    for i in 0..500 {
        let header = Header {
            data_type: data_types[i % data_types.len()],
            image_format: formats[i % formats.len()],
            crs_epsg: rng.next_u64() as u32,
            bounds_min_e: (rng.next_u64() % 1_000_000) as f64 / 3.0,
            bounds_min_n: -((rng.next_u64() % 1_000_000) as f64) / 7.0,
            bounds_max_e: (rng.next_u64() % 10_000_000) as f64,
            bounds_max_n: (rng.next_u64() % 10_000_000) as f64,
            tile_size_px: rng.next_u64() as u16,
            num_levels: (1 + rng.next_u64() % 255) as u8,
            level_table_offset: 256 + rng.next_u64() % 4096,
        };
        let buf = encode_header(&header);
        let decoded = decode_header(&buf).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(encode_header(&decoded), buf);
    }
}

// ---------------------------------------------------------------
// Level entry round-trip over generated field values
// ---------------------------------------------------------------

#[test]
fn level_entry_roundtrip_corpus() {
    let mut rng = Lcg(99);
    for _ in 0..500 {
        let cols = 1 + (rng.next_u64() % 4096) as u32;
        let rows = 1 + (rng.next_u64() % 4096) as u32;
        let level = Level {
            level_id: rng.next_u64() as u8,
            resolution_m: (1 + rng.next_u64() % 1024) as f32 / 8.0,
            tile_extent_m: (1 + rng.next_u64() % 100_000) as f32,
            origin_e: (rng.next_u64() % 20_000_000) as f64 / 11.0,
            origin_n: (rng.next_u64() % 20_000_000) as f64 / 13.0,
            grid_cols: cols,
            grid_rows: rows,
            tile_count: rng.next_u64() as u32 % (cols * rows),
            index_offset: 320 + rng.next_u64() % (1 << 40),
            index_length: u64::from(cols) * u64::from(rows) * 8,
            data_offset: 320 + rng.next_u64() % (1 << 40),
        };
        let buf = encode_level_entry(&level);
        let decoded = decode_level_entry(&buf);
        assert_eq!(decoded, level);
        assert_eq!(encode_level_entry(&decoded), buf);
    }
}

// ---------------------------------------------------------------
// Coordinate round-trip across many grid shapes
// ---------------------------------------------------------------

#[test]
fn coord_roundtrip_many_grids() {
    let grids = [
        (0.0, 0.0, 100.0_f32, 1u32, 1u32),
        (265_000.0, 7_675_000.0, 500_000.0, 2, 2),
        (-5_000.0, 12_345.0, 37.5, 33, 17),
        (606_000.0, 6_415_000.0, 250.0, 1320, 309),
    ];
    for (origin_e, origin_n, extent, cols, rows) in grids {
        let level = Level {
            level_id: 0,
            resolution_m: extent / 500.0,
            tile_extent_m: extent,
            origin_e,
            origin_n,
            grid_cols: cols,
            grid_rows: rows,
            tile_count: 0,
            index_offset: 0,
            index_length: 0,
            data_offset: 0,
        };
        let eps = f64::from(extent) * 1e-6;
        for row in (0..rows).step_by(7.max(rows as usize / 19)) {
            for col in (0..cols).step_by(7.max(cols as usize / 19)) {
                let b = level.cell_bounds(row, col);
                let (r, c) = level.cell_for_coord(b.min_e + eps, b.max_n - eps);
                assert_eq!((r, c), (i64::from(row), i64::from(col)));
            }
        }
    }
}

#[test]
fn cell_bounds_width_matches_extent() {
    let level = Level {
        level_id: 0,
        resolution_m: 0.5,
        tile_extent_m: 250.0,
        origin_e: 606_000.0,
        origin_n: 6_415_000.0,
        grid_cols: 100,
        grid_rows: 100,
        tile_count: 0,
        index_offset: 0,
        index_length: 0,
        data_offset: 0,
    };
    for (row, col) in [(0, 0), (0, 99), (99, 0), (50, 50)] {
        let b = level.cell_bounds(row, col);
        assert!((b.max_e - b.min_e - 250.0).abs() < 1e-6);
        assert!((b.max_n - b.min_n - 250.0).abs() < 1e-6);
        assert!(b.min_e < b.max_e && b.min_n < b.max_n);
    }
}
