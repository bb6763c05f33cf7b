//! Byte-traffic contract: how many fetches each reader operation issues,
//! and how many bytes they move. A recording byte source wraps the archive
//! and logs every fetch.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use swtiles_core::{DataType, ImageFormat};
use swtiles_storage::{
    ArchiveConfig, ArchiveReader, ArchiveWriter, ByteSource, LevelGrid, LevelPlan, MemorySource,
    Result, TileRecord,
};

struct RecordingSource {
    inner: MemorySource,
    fetches: Mutex<Vec<(u64, u64)>>,
}

impl RecordingSource {
    fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: MemorySource::new(bytes),
            fetches: Mutex::new(Vec::new()),
        }
    }

    fn fetches(&self) -> Vec<(u64, u64)> {
        self.fetches.lock().unwrap().clone()
    }

    fn clear(&self) {
        self.fetches.lock().unwrap().clear();
    }
}

#[async_trait]
impl ByteSource for RecordingSource {
    async fn fetch(&self, offset: u64, length: u64) -> Result<Bytes> {
        self.fetches.lock().unwrap().push((offset, length));
        self.inner.fetch(offset, length).await
    }
}

fn build_archive() -> Vec<u8> {
    let config = ArchiveConfig {
        data_type: DataType::Raster,
        image_format: ImageFormat::Png,
        crs_epsg: 3006,
        tile_size_px: 500,
    };
    let grid = LevelGrid {
        level_id: 0,
        resolution_m: 1.0,
        tile_extent_m: 500.0,
        origin_e: 0.0,
        origin_n: 0.0,
        grid_cols: 2,
        grid_rows: 2,
    };
    let mut writer = ArchiveWriter::new(Cursor::new(Vec::new()), config, 1).unwrap();
    writer
        .write_level(LevelPlan::from_records(
            grid,
            vec![TileRecord::new(0, 1, vec![7u8; 100])],
        ))
        .unwrap();
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn open_issues_exactly_two_fetches() {
    let source = Arc::new(RecordingSource::new(build_archive()));
    let _reader = ArchiveReader::open(source.clone()).await.unwrap();

    let fetches = source.fetches();
    assert_eq!(fetches, vec![(0, 256), (256, 64)]);
}

#[tokio::test]
async fn present_tile_costs_two_fetches_of_eight_plus_length() {
    let source = Arc::new(RecordingSource::new(build_archive()));
    let reader = ArchiveReader::open(source.clone()).await.unwrap();
    let level = reader.level(0).unwrap().clone();
    source.clear();

    let tile = reader.get_tile(0, 0, 1).await.unwrap().unwrap();
    assert_eq!(tile.bytes.len(), 100);

    let fetches = source.fetches();
    assert_eq!(fetches.len(), 2);
    // First fetch: the 8-byte index cell at its computed offset.
    assert_eq!(fetches[0], (level.index_offset + 8, 8));
    // Second fetch: the payload itself.
    assert_eq!(fetches[1], (level.data_offset, 100));
    assert_eq!(fetches.iter().map(|f| f.1).sum::<u64>(), 8 + 100);
}

#[tokio::test]
async fn empty_cell_costs_one_fetch_of_eight() {
    let source = Arc::new(RecordingSource::new(build_archive()));
    let reader = ArchiveReader::open(source.clone()).await.unwrap();
    source.clear();

    assert!(reader.get_tile(0, 0, 0).await.unwrap().is_none());

    let fetches = source.fetches();
    assert_eq!(fetches.len(), 1);
    assert_eq!(fetches[0].1, 8);
}

#[tokio::test]
async fn out_of_grid_cell_costs_no_fetches() {
    let source = Arc::new(RecordingSource::new(build_archive()));
    let reader = ArchiveReader::open(source.clone()).await.unwrap();
    source.clear();

    assert!(reader.get_tile(0, 5, 5).await.unwrap().is_none());
    assert!(reader.get_tile_by_coord(0, -1.0, 1.0).await.unwrap().is_none());
    assert!(source.fetches().is_empty());
}

#[tokio::test]
async fn tiles_in_view_touches_no_bytes() {
    let source = Arc::new(RecordingSource::new(build_archive()));
    let reader = ArchiveReader::open(source.clone()).await.unwrap();
    source.clear();

    let cells = reader
        .tiles_in_view(0, -10_000.0, -10_000.0, 10_000.0, 10_000.0)
        .unwrap();
    assert_eq!(cells.len(), 4);
    assert!(source.fetches().is_empty());
}

#[tokio::test]
async fn cached_tile_skips_the_source_entirely() {
    let source = Arc::new(RecordingSource::new(build_archive()));
    let reader = ArchiveReader::open(source.clone())
        .await
        .unwrap()
        .with_cache(swtiles_storage::TileCache::new(1 << 20));

    reader.get_tile(0, 0, 1).await.unwrap().unwrap();
    source.clear();

    let tile = reader.get_tile(0, 0, 1).await.unwrap().unwrap();
    assert_eq!(tile.bytes.len(), 100);
    assert!(source.fetches().is_empty());
}
