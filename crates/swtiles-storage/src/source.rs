//! Byte Sources
//!
//! Random access over archive bytes behind a single operation:
//! `fetch(offset, length)`. Everything the reader does that can block or
//! suspend goes through this trait; all other reader work is arithmetic
//! over already-fetched buffers.
//!
//! Four implementations:
//!
//! - [`FileSource`]: positioned reads on a local file
//! - [`HttpSource`]: `Range: bytes=start-end` requests against a URL
//! - [`ObjectStoreSource`]: ranged gets against any `object_store` backend
//!   (S3, GCS, MinIO, local filesystem)
//! - [`MemorySource`]: an in-memory buffer, for tests and small archives
//!
//! Sources may return fewer bytes than requested at end of input; callers
//! that need an exact count use [`ByteSource::fetch_exact`].

use std::io::SeekFrom;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// Random access over archive bytes.
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Fetch up to `length` bytes starting at `offset`.
    async fn fetch(&self, offset: u64, length: u64) -> Result<Bytes>;

    /// Fetch exactly `length` bytes or fail with `Truncated`.
    async fn fetch_exact(&self, offset: u64, length: u64) -> Result<Bytes> {
        let bytes = self.fetch(offset, length).await?;
        if (bytes.len() as u64) < length {
            return Err(Error::Truncated {
                offset,
                expected: length,
                actual: bytes.len() as u64,
            });
        }
        Ok(if bytes.len() as u64 > length {
            bytes.slice(..length as usize)
        } else {
            bytes
        })
    }
}

/// Byte source over a local file.
pub struct FileSource {
    file: Mutex<File>,
}

impl FileSource {
    pub async fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let file = File::open(path).await?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

#[async_trait]
impl ByteSource for FileSource {
    async fn fetch(&self, offset: u64, length: u64) -> Result<Bytes> {
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset)).await?;

        let mut buf = vec![0u8; length as usize];
        let mut filled = 0;
        while filled < buf.len() {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(Bytes::from(buf))
    }
}

/// Byte source over a range-capable HTTP endpoint.
///
/// Issues `Range: bytes=start-end` and accepts 200 and 206. A 200 response
/// means the server ignored the range and returned the whole body, so the
/// requested window is sliced out locally. `Content-Range` is never
/// parsed, which also covers servers reporting a wildcard total.
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn range_header(offset: u64, length: u64) -> String {
    format!("bytes={}-{}", offset, offset + length - 1)
}

#[async_trait]
impl ByteSource for HttpSource {
    async fn fetch(&self, offset: u64, length: u64) -> Result<Bytes> {
        if length == 0 {
            return Ok(Bytes::new());
        }

        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::RANGE, range_header(offset, length))
            .send()
            .await?;

        let status = response.status().as_u16();
        tracing::debug!(url = %self.url, offset, length, status, "range fetch");

        match status {
            206 => {
                let body = response.bytes().await?;
                Ok(if body.len() as u64 > length {
                    body.slice(..length as usize)
                } else {
                    body
                })
            }
            200 => {
                let body = response.bytes().await?;
                let start = (offset as usize).min(body.len());
                let end = ((offset + length) as usize).min(body.len());
                Ok(body.slice(start..end))
            }
            _ => Err(Error::HttpStatus {
                status,
                offset,
                length,
            }),
        }
    }
}

/// Byte source over an `object_store` backend.
pub struct ObjectStoreSource {
    store: Arc<dyn ObjectStore>,
    location: ObjectPath,
}

impl ObjectStoreSource {
    pub fn new(store: Arc<dyn ObjectStore>, location: ObjectPath) -> Self {
        Self { store, location }
    }
}

#[async_trait]
impl ByteSource for ObjectStoreSource {
    async fn fetch(&self, offset: u64, length: u64) -> Result<Bytes> {
        if length == 0 {
            return Ok(Bytes::new());
        }
        let bytes = self
            .store
            .get_range(&self.location, offset..offset + length)
            .await?;
        Ok(bytes)
    }
}

/// Byte source over an in-memory buffer.
pub struct MemorySource {
    data: Bytes,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    async fn fetch(&self, offset: u64, length: u64) -> Result<Bytes> {
        let start = (offset as usize).min(self.data.len());
        let end = ((offset + length) as usize).min(self.data.len());
        Ok(self.data.slice(start..end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_header_is_inclusive() {
        assert_eq!(range_header(0, 256), "bytes=0-255");
        assert_eq!(range_header(352, 8), "bytes=352-359");
        assert_eq!(range_header(100, 1), "bytes=100-100");
    }

    #[tokio::test]
    async fn memory_source_fetches_window() {
        let source = MemorySource::new(vec![0u8, 1, 2, 3, 4, 5, 6, 7]);
        let bytes = source.fetch(2, 3).await.unwrap();
        assert_eq!(&bytes[..], &[2, 3, 4]);
    }

    #[tokio::test]
    async fn memory_source_clamps_at_end() {
        let source = MemorySource::new(vec![9u8; 10]);
        let bytes = source.fetch(8, 100).await.unwrap();
        assert_eq!(bytes.len(), 2);

        let bytes = source.fetch(50, 4).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn fetch_exact_errors_on_short_read() {
        let source = MemorySource::new(vec![0u8; 16]);
        let err = source.fetch_exact(10, 10).await.unwrap_err();
        match err {
            Error::Truncated {
                offset,
                expected,
                actual,
            } => {
                assert_eq!((offset, expected, actual), (10, 10, 6));
            }
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_exact_returns_exact_window() {
        let source = MemorySource::new((0u8..32).collect::<Vec<_>>());
        let bytes = source.fetch_exact(4, 4).await.unwrap();
        assert_eq!(&bytes[..], &[4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn file_source_positioned_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.bin");
        std::fs::write(&path, (0u8..64).collect::<Vec<_>>()).unwrap();

        let source = FileSource::open(&path).await.unwrap();
        let bytes = source.fetch(10, 4).await.unwrap();
        assert_eq!(&bytes[..], &[10, 11, 12, 13]);

        // Reads are independent of each other's positions.
        let bytes = source.fetch(0, 2).await.unwrap();
        assert_eq!(&bytes[..], &[0, 1]);

        let bytes = source.fetch(60, 100).await.unwrap();
        assert_eq!(bytes.len(), 4);
    }
}
