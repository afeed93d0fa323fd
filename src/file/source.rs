use async_trait::async_trait;
use bytes::Bytes;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Random access to the bytes of a selected file.
///
/// `read_range` is called once per chunk dispatch, possibly concurrently
/// for different ranges of the same file.
#[async_trait]
pub trait ChunkSource: Send + Sync + std::fmt::Debug {
    async fn read_range(&self, start: u64, end: u64) -> io::Result<Bytes>;
}

/// File contents already held in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl ChunkSource for MemorySource {
    async fn read_range(&self, start: u64, end: u64) -> io::Result<Bytes> {
        let len = self.data.len() as u64;
        if start > end || end > len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("range {start}..{end} outside {len} bytes"),
            ));
        }
        Ok(self.data.slice(start as usize..end as usize))
    }
}

/// File on disk, reopened for every range so concurrent reads never share a cursor
#[derive(Debug, Clone)]
pub struct DiskSource {
    path: PathBuf,
}

impl DiskSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ChunkSource for DiskSource {
    async fn read_range(&self, start: u64, end: u64) -> io::Result<Bytes> {
        if start > end {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("range {start}..{end} is reversed"),
            ));
        }

        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(start)).await?;

        let mut buf = vec![0u8; (end - start) as usize];
        file.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}
