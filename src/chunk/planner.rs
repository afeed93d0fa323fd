use super::error::{ChunkError, ChunkResult};
use super::types::ChunkDescriptor;

/// Splits a file length into fixed-size chunks
#[derive(Debug, Clone, Copy)]
pub struct ChunkPlanner {
    chunk_size: u64,
}

impl ChunkPlanner {
    pub fn new(chunk_size: u64) -> ChunkResult<Self> {
        if chunk_size == 0 {
            return Err(ChunkError::InvalidChunkSize(chunk_size));
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of chunks a file of `size_bytes` is split into.
    ///
    /// Empty files still get one (empty) chunk so they produce a completion.
    pub fn chunk_count(&self, size_bytes: u64) -> u64 {
        size_bytes.div_ceil(self.chunk_size).max(1)
    }

    /// Ordered, 1-indexed chunks partitioning `[0, size_bytes)`.
    ///
    /// Every chunk is exactly `chunk_size` long except the last, which may
    /// be shorter.
    pub fn plan(&self, size_bytes: u64) -> ChunkResult<Vec<ChunkDescriptor>> {
        let count = self.chunk_count(size_bytes);
        let total_chunks = u32::try_from(count).map_err(|_| ChunkError::TooManyChunks {
            size: size_bytes,
            chunk_size: self.chunk_size,
            max: u32::MAX,
        })?;

        let chunks = (0..total_chunks)
            .map(|i| {
                let start = u64::from(i) * self.chunk_size;
                let end = (start + self.chunk_size).min(size_bytes);
                ChunkDescriptor {
                    index: i + 1,
                    total_chunks,
                    start,
                    end,
                }
            })
            .collect();

        Ok(chunks)
    }
}

/// Plan `size_bytes` with a one-off planner
pub fn plan(size_bytes: u64, chunk_size: u64) -> ChunkResult<Vec<ChunkDescriptor>> {
    ChunkPlanner::new(chunk_size)?.plan(size_bytes)
}
