use serde::{Deserialize, Serialize};

/// One contiguous byte range of a file, sent as a single request.
///
/// `index` is 1-based; `[start, end)` is half-open.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChunkDescriptor {
    pub index: u32,
    pub total_chunks: u32,
    pub start: u64,
    pub end: u64,
}

impl ChunkDescriptor {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn is_last(&self) -> bool {
        self.index == self.total_chunks
    }
}
