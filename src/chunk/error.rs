use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(u64),

    #[error("File of {size} bytes needs more than {max} chunks at chunk size {chunk_size}")]
    TooManyChunks { size: u64, chunk_size: u64, max: u32 },
}

pub type ChunkResult<T> = std::result::Result<T, ChunkError>;
