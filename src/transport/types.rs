use crate::chunk::ChunkDescriptor;
use crate::file::FileDescriptor;
use crate::transport::error::TransferError;
use serde::{Deserialize, Serialize};

/// Form fields describing one chunk to the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkParams {
    pub chunk_number: u32,
    pub chunk_size: u64,
    pub current_chunk_size: u64,
    pub total_size: u64,
    pub file_type: String,
    pub identifier: String,
    pub filename: String,
    pub relative_path: String,
    pub total_chunks: u32,
}

impl ChunkParams {
    pub fn new(file: &FileDescriptor, chunk: &ChunkDescriptor, chunk_size: u64) -> Self {
        Self {
            chunk_number: chunk.index,
            chunk_size,
            current_chunk_size: chunk.len(),
            total_size: file.size_bytes,
            file_type: file.mime_type.clone().unwrap_or_default(),
            identifier: file.file_id.clone(),
            filename: file.name.clone(),
            relative_path: file.relative_path.clone(),
            total_chunks: chunk.total_chunks,
        }
    }

    /// Field names and values in the order they are sent
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("resumableChunkNumber", self.chunk_number.to_string()),
            ("resumableChunkSize", self.chunk_size.to_string()),
            ("resumableCurrentChunkSize", self.current_chunk_size.to_string()),
            ("resumableTotalSize", self.total_size.to_string()),
            ("resumableType", self.file_type.clone()),
            ("resumableIdentifier", self.identifier.clone()),
            ("resumableFilename", self.filename.clone()),
            ("resumableRelativePath", self.relative_path.clone()),
            ("resumableTotalChunks", self.total_chunks.to_string()),
        ]
    }
}

/// Result of one chunk transfer attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Server accepted the chunk; carries the response body
    Acknowledged(String),
    TransientFailure(String),
    FatalFailure(String),
}

impl ChunkOutcome {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, ChunkOutcome::Acknowledged(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChunkOutcome::Acknowledged(_) => "acknowledged",
            ChunkOutcome::TransientFailure(_) => "transient",
            ChunkOutcome::FatalFailure(_) => "fatal",
        }
    }
}

impl From<TransferError> for ChunkOutcome {
    fn from(err: TransferError) -> Self {
        if err.is_transient() {
            ChunkOutcome::TransientFailure(err.to_string())
        } else {
            ChunkOutcome::FatalFailure(err.to_string())
        }
    }
}

/// Answer to a test-before-send probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Server already holds the chunk; carries the response body
    Present(String),
    Absent,
}
