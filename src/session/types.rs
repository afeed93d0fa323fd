use crate::file::FileDescriptor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Uploading,
    Complete,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Complete | SessionState::Failed)
    }
}

/// What a chunk outcome did to its file session
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkVerdict {
    /// New chunk acknowledged, file not finished yet
    Progress { fraction: f64 },
    /// Last missing chunk acknowledged; carries that chunk's response body
    Completed { server_response: String },
    /// Transient failure within budget; the chunk should be sent again
    Retry {
        attempt: u32,
        error_count: u32,
        reason: String,
    },
    Failed { error_count: u32, reason: String },
    /// Duplicate or late outcome that changes nothing
    Ignored,
}

/// Read-only snapshot of a file session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub file: FileDescriptor,
    pub state: SessionState,
    pub fraction: f64,
    pub acknowledged_chunks: u32,
    pub total_chunks: u32,
    pub error_count: u32,
    pub server_response: Option<String>,
    pub file_name: Option<String>,
}
