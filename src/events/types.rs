use crate::file::FileDescriptor;
use serde::Serialize;

pub const INVALID_TYPE_MESSAGE: &str = "Invalid file type!";

/// Lifecycle notifications delivered to the host
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UploadEvent {
    /// Admitted and queued in Pending; no chunk has been sent yet
    FileAdded { file: FileDescriptor },

    /// Admission refused the file because of its type; no session exists
    FileTypeRejected {
        file_name: String,
        file_type: String,
        message: String,
    },

    /// A new chunk was acknowledged.
    ///
    /// `percent` is floored, so it reads 100 only once the file is complete.
    /// `batch_fraction` is size-weighted across every admitted file.
    Progress {
        file_id: String,
        fraction: f64,
        percent: u8,
        batch_fraction: f64,
    },

    /// A chunk failed transiently and will be sent again
    FileRetry {
        file_id: String,
        chunk_index: u32,
        attempt: u32,
    },

    FileSuccess {
        file: FileDescriptor,
        server_response: String,
        file_name: String,
    },

    FileError {
        file: FileDescriptor,
        error_count: u32,
        message: String,
    },

    /// Every started file is terminal and nothing is queued or in flight
    Complete,
}

impl UploadEvent {
    pub fn progress(file_id: &str, fraction: f64, batch_fraction: f64) -> Self {
        UploadEvent::Progress {
            file_id: file_id.to_string(),
            fraction,
            percent: (fraction * 100.0).floor().clamp(0.0, 100.0) as u8,
            batch_fraction,
        }
    }

    pub fn file_id(&self) -> Option<&str> {
        match self {
            UploadEvent::FileAdded { file }
            | UploadEvent::FileSuccess { file, .. }
            | UploadEvent::FileError { file, .. } => Some(&file.file_id),
            UploadEvent::Progress { file_id, .. } | UploadEvent::FileRetry { file_id, .. } => {
                Some(file_id)
            }
            UploadEvent::FileTypeRejected { .. } | UploadEvent::Complete => None,
        }
    }
}
