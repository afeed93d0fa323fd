use crate::chunk::ChunkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdmissionError {
    #[error("Too many files: batch already holds the maximum of {max}")]
    TooManyFiles { max: usize },

    #[error("Invalid file type for {file_name}: {file_type:?} is not allowed")]
    InvalidType { file_name: String, file_type: String },

    #[error("File {file_name} is {size} bytes, over the {max} byte limit")]
    OversizedFile { file_name: String, size: u64, max: u64 },

    #[error("File {file_id} is already in this batch")]
    Duplicate { file_id: String },

    #[error("Cannot plan chunks: {0}")]
    Plan(#[from] ChunkError),
}

impl AdmissionError {
    /// Short label used for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            AdmissionError::TooManyFiles { .. } => "too_many_files",
            AdmissionError::InvalidType { .. } => "invalid_type",
            AdmissionError::OversizedFile { .. } => "oversized_file",
            AdmissionError::Duplicate { .. } => "duplicate",
            AdmissionError::Plan(_) => "plan",
        }
    }
}

pub type AdmissionResult<T> = Result<T, AdmissionError>;
