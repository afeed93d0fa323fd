use crate::config::ConfigError;
use crate::registry::AdmissionError;
use crate::transport::TransferError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport setup failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("File rejected: {0}")]
    Admission(#[from] AdmissionError),

    #[error("Unknown file: {0}")]
    FileNotFound(String),

    #[error("Drag and drop is disabled")]
    DragAndDropDisabled,
}

pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;
