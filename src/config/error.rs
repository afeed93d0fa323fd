use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid chunk size: {0} (must be greater than zero)")]
    InvalidChunkSize(u64),

    #[error("Invalid simultaneous uploads: {0} (must be at least one)")]
    InvalidConcurrency(usize),

    #[error("Invalid max files: {0} (use null for unlimited)")]
    InvalidMaxFiles(usize),

    #[error("Upload target is empty")]
    EmptyTarget,

    #[error("Invalid upload target: {0}")]
    InvalidTarget(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
