use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Server unavailable ({status}): {body}")]
    Unavailable { status: u16, body: String },

    #[error("Server rejected chunk ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to read chunk bytes: {0}")]
    Read(String),

    #[error("Invalid upload target: {0}")]
    InvalidTarget(String),

    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Failed to build request: {0}")]
    Build(String),
}

impl TransferError {
    /// Whether retrying the same chunk could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransferError::Timeout(_)
                | TransferError::Connection(_)
                | TransferError::Request(_)
                | TransferError::Unavailable { .. }
        )
    }
}

impl From<reqwest::Error> for TransferError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransferError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransferError::Connection(err.to_string())
        } else if err.is_builder() {
            TransferError::Build(err.to_string())
        } else {
            TransferError::Request(err.to_string())
        }
    }
}

pub type TransferResult<T> = Result<T, TransferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(TransferError::Timeout("30s".into()).is_transient());
        assert!(TransferError::Connection("reset".into()).is_transient());
        assert!(TransferError::Unavailable {
            status: 503,
            body: String::new()
        }
        .is_transient());

        assert!(!TransferError::Rejected {
            status: 415,
            body: "bad type".into()
        }
        .is_transient());
        assert!(!TransferError::Read("eof".into()).is_transient());
        assert!(!TransferError::Build("bad url".into()).is_transient());
    }
}
