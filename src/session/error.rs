use crate::session::types::SessionState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Chunk {index} does not exist for file {file_id}")]
    UnknownChunk { file_id: String, index: u32 },

    #[error("Chunk {index} of file {file_id} was never dispatched")]
    NotDispatched { file_id: String, index: u32 },

    #[error("Chunk {index} of file {file_id} is already in flight or acknowledged")]
    AlreadyDispatched { file_id: String, index: u32 },

    #[error("File {file_id} is {state:?}; no further chunks are dispatched")]
    Terminal { file_id: String, state: SessionState },
}

pub type SessionResult<T> = Result<T, SessionError>;
