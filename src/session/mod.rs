pub mod error;
pub mod file_session;
pub mod types;

pub use error::{SessionError, SessionResult};
pub use file_session::FileSession;
pub use types::{ChunkVerdict, SessionState, SessionSummary};
