//! Per-chunk HTTP transfer
//!
//! A chunk travels as one multipart POST carrying the resumable form
//! fields plus the chunk bytes. The optional probe is a GET with the same
//! fields as query string; a 2xx answer means the server already holds
//! the chunk.

pub mod error;
pub mod http;
pub mod response;
pub mod types;
pub mod uploader;

pub use error::{TransferError, TransferResult};
pub use http::{ChunkTransport, HttpTransport};
pub use response::resolve_file_name;
pub use types::{ChunkOutcome, ChunkParams, ProbeOutcome};
pub use uploader::ChunkUploader;
