//! Chunked, resumable file uploads over HTTP.
//!
//! Files are admitted into a batch, split into fixed-size chunks and sent
//! as independent multipart requests. A scheduler bounds how many chunk
//! transfers run at once and reports progress through an event stream.

pub mod chunk;
pub mod config;
pub mod events;
pub mod file;
pub mod metrics;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod transport;

pub use config::{OversizePolicy, UploadConfig};
pub use events::UploadEvent;
pub use file::{DiskSource, FileDescriptor, MemorySource, SelectedFile};
pub use scheduler::{SchedulerError, SchedulerResult, UploadScheduler};
pub use transport::{ChunkOutcome, ChunkParams, ChunkTransport, HttpTransport};
