mod source;
mod types;

pub use source::{ChunkSource, DiskSource, MemorySource};
pub use types::{file_identifier, FileDescriptor, SelectedFile};
