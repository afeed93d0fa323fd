//! Metrics for upload operations
//!
//! Recorded through the `metrics` facade; the host installs whatever
//! recorder/exporter it wants. Without one every call is a no-op.
//!
//! Key metrics:
//! - Chunk operations (sent, skipped, failed, retried)
//! - File outcomes (admitted, rejected, completed, failed)
//! - In-flight chunk transfers
//! - Chunk transfer duration

pub mod recorder;

pub use recorder::{
    init_metrics, record_chunk_failed, record_chunk_retry, record_chunk_sent,
    record_chunk_skipped, record_file_admitted, record_file_completed, record_file_failed,
    record_file_rejected, set_in_flight, ChunkTimer,
};
