//! Metrics recorder for upload operations

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    describe_counter!("upload_chunks_sent_total", "Chunks acknowledged by the server");
    describe_counter!(
        "upload_chunks_skipped_total",
        "Chunks the server already held when probed"
    );
    describe_counter!("upload_chunks_failed_total", "Failed chunk transfer attempts");
    describe_counter!("upload_chunk_retries_total", "Chunk transfers scheduled for retry");
    describe_counter!("upload_bytes_sent_total", "Chunk bytes acknowledged by the server");

    describe_counter!("upload_files_admitted_total", "Files admitted into a batch");
    describe_counter!("upload_files_rejected_total", "Files rejected at admission");
    describe_counter!("upload_files_completed_total", "Files fully uploaded");
    describe_counter!("upload_files_failed_total", "Files that failed irrecoverably");

    describe_gauge!("upload_chunks_in_flight", "Chunk transfers currently in flight");

    describe_histogram!(
        "upload_chunk_transfer_duration_seconds",
        "Time to transfer a single chunk"
    );
}

// ============== Chunk Operations ==============

pub fn record_chunk_sent(chunk_size: u64) {
    counter!("upload_chunks_sent_total").increment(1);
    counter!("upload_bytes_sent_total").increment(chunk_size);
}

pub fn record_chunk_skipped() {
    counter!("upload_chunks_skipped_total").increment(1);
}

/// `kind` is "transient" or "fatal"
pub fn record_chunk_failed(kind: &'static str) {
    counter!("upload_chunks_failed_total", "kind" => kind).increment(1);
}

pub fn record_chunk_retry() {
    counter!("upload_chunk_retries_total").increment(1);
}

pub fn record_chunk_duration(duration: Duration) {
    histogram!("upload_chunk_transfer_duration_seconds").record(duration.as_secs_f64());
}

pub fn set_in_flight(count: usize) {
    gauge!("upload_chunks_in_flight").set(count as f64);
}

// ============== File Operations ==============

pub fn record_file_admitted(size_bytes: u64) {
    counter!("upload_files_admitted_total").increment(1);
    histogram!("upload_file_size_bytes").record(size_bytes as f64);
}

pub fn record_file_rejected(reason: &'static str) {
    counter!("upload_files_rejected_total", "reason" => reason).increment(1);
}

pub fn record_file_completed() {
    counter!("upload_files_completed_total").increment(1);
}

pub fn record_file_failed() {
    counter!("upload_files_failed_total").increment(1);
}

/// Helper struct to time individual chunk operations
pub struct ChunkTimer {
    start_time: Instant,
}

impl ChunkTimer {
    pub fn start() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Stop timing and record the duration
    pub fn stop(self) -> Duration {
        let elapsed = self.start_time.elapsed();
        record_chunk_duration(elapsed);
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        // Should not panic when called multiple times
        init_metrics();
        init_metrics();
    }

    #[test]
    fn test_chunk_timer() {
        let timer = ChunkTimer::start();
        std::thread::sleep(Duration::from_millis(10));
        let elapsed = timer.stop();
        assert!(elapsed >= Duration::from_millis(10));
    }

    #[test]
    fn test_recorders_without_installed_recorder() {
        record_chunk_sent(1024);
        record_chunk_failed("transient");
        record_file_rejected("invalid_type");
        set_in_flight(3);
    }
}
