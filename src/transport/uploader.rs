use crate::chunk::ChunkDescriptor;
use crate::file::ChunkSource;
use crate::metrics;
use crate::transport::error::TransferError;
use crate::transport::http::ChunkTransport;
use crate::transport::types::{ChunkOutcome, ChunkParams, ProbeOutcome};
use std::sync::Arc;

/// Sends single chunks, optionally probing the server first
#[derive(Clone)]
pub struct ChunkUploader {
    transport: Arc<dyn ChunkTransport>,
    test_chunks: bool,
}

impl ChunkUploader {
    pub fn new(transport: Arc<dyn ChunkTransport>, test_chunks: bool) -> Self {
        Self {
            transport,
            test_chunks,
        }
    }

    /// Transfer `chunk` of the file behind `source`.
    ///
    /// Bytes are read only when the chunk actually has to be sent. A read
    /// failure is fatal: the file can no longer be reproduced.
    pub async fn send(
        &self,
        params: &ChunkParams,
        chunk: &ChunkDescriptor,
        source: &dyn ChunkSource,
    ) -> ChunkOutcome {
        if self.test_chunks {
            if let ProbeOutcome::Present(body) = self.transport.probe(params).await {
                tracing::debug!(
                    identifier = %params.identifier,
                    chunk = chunk.index,
                    "server already holds chunk, skipping transfer"
                );
                metrics::record_chunk_skipped();
                return ChunkOutcome::Acknowledged(body);
            }
        }

        let data = match source.read_range(chunk.start, chunk.end).await {
            Ok(data) => data,
            Err(e) => {
                metrics::record_chunk_failed("fatal");
                return TransferError::Read(e.to_string()).into();
            }
        };

        let timer = metrics::ChunkTimer::start();
        let outcome = self.transport.send(params, data).await;
        let elapsed = timer.stop();

        match &outcome {
            ChunkOutcome::Acknowledged(_) => {
                metrics::record_chunk_sent(chunk.len());
                tracing::debug!(
                    identifier = %params.identifier,
                    chunk = chunk.index,
                    total = chunk.total_chunks,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "chunk acknowledged"
                );
            }
            ChunkOutcome::TransientFailure(reason) | ChunkOutcome::FatalFailure(reason) => {
                metrics::record_chunk_failed(outcome.kind());
                tracing::warn!(
                    identifier = %params.identifier,
                    chunk = chunk.index,
                    kind = outcome.kind(),
                    "chunk transfer failed: {}",
                    reason
                );
            }
        }

        outcome
    }
}
