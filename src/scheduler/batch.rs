use crate::chunk::ChunkDescriptor;
use crate::config::UploadConfig;
use crate::events::{EventBus, UploadEvent};
use crate::file::{ChunkSource, FileDescriptor, SelectedFile};
use crate::metrics;
use crate::registry::{AdmissionResult, SessionRegistry};
use crate::session::{ChunkVerdict, SessionSummary};
use crate::transport::{resolve_file_name, ChunkOutcome};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// A chunk transfer ready to run outside the batch lock
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub batch_id: Uuid,
    pub position: usize,
    pub file: FileDescriptor,
    pub chunk: ChunkDescriptor,
    pub source: Arc<dyn ChunkSource>,
}

/// A chunk to put back on the queue once its retry delay has passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryRequest {
    pub position: usize,
    pub index: u32,
    pub attempt: u32,
}

/// All upload state of one batch.
///
/// Every method is synchronous; the scheduler holds the batch behind one
/// lock so outcome processing, event emission and the next dispatch
/// decision happen as a unit.
#[derive(Debug)]
pub struct UploadBatch {
    id: Uuid,
    registry: SessionRegistry,
    /// (admission position, chunk index): admission order, then chunk order
    queue: BTreeSet<(usize, u32)>,
    in_flight: usize,
    retries_pending: usize,
    simultaneous_uploads: usize,
    max_chunk_retries: u32,
    file_name_field: Option<String>,
}

impl UploadBatch {
    pub fn new(config: &UploadConfig) -> AdmissionResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            registry: SessionRegistry::new(config)?,
            queue: BTreeSet::new(),
            in_flight: 0,
            retries_pending: 0,
            simultaneous_uploads: config.simultaneous_uploads,
            max_chunk_retries: config.max_chunk_retries,
            file_name_field: config.file_name_server_field.clone(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn admit(&mut self, file: SelectedFile, events: &EventBus) -> AdmissionResult<FileDescriptor> {
        self.registry.admit(file, events)
    }

    /// Queue every outstanding chunk of the file at `position`.
    ///
    /// Returns false if the file was already started or does not exist.
    pub fn start(&mut self, position: usize) -> bool {
        let Some(session) = self.registry.session_at_mut(position) else {
            return false;
        };
        if session.is_terminal() || !session.mark_started() {
            return false;
        }
        for index in session.outstanding_chunks() {
            self.queue.insert((position, index));
        }
        true
    }

    /// Start every admitted file not started yet; returns how many were
    pub fn start_all(&mut self) -> usize {
        (0..self.registry.len())
            .filter(|position| self.start(*position))
            .count()
    }

    /// Pop queued chunks while under the concurrency cap
    pub fn next_dispatches(&mut self) -> Vec<Dispatch> {
        let mut dispatches = Vec::new();

        while self.in_flight < self.simultaneous_uploads {
            let Some((position, index)) = self.queue.pop_first() else {
                break;
            };
            let Some(session) = self.registry.session_at_mut(position) else {
                continue;
            };

            match session.begin_chunk(index) {
                Ok(chunk) => {
                    self.in_flight += 1;
                    tracing::debug!(
                        file_id = %session.file_id(),
                        chunk = index,
                        in_flight = self.in_flight,
                        "dispatching chunk"
                    );
                    dispatches.push(Dispatch {
                        batch_id: self.id,
                        position,
                        file: session.descriptor().clone(),
                        chunk,
                        source: session.source(),
                    });
                }
                Err(e) => {
                    tracing::debug!("skipping queued chunk: {}", e);
                }
            }
        }

        metrics::set_in_flight(self.in_flight);
        dispatches
    }

    /// Route a finished transfer to its session and emit what follows
    pub fn complete(
        &mut self,
        position: usize,
        index: u32,
        outcome: ChunkOutcome,
        events: &EventBus,
    ) -> Option<RetryRequest> {
        self.in_flight = self.in_flight.saturating_sub(1);
        metrics::set_in_flight(self.in_flight);

        let max_retries = self.max_chunk_retries;
        let Some(session) = self.registry.session_at_mut(position) else {
            tracing::warn!(position, "outcome for unknown session");
            return None;
        };
        let file = session.descriptor().clone();

        let verdict = match session.apply(index, outcome, max_retries) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!("discarding chunk outcome: {}", e);
                return None;
            }
        };

        let mut retry = None;
        match verdict {
            ChunkVerdict::Progress { fraction } => {
                let batch_fraction = self.registry.batch_progress();
                events.emit(UploadEvent::progress(&file.file_id, fraction, batch_fraction));
            }
            ChunkVerdict::Completed { server_response } => {
                let file_name = resolve_file_name(&server_response, self.file_name_field.as_deref());
                if let Some(session) = self.registry.session_at_mut(position) {
                    session.set_file_name(file_name.clone());
                }
                self.registry.record_file_name(file_name.clone());

                let batch_fraction = self.registry.batch_progress();
                events.emit(UploadEvent::progress(&file.file_id, 1.0, batch_fraction));

                metrics::record_file_completed();
                tracing::info!(file_id = %file.file_id, name = %file_name, "file uploaded");
                events.emit(UploadEvent::FileSuccess {
                    file,
                    server_response,
                    file_name,
                });
            }
            ChunkVerdict::Retry {
                attempt,
                error_count,
                reason,
            } => {
                self.retries_pending += 1;
                metrics::record_chunk_retry();
                tracing::warn!(
                    file_id = %file.file_id,
                    chunk = index,
                    attempt,
                    error_count,
                    "retrying chunk: {}",
                    reason
                );
                events.emit(UploadEvent::FileRetry {
                    file_id: file.file_id.clone(),
                    chunk_index: index,
                    attempt,
                });
                retry = Some(RetryRequest {
                    position,
                    index,
                    attempt,
                });
            }
            ChunkVerdict::Failed {
                error_count,
                reason,
            } => {
                self.queue.retain(|(p, _)| *p != position);
                metrics::record_file_failed();
                tracing::warn!(
                    file_id = %file.file_id,
                    error_count,
                    "file upload failed: {}",
                    reason
                );
                events.emit(UploadEvent::FileError {
                    file,
                    error_count,
                    message: reason,
                });
            }
            ChunkVerdict::Ignored => {
                tracing::debug!(file_id = %file.file_id, chunk = index, "ignoring chunk outcome");
            }
        }

        self.emit_complete_if_idle(events);
        retry
    }

    /// Put a retried chunk back on the queue after its delay
    pub fn requeue(&mut self, retry: RetryRequest, events: &EventBus) {
        self.retries_pending = self.retries_pending.saturating_sub(1);

        let live = self
            .registry
            .session_at(retry.position)
            .is_some_and(|session| !session.is_terminal());
        if live {
            self.queue.insert((retry.position, retry.index));
        }

        self.emit_complete_if_idle(events);
    }

    fn emit_complete_if_idle(&self, events: &EventBus) {
        if self.is_idle() && self.registry.sessions().any(|s| s.is_started()) {
            events.emit(UploadEvent::Complete);
        }
    }

    /// At least one chunk transfer is in flight
    pub fn is_uploading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Nothing in flight, queued, or waiting out a retry delay
    pub fn is_idle(&self) -> bool {
        self.in_flight == 0 && self.queue.is_empty() && self.retries_pending == 0
    }

    pub fn progress(&self) -> f64 {
        self.registry.batch_progress()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.registry.file_names()
    }

    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.registry.summaries()
    }
}
