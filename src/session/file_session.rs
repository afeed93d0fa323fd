use crate::chunk::ChunkDescriptor;
use crate::file::{ChunkSource, FileDescriptor};
use crate::session::error::{SessionError, SessionResult};
use crate::session::types::{ChunkVerdict, SessionState, SessionSummary};
use crate::transport::ChunkOutcome;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Upload state of one file.
///
/// Pure bookkeeping: callers feed dispatches and outcomes in, and act on
/// the returned [`ChunkVerdict`]. Once Complete or Failed every further
/// outcome is [`ChunkVerdict::Ignored`].
#[derive(Debug)]
pub struct FileSession {
    descriptor: FileDescriptor,
    chunks: Vec<ChunkDescriptor>,
    acknowledged: BTreeSet<u32>,
    in_flight: BTreeSet<u32>,
    retries: HashMap<u32, u32>,
    state: SessionState,
    server_response: Option<String>,
    file_name: Option<String>,
    error_count: u32,
    started: bool,
    source: Arc<dyn ChunkSource>,
}

impl FileSession {
    pub fn new(
        descriptor: FileDescriptor,
        chunks: Vec<ChunkDescriptor>,
        source: Arc<dyn ChunkSource>,
    ) -> Self {
        Self {
            descriptor,
            chunks,
            acknowledged: BTreeSet::new(),
            in_flight: BTreeSet::new(),
            retries: HashMap::new(),
            state: SessionState::Pending,
            server_response: None,
            file_name: None,
            error_count: 0,
            started: false,
            source,
        }
    }

    pub fn descriptor(&self) -> &FileDescriptor {
        &self.descriptor
    }

    pub fn file_id(&self) -> &str {
        &self.descriptor.file_id
    }

    pub fn chunks(&self) -> &[ChunkDescriptor] {
        &self.chunks
    }

    pub fn total_chunks(&self) -> u32 {
        self.chunks.len() as u32
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn source(&self) -> Arc<dyn ChunkSource> {
        self.source.clone()
    }

    pub fn server_response(&self) -> Option<&str> {
        self.server_response.as_deref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn set_file_name(&mut self, name: String) {
        self.file_name = Some(name);
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Whether the file has been handed to the scheduler
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Mark the file as queued for upload; returns false if it already was
    pub fn mark_started(&mut self) -> bool {
        !std::mem::replace(&mut self.started, true)
    }

    /// Fraction of chunks acknowledged, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        self.acknowledged.len() as f64 / self.chunks.len() as f64
    }

    /// Bytes covered by acknowledged chunks
    pub fn acknowledged_bytes(&self) -> u64 {
        self.acknowledged
            .iter()
            .filter_map(|index| self.chunk(*index))
            .map(|chunk| chunk.len())
            .sum()
    }

    pub fn chunk(&self, index: u32) -> Option<&ChunkDescriptor> {
        if index == 0 {
            return None;
        }
        self.chunks.get(index as usize - 1)
    }

    /// Chunk indices neither acknowledged nor in flight
    pub fn outstanding_chunks(&self) -> Vec<u32> {
        self.chunks
            .iter()
            .map(|c| c.index)
            .filter(|i| !self.acknowledged.contains(i) && !self.in_flight.contains(i))
            .collect()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Record that chunk `index` is being sent (Pending → Uploading)
    pub fn begin_chunk(&mut self, index: u32) -> SessionResult<ChunkDescriptor> {
        if self.is_terminal() {
            return Err(SessionError::Terminal {
                file_id: self.descriptor.file_id.clone(),
                state: self.state,
            });
        }
        let chunk = *self.chunk(index).ok_or_else(|| self.unknown(index))?;
        if self.acknowledged.contains(&index) || !self.in_flight.insert(index) {
            return Err(SessionError::AlreadyDispatched {
                file_id: self.descriptor.file_id.clone(),
                index,
            });
        }

        self.state = SessionState::Uploading;
        Ok(chunk)
    }

    /// Route a transfer outcome for chunk `index`
    pub fn apply(
        &mut self,
        index: u32,
        outcome: ChunkOutcome,
        max_retries: u32,
    ) -> SessionResult<ChunkVerdict> {
        match outcome {
            ChunkOutcome::Acknowledged(body) => self.acknowledge(index, body),
            ChunkOutcome::TransientFailure(reason) => {
                self.fail_chunk(index, reason, Some(max_retries))
            }
            ChunkOutcome::FatalFailure(reason) => self.fail_chunk(index, reason, None),
        }
    }

    pub fn acknowledge(&mut self, index: u32, body: String) -> SessionResult<ChunkVerdict> {
        if self.chunk(index).is_none() {
            return Err(self.unknown(index));
        }
        if self.is_terminal() || self.acknowledged.contains(&index) {
            self.in_flight.remove(&index);
            return Ok(ChunkVerdict::Ignored);
        }
        if !self.in_flight.remove(&index) {
            return Err(SessionError::NotDispatched {
                file_id: self.descriptor.file_id.clone(),
                index,
            });
        }

        self.acknowledged.insert(index);

        if self.acknowledged.len() == self.chunks.len() {
            self.state = SessionState::Complete;
            self.server_response = Some(body.clone());
            return Ok(ChunkVerdict::Completed {
                server_response: body,
            });
        }

        Ok(ChunkVerdict::Progress {
            fraction: self.progress(),
        })
    }

    /// `retry_budget` is `None` for fatal failures
    fn fail_chunk(
        &mut self,
        index: u32,
        reason: String,
        retry_budget: Option<u32>,
    ) -> SessionResult<ChunkVerdict> {
        if self.chunk(index).is_none() {
            return Err(self.unknown(index));
        }
        if self.is_terminal() || self.acknowledged.contains(&index) {
            self.in_flight.remove(&index);
            return Ok(ChunkVerdict::Ignored);
        }
        if !self.in_flight.remove(&index) {
            return Err(SessionError::NotDispatched {
                file_id: self.descriptor.file_id.clone(),
                index,
            });
        }

        self.error_count += 1;

        let used = self.retries.entry(index).or_insert(0);
        if let Some(budget) = retry_budget {
            if *used < budget {
                *used += 1;
                return Ok(ChunkVerdict::Retry {
                    attempt: *used,
                    error_count: self.error_count,
                    reason,
                });
            }
        }

        self.state = SessionState::Failed;
        Ok(ChunkVerdict::Failed {
            error_count: self.error_count,
            reason,
        })
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            file: self.descriptor.clone(),
            state: self.state,
            fraction: self.progress(),
            acknowledged_chunks: self.acknowledged.len() as u32,
            total_chunks: self.total_chunks(),
            error_count: self.error_count,
            server_response: self.server_response.clone(),
            file_name: self.file_name.clone(),
        }
    }

    fn unknown(&self, index: u32) -> SessionError {
        SessionError::UnknownChunk {
            file_id: self.descriptor.file_id.clone(),
            index,
        }
    }
}
