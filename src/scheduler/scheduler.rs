use crate::config::UploadConfig;
use crate::events::{EventBus, UploadEvent};
use crate::file::{FileDescriptor, SelectedFile};
use crate::metrics;
use crate::scheduler::batch::{Dispatch, RetryRequest, UploadBatch};
use crate::scheduler::error::{SchedulerError, SchedulerResult};
use crate::session::SessionSummary;
use crate::transport::{ChunkOutcome, ChunkParams, ChunkTransport, ChunkUploader, HttpTransport};
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use uuid::Uuid;

const MAX_RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Drives chunk transfers for one batch of files.
///
/// Cheap to clone; every clone shares the same batch. Operations that may
/// start transfers spawn Tokio tasks and must run inside a runtime.
#[derive(Clone)]
pub struct UploadScheduler {
    config: Arc<UploadConfig>,
    uploader: ChunkUploader,
    events: EventBus,
    batch: Arc<Mutex<UploadBatch>>,

    // Woken whenever the batch may have gone idle
    idle: Arc<Notify>,
}

impl UploadScheduler {
    pub fn new(config: UploadConfig, transport: Arc<dyn ChunkTransport>) -> SchedulerResult<Self> {
        config.validate()?;
        metrics::init_metrics();

        let batch = UploadBatch::new(&config)?;
        tracing::info!(
            url = %config.target,
            chunk_size = config.chunk_size,
            simultaneous_uploads = config.simultaneous_uploads,
            "upload scheduler ready"
        );

        Ok(Self {
            uploader: ChunkUploader::new(transport, config.test_chunks),
            config: Arc::new(config),
            events: EventBus::new(),
            batch: Arc::new(Mutex::new(batch)),
            idle: Arc::new(Notify::new()),
        })
    }

    /// Scheduler sending chunks over HTTP to `config.target`
    pub fn with_http(config: UploadConfig) -> SchedulerResult<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Self::new(config, Arc::new(transport))
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UploadEvent> {
        self.events.subscribe()
    }

    /// Admit one file into the current batch.
    ///
    /// With `auto_start` the file's chunks are queued right away; otherwise
    /// it waits for [`upload`](Self::upload) or
    /// [`upload_file`](Self::upload_file).
    pub fn add_file(&self, file: SelectedFile) -> SchedulerResult<FileDescriptor> {
        let (descriptor, dispatches) = {
            let mut batch = self.batch.lock();
            let descriptor = batch.admit(file, &self.events)?;
            if self.config.auto_start {
                if let Some(position) = batch.registry().position(&descriptor.file_id) {
                    batch.start(position);
                }
            }
            (descriptor, batch.next_dispatches())
        };

        self.spawn_all(dispatches);
        Ok(descriptor)
    }

    /// Admit a selection file by file; one result per file, in order
    pub fn add_files(&self, files: Vec<SelectedFile>) -> Vec<SchedulerResult<FileDescriptor>> {
        files.into_iter().map(|file| self.add_file(file)).collect()
    }

    /// Start every admitted file that has not started yet
    pub fn upload(&self) -> usize {
        let (started, dispatches) = {
            let mut batch = self.batch.lock();
            let started = batch.start_all();
            (started, batch.next_dispatches())
        };

        tracing::debug!(started, "starting uploads");
        self.spawn_all(dispatches);
        started
    }

    /// Start a single admitted file; returns false if it already started
    pub fn upload_file(&self, file_id: &str) -> SchedulerResult<bool> {
        let (started, dispatches) = {
            let mut batch = self.batch.lock();
            let position = batch
                .registry()
                .position(file_id)
                .ok_or_else(|| SchedulerError::FileNotFound(file_id.to_string()))?;
            let started = batch.start(position);
            (started, batch.next_dispatches())
        };

        self.spawn_all(dispatches);
        Ok(started)
    }

    /// Feed file selections from `selections` into the batch until the
    /// sender side closes
    pub fn attach_input(&self, mut selections: mpsc::Receiver<Vec<SelectedFile>>) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            while let Some(files) = selections.recv().await {
                for result in scheduler.add_files(files) {
                    if let Err(e) = result {
                        tracing::debug!("selection entry not added: {}", e);
                    }
                }
            }
        })
    }

    /// Like [`attach_input`](Self::attach_input) for dropped files
    pub fn attach_drop_zone(
        &self,
        drops: mpsc::Receiver<Vec<SelectedFile>>,
    ) -> SchedulerResult<JoinHandle<()>> {
        if self.config.disable_drag_and_drop {
            return Err(SchedulerError::DragAndDropDisabled);
        }
        Ok(self.attach_input(drops))
    }

    /// True while at least one chunk transfer is in flight
    pub fn is_uploading(&self) -> bool {
        self.batch.lock().is_uploading()
    }

    /// Size-weighted progress of the whole batch, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        self.batch.lock().progress()
    }

    /// Server-side names of completed files, in completion order
    pub fn file_names(&self) -> Vec<String> {
        self.batch.lock().file_names()
    }

    pub fn sessions(&self) -> Vec<SessionSummary> {
        self.batch.lock().summaries()
    }

    pub fn session(&self, file_id: &str) -> Option<SessionSummary> {
        self.batch.lock().registry().get(file_id).map(|s| s.summary())
    }

    pub fn batch_id(&self) -> Uuid {
        self.batch.lock().id()
    }

    /// Discard the current batch and start an empty one.
    ///
    /// Transfers still in flight run to completion but their outcomes are
    /// dropped.
    pub fn reset(&self) -> SchedulerResult<()> {
        let fresh = UploadBatch::new(&self.config)?;
        let old = std::mem::replace(&mut *self.batch.lock(), fresh);

        tracing::info!(
            batch = %old.id(),
            abandoned_in_flight = old.in_flight(),
            "upload batch reset"
        );
        metrics::set_in_flight(0);
        self.idle.notify_waiters();
        Ok(())
    }

    /// Wait until nothing is queued, in flight, or waiting to retry
    pub async fn wait_until_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.batch.lock().is_idle() {
                return;
            }
            notified.await;
        }
    }

    fn spawn_all(&self, dispatches: Vec<Dispatch>) {
        for dispatch in dispatches {
            let scheduler = self.clone();
            tokio::spawn(async move {
                scheduler.run_transfer(dispatch).await;
            });
        }
    }

    async fn run_transfer(&self, dispatch: Dispatch) {
        let params = ChunkParams::new(&dispatch.file, &dispatch.chunk, self.config.chunk_size);
        let outcome = self
            .uploader
            .send(&params, &dispatch.chunk, dispatch.source.as_ref())
            .await;

        self.finish_chunk(dispatch.batch_id, dispatch.position, dispatch.chunk.index, outcome);
    }

    fn finish_chunk(&self, batch_id: Uuid, position: usize, index: u32, outcome: ChunkOutcome) {
        let (retry, dispatches, idle) = {
            let mut batch = self.batch.lock();
            if batch.id() != batch_id {
                tracing::debug!(batch = %batch_id, chunk = index, "dropping outcome from a reset batch");
                return;
            }
            let retry = batch.complete(position, index, outcome, &self.events);
            (retry, batch.next_dispatches(), batch.is_idle())
        };

        if let Some(retry) = retry {
            self.schedule_retry(batch_id, retry);
        }
        self.spawn_all(dispatches);
        if idle {
            self.idle.notify_waiters();
        }
    }

    fn schedule_retry(&self, batch_id: Uuid, retry: RetryRequest) {
        let delay = self.retry_delay(retry.attempt);
        let scheduler = self.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let (dispatches, idle) = {
                let mut batch = scheduler.batch.lock();
                if batch.id() != batch_id {
                    return;
                }
                batch.requeue(retry, &scheduler.events);
                (batch.next_dispatches(), batch.is_idle())
            };

            scheduler.spawn_all(dispatches);
            if idle {
                scheduler.idle.notify_waiters();
            }
        });
    }

    /// Exponential delay before retry `attempt` (1-based)
    fn retry_delay(&self, attempt: u32) -> Duration {
        let base = self.config.chunk_retry_interval();
        let mut backoff = ExponentialBackoff {
            current_interval: base,
            initial_interval: base,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: MAX_RETRY_INTERVAL.max(base),
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };

        let mut delay = base;
        for _ in 0..attempt {
            if let Some(next) = backoff.next_backoff() {
                delay = next;
            }
        }
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;

    struct AckTransport;

    #[async_trait]
    impl ChunkTransport for AckTransport {
        async fn send(&self, params: &ChunkParams, _data: Bytes) -> ChunkOutcome {
            ChunkOutcome::Acknowledged(format!("{}#{}", params.filename, params.chunk_number))
        }
    }

    fn scheduler(config: UploadConfig) -> UploadScheduler {
        UploadScheduler::new(config, Arc::new(AckTransport)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = UploadConfig {
            chunk_size: 0,
            ..UploadConfig::new("http://localhost/upload")
        };
        let result = UploadScheduler::new(config, Arc::new(AckTransport));
        assert!(matches!(result, Err(SchedulerError::Config(_))));
    }

    #[test]
    fn test_retry_delay_doubles() {
        let scheduler = scheduler(UploadConfig {
            chunk_retry_interval_ms: 100,
            ..UploadConfig::new("http://localhost/upload")
        });
        assert_eq!(scheduler.retry_delay(1).as_millis(), 100);
        assert_eq!(scheduler.retry_delay(2).as_millis(), 200);
        assert_eq!(scheduler.retry_delay(3).as_millis(), 400);
    }

    #[tokio::test]
    async fn test_single_file_completes() {
        let scheduler = scheduler(UploadConfig {
            chunk_size: 4,
            ..UploadConfig::new("http://localhost/upload")
        });
        let mut events = scheduler.subscribe();

        let file = scheduler
            .add_file(SelectedFile::from_bytes("notes.txt", "0123456789"))
            .unwrap();
        scheduler.wait_until_idle().await;

        let summary = scheduler.session(&file.file_id).unwrap();
        assert_eq!(summary.acknowledged_chunks, 3);
        assert_eq!(scheduler.file_names(), vec!["notes.txt#3".to_string()]);
        assert!(!scheduler.is_uploading());
        assert_eq!(scheduler.progress(), 1.0);

        let mut last = None;
        while let Ok(event) = events.try_recv() {
            last = Some(event);
        }
        assert_eq!(last, Some(UploadEvent::Complete));
    }

    #[tokio::test]
    async fn test_upload_file_unknown_id() {
        let scheduler = scheduler(UploadConfig::new("http://localhost/upload"));
        let result = scheduler.upload_file("nope");
        assert!(matches!(result, Err(SchedulerError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_drop_zone_disabled() {
        let scheduler = scheduler(UploadConfig {
            disable_drag_and_drop: true,
            ..UploadConfig::new("http://localhost/upload")
        });
        let (_tx, rx) = mpsc::channel(1);
        assert!(matches!(
            scheduler.attach_drop_zone(rx),
            Err(SchedulerError::DragAndDropDisabled)
        ));
    }

    #[tokio::test]
    async fn test_reset_starts_new_batch() {
        let scheduler = scheduler(UploadConfig {
            auto_start: false,
            ..UploadConfig::new("http://localhost/upload")
        });
        scheduler
            .add_file(SelectedFile::from_bytes("a.txt", "abc"))
            .unwrap();
        let before = scheduler.batch_id();

        scheduler.reset().unwrap();
        assert_ne!(scheduler.batch_id(), before);
        assert!(scheduler.sessions().is_empty());
        assert!(scheduler.file_names().is_empty());
    }
}
