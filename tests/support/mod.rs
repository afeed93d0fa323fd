#![allow(dead_code)]

use async_trait::async_trait;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use parking_lot::Mutex;
use resumable_uploader::{ChunkOutcome, ChunkParams, ChunkTransport, UploadEvent};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

// ============== Scripted transport ==============

/// In-process transport with per-chunk scripted outcomes and delays.
///
/// Unscripted chunks are acknowledged with `"<filename>:<chunk>"`.
#[derive(Default)]
pub struct ScriptedTransport {
    delay: Duration,
    delays: Mutex<HashMap<(String, u32), Duration>>,
    script: Mutex<HashMap<(String, u32), VecDeque<ChunkOutcome>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    sent: Mutex<Vec<(String, u32)>>,
}

impl ScriptedTransport {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn delay_chunk(&self, filename: &str, chunk: u32, delay: Duration) {
        self.delays.lock().insert((filename.to_string(), chunk), delay);
    }

    /// Queue outcomes returned, in order, for successive sends of a chunk
    pub fn script(&self, filename: &str, chunk: u32, outcomes: Vec<ChunkOutcome>) {
        self.script
            .lock()
            .entry((filename.to_string(), chunk))
            .or_default()
            .extend(outcomes);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<(String, u32)> {
        self.sent.lock().clone()
    }

    pub fn sends_of(&self, filename: &str) -> usize {
        self.sent.lock().iter().filter(|(f, _)| f == filename).count()
    }
}

#[async_trait]
impl ChunkTransport for ScriptedTransport {
    async fn send(&self, params: &ChunkParams, _data: Bytes) -> ChunkOutcome {
        let key = (params.filename.clone(), params.chunk_number);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.sent.lock().push(key.clone());

        let delay = self.delays.lock().get(&key).copied().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .script
            .lock()
            .get_mut(&key)
            .and_then(|outcomes| outcomes.pop_front());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        scripted.unwrap_or_else(|| {
            ChunkOutcome::Acknowledged(format!("{}:{}", params.filename, params.chunk_number))
        })
    }
}

/// Everything received so far, without waiting
pub fn drain(rx: &mut mpsc::UnboundedReceiver<UploadEvent>) -> Vec<UploadEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ============== Resumable test server ==============

#[derive(Default)]
struct ServerState {
    chunks: HashMap<String, BTreeMap<u32, Bytes>>,
    assembled: HashMap<String, Vec<u8>>,
    failures: HashMap<u32, VecDeque<u16>>,
    posts: usize,
    probes: usize,
    json_name: bool,
    fields: Vec<HashMap<String, String>>,
}

/// Axum server speaking the resumable chunk protocol.
///
/// GET answers 200 when the probed chunk is stored and 404 otherwise.
/// POST stores the chunk, reassembles the file once every chunk is there,
/// and answers with the file name (or `{"name": ...}` in JSON mode).
#[derive(Clone, Default)]
pub struct TestServer {
    state: Arc<Mutex<ServerState>>,
}

impl TestServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json_names(self) -> Self {
        self.state.lock().json_name = true;
        self
    }

    /// Answer the next POSTs of chunk `chunk` (any file) with these statuses
    pub fn fail_chunk(&self, chunk: u32, statuses: Vec<u16>) {
        self.state
            .lock()
            .failures
            .entry(chunk)
            .or_default()
            .extend(statuses);
    }

    /// Store a chunk as if an earlier session had sent it
    pub fn preload(&self, identifier: &str, chunk: u32, data: impl Into<Bytes>) {
        self.state
            .lock()
            .chunks
            .entry(identifier.to_string())
            .or_default()
            .insert(chunk, data.into());
    }

    pub fn assembled(&self, filename: &str) -> Option<Vec<u8>> {
        self.state.lock().assembled.get(filename).cloned()
    }

    pub fn posts(&self) -> usize {
        self.state.lock().posts
    }

    pub fn probes(&self) -> usize {
        self.state.lock().probes
    }

    pub fn received_fields(&self) -> Vec<HashMap<String, String>> {
        self.state.lock().fields.clone()
    }

    /// Serve on an ephemeral local port; returns the upload URL
    pub async fn start(&self) -> String {
        let app = Router::new()
            .route("/upload", get(probe).post(receive))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}/upload")
    }
}

async fn probe(
    State(server): State<TestServer>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    let mut state = server.state.lock();
    state.probes += 1;

    let identifier = query.get("resumableIdentifier").cloned().unwrap_or_default();
    let chunk: u32 = query
        .get("resumableChunkNumber")
        .and_then(|n| n.parse().ok())
        .unwrap_or(0);

    let present = state
        .chunks
        .get(&identifier)
        .is_some_and(|chunks| chunks.contains_key(&chunk));
    if present {
        (StatusCode::OK, "OK".to_string())
    } else {
        (StatusCode::NOT_FOUND, String::new())
    }
}

async fn receive(State(server): State<TestServer>, mut multipart: Multipart) -> (StatusCode, String) {
    let mut fields = HashMap::new();
    let mut data = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            data = field.bytes().await.ok();
        } else if let Ok(value) = field.text().await {
            fields.insert(name, value);
        }
    }

    let mut guard = server.state.lock();
    let state = &mut *guard;
    state.posts += 1;
    state.fields.push(fields.clone());

    let chunk: u32 = fields
        .get("resumableChunkNumber")
        .and_then(|n| n.parse().ok())
        .unwrap_or(0);
    if let Some(status) = state.failures.get_mut(&chunk).and_then(|s| s.pop_front()) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, "scripted failure".to_string());
    }

    let (Some(data), Some(identifier), Some(filename), Some(total)) = (
        data,
        fields.get("resumableIdentifier").cloned(),
        fields.get("resumableFilename").cloned(),
        fields
            .get("resumableTotalChunks")
            .and_then(|n| n.parse::<u32>().ok()),
    ) else {
        return (StatusCode::BAD_REQUEST, "missing resumable fields".to_string());
    };

    let stored = state.chunks.entry(identifier).or_default();
    stored.insert(chunk, data);
    if stored.len() as u32 == total {
        let file: Vec<u8> = stored.values().flat_map(|b| b.iter().copied()).collect();
        state.assembled.insert(filename.clone(), file);
    }

    let body = if state.json_name {
        serde_json::json!({ "name": format!("stored-{filename}") }).to_string()
    } else {
        filename
    };
    (StatusCode::OK, body)
}
