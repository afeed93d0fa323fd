use crate::chunk::ChunkPlanner;
use crate::config::{OversizePolicy, UploadConfig};
use crate::events::{EventBus, UploadEvent, INVALID_TYPE_MESSAGE};
use crate::file::{FileDescriptor, SelectedFile};
use crate::metrics;
use crate::registry::error::{AdmissionError, AdmissionResult};
use crate::session::{FileSession, SessionSummary};
use std::collections::HashMap;

/// The file sessions of one upload batch, in admission order.
///
/// Sessions are never removed individually; a position handed out by
/// [`SessionRegistry::position`] stays valid until [`SessionRegistry::clear`].
#[derive(Debug)]
pub struct SessionRegistry {
    planner: ChunkPlanner,
    filetypes: Option<Vec<String>>,
    max_files: Option<usize>,
    max_file_size: u64,
    oversize_policy: OversizePolicy,
    sessions: Vec<FileSession>,
    by_id: HashMap<String, usize>,
    file_names: Vec<String>,
}

impl SessionRegistry {
    pub fn new(config: &UploadConfig) -> AdmissionResult<Self> {
        let filetypes = config.filetypes.as_ref().map(|types| {
            types
                .iter()
                .map(|t| t.trim().trim_start_matches('.').to_lowercase())
                .collect()
        });

        Ok(Self {
            planner: ChunkPlanner::new(config.chunk_size)?,
            filetypes,
            max_files: config.max_files,
            max_file_size: config.max_file_size,
            oversize_policy: config.oversize_policy,
            sessions: Vec::new(),
            by_id: HashMap::new(),
            file_names: Vec::new(),
        })
    }

    /// Validate `file` and, if accepted, create its Pending session.
    ///
    /// Checks run in order: file count, type, size, duplicate identity.
    /// Only a type mismatch is reported on the event bus; every rejection
    /// is returned to the caller.
    pub fn admit(
        &mut self,
        file: SelectedFile,
        events: &EventBus,
    ) -> AdmissionResult<FileDescriptor> {
        let result = self.check(&file);
        if let Err(e) = &result {
            metrics::record_file_rejected(e.reason());
            tracing::warn!(file = %file.name, "file rejected: {}", e);
            if let AdmissionError::InvalidType {
                file_name,
                file_type,
            } = e
            {
                events.emit(UploadEvent::FileTypeRejected {
                    file_name: file_name.clone(),
                    file_type: file_type.clone(),
                    message: INVALID_TYPE_MESSAGE.to_string(),
                });
            }
        }
        let descriptor = result?;

        let chunks = self.planner.plan(descriptor.size_bytes)?;
        let session = FileSession::new(descriptor.clone(), chunks, file.source);

        self.by_id
            .insert(descriptor.file_id.clone(), self.sessions.len());
        self.sessions.push(session);

        metrics::record_file_admitted(descriptor.size_bytes);
        tracing::info!(
            file_id = %descriptor.file_id,
            size = descriptor.size_bytes,
            "file admitted"
        );
        events.emit(UploadEvent::FileAdded {
            file: descriptor.clone(),
        });

        Ok(descriptor)
    }

    fn check(&self, file: &SelectedFile) -> AdmissionResult<FileDescriptor> {
        if let Some(max) = self.max_files {
            if self.sessions.len() >= max {
                return Err(AdmissionError::TooManyFiles { max });
            }
        }

        let descriptor = FileDescriptor::from_selected(file);

        if !self.type_allowed(&descriptor) {
            return Err(AdmissionError::InvalidType {
                file_name: descriptor.name,
                file_type: descriptor.file_type,
            });
        }

        if descriptor.size_bytes > self.max_file_size {
            match self.oversize_policy {
                OversizePolicy::Reject => {
                    return Err(AdmissionError::OversizedFile {
                        file_name: descriptor.name,
                        size: descriptor.size_bytes,
                        max: self.max_file_size,
                    });
                }
                OversizePolicy::Allow => {
                    tracing::debug!(
                        file_id = %descriptor.file_id,
                        "admitting file over max_file_size"
                    );
                }
            }
        }

        if self.by_id.contains_key(&descriptor.file_id) {
            return Err(AdmissionError::Duplicate {
                file_id: descriptor.file_id,
            });
        }

        Ok(descriptor)
    }

    fn type_allowed(&self, descriptor: &FileDescriptor) -> bool {
        let Some(allowed) = &self.filetypes else {
            return true;
        };

        let by_extension = allowed.iter().any(|t| *t == descriptor.file_type);
        let by_mime = descriptor
            .mime_type
            .as_ref()
            .map(|mime| mime.to_lowercase())
            .is_some_and(|mime| allowed.contains(&mime));

        by_extension || by_mime
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn position(&self, file_id: &str) -> Option<usize> {
        self.by_id.get(file_id).copied()
    }

    pub fn get(&self, file_id: &str) -> Option<&FileSession> {
        self.position(file_id).map(|i| &self.sessions[i])
    }

    pub fn session_at(&self, position: usize) -> Option<&FileSession> {
        self.sessions.get(position)
    }

    pub fn session_at_mut(&mut self, position: usize) -> Option<&mut FileSession> {
        self.sessions.get_mut(position)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &FileSession> {
        self.sessions.iter()
    }

    /// Record the server-assigned name of a completed file
    pub fn record_file_name(&mut self, name: String) {
        self.file_names.push(name);
    }

    /// Server-assigned names of completed files, in completion order
    pub fn file_names(&self) -> Vec<String> {
        self.file_names.clone()
    }

    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.sessions.iter().map(FileSession::summary).collect()
    }

    /// Size-weighted progress over every admitted file
    pub fn batch_progress(&self) -> f64 {
        if self.sessions.is_empty() {
            return 0.0;
        }

        let total_bytes: u64 = self.sessions.iter().map(|s| s.descriptor().size_bytes).sum();
        if total_bytes == 0 {
            let done: f64 = self.sessions.iter().map(FileSession::progress).sum();
            return done / self.sessions.len() as f64;
        }

        let acknowledged: u64 = self
            .sessions
            .iter()
            .map(FileSession::acknowledged_bytes)
            .sum();
        acknowledged as f64 / total_bytes as f64
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
        self.by_id.clear();
        self.file_names.clear();
    }
}
