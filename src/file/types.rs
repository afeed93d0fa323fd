use crate::file::source::{ChunkSource, DiskSource, MemorySource};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Identity and shape of an admitted file; immutable after admission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileDescriptor {
    pub file_id: String,
    pub name: String,
    pub relative_path: String,
    pub size_bytes: u64,
    /// Lower-cased extension without the dot, empty when there is none
    pub file_type: String,
    pub mime_type: Option<String>,
    pub added_at: i64,
}

impl FileDescriptor {
    pub fn from_selected(file: &SelectedFile) -> Self {
        let relative_path = file
            .relative_path
            .clone()
            .unwrap_or_else(|| file.name.clone());

        Self {
            file_id: file_identifier(file.size, &relative_path),
            name: file.name.clone(),
            relative_path,
            size_bytes: file.size,
            file_type: file.extension(),
            mime_type: file.mime_type.clone(),
            added_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Resumable-style identifier: `{size}-{path stripped to [0-9A-Za-z_-]}`
pub fn file_identifier(size: u64, relative_path: &str) -> String {
    let cleaned: String = relative_path
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    format!("{size}-{cleaned}")
}

/// A file handed over by an input or drop handle, not yet admitted
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub relative_path: Option<String>,
    pub size: u64,
    pub mime_type: Option<String>,
    pub source: Arc<dyn ChunkSource>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, size: u64, source: Arc<dyn ChunkSource>) -> Self {
        Self {
            name: name.into(),
            relative_path: None,
            size,
            mime_type: None,
            source,
        }
    }

    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let source = MemorySource::new(data);
        let size = source.len();
        Self::new(name, size, Arc::new(source))
    }

    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Ok(Self::new(
            name,
            metadata.len(),
            Arc::new(DiskSource::new(path)),
        ))
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_relative_path(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = Some(relative_path.into());
        self
    }

    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}
