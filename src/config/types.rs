use crate::config::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// What admission does with a file larger than `max_file_size`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OversizePolicy {
    #[default]
    Reject,
    Allow,
}

/// Upload engine configuration.
///
/// Keys deserialize in camelCase so a host can pass the same option object
/// it hands to its upload widget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UploadConfig {
    #[serde(alias = "service")]
    pub target: String,
    pub filetypes: Option<Vec<String>>,
    pub max_files: Option<usize>,
    pub max_file_size: u64,
    pub oversize_policy: OversizePolicy,
    pub chunk_size: u64,
    pub simultaneous_uploads: usize,
    pub disable_drag_and_drop: bool,
    pub file_name_server_field: Option<String>,
    pub max_chunk_retries: u32,
    pub chunk_retry_interval_ms: u64,
    pub test_chunks: bool,
    pub request_timeout_ms: Option<u64>,
    pub file_parameter_name: String,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub permanent_errors: Vec<u16>,
    pub auto_start: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            target: "/upload".into(),
            filetypes: None,
            max_files: Some(1),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            oversize_policy: OversizePolicy::Reject,
            chunk_size: DEFAULT_CHUNK_SIZE,
            simultaneous_uploads: 1,
            disable_drag_and_drop: false,
            file_name_server_field: None,
            max_chunk_retries: 0,
            chunk_retry_interval_ms: 500,
            test_chunks: false,
            request_timeout_ms: None,
            file_parameter_name: "file".into(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            permanent_errors: vec![400, 404, 409, 415, 500, 501],
            auto_start: true,
        }
    }
}

impl UploadConfig {
    /// Config pointing at `target` with every other option at its default
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    /// Parse and validate a JSON option object
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: UploadConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }
        if self.simultaneous_uploads == 0 {
            return Err(ConfigError::InvalidConcurrency(self.simultaneous_uploads));
        }
        if self.max_files == Some(0) {
            return Err(ConfigError::InvalidMaxFiles(0));
        }
        if self.target.trim().is_empty() {
            return Err(ConfigError::EmptyTarget);
        }
        if let Some((scheme, _)) = self.target.split_once("://") {
            if !matches!(scheme.to_ascii_lowercase().as_str(), "http" | "https") {
                return Err(ConfigError::InvalidTarget(self.target.clone()));
            }
        }
        Ok(())
    }

    /// Delay before the first retry of a failed chunk
    pub fn chunk_retry_interval(&self) -> Duration {
        Duration::from_millis(self.chunk_retry_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Whether `status` is in the non-retriable set
    pub fn is_permanent_error(&self, status: u16) -> bool {
        self.permanent_errors.contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_host_component() {
        let config = UploadConfig::default();
        assert_eq!(config.target, "/upload");
        assert_eq!(config.max_files, Some(1));
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.chunk_size, 1024 * 1024);
        assert_eq!(config.simultaneous_uploads, 1);
        assert_eq!(config.max_chunk_retries, 0);
        assert!(!config.test_chunks);
        assert!(!config.disable_drag_and_drop);
        assert!(config.auto_start);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_camel_case() {
        let json = r#"{
            "service": "http://localhost:8050/upload_resumable",
            "filetypes": ["csv"],
            "maxFiles": 3,
            "maxFileSize": 524288000,
            "chunkSize": 2048,
            "simultaneousUploads": 4,
            "fileNameServerField": "name",
            "maxChunkRetries": 2
        }"#;

        let config = UploadConfig::from_json(json).unwrap();
        assert_eq!(config.target, "http://localhost:8050/upload_resumable");
        assert_eq!(config.filetypes, Some(vec!["csv".to_string()]));
        assert_eq!(config.max_files, Some(3));
        assert_eq!(config.max_file_size, 524_288_000);
        assert_eq!(config.chunk_size, 2048);
        assert_eq!(config.simultaneous_uploads, 4);
        assert_eq!(config.file_name_server_field.as_deref(), Some("name"));
        assert_eq!(config.max_chunk_retries, 2);
        // Unspecified keys keep their defaults
        assert_eq!(config.file_parameter_name, "file");
        assert_eq!(config.oversize_policy, OversizePolicy::Reject);
    }

    #[test]
    fn test_unlimited_max_files() {
        let config = UploadConfig::from_json(r#"{"maxFiles": null}"#).unwrap();
        assert_eq!(config.max_files, None);
    }

    #[test]
    fn test_oversize_policy_parsing() {
        let config = UploadConfig::from_json(r#"{"oversizePolicy": "allow"}"#).unwrap();
        assert_eq!(config.oversize_policy, OversizePolicy::Allow);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = UploadConfig::default();
        config.chunk_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidChunkSize(0))
        ));

        let mut config = UploadConfig::default();
        config.simultaneous_uploads = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConcurrency(0))
        ));

        let mut config = UploadConfig::default();
        config.max_files = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMaxFiles(0))
        ));

        let config = UploadConfig::new("  ");
        assert!(matches!(config.validate(), Err(ConfigError::EmptyTarget)));

        let config = UploadConfig::new("ftp://example.com/upload");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTarget(_))));
        assert!(UploadConfig::new("HTTPS://example.com/upload").validate().is_ok());
    }

    #[test]
    fn test_malformed_json() {
        let result = UploadConfig::from_json("{ not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_permanent_errors() {
        let config = UploadConfig::default();
        assert!(config.is_permanent_error(415));
        assert!(config.is_permanent_error(500));
        assert!(!config.is_permanent_error(503));
        assert!(!config.is_permanent_error(429));
    }
}
