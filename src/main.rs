//! Command-line uploader.
//!
//! Usage:
//!   resumable-upload --target http://localhost:8050/upload report.pdf photo.png
//!   resumable-upload --config upload.json --simultaneous 3 --test-chunks *.csv

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use futures::future::join_all;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use resumable_uploader::{SelectedFile, UploadConfig, UploadEvent, UploadScheduler};

#[derive(Parser, Debug)]
#[command(name = "resumable-upload", version, about = "Chunked resumable HTTP uploads")]
struct Args {
    /// Upload endpoint receiving the chunk POSTs
    #[arg(long)]
    target: Option<String>,

    /// JSON config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    chunk_size: Option<u64>,

    /// Chunk transfers allowed in flight at once
    #[arg(long)]
    simultaneous: Option<usize>,

    #[arg(long)]
    max_files: Option<usize>,

    #[arg(long)]
    max_file_size: Option<u64>,

    /// Accepted extension, repeatable
    #[arg(long = "filetype")]
    filetypes: Vec<String>,

    /// Retries per chunk after a transient failure
    #[arg(long)]
    retries: Option<u32>,

    /// Probe the server before sending each chunk
    #[arg(long)]
    test_chunks: bool,

    /// JSON field of the final response carrying the stored file name
    #[arg(long)]
    file_name_field: Option<String>,

    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl Args {
    async fn upload_config(&self) -> anyhow::Result<UploadConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                UploadConfig::from_json(&json)?
            }
            // No per-selection file limit on the command line
            None => UploadConfig {
                max_files: None,
                ..UploadConfig::default()
            },
        };

        if let Some(target) = &self.target {
            config.target = target.clone();
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(simultaneous) = self.simultaneous {
            config.simultaneous_uploads = simultaneous;
        }
        if let Some(max_files) = self.max_files {
            config.max_files = Some(max_files);
        }
        if let Some(max_file_size) = self.max_file_size {
            config.max_file_size = max_file_size;
        }
        if !self.filetypes.is_empty() {
            config.filetypes = Some(self.filetypes.clone());
        }
        if let Some(retries) = self.retries {
            config.max_chunk_retries = retries;
        }
        if self.test_chunks {
            config.test_chunks = true;
        }
        if let Some(field) = &self.file_name_field {
            config.file_name_server_field = Some(field.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut config = args.upload_config().await?;
    // Start only once every file is admitted so the admission order holds
    config.auto_start = false;

    let scheduler = UploadScheduler::with_http(config)?;
    let mut events = scheduler.subscribe();

    let selected = join_all(args.files.iter().map(SelectedFile::from_path)).await;

    let mut rejected = 0usize;
    for (path, file) in args.files.iter().zip(selected) {
        let file = match file {
            Ok(file) => file,
            Err(e) => {
                error!(path = %path.display(), "cannot open file: {}", e);
                rejected += 1;
                continue;
            }
        };
        if let Err(e) = scheduler.add_file(file) {
            warn!(path = %path.display(), "{}", e);
            rejected += 1;
        }
    }

    if scheduler.upload() == 0 {
        bail!("no file was admitted");
    }

    let mut failed = 0usize;
    let mut last_percent = None;
    while let Some(event) = events.recv().await {
        match event {
            UploadEvent::Progress { batch_fraction, .. } => {
                let percent = (batch_fraction * 100.0).floor() as u8;
                if last_percent != Some(percent) {
                    info!(percent, "uploading");
                    last_percent = Some(percent);
                }
            }
            UploadEvent::FileRetry {
                file_id,
                chunk_index,
                attempt,
            } => {
                warn!(file_id = %file_id, chunk = chunk_index, attempt, "retrying chunk");
            }
            UploadEvent::FileSuccess {
                file, file_name, ..
            } => {
                info!(file = %file.name, stored_as = %file_name, "uploaded");
            }
            UploadEvent::FileError {
                file,
                error_count,
                message,
            } => {
                error!(file = %file.name, error_count, "upload failed: {}", message);
                failed += 1;
            }
            UploadEvent::Complete => break,
            UploadEvent::FileAdded { .. } | UploadEvent::FileTypeRejected { .. } => {}
        }
    }
    scheduler.wait_until_idle().await;

    for name in scheduler.file_names() {
        println!("{name}");
    }

    if failed + rejected > 0 {
        bail!("{failed} file(s) failed, {rejected} file(s) rejected");
    }
    Ok(())
}
