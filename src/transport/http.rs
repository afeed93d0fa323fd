use crate::config::UploadConfig;
use crate::transport::error::{TransferError, TransferResult};
use crate::transport::types::{ChunkOutcome, ChunkParams, ProbeOutcome};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::Url;

/// Moves one chunk to the server.
///
/// Implementations never fail with an error: every failure is folded into
/// a [`ChunkOutcome`] so the scheduler only ever routes outcomes.
#[async_trait]
pub trait ChunkTransport: Send + Sync {
    async fn send(&self, params: &ChunkParams, data: Bytes) -> ChunkOutcome;

    /// Ask whether the server already holds this chunk
    async fn probe(&self, _params: &ChunkParams) -> ProbeOutcome {
        ProbeOutcome::Absent
    }
}

/// `reqwest`-backed transport speaking the resumable form protocol
pub struct HttpTransport {
    http: reqwest::Client,
    target: Url,
    file_parameter_name: String,
    query: Vec<(String, String)>,
    permanent_errors: Vec<u16>,
}

impl HttpTransport {
    pub fn new(config: &UploadConfig) -> TransferResult<Self> {
        let target = Url::parse(&config.target)
            .map_err(|e| TransferError::InvalidTarget(format!("{}: {e}", config.target)))?;
        if !matches!(target.scheme(), "http" | "https") {
            return Err(TransferError::InvalidTarget(format!(
                "{}: unsupported scheme {}",
                config.target,
                target.scheme()
            )));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| TransferError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| TransferError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            target,
            file_parameter_name: config.file_parameter_name.clone(),
            query: config
                .query
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            permanent_errors: config.permanent_errors.clone(),
        })
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    fn build_form(&self, params: &ChunkParams, data: Bytes) -> TransferResult<Form> {
        let mut form = Form::new();
        for (name, value) in params.form_fields() {
            form = form.text(name, value);
        }
        for (name, value) in &self.query {
            form = form.text(name.clone(), value.clone());
        }

        let part = Part::bytes(data.to_vec())
            .file_name(params.filename.clone())
            .mime_str("application/octet-stream")?;
        Ok(form.part(self.file_parameter_name.clone(), part))
    }

    async fn classify(&self, response: reqwest::Response) -> ChunkOutcome {
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return TransferError::from(e).into(),
        };

        if status.is_success() {
            return ChunkOutcome::Acknowledged(body);
        }

        let status = status.as_u16();
        let err = if self.permanent_errors.contains(&status) {
            TransferError::Rejected { status, body }
        } else {
            TransferError::Unavailable { status, body }
        };
        err.into()
    }
}

#[async_trait]
impl ChunkTransport for HttpTransport {
    async fn send(&self, params: &ChunkParams, data: Bytes) -> ChunkOutcome {
        let form = match self.build_form(params, data) {
            Ok(form) => form,
            Err(e) => return e.into(),
        };

        match self
            .http
            .post(self.target.clone())
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => self.classify(response).await,
            Err(e) => TransferError::from(e).into(),
        }
    }

    async fn probe(&self, params: &ChunkParams) -> ProbeOutcome {
        let mut query: Vec<(String, String)> = params
            .form_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        query.extend(self.query.iter().cloned());

        match self.http.get(self.target.clone()).query(&query).send().await {
            Ok(response) if response.status().is_success() => {
                ProbeOutcome::Present(response.text().await.unwrap_or_default())
            }
            Ok(_) => ProbeOutcome::Absent,
            Err(e) => {
                tracing::debug!(
                    identifier = %params.identifier,
                    chunk = params.chunk_number,
                    "chunk probe failed, sending anyway: {}",
                    e
                );
                ProbeOutcome::Absent
            }
        }
    }
}
