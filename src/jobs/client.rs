use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::attachment::Attachment;
use super::error::JobError;
use super::status::StatusVocabulary;
use crate::config::HttpSettings;

/// Multipart text part announcing how many file parts were sent
pub const ATTACHMENT_COUNT_FIELD: &str = "attachmentCount";

/// Fields whose presence (non-null) marks a body as an immediate result
const RESULT_FIELDS: &[&str] = &[
    "output",
    "outputs",
    "images",
    "imageUrl",
    "image",
    "data",
    "videoUrls",
    "text",
    "transcription",
];

const JOB_ID_FIELDS: &[&str] = &["id", "jobId", "job_id", "requestId", "request_id"];

static SHARED_CLIENT: OnceCell<RemoteJobClient> = OnceCell::const_new();

/// Request body sent to a provider
#[derive(Debug)]
pub enum Payload {
    Json(Value),
    Multipart(MultipartPayload),
}

/// Multipart body builder. File parts keep their filename and content type.
#[derive(Debug, Default)]
pub struct MultipartPayload {
    texts: Vec<(String, String)>,
    files: Vec<(String, Attachment)>,
}

impl MultipartPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.texts.push((name.into(), value.into()));
        self
    }

    pub fn attachment(mut self, name: impl Into<String>, attachment: Attachment) -> Self {
        self.files.push((name.into(), attachment));
        self
    }

    pub fn attachment_count(&self) -> usize {
        self.files.len()
    }

    fn into_form(self) -> Result<Form, JobError> {
        let count = self.files.len();
        let mut form = Form::new();

        for (name, value) in self.texts {
            form = form.text(name, value);
        }

        for (name, attachment) in self.files {
            let (filename, content_type, data) = attachment.into_parts();
            let mut part = Part::bytes(data).mime_str(&content_type).map_err(|e| JobError::Submission {
                status: None,
                message: format!("invalid content type '{content_type}' for part '{name}': {e}"),
            })?;
            if let Some(filename) = filename {
                part = part.file_name(filename);
            }
            form = form.part(name, part);
        }

        Ok(form.text(ATTACHMENT_COUNT_FIELD, count.to_string()))
    }
}

/// One submission call
#[derive(Debug)]
pub struct Submit<'a> {
    pub endpoint: &'a str,
    pub credential: Option<&'a str>,
    pub payload: Payload,
    /// Ask the provider to hold the connection until output is ready
    pub sync_wait: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutput {
    Json(Value),
    Binary(Attachment),
}

/// How the provider answered a submission
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Immediate(ProviderOutput),
    Pending(String),
}

/// HTTP client for external generation, transcription and email providers
#[derive(Debug, Clone)]
pub struct RemoteJobClient {
    http: reqwest::Client,
}

impl RemoteJobClient {
    pub fn new(settings: &HttpSettings) -> Result<Self, JobError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .user_agent(concat!("studio-proxy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| JobError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Process-wide client. Concurrent first callers share one initialization.
    pub async fn shared(settings: &HttpSettings) -> Result<&'static RemoteJobClient, JobError> {
        SHARED_CLIENT
            .get_or_try_init(|| async {
                let client = RemoteJobClient::new(settings)?;
                info!(
                    "Outbound HTTP client initialized (timeout={:?}, connect_timeout={:?})",
                    settings.request_timeout, settings.connect_timeout
                );
                Ok(client)
            })
            .await
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Submit a job and interpret the provider's immediate answer
    ///
    /// # Errors
    /// - `Config` - credential missing or blank (no request is made)
    /// - `Submission` - transport failure or non-2xx status
    /// - `ProviderFailure` - 2xx body whose status is a failed sentinel
    /// - `UnexpectedResponse` - neither a result nor a job id in the body
    pub async fn submit(
        &self,
        request: Submit<'_>,
        vocabulary: &StatusVocabulary,
    ) -> Result<Submission, JobError> {
        let credential = usable_credential(request.credential)?;

        let mut builder = self.http.post(request.endpoint).bearer_auth(credential);
        if request.sync_wait {
            builder = builder.header("Prefer", "wait");
        }
        builder = match request.payload {
            Payload::Json(body) => builder.json(&body),
            Payload::Multipart(form) => {
                debug!("Submitting {} attachment(s) as multipart", form.attachment_count());
                builder.multipart(form.into_form()?)
            }
        };

        info!("Submitting job to {}", request.endpoint);
        let (content_type, bytes) = send(builder).await?;

        if let Some(content_type) = content_type.filter(|ct| is_media(ct)) {
            debug!("Provider answered with {} bytes of {}", bytes.len(), content_type);
            let attachment = Attachment::new(None, Some(content_type), bytes);
            return Ok(Submission::Immediate(ProviderOutput::Binary(attachment)));
        }

        let body: Value = serde_json::from_slice(&bytes)
            .map_err(|e| JobError::UnexpectedResponse(format!("response body is not JSON: {e}")))?;
        interpret(body, vocabulary)
    }

    /// Plain JSON call for providers without a job model (email delivery)
    pub async fn post_json(
        &self,
        endpoint: &str,
        credential: Option<&str>,
        body: &Value,
    ) -> Result<Value, JobError> {
        let credential = usable_credential(credential)?;
        let builder = self.http.post(endpoint).bearer_auth(credential).json(body);

        let (_, bytes) = send(builder).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| JobError::UnexpectedResponse(format!("response body is not JSON: {e}")))
    }
}

fn usable_credential(credential: Option<&str>) -> Result<&str, JobError> {
    credential
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| JobError::Config("provider credential is not configured".to_string()))
}

/// Send the request; non-2xx becomes `Submission` with the provider's message
async fn send(builder: RequestBuilder) -> Result<(Option<String>, Vec<u8>), JobError> {
    let response = builder.send().await.map_err(|e| JobError::Submission {
        status: e.status().map(|s| s.as_u16()),
        message: format!("request failed: {e}"),
    })?;

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase());

    let bytes = response.bytes().await.map_err(|e| JobError::Submission {
        status: Some(status.as_u16()),
        message: format!("failed to read response body: {e}"),
    })?;

    if !status.is_success() {
        let message = serde_json::from_slice::<Value>(&bytes)
            .ok()
            .and_then(|body| provider_error_message(&body))
            .unwrap_or_else(|| format!("provider returned HTTP {}", status.as_u16()));
        warn!("Provider rejected submission with HTTP {}: {}", status.as_u16(), message);
        return Err(JobError::Submission {
            status: Some(status.as_u16()),
            message,
        });
    }

    Ok((content_type, bytes.to_vec()))
}

fn is_media(content_type: &str) -> bool {
    ["image/", "audio/", "video/"]
        .iter()
        .any(|prefix| content_type.starts_with(prefix))
}

/// Classify a 2xx JSON submission body
pub fn interpret(body: Value, vocabulary: &StatusVocabulary) -> Result<Submission, JobError> {
    if let Some(status) = vocabulary.status_of(&body) {
        if vocabulary.is_failed(status) {
            let message = provider_error_message(&body)
                .unwrap_or_else(|| format!("provider reported status '{status}'"));
            return Err(JobError::ProviderFailure(message));
        }
    }

    let has_result = body.is_array()
        || RESULT_FIELDS
            .iter()
            .any(|field| body.get(field).is_some_and(|v| !v.is_null()));
    if has_result {
        return Ok(Submission::Immediate(ProviderOutput::Json(body)));
    }

    match job_id_of(&body) {
        Some(job_id) => Ok(Submission::Pending(job_id)),
        None => Err(JobError::UnexpectedResponse(
            "neither a result nor a job identifier was found".to_string(),
        )),
    }
}

pub fn job_id_of(body: &Value) -> Option<String> {
    JOB_ID_FIELDS
        .iter()
        .filter_map(|field| body.get(field).and_then(Value::as_str))
        .map(str::trim)
        .find(|id| !id.is_empty())
        .map(str::to_string)
}

/// Best-effort error text from a provider body
pub(crate) fn provider_error_message(body: &Value) -> Option<String> {
    [
        body.get("error"),
        body.pointer("/error/message"),
        body.get("detail"),
        body.get("message"),
    ]
    .into_iter()
    .flatten()
    .filter_map(|v| v.as_str().map(str::trim).filter(|m| !m.is_empty()))
    .map(str::to_string)
    .next()
}
