use chrono::{DateTime, Utc};
use serde::Serialize;

/// Kind of asynchronous work tracked at an external provider
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    VideoGeneration,
    Transcription,
}

/// Job state. Completed, Failed, TimedOut and PollError are terminal.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
    TimedOut,
    PollError,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::TimedOut | JobState::PollError
        )
    }
}

/// One outstanding unit of work, identified by the provider-issued job id
///
/// Jobs only live for the request (or client polling session) that created
/// them; nothing here is persisted.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    job_id: String,
    kind: JobKind,
    submitted_at: DateTime<Utc>,
    attempts: u32,
    state: JobState,
}

impl Job {
    pub fn new(job_id: impl Into<String>, kind: JobKind) -> Self {
        Self {
            job_id: job_id.into(),
            kind,
            submitted_at: Utc::now(),
            attempts: 0,
            state: JobState::Pending,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub(crate) fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Move the job to `next`. Returns false when the transition is refused:
    /// terminal states are sticky and nothing goes back to Pending.
    pub(crate) fn advance(&mut self, next: JobState) -> bool {
        if self.state.is_terminal() || next == JobState::Pending || self.state == next {
            return false;
        }
        self.state = next;
        true
    }
}

/// What a normalized result carries
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ResultKind {
    ImageUrls,
    VideoUrls,
    Text,
}

/// Normalized output of a completed job. The payload is never empty.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct JobResult {
    kind: ResultKind,
    payload: Vec<String>,
}

impl JobResult {
    pub fn new(kind: ResultKind, payload: Vec<String>) -> Option<Self> {
        if payload.is_empty() {
            return None;
        }
        Some(Self { kind, payload })
    }

    pub fn text(transcript: impl Into<String>) -> Option<Self> {
        let transcript = transcript.into();
        if transcript.trim().is_empty() {
            return None;
        }
        Some(Self {
            kind: ResultKind::Text,
            payload: vec![transcript],
        })
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    pub fn payload(&self) -> &[String] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<String> {
        self.payload
    }

    /// The transcript of a text result, or the first URL otherwise
    pub fn into_first(self) -> String {
        self.payload.into_iter().next().unwrap_or_default()
    }
}
