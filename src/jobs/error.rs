use thiserror::Error;

/// Failures of the submit / poll / normalize pipeline
#[derive(Debug, Error)]
pub enum JobError {
    /// Required credential or configuration value is absent
    #[error("{0}")]
    Config(String),

    /// Transport failure or non-2xx on the initial submission
    #[error("submission failed: {message}")]
    Submission { status: Option<u16>, message: String },

    /// 2xx submission response carrying neither a result nor a job id
    #[error("unexpected provider response: {0}")]
    UnexpectedResponse(String),

    /// Transport failure or non-2xx while checking job status
    #[error("status check failed: {message}")]
    Poll { status: Option<u16>, message: String },

    /// Provider answered 2xx but declared the job failed
    #[error("{0}")]
    ProviderFailure(String),

    #[error("job {job_id} still processing after {attempts} status checks")]
    TimedOut { job_id: String, attempts: u32 },

    #[error("provider response did not contain any recognizable output")]
    UnrecognizedResponse,

    #[error("no transcription found in provider response")]
    NoTranscriptionFound,

    #[error("request cancelled before the job finished")]
    Cancelled,
}

impl JobError {
    /// Stable identifier reported to callers alongside the message
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Config(_) => "config-error",
            JobError::Submission { .. } => "submission-error",
            JobError::UnexpectedResponse(_) => "unexpected-response",
            JobError::Poll { .. } => "poll-error",
            JobError::ProviderFailure(_) => "provider-failure",
            JobError::TimedOut { .. } => "timed-out",
            JobError::UnrecognizedResponse => "unrecognized-response",
            JobError::NoTranscriptionFound => "no-transcription-found",
            JobError::Cancelled => "cancelled",
        }
    }

    pub fn missing_credential(variable: &str) -> Self {
        JobError::Config(format!("{variable} is not configured"))
    }
}
