use tracing::{info, warn};

use super::models::{PollMode, VideoRequest};
use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::jobs::normalize::{normalize_output, output_section};
use crate::jobs::status::{StatusClass, StatusFetchError};
use crate::jobs::{
    poll_until_terminal, HttpStatusFetcher, Job, JobError, JobKind, JobResult, MultipartPayload,
    Payload, ProviderOutput, ResultKind, StatusFetcher, Submission, Submit, PREDICTION_STATUS,
};

/// Result of a video submission
#[derive(Debug)]
pub enum VideoOutcome {
    Completed(JobResult),
    /// Job accepted; the caller polls with the job id
    Submitted(Job),
}

/// Result of one client-driven status check
#[derive(Debug, PartialEq)]
pub enum VideoStatus {
    Completed(Vec<String>),
    Failed(String),
    Processing(Option<String>),
    Error(StatusFetchError),
}

/// Submit a motion-control video job
///
/// # Business Logic
/// - Checks the provider credential before any network call
/// - Forwards image and video as multipart parts with their filenames
/// - Synchronous provider answers are normalized directly
/// - Job ids are polled here (server mode) or handed back (client mode)
pub async fn generate_video(state: &AppState, request: VideoRequest) -> Result<VideoOutcome, ApiError> {
    let settings = &state.config().video;
    let credential = settings.credential()?;
    let client = state.client().await?;

    let endpoint = settings.predictions_url(&request.model_id);
    let mode = request.mode;
    info!(
        "Service: Submitting video job with model={}, mode={:?}",
        request.model_id, mode
    );

    let mut payload = MultipartPayload::new()
        .text("model", request.model_id.as_str())
        .text("character_orientation", request.orientation.as_str())
        .text("keep_original_sound", request.keep_original_sound.to_string());
    if let Some(prompt) = &request.prompt {
        payload = payload.text("prompt", prompt.as_str());
    }
    let payload = payload
        .attachment("image", request.image)
        .attachment("video", request.video);

    let submission = client
        .submit(
            Submit {
                endpoint: &endpoint,
                credential: Some(credential),
                payload: Payload::Multipart(payload),
                sync_wait: false,
            },
            &PREDICTION_STATUS,
        )
        .await?;

    let job_id = match submission {
        Submission::Immediate(ProviderOutput::Json(body)) => {
            let result = normalize_output(output_section(&body), ResultKind::VideoUrls)?;
            return Ok(VideoOutcome::Completed(result));
        }
        Submission::Immediate(ProviderOutput::Binary(video)) => {
            let result = JobResult::new(ResultKind::VideoUrls, vec![video.to_data_url()])
                .ok_or(JobError::UnrecognizedResponse)?;
            return Ok(VideoOutcome::Completed(result));
        }
        Submission::Pending(job_id) => job_id,
    };

    let mut job = Job::new(job_id, JobKind::VideoGeneration);
    info!("Service: Video job {} accepted by provider", job.job_id());

    if mode == PollMode::Client {
        return Ok(VideoOutcome::Submitted(job));
    }

    let fetcher = HttpStatusFetcher::new(client.clone(), settings.status_base(), credential);
    let outcome = poll_until_terminal(
        &mut job,
        &fetcher,
        &PREDICTION_STATUS,
        state.config().video_poll,
        &state.request_token(),
    )
    .await;
    let body = outcome.into_result(&job)?;

    let result = normalize_output(output_section(&body), ResultKind::VideoUrls)?;
    info!(
        "Service: Video job {} finished with {} video(s) after {} check(s)",
        job.job_id(),
        result.payload().len(),
        job.attempts()
    );
    Ok(VideoOutcome::Completed(result))
}

/// One status check for client-driven polling
pub async fn check_video_status(state: &AppState, job_id: &str) -> Result<VideoStatus, ApiError> {
    let settings = &state.config().video;
    let credential = settings.credential()?;
    let client = state.client().await?;

    let fetcher = HttpStatusFetcher::new(client.clone(), settings.status_base(), credential);
    let body = match fetcher.fetch_status(job_id).await {
        Ok(body) => body,
        Err(e) => {
            warn!("Service: Status check for video job {} failed: {}", job_id, e);
            return Ok(VideoStatus::Error(e));
        }
    };

    let status = match PREDICTION_STATUS.classify(&body) {
        StatusClass::Completed => match normalize_output(output_section(&body), ResultKind::VideoUrls) {
            Ok(result) => VideoStatus::Completed(result.into_payload()),
            Err(e) => VideoStatus::Error(StatusFetchError {
                status: None,
                message: e.to_string(),
            }),
        },
        StatusClass::Failed(message) => VideoStatus::Failed(message),
        StatusClass::Processing { status, recognized } => {
            if !recognized {
                warn!(
                    "Service: Video job {} reported unrecognized status {:?}",
                    job_id, status
                );
            }
            VideoStatus::Processing(status)
        }
    };
    Ok(status)
}
