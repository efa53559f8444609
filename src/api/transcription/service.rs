use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::models::TranscriptionRequest;
use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::jobs::client::job_id_of;
use crate::jobs::normalize::{extract_transcript, normalize_transcript};
use crate::jobs::status::StatusClass;
use crate::jobs::{
    poll_until_terminal, HttpStatusFetcher, Job, JobError, JobKind, JobResult, Payload,
    ProviderOutput, RemoteJobClient, Submission, Submit, PREDICTION_STATUS,
};

/// Transcribe (or translate) one audio upload
///
/// # Business Logic
/// - Checks the provider credential before any network call
/// - Sends the audio as a data URL and asks the provider to wait
/// - A transcript in the first answer is returned as is
/// - A job id without a transcript is polled until terminal
///
/// # Returns
/// - `Ok(JobResult)` - a `Text` result holding the transcript
/// - `Err(ApiError)` - config, submission, polling or extraction failure
pub async fn transcribe(state: &AppState, request: TranscriptionRequest) -> Result<JobResult, ApiError> {
    let settings = &state.config().transcription;
    let credential = settings.credential()?;
    let model = settings
        .default_model()
        .ok_or_else(|| JobError::Config("TRANSCRIPTION_MODEL is not configured".to_string()))?;
    let client = state.client().await?;

    let endpoint = settings.predictions_url(model);
    info!(
        "Service: Transcribing {} bytes of {} with model={}, task={}",
        request.audio.len(),
        request.audio.content_type(),
        model,
        request.task()
    );

    let submission = client
        .submit(
            Submit {
                endpoint: &endpoint,
                credential: Some(credential),
                payload: Payload::Json(build_payload(&request)),
                sync_wait: true,
            },
            &PREDICTION_STATUS,
        )
        .await?;

    let job_id = match submission {
        Submission::Immediate(ProviderOutput::Json(body)) => {
            if let Some(text) = extract_transcript(&body) {
                return Ok(JobResult::text(text).ok_or(JobError::NoTranscriptionFound)?);
            }
            match (PREDICTION_STATUS.classify(&body), job_id_of(&body)) {
                (StatusClass::Failed(message), _) => return Err(JobError::ProviderFailure(message).into()),
                (StatusClass::Processing { .. }, Some(job_id)) => job_id,
                _ => return Err(JobError::NoTranscriptionFound.into()),
            }
        }
        Submission::Immediate(ProviderOutput::Binary(output)) => {
            return Err(JobError::UnexpectedResponse(format!(
                "provider answered with {} instead of a transcript",
                output.content_type()
            ))
            .into());
        }
        Submission::Pending(job_id) => job_id,
    };

    poll_transcription(state, client, credential, job_id).await
}

async fn poll_transcription(
    state: &AppState,
    client: &RemoteJobClient,
    credential: &str,
    job_id: String,
) -> Result<JobResult, ApiError> {
    let mut job = Job::new(job_id, JobKind::Transcription);
    info!("Service: Transcription job {} still running, polling", job.job_id());

    let fetcher = HttpStatusFetcher::new(
        client.clone(),
        state.config().transcription.status_base(),
        credential,
    );
    let outcome = poll_until_terminal(
        &mut job,
        &fetcher,
        &PREDICTION_STATUS,
        state.config().transcription_poll,
        &state.request_token(),
    )
    .await;
    let body = outcome.into_result(&job)?;

    normalize_transcript(&body).map_err(|e| {
        warn!(
            "Service: Transcription job {} ended in state {:?} without a transcript",
            job.job_id(),
            job.state()
        );
        e.into()
    })
}

fn build_payload(request: &TranscriptionRequest) -> Value {
    let mut input = Map::new();
    input.insert("audio".to_string(), json!(request.audio.to_data_url()));
    input.insert("task".to_string(), json!(request.task()));
    input.insert("translate".to_string(), json!(request.translate));
    if let Some(language) = &request.language {
        input.insert("language".to_string(), json!(language));
    }
    json!({ "input": input })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::Attachment;

    #[test]
    fn payload_carries_the_audio_as_a_data_url() {
        let request = TranscriptionRequest {
            audio: Attachment::new(None, Some("audio/webm".to_string()), vec![1, 2, 3]),
            translate: false,
            language: Some("fr".to_string()),
        };
        assert_eq!(
            build_payload(&request),
            json!({"input": {
                "audio": "data:audio/webm;base64,AQID",
                "task": "transcribe",
                "translate": false,
                "language": "fr"
            }})
        );
    }

    #[test]
    fn language_is_omitted_when_absent() {
        let request = TranscriptionRequest {
            audio: Attachment::new(None, Some("audio/wav".to_string()), vec![0]),
            translate: true,
            language: None,
        };
        let payload = build_payload(&request);
        assert!(payload["input"].get("language").is_none());
        assert_eq!(payload["input"]["task"], "translate");
    }
}
