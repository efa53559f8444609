use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::models::{ImageRequest, OutputFormat};
use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::jobs::normalize::{normalize_output, output_section};
use crate::jobs::{
    JobError, JobResult, Payload, ProviderOutput, ResultKind, Submission, Submit, PREDICTION_STATUS,
};

/// Synchronous image generation
///
/// # Business Logic
/// - Checks the provider credential before any network call
/// - Sends reference images as data URLs (the provider only accepts JSON)
/// - Asks the provider to answer within the request (`Prefer: wait`)
/// - Re-encodes binary or inline base64 images as data URLs
///
/// # Returns
/// - `Ok(JobResult)` - one or more image URLs
/// - `Err(ApiError)` - config, submission or normalization failure
pub async fn generate_image(state: &AppState, request: ImageRequest) -> Result<JobResult, ApiError> {
    let settings = &state.config().image;
    let credential = settings.credential()?;
    let client = state.client().await?;

    let endpoint = settings.predictions_url(&request.model_id);
    let output_format = request.output_format;
    info!(
        "Service: Generating image with model={}, references={}",
        request.model_id,
        request.reference_images.len()
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

    let result = match submission {
        Submission::Immediate(ProviderOutput::Binary(image)) => {
            JobResult::new(ResultKind::ImageUrls, vec![image.to_data_url()])
                .ok_or(JobError::UnrecognizedResponse)?
        }
        Submission::Immediate(ProviderOutput::Json(body)) => {
            let body = inline_images_as_data_urls(body, output_format);
            normalize_output(output_section(&body), ResultKind::ImageUrls)?
        }
        Submission::Pending(job_id) => {
            warn!("Service: Image provider queued job {} instead of answering", job_id);
            return Err(JobError::UnexpectedResponse(format!(
                "provider queued job {job_id} instead of returning images"
            ))
            .into());
        }
    };

    info!("Service: Image generation returned {} image(s)", result.payload().len());
    Ok(result)
}

fn build_payload(request: &ImageRequest) -> Value {
    let mut input = Map::new();
    input.insert("prompt".to_string(), json!(request.prompt));
    input.insert("quality".to_string(), json!(request.quality));
    input.insert("aspect_ratio".to_string(), json!(request.aspect_ratio));
    input.insert("output_format".to_string(), json!(request.output_format));
    if let Some(style_preset) = &request.style_preset {
        input.insert("style_preset".to_string(), json!(style_preset));
    }
    if !request.reference_images.is_empty() {
        let images: Vec<String> = request
            .reference_images
            .iter()
            .map(|image| image.to_data_url())
            .collect();
        input.insert("input_images".to_string(), json!(images));
    }
    json!({ "input": input })
}

/// `data: [{"b64_json": ..}]` -> `data: ["data:image/..;base64,.."]`
fn inline_images_as_data_urls(mut body: Value, format: OutputFormat) -> Value {
    if let Some(items) = body.get_mut("data").and_then(Value::as_array_mut) {
        for item in items.iter_mut() {
            let url = item
                .get("b64_json")
                .and_then(Value::as_str)
                .map(|encoded| format!("data:{};base64,{}", format.mime_type(), encoded));
            if let Some(url) = url {
                *item = Value::String(url);
            }
        }
    }
    body
}
