use actix_multipart::Multipart;
use actix_web::{
    post,
    web::{scope, Data, ServiceConfig},
    HttpResponse,
};
use tracing::info;

use super::models::{TranscriptionRequest, TranscriptionResponse};
use super::service;
use crate::api::error::ApiError;
use crate::api::form::FormData;
use crate::api::state::AppState;

#[post("")]
async fn transcribe(state: Data<AppState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    let config = state.config();
    let mut form = FormData::from_multipart(payload, config.max_payload_size).await?;
    let request = TranscriptionRequest::from_form(&mut form)?;
    info!("Transcription requested: {} bytes, translate={}", request.audio.len(), request.translate);

    let result = service::transcribe(&state, request).await?;
    Ok(HttpResponse::Ok().json(TranscriptionResponse {
        text: result.into_first(),
    }))
}

pub fn transcription_config(config: &mut ServiceConfig) {
    config.service(scope("/api/transcribe").service(transcribe));
}
