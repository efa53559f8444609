use actix_multipart::Multipart;
use actix_web::{
    post,
    web::{scope, Data, ServiceConfig},
    HttpResponse,
};
use tracing::info;

use super::models::{ImageRequest, ImageResponse};
use super::service;
use crate::api::error::ApiError;
use crate::api::form::FormData;
use crate::api::state::AppState;

#[post("")]
async fn generate_image(state: Data<AppState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    let config = state.config();
    let mut form = FormData::from_multipart(payload, config.max_payload_size).await?;
    let request = ImageRequest::from_form(&mut form, &config.image, config.max_reference_images)?;
    info!("Image generation requested: model={}", request.model_id);

    let result = service::generate_image(&state, request).await?;
    Ok(HttpResponse::Ok().json(ImageResponse {
        images: result.into_payload(),
    }))
}

pub fn image_config(config: &mut ServiceConfig) {
    config.service(scope("/api/generate").service(generate_image));
}
