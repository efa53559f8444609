use actix_web::{
    post,
    web::{scope, Data, ServiceConfig},
    HttpResponse,
};
use actix_web_validator::Json;
use tracing::info;

use super::models::{ContactMessage, ContactResponse};
use super::service;
use crate::api::error::ApiError;
use crate::api::state::AppState;

#[post("")]
async fn submit_contact(state: Data<AppState>, message: Json<ContactMessage>) -> Result<HttpResponse, ApiError> {
    info!("Contact message received from {}", message.email);

    let message_id = service::send_contact_message(&state, &message).await?;
    Ok(HttpResponse::Ok().json(ContactResponse {
        success: true,
        message_id,
    }))
}

pub fn contact_config(config: &mut ServiceConfig) {
    config.service(scope("/api/contact").service(submit_contact));
}
