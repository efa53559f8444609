use serde_json::json;
use tracing::info;

use super::models::ContactMessage;
use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::jobs::client::job_id_of;
use crate::jobs::JobError;

/// Forward a contact message to the email-delivery provider
///
/// # Returns
/// - `Ok(String)` - the provider's message id
/// - `Err(ApiError)` - missing email settings or delivery failure
pub async fn send_contact_message(state: &AppState, message: &ContactMessage) -> Result<String, ApiError> {
    let settings = &state.config().email;
    let credential = settings.credential()?;
    let recipient = settings.recipient()?;
    let client = state.client().await?;

    let endpoint = format!("{}/emails", settings.base_url.trim_end_matches('/'));
    let body = json!({
        "from": settings.from,
        "to": [recipient],
        "reply_to": message.email.trim(),
        "subject": message.subject(),
        "text": message.body(),
    });

    info!("Service: Delivering contact message to {}", endpoint);
    let response = client.post_json(&endpoint, Some(credential), &body).await?;

    let message_id = job_id_of(&response).ok_or_else(|| {
        JobError::UnexpectedResponse("email provider did not return a message id".to_string())
    })?;
    info!("Service: Contact message delivered as {}", message_id);
    Ok(message_id)
}
