use serde::{Deserialize, Serialize};
use validator::Validate;

/// Message submitted through the contact form
#[derive(Deserialize, Serialize, Debug, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    #[validate(length(min = 1, max = 200, message = "Full name must be between 1 and 200 characters"))]
    pub full_name: String,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 5000, message = "Details must be between 1 and 5000 characters"))]
    pub details: String,
}

impl ContactMessage {
    pub fn subject(&self) -> String {
        format!("New contact request from {}", self.full_name.trim())
    }

    pub fn body(&self) -> String {
        format!(
            "Name: {}\nEmail: {}\n\n{}",
            self.full_name.trim(),
            self.email.trim(),
            self.details.trim()
        )
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub success: bool,
    pub message_id: String,
}
