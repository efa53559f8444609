use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;
use tracing::{error, warn};

use super::validation::{ErrorResponse, FieldErrors};
use crate::jobs::JobError;

/// Errors surfaced by the request router
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed caller input; never reaches the network
    #[error("{message}")]
    Validation { message: String, fields: FieldErrors },

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error(transparent)]
    Job(#[from] JobError),
}

impl ApiError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut fields = FieldErrors::new();
        fields.add(field, message.clone());
        ApiError::Validation { message, fields }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation-error",
            ApiError::UnknownModel(_) => "unknown-model",
            ApiError::Job(e) => e.kind(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::UnknownModel(_) => StatusCode::BAD_REQUEST,
            ApiError::Job(JobError::Poll {
                status: Some(status),
                ..
            }) if (400..=599).contains(status) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Job(JobError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Job(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_client_error() {
            warn!("Request rejected ({}): {}", self.kind(), self);
        } else {
            error!("Request failed ({}): {}", self.kind(), self);
        }

        let fields = match self {
            ApiError::Validation { fields, .. } => Some(fields.to_json()),
            _ => None,
        };
        HttpResponse::build(status).json(ErrorResponse {
            error: self.to_string(),
            kind: self.kind(),
            fields,
        })
    }
}
