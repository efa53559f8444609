use actix_web::HttpResponse;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;
use validator::ValidationErrors;

use super::error::ApiError;

/// JSON error body shared by every route
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<serde_json::Value>,
}

/// Per-field messages collected before rejecting a request
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn extend(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `{"<field>": {"errors": [..]}}`
    pub fn to_json(&self) -> serde_json::Value {
        let fields = self
            .0
            .iter()
            .map(|(field, messages)| (field.clone(), serde_json::json!({ "errors": messages })))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(fields)
    }

    /// Ok when nothing was collected, otherwise a validation error
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            return Ok(());
        }
        let message = self.summary();
        Err(ApiError::Validation {
            message,
            fields: self,
        })
    }

    fn summary(&self) -> String {
        self.0
            .values()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_else(|| "Validation failed".to_string())
    }
}

impl From<&ValidationErrors> for FieldErrors {
    fn from(validation_errors: &ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errors) in validation_errors.field_errors() {
            for e in errors {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Validation error in field: {}", field));
                fields.add(field.to_string(), message);
            }
        }
        fields
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(validation_errors: ValidationErrors) -> Self {
        let fields = FieldErrors::from(&validation_errors);
        let message = fields.summary();
        ApiError::Validation { message, fields }
    }
}

fn bad_request(error: &str, fields: serde_json::Value) -> actix_web::Error {
    let error_response = ErrorResponse {
        error: error.to_string(),
        kind: "validation-error",
        fields: Some(fields),
    };
    actix_web::error::InternalError::from_response("", HttpResponse::BadRequest().json(error_response)).into()
}

/// Creates a configured JsonConfig with standardized error handling for the entire project
pub fn json_config() -> actix_web_validator::JsonConfig {
    actix_web_validator::JsonConfig::default().error_handler(|err, _req| {
        let mut fields = serde_json::Map::new();

        match err {
            actix_web_validator::Error::Validate(validation_errors) => {
                let collected = FieldErrors::from(&validation_errors);
                warn!("Rejected JSON body: {:?}", collected);
                bad_request("Validation failed", collected.to_json())
            }
            actix_web_validator::Error::Deserialize(de_err) => {
                let err_string = de_err.to_string();

                if err_string.contains("EOF while parsing") {
                    fields.insert(
                        "message".to_string(),
                        serde_json::json!("Request body is empty. Expected JSON payload"),
                    );
                } else if err_string.contains("missing field") {
                    fields.insert("message".to_string(), serde_json::json!(err_string));
                } else {
                    fields.insert("message".to_string(), serde_json::json!("Invalid JSON format"));
                }

                warn!("Rejected JSON body: {}", err_string);
                bad_request("Request validation failed", serde_json::Value::Object(fields))
            }
            _ => {
                fields.insert("message".to_string(), serde_json::json!("Validation error"));
                bad_request("Validation failed", serde_json::Value::Object(fields))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collected_errors_become_a_validation_error() {
        let mut fields = FieldErrors::new();
        fields.add("video", "Motion reference video is required");
        fields.add("video", "Must be a video file");

        let err = fields.into_result().unwrap_err();
        assert_eq!(err.kind(), "validation-error");
        assert_eq!(err.to_string(), "Motion reference video is required");
    }

    #[test]
    fn field_json_uses_errors_arrays() {
        let mut fields = FieldErrors::new();
        fields.add("prompt", "Prompt is required");
        assert_eq!(
            fields.to_json(),
            serde_json::json!({"prompt": {"errors": ["Prompt is required"]}})
        );
    }

    #[test]
    fn empty_collection_is_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }
}
