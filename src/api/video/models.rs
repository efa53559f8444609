use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::form::FormData;
use crate::api::validation::FieldErrors;
use crate::config::ProviderSettings;
use crate::jobs::Attachment;

/// Whether the character follows the subject image's or the motion video's orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharacterOrientation {
    #[default]
    Image,
    Video,
}

impl CharacterOrientation {
    pub fn as_str(self) -> &'static str {
        match self {
            CharacterOrientation::Image => "image",
            CharacterOrientation::Video => "video",
        }
    }
}

/// Who drives polling once the provider hands back a job id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollMode {
    /// Poll inside this request until the job is terminal
    #[default]
    Server,
    /// Return the job id; the caller polls `/api/video/poll`
    Client,
}

/// Validated motion-control video request
#[derive(Debug)]
pub struct VideoRequest {
    pub model_id: String,
    pub image: Attachment,
    pub video: Attachment,
    pub prompt: Option<String>,
    pub orientation: CharacterOrientation,
    pub keep_original_sound: bool,
    pub mode: PollMode,
}

impl VideoRequest {
    /// Build the request from the submitted form
    ///
    /// The motion-control model needs both a subject image and a motion
    /// reference video; each missing part is reported under its own field.
    pub fn from_form(form: &mut FormData, settings: &ProviderSettings) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();

        let model_id = form.text("modelId").map(str::to_string);
        if model_id.is_none() {
            errors.add("modelId", "modelId is required");
        }

        let image = form.take_file("image");
        match &image {
            None => errors.add("image", "Subject image is required"),
            Some(image) if image.media_type() != "image" => {
                errors.add("image", "Subject image must be an image file")
            }
            Some(_) => {}
        }

        let video = form.take_file("video");
        match &video {
            None => errors.add("video", "Motion reference video is required"),
            Some(video) if video.media_type() != "video" => {
                errors.add("video", "Motion reference video must be a video file")
            }
            Some(_) => {}
        }

        let orientation = match form.text("characterOrientation") {
            None => CharacterOrientation::default(),
            Some(raw) if raw.eq_ignore_ascii_case("image") => CharacterOrientation::Image,
            Some(raw) if raw.eq_ignore_ascii_case("video") => CharacterOrientation::Video,
            Some(_) => {
                errors.add("characterOrientation", "characterOrientation must be image or video");
                CharacterOrientation::default()
            }
        };

        let keep_original_sound = match form.text("keepOriginalSound") {
            None => true,
            Some(raw) => parse_flag(raw).unwrap_or_else(|| {
                errors.add("keepOriginalSound", "keepOriginalSound must be true or false");
                true
            }),
        };

        let mode = match form.text("pollMode") {
            None => PollMode::default(),
            Some(raw) if raw.eq_ignore_ascii_case("server") => PollMode::Server,
            Some(raw) if raw.eq_ignore_ascii_case("client") => PollMode::Client,
            Some(_) => {
                errors.add("pollMode", "pollMode must be server or client");
                PollMode::default()
            }
        };

        let prompt = form.text("prompt").map(str::to_string);

        errors.into_result()?;

        let (Some(model_id), Some(image), Some(video)) = (model_id, image, video) else {
            return Err(ApiError::validation("form", "Incomplete video request"));
        };
        if !settings.supports_model(&model_id) {
            return Err(ApiError::UnknownModel(model_id));
        }

        Ok(VideoRequest {
            model_id,
            image,
            video,
            prompt,
            orientation,
            keep_original_sound,
            mode,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Query of the client-driven poll endpoint
#[derive(Debug, Deserialize)]
pub struct PollQuery {
    #[serde(rename = "jobId")]
    pub job_id: Option<String>,
}

impl PollQuery {
    /// Job ids are forwarded into a provider URL path, so only
    /// `[A-Za-z0-9_-]` is accepted
    pub fn validated_job_id(&self) -> Result<&str, ApiError> {
        let job_id = self
            .job_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::validation("jobId", "jobId is required"))?;

        if !job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ApiError::validation("jobId", "jobId contains invalid characters"));
        }
        Ok(job_id)
    }
}

/// Body of the video endpoints
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VideoStatusResponse {
    Completed {
        #[serde(rename = "videoUrls")]
        video_urls: Vec<String>,
    },
    Processing {
        #[serde(rename = "jobId", skip_serializing_if = "Option::is_none")]
        job_id: Option<String>,
        message: String,
    },
    Failed {
        error: String,
    },
    Error {
        error: String,
    },
}
