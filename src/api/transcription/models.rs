use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::form::FormData;
use crate::api::validation::FieldErrors;
use crate::jobs::Attachment;

pub const AUDIO_FIELD: &str = "audio";

/// Validated transcription request
#[derive(Debug)]
pub struct TranscriptionRequest {
    pub audio: Attachment,
    /// Translate the transcript to English instead of transcribing verbatim
    pub translate: bool,
    pub language: Option<String>,
}

impl TranscriptionRequest {
    /// Exactly one file part named `audio` holding `audio/*` content
    pub fn from_form(form: &mut FormData) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();

        let extra: Vec<String> = form
            .file_names()
            .filter(|name| *name != AUDIO_FIELD)
            .map(str::to_string)
            .collect();
        for name in extra {
            errors.add(name, "Only one audio file may be uploaded");
        }

        let audio = form.take_file(AUDIO_FIELD);
        match &audio {
            None => errors.add(AUDIO_FIELD, "No audio file provided"),
            Some(audio) if audio.media_type() != "audio" => {
                errors.add(AUDIO_FIELD, "Uploaded file must be an audio file")
            }
            Some(_) => {}
        }

        let translate = match form.text("translate") {
            None => true,
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    errors.add("translate", "translate must be true or false");
                    true
                }
            },
        };

        let language = form.text("language").map(str::to_string);
        if language.as_deref().is_some_and(|l| l.len() > 16) {
            errors.add("language", "language must be a short language code");
        }

        errors.into_result()?;

        let Some(audio) = audio else {
            return Err(ApiError::validation(AUDIO_FIELD, "No audio file provided"));
        };
        Ok(TranscriptionRequest {
            audio,
            translate,
            language,
        })
    }

    pub fn task(&self) -> &'static str {
        if self.translate {
            "translate"
        } else {
            "transcribe"
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TranscriptionResponse {
    pub text: String,
}
