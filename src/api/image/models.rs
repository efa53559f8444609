use serde::Serialize;
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::form::FormData;
use crate::api::validation::FieldErrors;
use crate::config::ProviderSettings;
use crate::jobs::Attachment;

pub const REFERENCE_IMAGE_PREFIX: &str = "referenceImage";
pub const REFERENCE_IMAGE_COUNT_FIELD: &str = "referenceImageCount";

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Low,
    Medium,
    High,
    #[default]
    Auto,
}

impl Quality {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "low" => Some(Quality::Low),
            "medium" => Some(Quality::Medium),
            "high" => Some(Quality::High),
            "auto" => Some(Quality::Auto),
            _ => None,
        }
    }
}

pub const ASPECT_RATIOS: &[&str] = &["1:1", "3:2", "2:3", "4:3", "3:4", "16:9", "9:16"];

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "png" => Some(OutputFormat::Png),
            "jpeg" | "jpg" => Some(OutputFormat::Jpeg),
            "webp" => Some(OutputFormat::Webp),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Webp => "image/webp",
        }
    }
}

/// Validated image-generation request
///
/// Defaults: quality `auto`, aspect ratio `1:1`, output format `png`,
/// style preset `none` (not forwarded).
#[derive(Debug, Validate)]
pub struct ImageRequest {
    pub model_id: String,
    #[validate(length(min = 1, max = 4000, message = "Prompt must be between 1 and 4000 characters"))]
    pub prompt: String,
    pub quality: Quality,
    pub aspect_ratio: String,
    pub output_format: OutputFormat,
    #[validate(length(max = 64, message = "Style preset must be at most 64 characters"))]
    pub style_preset: Option<String>,
    pub reference_images: Vec<Attachment>,
}

impl ImageRequest {
    /// Build the request from the submitted form
    ///
    /// Every field problem is reported at once. Unknown model ids are
    /// rejected as `unknown-model`.
    pub fn from_form(
        form: &mut FormData,
        settings: &ProviderSettings,
        max_reference_images: usize,
    ) -> Result<Self, ApiError> {
        let mut errors = FieldErrors::new();

        let prompt = form.text("prompt").map(str::to_string);
        if prompt.is_none() {
            errors.add("prompt", "Prompt is required");
        }

        let quality = match form.text("quality") {
            None => Quality::default(),
            Some(raw) => Quality::parse(raw).unwrap_or_else(|| {
                errors.add("quality", "Quality must be one of low, medium, high, auto");
                Quality::default()
            }),
        };

        let aspect_ratio = form.text("aspectRatio").unwrap_or("1:1").to_string();
        if !ASPECT_RATIOS.contains(&aspect_ratio.as_str()) {
            errors.add(
                "aspectRatio",
                format!("Aspect ratio must be one of {}", ASPECT_RATIOS.join(", ")),
            );
        }

        let output_format = match form.text("outputFormat") {
            None => OutputFormat::default(),
            Some(raw) => OutputFormat::parse(raw).unwrap_or_else(|| {
                errors.add("outputFormat", "Output format must be one of png, jpeg, webp");
                OutputFormat::default()
            }),
        };

        let style_preset = form
            .text("stylePreset")
            .filter(|s| !s.eq_ignore_ascii_case("none"))
            .map(str::to_string);

        let reference_images = match form.take_indexed_files(
            REFERENCE_IMAGE_PREFIX,
            REFERENCE_IMAGE_COUNT_FIELD,
            max_reference_images,
        ) {
            Ok(images) => images,
            Err(ApiError::Validation { fields, .. }) => {
                errors.extend(fields);
                Vec::new()
            }
            Err(other) => return Err(other),
        };
        for (index, image) in reference_images.iter().enumerate() {
            if image.media_type() != "image" {
                errors.add(
                    format!("{REFERENCE_IMAGE_PREFIX}{index}"),
                    "Reference images must be image files",
                );
            }
        }

        errors.into_result()?;

        let model_id = match form.text("modelId") {
            Some(id) if settings.supports_model(id) => id.to_string(),
            Some(id) => return Err(ApiError::UnknownModel(id.to_string())),
            None => settings
                .default_model()
                .map(str::to_string)
                .ok_or_else(|| ApiError::UnknownModel(String::new()))?,
        };

        let request = ImageRequest {
            model_id,
            prompt: prompt.unwrap_or_default(),
            quality,
            aspect_ratio,
            output_format,
            style_preset,
            reference_images,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Response for a successful generation
#[derive(Serialize)]
pub struct ImageResponse {
    pub images: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn settings() -> ProviderSettings {
        Config::for_tests("http://localhost").image
    }

    #[test]
    fn defaults_apply_when_only_prompt_is_given() {
        let mut form = FormData::for_tests(&[("prompt", "a red fox")], vec![]);
        let request = ImageRequest::from_form(&mut form, &settings(), 2).unwrap();

        assert_eq!(request.model_id, "test/image-model");
        assert_eq!(request.quality, Quality::Auto);
        assert_eq!(request.aspect_ratio, "1:1");
        assert_eq!(request.output_format, OutputFormat::Png);
        assert!(request.style_preset.is_none());
        assert!(request.reference_images.is_empty());
    }

    #[test]
    fn all_invalid_fields_are_reported_together() {
        let mut form = FormData::for_tests(
            &[("quality", "ultra"), ("aspectRatio", "5:1"), ("outputFormat", "gif")],
            vec![],
        );
        match ImageRequest::from_form(&mut form, &settings(), 2).unwrap_err() {
            ApiError::Validation { fields, .. } => {
                for field in ["prompt", "quality", "aspectRatio", "outputFormat"] {
                    assert!(fields.contains(field), "{field} should be reported");
                }
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn non_image_reference_is_rejected() {
        let mut form = FormData::for_tests(
            &[("prompt", "a red fox"), ("referenceImageCount", "1")],
            vec![(
                "referenceImage0",
                Attachment::new(Some("notes.txt".to_string()), Some("text/plain".to_string()), vec![1]),
            )],
        );
        let err = ImageRequest::from_form(&mut form, &settings(), 2).unwrap_err();
        assert_eq!(err.kind(), "validation-error");
    }

    #[test]
    fn unknown_model_is_rejected() {
        let mut form = FormData::for_tests(&[("prompt", "a red fox"), ("modelId", "other/model")], vec![]);
        let err = ImageRequest::from_form(&mut form, &settings(), 2).unwrap_err();
        assert_eq!(err.kind(), "unknown-model");
    }

    #[test]
    fn overlong_style_preset_fails_validation() {
        let preset = "x".repeat(65);
        let mut form = FormData::for_tests(&[("prompt", "a red fox"), ("stylePreset", &preset)], vec![]);
        let err = ImageRequest::from_form(&mut form, &settings(), 2).unwrap_err();
        assert_eq!(err.to_string(), "Style preset must be at most 64 characters");
    }
}
