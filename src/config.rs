use std::env;
use std::fmt;
use std::time::Duration;

use crate::jobs::{JobError, PollConfig};

/// Outbound HTTP client settings
#[derive(Clone, Debug)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// One external generation/transcription provider
#[derive(Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Model identifiers accepted by the router; the first one is the default
    pub models: Vec<String>,
    /// Name of the variable holding the key, used in config-error messages
    pub key_variable: &'static str,
}

impl ProviderSettings {
    /// Credential or `config-error` naming the missing variable
    pub fn credential(&self) -> Result<&str, JobError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| JobError::missing_credential(self.key_variable))
    }

    pub fn is_configured(&self) -> bool {
        self.credential().is_ok()
    }

    pub fn default_model(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }

    pub fn supports_model(&self, model_id: &str) -> bool {
        self.models.iter().any(|m| m == model_id)
    }

    /// `POST` target for a new prediction of `model`
    pub fn predictions_url(&self, model: &str) -> String {
        format!("{}/v1/models/{}/predictions", self.base_url.trim_end_matches('/'), model)
    }

    /// Base for `GET {status_base}/{job_id}`
    pub fn status_base(&self) -> String {
        format!("{}/v1/predictions", self.base_url.trim_end_matches('/'))
    }
}

/// Email-delivery provider used by the contact endpoint
#[derive(Clone)]
pub struct EmailSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub from: String,
    pub to: Option<String>,
}

impl EmailSettings {
    pub fn credential(&self) -> Result<&str, JobError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| JobError::missing_credential("EMAIL_API_KEY"))
    }

    pub fn recipient(&self) -> Result<&str, JobError> {
        self.to
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| JobError::missing_credential("CONTACT_TO"))
    }
}

/// Hosted datastore used by the front-end for history; only reported here
#[derive(Clone, Default)]
pub struct DatastoreSettings {
    pub url: Option<String>,
    pub anon_key: Option<String>,
}

impl DatastoreSettings {
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
            && self.anon_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Application configuration loaded from environment variables
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,

    /// Maximum payload size for all requests (in bytes)
    /// Default: 50MB, uploads carry reference images and motion videos
    pub max_payload_size: usize,

    /// Directory for the rolling log files
    pub log_dir: String,

    pub http: HttpSettings,
    pub image: ProviderSettings,
    pub video: ProviderSettings,
    pub transcription: ProviderSettings,
    pub email: EmailSettings,
    pub datastore: DatastoreSettings,

    pub video_poll: PollConfig,
    pub transcription_poll: PollConfig,

    /// Upper bound on reference images per image-generation request
    pub max_reference_images: usize,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Nothing is strictly required: missing provider keys surface as
    /// `config-error` responses on the routes that need them.
    ///
    /// Optional environment variables:
    /// - HOST / PORT: bind address (default: 127.0.0.1:8080)
    /// - MAX_PAYLOAD_SIZE: maximum request payload size in bytes (default: 52428800 = 50MB)
    /// - LOG_DIR: log directory (default: logs)
    /// - IMAGE_API_URL / IMAGE_API_KEY / IMAGE_MODELS (comma separated)
    /// - VIDEO_API_URL / VIDEO_API_KEY / VIDEO_MODELS (comma separated)
    /// - TRANSCRIPTION_API_URL / TRANSCRIPTION_API_KEY / TRANSCRIPTION_MODEL
    /// - EMAIL_API_URL / EMAIL_API_KEY / CONTACT_FROM / CONTACT_TO
    /// - DATASTORE_URL / DATASTORE_ANON_KEY
    /// - VIDEO_POLL_INTERVAL_MS / VIDEO_POLL_MAX_ATTEMPTS (default: 5000 / 120)
    /// - TRANSCRIPTION_POLL_INTERVAL_MS / TRANSCRIPTION_POLL_MAX_ATTEMPTS (default: 500 / 60)
    /// - MAX_REFERENCE_IMAGES (default: 4)
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let video_poll = PollConfig::new(
            Duration::from_millis(parse_or("VIDEO_POLL_INTERVAL_MS", 5_000)),
            parse_or("VIDEO_POLL_MAX_ATTEMPTS", 120),
        )
        .map_err(|e| format!("video polling: {e}"))?;

        let transcription_poll = PollConfig::new(
            Duration::from_millis(parse_or("TRANSCRIPTION_POLL_INTERVAL_MS", 500)),
            parse_or("TRANSCRIPTION_POLL_MAX_ATTEMPTS", 60),
        )
        .map_err(|e| format!("transcription polling: {e}"))?;

        let image = ProviderSettings {
            base_url: string_or("IMAGE_API_URL", "https://api.replicate.com"),
            api_key: optional("IMAGE_API_KEY"),
            models: list_or("IMAGE_MODELS", "openai/gpt-image-1"),
            key_variable: "IMAGE_API_KEY",
        };
        let video = ProviderSettings {
            base_url: string_or("VIDEO_API_URL", "https://api.replicate.com"),
            api_key: optional("VIDEO_API_KEY"),
            models: list_or("VIDEO_MODELS", "kwaivgi/kling-v2.6-motion-control"),
            key_variable: "VIDEO_API_KEY",
        };
        let transcription = ProviderSettings {
            base_url: string_or("TRANSCRIPTION_API_URL", "https://api.replicate.com"),
            api_key: optional("TRANSCRIPTION_API_KEY"),
            models: list_or("TRANSCRIPTION_MODEL", "openai/whisper"),
            key_variable: "TRANSCRIPTION_API_KEY",
        };

        if image.models.is_empty() || video.models.is_empty() || transcription.models.is_empty() {
            return Err("IMAGE_MODELS, VIDEO_MODELS and TRANSCRIPTION_MODEL must not be empty".to_string());
        }

        Ok(Config {
            host: string_or("HOST", "127.0.0.1"),
            port: parse_or("PORT", 8080),
            max_payload_size: parse_or("MAX_PAYLOAD_SIZE", 50 * 1024 * 1024), // Default: 50MB
            log_dir: string_or("LOG_DIR", "logs"),
            http: HttpSettings {
                request_timeout: Duration::from_secs(parse_or("HTTP_TIMEOUT_SECS", 120)),
                connect_timeout: Duration::from_secs(parse_or("HTTP_CONNECT_TIMEOUT_SECS", 10)),
            },
            image,
            video,
            transcription,
            email: EmailSettings {
                base_url: string_or("EMAIL_API_URL", "https://api.resend.com"),
                api_key: optional("EMAIL_API_KEY"),
                from: string_or("CONTACT_FROM", "Studio Contact <contact@localhost>"),
                to: optional("CONTACT_TO"),
            },
            datastore: DatastoreSettings {
                url: optional("DATASTORE_URL"),
                anon_key: optional("DATASTORE_ANON_KEY"),
            },
            video_poll,
            transcription_poll,
            max_reference_images: parse_or("MAX_REFERENCE_IMAGES", 4),
        })
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn string_or(name: &str, default: &str) -> String {
    optional(name).unwrap_or_else(|| default.to_string())
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn list_or(name: &str, default: &str) -> Vec<String> {
    string_or(name, default)
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

fn presence(configured: bool) -> &'static str {
    if configured {
        "configured"
    } else {
        "missing"
    }
}

/// Secrets are shown as configured/missing only
impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "bind:                 {}:{}", self.host, self.port)?;
        writeln!(f, "max payload size:     {} bytes", self.max_payload_size)?;
        writeln!(f, "log dir:              {}", self.log_dir)?;
        writeln!(f, "http timeout:         {:?} (connect {:?})", self.http.request_timeout, self.http.connect_timeout)?;
        for (name, provider) in [
            ("image", &self.image),
            ("video", &self.video),
            ("transcription", &self.transcription),
        ] {
            writeln!(
                f,
                "{:<22}{} [{}] key {}",
                format!("{name} provider:"),
                provider.base_url,
                provider.models.join(", "),
                presence(provider.is_configured())
            )?;
        }
        writeln!(
            f,
            "email provider:       {} key {}, recipient {}",
            self.email.base_url,
            presence(self.email.credential().is_ok()),
            presence(self.email.recipient().is_ok())
        )?;
        writeln!(f, "datastore:            {}", presence(self.datastore.is_configured()))?;
        writeln!(
            f,
            "video polling:        every {:?}, at most {} checks",
            self.video_poll.interval, self.video_poll.max_attempts
        )?;
        writeln!(
            f,
            "transcription polling: every {:?}, at most {} checks",
            self.transcription_poll.interval, self.transcription_poll.max_attempts
        )?;
        write!(f, "max reference images: {}", self.max_reference_images)
    }
}

#[cfg(test)]
impl Config {
    /// Every provider pointed at `provider_url` with test credentials and fast polling
    pub fn for_tests(provider_url: &str) -> Self {
        let provider = |models: &str, key_variable: &'static str| ProviderSettings {
            base_url: provider_url.to_string(),
            api_key: Some("test-key".to_string()),
            models: vec![models.to_string()],
            key_variable,
        };
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_payload_size: 10 * 1024 * 1024,
            log_dir: "logs".to_string(),
            http: HttpSettings::default(),
            image: provider("test/image-model", "IMAGE_API_KEY"),
            video: provider("test/motion-control", "VIDEO_API_KEY"),
            transcription: provider("test/whisper", "TRANSCRIPTION_API_KEY"),
            email: EmailSettings {
                base_url: provider_url.to_string(),
                api_key: Some("test-key".to_string()),
                from: "Studio <contact@example.com>".to_string(),
                to: Some("team@example.com".to_string()),
            },
            datastore: DatastoreSettings::default(),
            video_poll: PollConfig {
                interval: Duration::from_millis(10),
                max_attempts: 5,
            },
            transcription_poll: PollConfig {
                interval: Duration::from_millis(10),
                max_attempts: 5,
            },
            max_reference_images: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_credential_is_a_config_error_naming_the_variable() {
        let mut config = Config::for_tests("http://localhost");
        config.video.api_key = Some("  ".to_string());

        let err = config.video.credential().unwrap_err();
        assert_eq!(err.kind(), "config-error");
        assert_eq!(err.to_string(), "VIDEO_API_KEY is not configured");
    }

    #[test]
    fn provider_urls_are_built_from_the_base() {
        let config = Config::for_tests("http://localhost:9000/");
        assert_eq!(
            config.image.predictions_url("test/image-model"),
            "http://localhost:9000/v1/models/test/image-model/predictions"
        );
        assert_eq!(config.video.status_base(), "http://localhost:9000/v1/predictions");
    }

    #[test]
    fn display_never_prints_secrets() {
        let rendered = Config::for_tests("http://localhost").to_string();
        assert!(!rendered.contains("test-key"));
        assert!(rendered.contains("configured"));
    }
}
