use actix_multipart::Multipart;
use futures_util::StreamExt;
use std::collections::HashMap;
use tracing::debug;

use super::error::ApiError;
use crate::jobs::Attachment;

/// A collected multipart submission: text fields plus file parts
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, Attachment>,
}

impl FormData {
    /// Drain the multipart stream, rejecting bodies larger than `limit` bytes
    ///
    /// Parts carrying a filename are files; the rest must be UTF-8 text.
    /// Empty file parts are ignored.
    pub async fn from_multipart(mut payload: Multipart, limit: usize) -> Result<Self, ApiError> {
        let mut form = FormData::default();
        let mut total = 0usize;

        while let Some(field) = payload.next().await {
            let mut field = field
                .map_err(|e| ApiError::validation("form", format!("Malformed multipart body: {e}")))?;

            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let filename = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);
            let content_type = field.content_type().map(|m| m.essence_str().to_string());

            let mut data = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk
                    .map_err(|e| ApiError::validation(&name, format!("Failed to read field: {e}")))?;
                total += chunk.len();
                if total > limit {
                    return Err(ApiError::validation(
                        "form",
                        format!("Request body exceeds {limit} bytes"),
                    ));
                }
                data.extend_from_slice(&chunk);
            }

            match filename {
                Some(filename) => {
                    if data.is_empty() {
                        debug!("Ignoring empty file part '{}'", name);
                        continue;
                    }
                    if form.files.contains_key(&name) {
                        return Err(ApiError::validation(
                            &name,
                            format!("Only one file may be uploaded as '{name}'"),
                        ));
                    }
                    form.files
                        .insert(name, Attachment::new(Some(filename), content_type, data));
                }
                None => {
                    let value = String::from_utf8(data)
                        .map_err(|_| ApiError::validation(&name, "Field must be valid UTF-8 text"))?;
                    form.fields.insert(name, value);
                }
            }
        }

        debug!(
            "Collected multipart form: {} field(s), {} file(s), {} bytes",
            form.fields.len(),
            form.files.len(),
            total
        );
        Ok(form)
    }

    /// Trimmed, non-empty text value
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<Attachment> {
        self.files.remove(name)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Files named `{prefix}0..{prefix}N-1`, where N comes from `count_field`
    ///
    /// A missing count field means no files. The count must not exceed `max`
    /// and every announced index must be present.
    pub fn take_indexed_files(
        &mut self,
        prefix: &str,
        count_field: &str,
        max: usize,
    ) -> Result<Vec<Attachment>, ApiError> {
        let count = match self.text(count_field) {
            None => 0,
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                ApiError::validation(count_field, format!("{count_field} must be a non-negative integer"))
            })?,
        };

        if count > max {
            return Err(ApiError::validation(
                count_field,
                format!("At most {max} files are allowed, got {count}"),
            ));
        }

        (0..count)
            .map(|index| {
                let name = format!("{prefix}{index}");
                self.take_file(&name)
                    .ok_or_else(|| ApiError::validation(name.clone(), format!("{name} is missing")))
            })
            .collect()
    }

    #[cfg(test)]
    pub fn for_tests(fields: &[(&str, &str)], files: Vec<(&str, Attachment)>) -> Self {
        FormData {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: files.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }
}

#[cfg(test)]
pub mod test_support {
    /// Hand-built multipart/form-data body for handler tests
    pub struct MultipartBody {
        boundary: String,
        buf: Vec<u8>,
    }

    impl MultipartBody {
        pub fn new() -> Self {
            Self {
                boundary: "studio-proxy-test-boundary".to_string(),
                buf: Vec::new(),
            }
        }

        pub fn text(mut self, name: &str, value: &str) -> Self {
            self.buf.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    self.boundary, name, value
                )
                .as_bytes(),
            );
            self
        }

        pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
            self.buf.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    self.boundary, name, filename, content_type
                )
                .as_bytes(),
            );
            self.buf.extend_from_slice(data);
            self.buf.extend_from_slice(b"\r\n");
            self
        }

        /// (content-type header value, body)
        pub fn finish(mut self) -> (String, Vec<u8>) {
            self.buf
                .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
            (
                format!("multipart/form-data; boundary={}", self.boundary),
                self.buf,
            )
        }
    }
}
