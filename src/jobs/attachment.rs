use base64::{engine::general_purpose::STANDARD, Engine};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// A binary part received from the caller or returned by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    filename: Option<String>,
    content_type: String,
    data: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: Option<String>, content_type: Option<String>, data: Vec<u8>) -> Self {
        let content_type = content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());
        Self {
            filename,
            content_type,
            data,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `image/png` -> `image`
    pub fn media_type(&self) -> &str {
        self.content_type
            .split('/')
            .next()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
    }

    pub fn into_parts(self) -> (Option<String>, String, Vec<u8>) {
        (self.filename, self.content_type, self.data)
    }

    /// `data:<mime>;base64,<data>` with the original MIME type
    pub fn to_data_url(&self) -> String {
        data_url(&self.content_type, &self.data)
    }
}

pub fn data_url(content_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_preserves_mime_type() {
        let attachment = Attachment::new(
            Some("clip.webm".to_string()),
            Some("audio/webm".to_string()),
            b"hello".to_vec(),
        );
        assert_eq!(attachment.to_data_url(), "data:audio/webm;base64,aGVsbG8=");
        assert_eq!(attachment.media_type(), "audio");
    }

    #[test]
    fn missing_content_type_falls_back_to_octet_stream() {
        let attachment = Attachment::new(None, Some(" ".to_string()), vec![1, 2, 3]);
        assert_eq!(attachment.content_type(), "application/octet-stream");
        assert_eq!(attachment.len(), 3);
    }
}
