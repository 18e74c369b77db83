use bytes::Bytes;

/// Default content type for textual uploads
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
/// Default content type for binary uploads
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";
/// Content type for encrypted, signed-wrapper, and sidecar payloads
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// File content as the application sees it.
///
/// Text and binary are kept apart so that a round trip through encryption
/// hands back the same representation that went in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Binary(Bytes),
}

impl Content {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(text) => text.as_bytes(),
            Content::Binary(bytes) => bytes.as_ref(),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Content::Text(_))
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Content type used when the caller does not supply one
    pub fn default_content_type(&self) -> &'static str {
        match self {
            Content::Text(_) => TEXT_CONTENT_TYPE,
            Content::Binary(_) => BINARY_CONTENT_TYPE,
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Content::Text(text) => Bytes::from(text),
            Content::Binary(bytes) => bytes,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Binary(_) => None,
        }
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Binary(Bytes::from(bytes))
    }
}

impl From<Bytes> for Content {
    fn from(bytes: Bytes) -> Self {
        Content::Binary(bytes)
    }
}

/// Whether a response with this content type should be surfaced as text
pub fn is_textual_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("text/") || essence == JSON_CONTENT_TYPE
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_textual_content_types() {
        assert!(is_textual_content_type("text/plain; charset=utf-8"));
        assert!(is_textual_content_type("Application/JSON"));
        assert!(is_textual_content_type("text/html"));
        assert!(!is_textual_content_type("application/octet-stream"));
        assert!(!is_textual_content_type("image/png"));
    }

    #[test]
    fn test_default_content_type() {
        assert_eq!(Content::from("hi").default_content_type(), TEXT_CONTENT_TYPE);
        assert_eq!(
            Content::from(vec![0u8, 1]).default_content_type(),
            BINARY_CONTENT_TYPE
        );
    }
}
