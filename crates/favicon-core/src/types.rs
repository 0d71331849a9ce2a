use serde::{Deserialize, Serialize};

/// Pixel dimensions declared by a `sizes="WxH"` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IconSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A discovered favicon.
///
/// Candidates found in the page markup are trusted as declared. Guessed
/// candidates have passed a content-type check but their bytes were never
/// decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaviconCandidate {
    /// Absolute, scheme-qualified URL of the icon.
    pub url: String,
    /// Declared size, only present when the `<link>` tag carried `sizes`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<IconSize>,
}

impl FaviconCandidate {
    /// Candidate without a declared size.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            size: None,
        }
    }

    /// Candidate with a declared size.
    pub fn with_size(url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            url: url.into(),
            size: Some(IconSize { width, height }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_serialization_omits_missing_size() {
        let candidate = FaviconCandidate::new("https://example.com/favicon.ico");
        let json = serde_json::to_string(&candidate).unwrap();
        assert_eq!(json, r#"{"url":"https://example.com/favicon.ico"}"#);
    }

    #[test]
    fn test_candidate_serialization_with_size() {
        let candidate = FaviconCandidate::with_size("https://example.com/i.png", 32, 16);
        let json = serde_json::to_string(&candidate).unwrap();
        assert!(json.contains(r#""size":{"width":32,"height":16}"#));

        let back: FaviconCandidate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, candidate);
    }
}
