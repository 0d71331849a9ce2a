//! Resolution options.
//!
//! [`ResolutionOptions`] is what callers configure: accepted `rel` keywords,
//! the per-request timeout and extra request headers. Every field has a
//! default, so partial TOML documents work:
//!
//! ```toml
//! types = ["icon", "apple-touch-icon"]
//! timeout_ms = 3000
//!
//! [headers]
//! Accept-Language = "en-US"
//! ```
//!
//! When resolution starts the options are frozen into [`EffectiveOptions`],
//! which merges the caller's headers over [`DEFAULT_USER_AGENT`].
//!
//! ```rust
//! use favicon_core::ResolutionOptions;
//! use std::time::Duration;
//!
//! let options = ResolutionOptions::default()
//!     .with_types(["icon", "shortcut"])
//!     .with_timeout(Duration::from_secs(2))
//!     .with_header("Accept-Language", "de");
//!
//! let effective = options.effective();
//! assert!(effective.accepts("Shortcut"));
//! assert_eq!(effective.timeout(), Duration::from_secs(2));
//! ```

use crate::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// User-Agent sent unless the caller supplies their own.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_13_5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/72.0.3610.2 Safari/537.36";

/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Relation keyword accepted when `types` is left unset.
pub const DEFAULT_ICON_TYPE: &str = "icon";

/// Caller-facing options for a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionOptions {
    /// Accepted `rel` keywords, e.g. `icon` or `apple-touch-icon`.
    pub types: BTreeSet<String>,

    /// Per-request timeout in milliseconds.
    ///
    /// Bounds each request individually; there is no deadline spanning the
    /// whole resolution.
    pub timeout_ms: u64,

    /// Extra request headers. A header named like a default one (compared
    /// case-insensitively) replaces it.
    pub headers: BTreeMap<String, String>,
}

impl Default for ResolutionOptions {
    fn default() -> Self {
        Self {
            types: BTreeSet::from([DEFAULT_ICON_TYPE.to_string()]),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            headers: BTreeMap::new(),
        }
    }
}

impl ResolutionOptions {
    /// Replace the accepted relation keywords.
    #[must_use]
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Add or replace a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Parse options from a TOML document, filling in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the document is not valid TOML, does not
    /// match the options schema, or names a header that is not a valid HTTP
    /// header.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let options: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse options: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or fails
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read options '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check that every header can actually be sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending header.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("Invalid header name '{name}': {e}")))?;
            HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("Invalid value for header '{name}': {e}")))?;
        }
        Ok(())
    }

    /// Freeze these options for one resolution.
    ///
    /// Headers that fail validation are skipped with a warning. An empty
    /// `types` set is kept as is and accepts no `rel` at all, so only
    /// guessing can produce icons.
    pub fn effective(&self) -> EffectiveOptions {
        let types: BTreeSet<String> = self
            .types
            .iter()
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                },
                _ => warn!(header = %name, "Skipping invalid request header"),
            }
        }

        EffectiveOptions {
            types,
            timeout: Duration::from_millis(self.timeout_ms),
            headers,
        }
    }
}

/// Options frozen for the duration of a single resolution.
#[derive(Debug, Clone)]
pub struct EffectiveOptions {
    types: BTreeSet<String>,
    timeout: Duration,
    headers: HeaderMap,
}

impl EffectiveOptions {
    /// Whether a single `rel` token is accepted, ignoring ASCII case.
    pub fn accepts(&self, rel_token: &str) -> bool {
        self.types.contains(&rel_token.to_ascii_lowercase())
    }

    /// Accepted relation keywords, lower-cased.
    pub const fn types(&self) -> &BTreeSet<String> {
        &self.types
    }

    /// Per-request timeout.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Headers sent with every request.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl Default for EffectiveOptions {
    fn default() -> Self {
        ResolutionOptions::default().effective()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let options = ResolutionOptions::default();
        assert_eq!(options.types, BTreeSet::from(["icon".to_string()]));
        assert_eq!(options.timeout_ms, 5000);
        assert!(options.headers.is_empty());

        let effective = options.effective();
        assert!(effective.accepts("icon"));
        assert!(!effective.accepts("apple-touch-icon"));
        assert_eq!(effective.timeout(), Duration::from_millis(5000));
        assert_eq!(
            effective.headers().get(USER_AGENT).unwrap(),
            DEFAULT_USER_AGENT
        );
    }

    #[test]
    fn test_caller_header_overrides_default_case_insensitively() {
        let effective = ResolutionOptions::default()
            .with_header("user-agent", "custom/1.0")
            .with_header("X-Extra", "yes")
            .effective();

        let agents: Vec<_> = effective.headers().get_all(USER_AGENT).iter().collect();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0], "custom/1.0");
        assert_eq!(effective.headers().get("x-extra").unwrap(), "yes");
    }

    #[test]
    fn test_invalid_headers_are_skipped() {
        let effective = ResolutionOptions::default()
            .with_header("bad header", "x")
            .with_header("X-Ok", "fine")
            .effective();
        assert_eq!(effective.headers().len(), 2);
        assert!(effective.headers().get("x-ok").is_some());
    }

    #[test]
    fn test_types_are_normalized() {
        let effective = ResolutionOptions::default()
            .with_types(["Icon", " apple-touch-icon ", ""])
            .effective();
        assert_eq!(effective.types().len(), 2);
        assert!(effective.accepts("ICON"));
        assert!(effective.accepts("apple-touch-icon"));
    }

    #[test]
    fn test_empty_types_accept_nothing() {
        let effective = ResolutionOptions::default()
            .with_types(Vec::<String>::new())
            .effective();
        assert!(effective.types().is_empty());
        assert!(!effective.accepts("icon"));

        let blank = ResolutionOptions::default()
            .with_types(["  ", ""])
            .effective();
        assert!(blank.types().is_empty());
        assert!(!blank.accepts("icon"));
    }

    #[test]
    fn test_from_toml_keeps_explicit_empty_types() {
        let options = ResolutionOptions::from_toml_str("types = []").unwrap();
        assert!(options.types.is_empty());
        assert!(!options.effective().accepts("icon"));
    }

    #[test]
    fn test_with_timeout() {
        let options = ResolutionOptions::default().with_timeout(Duration::from_millis(1500));
        assert_eq!(options.timeout_ms, 1500);
    }

    #[test]
    fn test_from_toml_partial_document() {
        let options = ResolutionOptions::from_toml_str("timeout_ms = 250").unwrap();
        assert_eq!(options.timeout_ms, 250);
        assert_eq!(options.types, BTreeSet::from(["icon".to_string()]));
    }

    #[test]
    fn test_from_toml_full_document() {
        let options = ResolutionOptions::from_toml_str(
            r#"
types = ["icon", "apple-touch-icon"]
timeout_ms = 3000

[headers]
Accept-Language = "en-US"
"#,
        )
        .unwrap();
        assert_eq!(options.types.len(), 2);
        assert_eq!(options.headers.get("Accept-Language").unwrap(), "en-US");
    }

    #[test]
    fn test_from_toml_rejects_bad_header() {
        let err = ResolutionOptions::from_toml_str(
            r#"
[headers]
"bad header" = "x"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)), "unexpected: {err}");
    }

    #[test]
    fn test_from_toml_rejects_wrong_types() {
        let err = ResolutionOptions::from_toml_str("timeout_ms = \"soon\"").unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "types = [\"shortcut\"]").unwrap();

        let options = ResolutionOptions::load(file.path()).unwrap();
        assert_eq!(options.types, BTreeSet::from(["shortcut".to_string()]));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ResolutionOptions::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read options"));
    }
}
