//! Two-stage favicon resolution.
//!
//! 1. Fetch the page and collect the icons its `<link>` tags declare.
//! 2. Only if that found nothing, probe well-known file names at the origin.
//!
//! Resolution never fails. A page without icons and an unreachable network
//! both produce an empty list; callers that need to tell them apart have to
//! check connectivity themselves.

use crate::config::ResolutionOptions;
use crate::discovery::{discover_by_guessing, discover_from_html};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::FaviconCandidate;
use crate::Result;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Resolves the favicons of web pages.
///
/// Cheap to clone; clones share the underlying transport.
///
/// ```rust,no_run
/// use favicon_core::{FaviconResolver, ResolutionOptions};
///
/// # async fn example() -> favicon_core::Result<()> {
/// let resolver = FaviconResolver::new()?;
/// let icons = resolver
///     .resolve("https://www.rust-lang.org", &ResolutionOptions::default())
///     .await;
///
/// for icon in &icons {
///     println!("{} {:?}", icon.url, icon.size);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FaviconResolver {
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for FaviconResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaviconResolver").finish_non_exhaustive()
    }
}

impl FaviconResolver {
    /// Resolver on the default `reqwest` transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self> {
        Ok(Self::with_transport(ReqwestTransport::new()?))
    }

    /// Resolver on a caller-supplied transport.
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Resolver sharing an existing transport.
    pub fn with_shared_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Find the favicons of `uri`.
    ///
    /// Options are frozen before the first request. Icons declared in the page
    /// are returned in document order; if there are none, guessed icons are
    /// returned instead. The list may be empty.
    #[instrument(skip_all, fields(uri = %uri))]
    pub async fn resolve(&self, uri: &str, options: &ResolutionOptions) -> Vec<FaviconCandidate> {
        let uri = uri.trim();
        let effective = options.effective();

        let declared = discover_from_html(self.transport.as_ref(), uri, &effective).await;
        if !declared.is_empty() {
            info!(count = declared.len(), "Resolved favicons from page markup");
            return declared;
        }

        debug!("Page declared no icons, guessing");
        let guessed = discover_by_guessing(self.transport.as_ref(), uri, &effective).await;
        if guessed.is_empty() {
            info!("No favicon found");
        } else {
            info!(count = guessed.len(), "Resolved favicons by guessing");
        }
        guessed
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::disallowed_macros,
    clippy::unnecessary_wraps
)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::transport::{HttpRequest, HttpResponse};
    use async_trait::async_trait;
    use reqwest::header::USER_AGENT;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned responses by URL; records each request's URL and User-Agent.
    #[derive(Default)]
    struct RecordingTransport {
        responses: HashMap<String, HttpResponse>,
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl RecordingTransport {
        fn page(mut self, url: &str, html: &str) -> Self {
            self.responses.insert(
                url.to_string(),
                HttpResponse {
                    status: 200,
                    content_type: Some("text/html".to_string()),
                    body: html.as_bytes().to_vec(),
                },
            );
            self
        }

        fn image(mut self, url: &str) -> Self {
            self.responses.insert(
                url.to_string(),
                HttpResponse {
                    status: 200,
                    content_type: Some("image/x-icon".to_string()),
                    body: vec![0, 0, 1, 0],
                },
            );
            self
        }

        fn call_urls(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(url, _)| url.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn get(&self, request: &HttpRequest) -> crate::Result<HttpResponse> {
            let agent = request
                .headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string);
            self.calls
                .lock()
                .unwrap()
                .push((request.url.clone(), agent));
            self.responses
                .get(&request.url)
                .cloned()
                .ok_or_else(|| Error::Other("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_declared_icons_skip_guessing() {
        let transport = Arc::new(RecordingTransport::default().page(
            "https://example.com/",
            r#"<link rel="icon" href="/brand.png" sizes="64x64">"#,
        ));
        let resolver = FaviconResolver::with_shared_transport(transport.clone());

        let icons = resolver
            .resolve("https://example.com/", &ResolutionOptions::default())
            .await;

        assert_eq!(
            icons,
            vec![FaviconCandidate::with_size(
                "https://example.com/brand.png",
                64,
                64
            )]
        );
        assert_eq!(transport.call_urls(), vec!["https://example.com/"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_guessing() {
        let transport = Arc::new(
            RecordingTransport::default()
                .page("https://example.com/", "<html><head></head></html>")
                .image("https://example.com/favicon.ico"),
        );
        let resolver = FaviconResolver::with_shared_transport(transport.clone());

        let icons = resolver
            .resolve("https://example.com/", &ResolutionOptions::default())
            .await;

        assert_eq!(
            icons,
            vec![FaviconCandidate::new("https://example.com/favicon.ico")]
        );
        assert_eq!(transport.call_urls().len(), 5);
    }

    #[tokio::test]
    async fn test_nothing_found_is_empty() {
        let transport = Arc::new(RecordingTransport::default());
        let resolver = FaviconResolver::with_shared_transport(transport.clone());

        let icons = resolver
            .resolve("https://example.com/", &ResolutionOptions::default())
            .await;

        assert!(icons.is_empty());
        assert_eq!(transport.call_urls().len(), 5);
    }

    #[tokio::test]
    async fn test_empty_types_ignore_declared_icons() {
        let transport = Arc::new(
            RecordingTransport::default()
                .page(
                    "https://example.com/",
                    r#"<link rel="icon" href="/declared.ico">"#,
                )
                .image("https://example.com/favicon.ico"),
        );
        let resolver = FaviconResolver::with_shared_transport(transport.clone());
        let options = ResolutionOptions::default().with_types(Vec::<String>::new());

        let icons = resolver.resolve("https://example.com/", &options).await;

        assert_eq!(
            icons,
            vec![FaviconCandidate::new("https://example.com/favicon.ico")]
        );
        assert_eq!(transport.call_urls().len(), 5);
    }

    #[tokio::test]
    async fn test_schemeless_input_guesses_both_schemes() {
        let transport = Arc::new(
            RecordingTransport::default()
                .image("http://example.com/favicon.ico")
                .image("https://example.com/favicon.ico"),
        );
        let resolver = FaviconResolver::with_shared_transport(transport.clone());

        let icons = resolver
            .resolve("example.com", &ResolutionOptions::default())
            .await;

        assert_eq!(
            icons,
            vec![
                FaviconCandidate::new("https://example.com/favicon.ico"),
                FaviconCandidate::new("http://example.com/favicon.ico"),
            ]
        );
        // One page fetch plus eight probes
        assert_eq!(transport.call_urls().len(), 9);
    }

    #[tokio::test]
    async fn test_hostless_input_only_attempts_page_fetch() {
        let transport = Arc::new(RecordingTransport::default());
        let resolver = FaviconResolver::with_shared_transport(transport.clone());

        let icons = resolver
            .resolve("/favicon.ico", &ResolutionOptions::default())
            .await;

        assert!(icons.is_empty());
        assert_eq!(transport.call_urls(), vec!["/favicon.ico"]);
    }

    #[tokio::test]
    async fn test_default_user_agent_is_sent() {
        let transport = Arc::new(RecordingTransport::default());
        let resolver = FaviconResolver::with_shared_transport(transport.clone());
        resolver
            .resolve("https://example.com/", &ResolutionOptions::default())
            .await;

        let calls = transport.calls.lock().unwrap();
        assert!(calls.iter().all(|(_, agent)| {
            agent.as_deref() == Some(crate::config::DEFAULT_USER_AGENT)
        }));
    }

    #[tokio::test]
    async fn test_caller_user_agent_wins() {
        let transport = Arc::new(RecordingTransport::default());
        let resolver = FaviconResolver::with_shared_transport(transport.clone());
        let options = ResolutionOptions::default().with_header("User-Agent", "my-bot/2");
        resolver.resolve("https://example.com/", &options).await;

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 5);
        assert!(
            calls
                .iter()
                .all(|(_, agent)| agent.as_deref() == Some("my-bot/2"))
        );
    }

    #[test]
    fn test_resolver_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FaviconResolver>();
    }
}
