//! Icon discovery by probing well-known file names.
//!
//! When a page declares no icons, browsers still look for `/favicon.ico` at
//! the origin root. This module probes that and its common siblings:
//!
//! 1. `<origin>/favicon.ico`
//! 2. `<origin>/favicon.png`
//! 3. `<origin>/favicon.gif`
//! 4. `<origin>/favicon.svg`
//!
//! All probes run concurrently. A probe counts as a hit when the response
//! declares an `image/*` content type and has a body; the status code is not
//! consulted. Results keep the order above.
//!
//! If the input has a host but no scheme, both `https://` and `http://` are
//! probed and HTTPS hits come first. Without a host nothing is probed.

use crate::config::EffectiveOptions;
use crate::transport::{HttpRequest, Transport};
use crate::types::FaviconCandidate;
use crate::uri::PageUri;
use futures::future::join_all;
use tracing::{debug, instrument};

/// File names probed at the origin root, in result order.
pub const FAVICON_FILENAMES: [&str; 4] =
    ["favicon.ico", "favicon.png", "favicon.gif", "favicon.svg"];

/// Probe the origin of `uri` for well-known favicon files.
///
/// Any path on `uri` is discarded; probing always targets the origin root.
#[instrument(skip_all, fields(uri = %uri))]
pub async fn discover_by_guessing(
    transport: &dyn Transport,
    uri: &str,
    options: &EffectiveOptions,
) -> Vec<FaviconCandidate> {
    let page = PageUri::parse(uri);

    let Some(host) = page.host() else {
        debug!("No host to guess against");
        return Vec::new();
    };

    if let Some(origin) = page.origin() {
        return probe_origin(transport, &origin, options).await;
    }

    debug!(host, "No scheme given, probing https and http");
    let https_origin = format!("https://{host}");
    let http_origin = format!("http://{host}");
    let (mut found, http_found) = tokio::join!(
        probe_origin(transport, &https_origin, options),
        probe_origin(transport, &http_origin, options),
    );
    found.extend(http_found);
    found
}

/// Probe every well-known file name under one origin.
async fn probe_origin(
    transport: &dyn Transport,
    origin: &str,
    options: &EffectiveOptions,
) -> Vec<FaviconCandidate> {
    let probes = FAVICON_FILENAMES
        .iter()
        .map(|name| probe_icon(transport, format!("{origin}/{name}"), options));

    let found: Vec<_> = join_all(probes).await.into_iter().flatten().collect();
    debug!(origin, count = found.len(), "Probed well-known favicon paths");
    found
}

/// Fetch one guessed URL and keep it if it looks like an image.
async fn probe_icon(
    transport: &dyn Transport,
    url: String,
    options: &EffectiveOptions,
) -> Option<FaviconCandidate> {
    let request = HttpRequest {
        url,
        timeout: options.timeout(),
        headers: options.headers().clone(),
    };

    match transport.get(&request).await {
        Ok(response) if response.is_image() && !response.body.is_empty() => {
            debug!(url = %request.url, "Favicon found");
            Some(FaviconCandidate::new(request.url))
        },
        Ok(response) => {
            debug!(
                url = %request.url,
                status = response.status,
                content_type = response.content_type.as_deref().unwrap_or(""),
                "Not an image"
            );
            None
        },
        Err(e) => {
            debug!(url = %request.url, error = %e, "Probe failed");
            None
        },
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
    use crate::transport::{HttpResponse, ReqwestTransport};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Serves canned responses by URL and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        responses: HashMap<String, HttpResponse>,
        requested: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn image_at(mut self, url: &str, content_type: &str) -> Self {
            self.responses.insert(
                url.to_string(),
                HttpResponse {
                    status: 200,
                    content_type: Some(content_type.to_string()),
                    body: vec![1, 2, 3],
                },
            );
            self
        }

        fn requested(&self) -> Vec<String> {
            let mut urls = self.requested.lock().unwrap().clone();
            urls.sort();
            urls
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, request: &HttpRequest) -> crate::Result<HttpResponse> {
            self.requested.lock().unwrap().push(request.url.clone());
            self.responses
                .get(&request.url)
                .cloned()
                .ok_or_else(|| Error::Other(format!("connection refused: {}", request.url)))
        }
    }

    fn urls(found: &[FaviconCandidate]) -> Vec<&str> {
        found.iter().map(|c| c.url.as_str()).collect()
    }

    #[tokio::test]
    async fn test_no_host_issues_no_requests() {
        let transport = ScriptedTransport::default();
        for uri in ["", "/only/a/path", "   "] {
            let found = discover_by_guessing(&transport, uri, &EffectiveOptions::default()).await;
            assert!(found.is_empty());
        }
        assert!(transport.requested().is_empty());
    }

    #[tokio::test]
    async fn test_scheme_given_probes_only_that_origin_root() {
        let transport = ScriptedTransport::default()
            .image_at("https://example.com/favicon.ico", "image/x-icon");

        let found = discover_by_guessing(
            &transport,
            "https://example.com/deep/path/page.html",
            &EffectiveOptions::default(),
        )
        .await;

        assert_eq!(urls(&found), vec!["https://example.com/favicon.ico"]);
        assert_eq!(found[0].size, None);
        assert_eq!(
            transport.requested(),
            vec![
                "https://example.com/favicon.gif",
                "https://example.com/favicon.ico",
                "https://example.com/favicon.png",
                "https://example.com/favicon.svg",
            ]
        );
    }

    #[tokio::test]
    async fn test_results_follow_filename_order() {
        let transport = ScriptedTransport::default()
            .image_at("http://example.com/favicon.svg", "image/svg+xml")
            .image_at("http://example.com/favicon.png", "image/png")
            .image_at("http://example.com/favicon.ico", "image/vnd.microsoft.icon");

        let found = discover_by_guessing(
            &transport,
            "http://example.com",
            &EffectiveOptions::default(),
        )
        .await;

        assert_eq!(
            urls(&found),
            vec![
                "http://example.com/favicon.ico",
                "http://example.com/favicon.png",
                "http://example.com/favicon.svg",
            ]
        );
    }

    #[tokio::test]
    async fn test_schemeless_probes_https_then_http() {
        let transport = ScriptedTransport::default()
            .image_at("http://example.com/favicon.ico", "image/x-icon")
            .image_at("https://example.com/favicon.png", "image/png")
            .image_at("http://example.com/favicon.gif", "image/gif");

        let found =
            discover_by_guessing(&transport, "example.com/about", &EffectiveOptions::default())
                .await;

        assert_eq!(
            urls(&found),
            vec![
                "https://example.com/favicon.png",
                "http://example.com/favicon.ico",
                "http://example.com/favicon.gif",
            ]
        );
        assert_eq!(transport.requested().len(), 8);
    }

    #[tokio::test]
    async fn test_non_image_responses_are_rejected() {
        let mut transport = ScriptedTransport::default()
            .image_at("https://example.com/favicon.ico", "text/html; charset=utf-8");
        transport.responses.insert(
            "https://example.com/favicon.png".to_string(),
            HttpResponse {
                status: 200,
                content_type: None,
                body: vec![1],
            },
        );
        transport.responses.insert(
            "https://example.com/favicon.gif".to_string(),
            HttpResponse {
                status: 200,
                content_type: Some("image/gif".to_string()),
                body: Vec::new(),
            },
        );

        let found = discover_by_guessing(
            &transport,
            "https://example.com",
            &EffectiveOptions::default(),
        )
        .await;
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_probe_against_mock_server() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/favicon.ico"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/x-icon")
                    .set_body_bytes(vec![0u8, 0, 1, 0]),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/favicon.png"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        // Status is not consulted: an image body served with 404 still counts
        Mock::given(method("GET"))
            .and(path("/favicon.svg"))
            .respond_with(ResponseTemplate::new(404).set_body_raw("<svg/>", "image/svg+xml"))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let found = discover_by_guessing(
            &transport,
            &format!("{}/some/page", server.uri()),
            &EffectiveOptions::default(),
        )
        .await;

        assert_eq!(
            found,
            vec![
                FaviconCandidate::new(format!("{}/favicon.ico", server.uri())),
                FaviconCandidate::new(format!("{}/favicon.svg", server.uri())),
            ]
        );
    }
}
