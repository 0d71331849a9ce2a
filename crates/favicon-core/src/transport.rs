//! HTTP collaborator used by the discovery stages.
//!
//! Discovery only ever needs "GET this URL with these headers and this
//! timeout, then tell me the content type and body". [`Transport`] captures
//! that so tests and embedders can swap the network out; [`ReqwestTransport`]
//! is the default implementation.

use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use std::time::Duration;
use tracing::debug;

/// Maximum number of redirects followed for a single request.
const MAX_REDIRECTS: usize = 5;

/// A single outbound GET request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Absolute URL to fetch.
    pub url: String,
    /// Upper bound for the whole request, body included.
    pub timeout: Duration,
    /// Headers sent with the request.
    pub headers: HeaderMap,
}

/// What discovery needs to know about a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw `Content-Type` header value, if present and valid UTF-8.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Whether the declared content type is `image/*`.
    pub fn is_image(&self) -> bool {
        self.content_type.as_deref().is_some_and(|ct| {
            ct.trim_start()
                .get(..6)
                .is_some_and(|head| head.eq_ignore_ascii_case("image/"))
        })
    }
}

/// Performs GET requests on behalf of the resolver.
///
/// Implementations report transport failures as errors; status codes are
/// returned as data and never turned into errors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform `request` and collect the response.
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport with a fresh HTTP client.
    ///
    /// Timeouts and headers are applied per request, so the client itself
    /// carries neither.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }

    /// Wrap an existing client, e.g. one configured with a proxy.
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let response = self
            .client
            .get(&request.url)
            .timeout(request.timeout)
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| classify(&request.url, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(std::string::ToString::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| classify(&request.url, e))?
            .to_vec();

        debug!(
            url = %request.url,
            status,
            content_type = content_type.as_deref().unwrap_or(""),
            bytes = body.len(),
            "Fetched"
        );

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

fn classify(url: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("Request to '{url}' timed out"))
    } else if err.is_builder() {
        Error::InvalidUrl(format!("'{url}': {err}"))
    } else {
        Error::Network(err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, USER_AGENT};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(url: String) -> HttpRequest {
        HttpRequest {
            url,
            timeout: Duration::from_secs(5),
            headers: HeaderMap::new(),
        }
    }

    #[test]
    fn test_is_image() {
        let mut response = HttpResponse {
            content_type: Some("image/x-icon".to_string()),
            ..HttpResponse::default()
        };
        assert!(response.is_image());

        response.content_type = Some("Image/PNG; charset=binary".to_string());
        assert!(response.is_image());

        response.content_type = Some("text/html".to_string());
        assert!(!response.is_image());

        response.content_type = Some("imag".to_string());
        assert!(!response.is_image());

        response.content_type = None;
        assert!(!response.is_image());
    }

    #[test]
    fn test_text_is_lossy() {
        let response = HttpResponse {
            body: vec![b'o', b'k', 0xff],
            ..HttpResponse::default()
        };
        assert_eq!(response.text(), "ok\u{fffd}");
    }

    #[tokio::test]
    async fn test_get_collects_status_type_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/favicon.ico"))
            .and(header("user-agent", "probe-test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/x-icon")
                    .set_body_bytes(vec![0u8, 0, 1, 0]),
            )
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let mut req = request(format!("{}/favicon.ico", server.uri()));
        req.headers
            .insert(USER_AGENT, HeaderValue::from_static("probe-test"));

        let response = transport.get(&req).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type.as_deref(), Some("image/x-icon"));
        assert_eq!(response.body, vec![0u8, 0, 1, 0]);
    }

    #[tokio::test]
    async fn test_get_returns_error_statuses_as_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let response = transport
            .get(&request(format!("{}/nope", server.uri())))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.text(), "missing");
    }

    #[tokio::test]
    async fn test_get_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let mut req = request(format!("{}/slow", server.uri()));
        req.timeout = Duration::from_millis(100);

        let err = transport.get(&req).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "unexpected error: {err}");
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_get_rejects_unparseable_url() {
        let transport = ReqwestTransport::new().unwrap();
        let err = transport
            .get(&request("example.com".to_string()))
            .await
            .unwrap_err();
        assert!(!err.is_recoverable());
    }
}
