//! Icon discovery from `<link>` tags in page markup.
//!
//! The page is not parsed into a DOM. Every `<link ...>` tag is located with a
//! regex, reduced to its attribute soup and inspected for `rel`, `href` and
//! `sizes`. That keeps the scanner tolerant of attribute order, odd
//! whitespace, multi-valued `rel` and markup a strict parser would refuse.
//!
//! ```rust
//! use favicon_core::discovery::link::extract_link_candidates;
//! use favicon_core::uri::PageUri;
//! use std::collections::BTreeSet;
//!
//! let html = r#"
//! <head>
//!   <link rel="stylesheet" href="/site.css">
//!   <link rel="shortcut icon" href="/favicon.ico">
//!   <link href="icons/32.png" sizes="32x32" rel="icon" />
//! </head>
//! "#;
//!
//! let base = PageUri::parse("https://example.com/blog/post");
//! let types = BTreeSet::from(["icon".to_string()]);
//! let found = extract_link_candidates(&base, html, &types);
//!
//! assert_eq!(found.len(), 2);
//! assert_eq!(found[0].url, "https://example.com/favicon.ico");
//! assert_eq!(found[1].url, "https://example.com/blog/icons/32.png");
//! ```

use crate::config::EffectiveOptions;
use crate::transport::{HttpRequest, Transport};
use crate::types::{FaviconCandidate, IconSize};
use crate::uri::PageUri;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::{debug, instrument, trace};

/// Regex for a whole `<link ...>` tag.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static LINK_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<link\s[^>]*>").unwrap());

/// Regex for the opening `<link` token.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static TAG_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^<\s*link\s*").unwrap());

/// Regex for the closing `>` or `/>`.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static TAG_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*/?>$").unwrap());

/// Regex for `rel="..."` or `rel='...'`
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static REL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\srel\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

/// Regex for `href="..."` or `href='...'`
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\shref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

/// Regex for the first `WxH` entry of a `sizes` attribute.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static SIZES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\ssizes\s*=\s*["']\s*(\d+)x(\d+)"#).unwrap());

/// Turn one raw `<link ...>` tag into a candidate.
///
/// Returns `None` when the tag has no `rel`, none of its `rel` tokens is in
/// `types` (compared ignoring ASCII case), it has no usable `href`, or the
/// href is relative and `base` has no host to resolve it against.
///
/// ```rust
/// use favicon_core::discovery::link::parse_link_tag;
/// use favicon_core::types::IconSize;
/// use favicon_core::uri::PageUri;
/// use std::collections::BTreeSet;
///
/// let base = PageUri::parse("https://example.com/");
/// let types = BTreeSet::from(["icon".to_string()]);
///
/// let hit = parse_link_tag(&base, r#"<link rel="icon" sizes="32x32" href="/i.png">"#, &types)
///     .unwrap();
/// assert_eq!(hit.url, "https://example.com/i.png");
/// assert_eq!(hit.size, Some(IconSize { width: 32, height: 32 }));
///
/// assert!(parse_link_tag(&base, r#"<link rel="stylesheet" href="/a.css">"#, &types).is_none());
/// ```
pub fn parse_link_tag(
    base: &PageUri,
    tag: &str,
    types: &BTreeSet<String>,
) -> Option<FaviconCandidate> {
    let soup = attribute_soup(tag);

    let rel = capture_attr(&REL_RE, &soup)?;
    let accepted = rel
        .split_whitespace()
        .any(|token| types.iter().any(|t| t.eq_ignore_ascii_case(token)));
    if !accepted {
        return None;
    }

    let href = capture_attr(&HREF_RE, &soup)?.trim();
    if href.is_empty() {
        return None;
    }

    let size = SIZES_RE.captures(&soup).and_then(|caps| {
        Some(IconSize {
            width: caps[1].parse().ok()?,
            height: caps[2].parse().ok()?,
        })
    });

    let Some(url) = base.resolve_href(href) else {
        trace!(href, "Cannot resolve href without a host");
        return None;
    };

    Some(FaviconCandidate { url, size })
}

/// Scan `html` for icon links, in document order.
pub fn extract_link_candidates(
    base: &PageUri,
    html: &str,
    types: &BTreeSet<String>,
) -> Vec<FaviconCandidate> {
    LINK_TAG_RE
        .find_iter(html)
        .filter_map(|tag| parse_link_tag(base, tag.as_str(), types))
        .collect()
}

/// Fetch `uri` and return the icons its markup declares.
///
/// Best effort: a failed fetch, timeout or empty body yields an empty list.
/// The status code is ignored, so error pages that still carry the site's
/// `<head>` contribute their icons.
#[instrument(skip_all, fields(uri = %uri))]
pub async fn discover_from_html(
    transport: &dyn Transport,
    uri: &str,
    options: &EffectiveOptions,
) -> Vec<FaviconCandidate> {
    let request = HttpRequest {
        url: uri.to_string(),
        timeout: options.timeout(),
        headers: options.headers().clone(),
    };

    let response = match transport.get(&request).await {
        Ok(response) => response,
        Err(e) => {
            debug!(error = %e, category = e.category(), "Page fetch failed");
            return Vec::new();
        },
    };

    if response.body.is_empty() {
        debug!(status = response.status, "Page body is empty");
        return Vec::new();
    }

    let base = PageUri::parse(uri);
    let found = extract_link_candidates(&base, &response.text(), options.types());
    debug!(count = found.len(), "Scanned page for icon links");
    found
}

/// Strip `<link` and the closer, leaving ` attr="..." attr="..."`.
fn attribute_soup(tag: &str) -> String {
    let inner = TAG_OPEN_RE.replace(tag.trim(), "");
    let inner = TAG_CLOSE_RE.replace(&inner, "");
    format!(" {inner}")
}

fn capture_attr<'a>(re: &Regex, soup: &'a str) -> Option<&'a str> {
    let caps = re.captures(soup)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
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
    use crate::config::ResolutionOptions;
    use crate::transport::{HttpResponse, ReqwestTransport};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn icon_types() -> BTreeSet<String> {
        BTreeSet::from(["icon".to_string()])
    }

    fn parse(base: &str, tag: &str) -> Option<FaviconCandidate> {
        parse_link_tag(&PageUri::parse(base), tag, &icon_types())
    }

    #[test]
    fn test_absolute_href_is_kept() {
        let hit = parse(
            "https://example.com/",
            r#"<link rel="icon" href="https://cdn.example.net/i.ico">"#,
        )
        .unwrap();
        assert_eq!(hit.url, "https://cdn.example.net/i.ico");
        assert_eq!(hit.size, None);
    }

    #[test]
    fn test_root_relative_href() {
        let hit = parse(
            "https://example.com/page",
            r#"<link rel="icon" href="/a/b.png">"#,
        )
        .unwrap();
        assert_eq!(hit.url, "https://example.com/a/b.png");
    }

    #[test]
    fn test_path_relative_href() {
        let hit = parse(
            "https://example.com/dir/page",
            r#"<link rel="icon" href="b.png">"#,
        )
        .unwrap();
        assert_eq!(hit.url, "https://example.com/dir/b.png");
    }

    #[test]
    fn test_protocol_relative_href_defaults_to_https() {
        let hit = parse("example.com", r#"<link rel="icon" href="//cdn.example.com/x.ico">"#)
            .unwrap();
        assert_eq!(hit.url, "https://cdn.example.com/x.ico");
    }

    #[test]
    fn test_relative_href_without_host_is_dropped() {
        assert!(parse("/local/page", r#"<link rel="icon" href="/x.ico">"#).is_none());
    }

    #[test]
    fn test_rel_outside_types_is_rejected() {
        assert!(
            parse(
                "https://example.com/",
                r#"<link rel="stylesheet" href="/a.css">"#
            )
            .is_none()
        );
    }

    #[test]
    fn test_multi_valued_rel() {
        let hit = parse(
            "https://example.com/",
            r#"<link rel="shortcut  icon" href="/favicon.ico">"#,
        );
        assert!(hit.is_some());
    }

    #[test]
    fn test_rel_tokens_ignore_case() {
        let hit = parse("https://example.com/", r#"<LINK REL="Icon" HREF="/f.ico">"#);
        assert_eq!(hit.unwrap().url, "https://example.com/f.ico");
    }

    #[test]
    fn test_other_types_are_configurable() {
        let types = BTreeSet::from(["apple-touch-icon".to_string()]);
        let base = PageUri::parse("https://example.com/");
        let tag = r#"<link rel="apple-touch-icon" href="/apple.png">"#;
        assert!(parse_link_tag(&base, tag, &types).is_some());
        assert!(parse_link_tag(&base, tag, &icon_types()).is_none());
    }

    #[test]
    fn test_missing_rel_or_href() {
        assert!(parse("https://example.com/", r#"<link href="/f.ico">"#).is_none());
        assert!(parse("https://example.com/", r#"<link rel="icon">"#).is_none());
        assert!(parse("https://example.com/", r#"<link rel="icon" href="  ">"#).is_none());
    }

    #[test]
    fn test_unterminated_quote_is_rejected() {
        assert!(parse("https://example.com/", r#"<link rel="icon href=/f.ico>"#).is_none());
        assert!(parse("https://example.com/", r#"<link rel="icon" href="/f.ico>"#).is_none());
    }

    #[test]
    fn test_attribute_order_and_whitespace() {
        let hit = parse(
            "https://example.com/",
            "<link\n\thref = \"/f.png\"\n\tsizes= \"16X16\"\n\trel =\"icon\"\n/>",
        )
        .unwrap();
        assert_eq!(hit.url, "https://example.com/f.png");
        assert_eq!(
            hit.size,
            Some(IconSize {
                width: 16,
                height: 16
            })
        );
    }

    #[test]
    fn test_single_quoted_attributes() {
        let hit = parse("https://example.com/", "<link rel='icon' href='/f.svg'>").unwrap();
        assert_eq!(hit.url, "https://example.com/f.svg");
    }

    #[test]
    fn test_sizes() {
        let hit = parse(
            "https://example.com/",
            r#"<link rel="icon" sizes="32x32" href="/f.png">"#,
        )
        .unwrap();
        assert_eq!(
            hit.size,
            Some(IconSize {
                width: 32,
                height: 32
            })
        );

        let first = parse(
            "https://example.com/",
            r#"<link rel="icon" sizes="16x16 48x48" href="/f.ico">"#,
        )
        .unwrap();
        assert_eq!(first.size.unwrap().width, 16);
    }

    #[test]
    fn test_unusable_sizes_are_ignored() {
        for sizes in ["any", "99999999999x1", "32"] {
            let tag = format!(r#"<link rel="icon" sizes="{sizes}" href="/f.png">"#);
            let hit = parse("https://example.com/", &tag).unwrap();
            assert_eq!(hit.size, None, "sizes={sizes}");
        }
    }

    #[test]
    fn test_extract_preserves_document_order() {
        let html = r#"
<html><head>
<link rel="icon" href="/one.png">
<link rel="stylesheet" href="/style.css">
<link rel="icon" href="/two.png">
<meta name="x" content="y">
<link rel="icon" href="/three.png" />
</head></html>
"#;
        let found = extract_link_candidates(
            &PageUri::parse("https://example.com/"),
            html,
            &icon_types(),
        );
        let urls: Vec<_> = found.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/one.png",
                "https://example.com/two.png",
                "https://example.com/three.png",
            ]
        );
    }

    #[test]
    fn test_extract_skips_malformed_and_continues() {
        let html = r#"<link rel="icon" href="/broken><link rel="icon" href="/ok.ico">"#;
        let found = extract_link_candidates(
            &PageUri::parse("https://example.com/"),
            html,
            &icon_types(),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://example.com/ok.ico");
    }

    #[test]
    fn test_extract_ignores_lookalike_tags() {
        let html = r#"<linkage rel="icon" href="/no.ico"><a rel="icon" href="/no2.ico">"#;
        let found = extract_link_candidates(
            &PageUri::parse("https://example.com/"),
            html,
            &icon_types(),
        );
        assert!(found.is_empty());
    }

    proptest! {
        #[test]
        fn prop_absolute_href_is_verbatim(
            href in "https?://[a-z0-9]{1,12}(\\.[a-z]{2,6}){1,2}(/[A-Za-z0-9._~-]{0,12}){0,4}"
        ) {
            let tag = format!(r#"<link rel="icon" href="{href}">"#);
            let hit = parse("https://base.example/", &tag).unwrap();
            prop_assert_eq!(hit.url, href);
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn get(&self, request: &HttpRequest) -> crate::Result<HttpResponse> {
            Err(Error::Timeout(request.url.clone()))
        }
    }

    #[tokio::test]
    async fn test_discover_swallows_transport_errors() {
        let found = discover_from_html(
            &FailingTransport,
            "https://example.com/",
            &EffectiveOptions::default(),
        )
        .await;
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_discover_from_served_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs/index.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<head><link rel="icon" href="icon.svg"><link rel="icon" href="/root.ico" sizes="48x48"></head>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let uri = format!("{}/docs/index.html", server.uri());
        let found = discover_from_html(&transport, &uri, &EffectiveOptions::default()).await;

        assert_eq!(
            found,
            vec![
                FaviconCandidate::new(format!("{}/docs/icon.svg", server.uri())),
                FaviconCandidate::with_size(format!("{}/root.ico", server.uri()), 48, 48),
            ]
        );
    }

    #[tokio::test]
    async fn test_discover_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let found = discover_from_html(&transport, &server.uri(), &EffectiveOptions::default())
            .await;
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_discover_uses_configured_types() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<link rel="apple-touch-icon" href="/apple.png"><link rel="icon" href="/f.ico">"#,
            ))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new().unwrap();
        let options = ResolutionOptions::default()
            .with_types(["apple-touch-icon"])
            .effective();
        let found = discover_from_html(&transport, &server.uri(), &options).await;

        assert_eq!(found.len(), 1);
        assert!(found[0].url.ends_with("/apple.png"));
    }
}
