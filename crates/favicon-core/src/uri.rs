//! Page URI decomposition and href resolution.
//!
//! Inputs are loosely typed: callers pass full URLs (`https://example.com/a`),
//! bare hosts (`example.com`), protocol-relative forms (`//example.com`) or
//! paths. [`PageUri::parse`] never fails; it records whichever of scheme, host
//! and path it could recognise, and the discovery stages decide what they can
//! do with the parts that are missing.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Scheme followed by an authority marker, e.g. `https://`.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*)://").unwrap());

/// Scheme used when a protocol-relative href meets a scheme-less page URI.
pub const DEFAULT_SCHEME: &str = "https";

/// The parts of a page URI that favicon discovery cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUri {
    scheme: Option<String>,
    host: Option<String>,
    path: String,
}

impl PageUri {
    /// Decompose `input` into scheme, host (with port) and path.
    ///
    /// A scheme is only recognised when followed by `://`. Without one, a
    /// leading `//` or a leading non-slash segment is taken as the host, and a
    /// single leading `/` means there is no host at all.
    ///
    /// ```rust
    /// use favicon_core::uri::PageUri;
    ///
    /// let page = PageUri::parse("https://Example.com:8443/docs/index.html");
    /// assert_eq!(page.scheme(), Some("https"));
    /// assert_eq!(page.host(), Some("example.com:8443"));
    /// assert_eq!(page.path(), "/docs/index.html");
    ///
    /// let bare = PageUri::parse("example.com/about");
    /// assert_eq!(bare.scheme(), None);
    /// assert_eq!(bare.host(), Some("example.com"));
    /// ```
    pub fn parse(input: &str) -> Self {
        let input = input.trim();

        if let Some(caps) = SCHEME_RE.captures(input) {
            let scheme = caps[1].to_ascii_lowercase();
            if let Ok(parsed) = Url::parse(input) {
                if let Some(host) = parsed.host_str() {
                    let host = parsed
                        .port()
                        .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));
                    return Self {
                        scheme: Some(scheme),
                        host: Some(host),
                        path: parsed.path().to_string(),
                    };
                }
            }
            let (host, path) = split_authority(&input[caps[0].len()..]);
            return Self {
                scheme: Some(scheme),
                host,
                path,
            };
        }

        if let Some(rest) = input.strip_prefix("//") {
            let (host, path) = split_authority(rest);
            return Self {
                scheme: None,
                host,
                path,
            };
        }

        if input.starts_with('/') {
            return Self {
                scheme: None,
                host: None,
                path: strip_query_and_fragment(input).to_string(),
            };
        }

        let (host, path) = split_authority(input);
        Self {
            scheme: None,
            host,
            path,
        }
    }

    /// Lower-cased scheme without the trailing colon.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Host including a non-default port.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Path component, empty when the input had none.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `<scheme>://<host>` when both parts are known.
    pub fn origin(&self) -> Option<String> {
        Some(format!("{}://{}", self.scheme()?, self.host()?))
    }

    /// Directory that relative hrefs resolve against, without trailing slash.
    ///
    /// `/dir/page` and `/dir/` both yield `/dir`; `/page` and `/` yield an
    /// empty string.
    pub fn directory(&self) -> &str {
        let path = self.path.as_str();
        if let Some(trimmed) = path.strip_suffix('/') {
            return trimmed;
        }
        path.rfind('/').map_or("", |idx| &path[..idx])
    }

    /// Resolve an href found on this page into an absolute URL.
    ///
    /// Returns `None` when the href needs a host this page URI does not have.
    ///
    /// ```rust
    /// use favicon_core::uri::PageUri;
    ///
    /// let page = PageUri::parse("https://example.com/dir/page");
    /// assert_eq!(
    ///     page.resolve_href("b.png").as_deref(),
    ///     Some("https://example.com/dir/b.png")
    /// );
    /// assert_eq!(
    ///     page.resolve_href("/a/b.png").as_deref(),
    ///     Some("https://example.com/a/b.png")
    /// );
    /// ```
    pub fn resolve_href(&self, href: &str) -> Option<String> {
        if is_absolute_http(href) {
            return Some(href.to_string());
        }

        let scheme = self.scheme().unwrap_or(DEFAULT_SCHEME);
        if let Some(rest) = href.strip_prefix("//") {
            return Some(format!("{scheme}://{rest}"));
        }

        let host = self.host()?;
        if href.starts_with('/') {
            Some(format!("{scheme}://{host}{href}"))
        } else {
            Some(format!("{scheme}://{host}{}/{href}", self.directory()))
        }
    }
}

/// Whether `href` starts with `http://` or `https://`, ignoring ASCII case.
pub fn is_absolute_http(href: &str) -> bool {
    let starts_with = |prefix: &str| {
        href.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };
    starts_with("http://") || starts_with("https://")
}

/// Split `host[:port][/path][?query][#fragment]` into host and path.
fn split_authority(rest: &str) -> (Option<String>, String) {
    let rest = strip_query_and_fragment(rest);
    let (authority, path) = rest
        .find('/')
        .map_or((rest, ""), |idx| (&rest[..idx], &rest[idx..]));

    // Drop userinfo, keep host and port
    let authority = authority
        .rfind('@')
        .map_or(authority, |idx| &authority[idx + 1..]);

    let host = (!authority.is_empty()).then(|| authority.to_ascii_lowercase());
    (host, path.to_string())
}

fn strip_query_and_fragment(input: &str) -> &str {
    input
        .find(['?', '#'])
        .map_or(input, |idx| &input[..idx])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_url() {
        let page = PageUri::parse("https://example.com/dir/page?q=1#top");
        assert_eq!(page.scheme(), Some("https"));
        assert_eq!(page.host(), Some("example.com"));
        assert_eq!(page.path(), "/dir/page");
        assert_eq!(page.origin().as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_parse_keeps_non_default_port() {
        let page = PageUri::parse("http://127.0.0.1:4321/");
        assert_eq!(page.host(), Some("127.0.0.1:4321"));
        assert_eq!(page.origin().as_deref(), Some("http://127.0.0.1:4321"));
    }

    #[test]
    fn test_parse_drops_default_port() {
        let page = PageUri::parse("https://example.com:443/x");
        assert_eq!(page.host(), Some("example.com"));
    }

    #[test]
    fn test_parse_bare_host() {
        let page = PageUri::parse("example.com");
        assert_eq!(page.scheme(), None);
        assert_eq!(page.host(), Some("example.com"));
        assert_eq!(page.path(), "");
        assert_eq!(page.origin(), None);
    }

    #[test]
    fn test_parse_bare_host_with_port_and_path() {
        let page = PageUri::parse("localhost:8080/app/");
        assert_eq!(page.scheme(), None);
        assert_eq!(page.host(), Some("localhost:8080"));
        assert_eq!(page.path(), "/app/");
    }

    #[test]
    fn test_parse_protocol_relative() {
        let page = PageUri::parse("//Example.com/page");
        assert_eq!(page.scheme(), None);
        assert_eq!(page.host(), Some("example.com"));
        assert_eq!(page.path(), "/page");
    }

    #[test]
    fn test_parse_path_only_has_no_host() {
        let page = PageUri::parse("/just/a/path");
        assert_eq!(page.host(), None);
        assert_eq!(page.path(), "/just/a/path");
    }

    #[test]
    fn test_parse_empty_has_nothing() {
        let page = PageUri::parse("   ");
        assert_eq!(page.scheme(), None);
        assert_eq!(page.host(), None);
        assert_eq!(page.path(), "");
    }

    #[test]
    fn test_parse_strips_userinfo() {
        let page = PageUri::parse("user:pw@example.com/a");
        assert_eq!(page.host(), Some("example.com"));
    }

    #[test]
    fn test_directory() {
        assert_eq!(PageUri::parse("https://e.com/dir/page").directory(), "/dir");
        assert_eq!(PageUri::parse("https://e.com/dir/").directory(), "/dir");
        assert_eq!(PageUri::parse("https://e.com/page").directory(), "");
        assert_eq!(PageUri::parse("https://e.com/").directory(), "");
        assert_eq!(PageUri::parse("e.com").directory(), "");
    }

    #[test]
    fn test_resolve_absolute_is_verbatim() {
        let page = PageUri::parse("https://example.com/");
        assert_eq!(
            page.resolve_href("HTTP://Other.com/x.ico").as_deref(),
            Some("HTTP://Other.com/x.ico")
        );
    }

    #[test]
    fn test_resolve_protocol_relative_uses_page_scheme() {
        let page = PageUri::parse("http://example.com/");
        assert_eq!(
            page.resolve_href("//cdn.example.com/x.ico").as_deref(),
            Some("http://cdn.example.com/x.ico")
        );
    }

    #[test]
    fn test_resolve_protocol_relative_defaults_to_https() {
        let page = PageUri::parse("example.com");
        assert_eq!(
            page.resolve_href("//cdn.example.com/x.ico").as_deref(),
            Some("https://cdn.example.com/x.ico")
        );

        let hostless = PageUri::parse("/local");
        assert_eq!(
            hostless.resolve_href("//cdn.example.com/x.ico").as_deref(),
            Some("https://cdn.example.com/x.ico")
        );
    }

    #[test]
    fn test_resolve_root_relative() {
        let page = PageUri::parse("https://example.com/page");
        assert_eq!(
            page.resolve_href("/a/b.png").as_deref(),
            Some("https://example.com/a/b.png")
        );
    }

    #[test]
    fn test_resolve_path_relative() {
        let page = PageUri::parse("https://example.com/dir/page");
        assert_eq!(
            page.resolve_href("b.png").as_deref(),
            Some("https://example.com/dir/b.png")
        );

        let root = PageUri::parse("https://example.com");
        assert_eq!(
            root.resolve_href("b.png").as_deref(),
            Some("https://example.com/b.png")
        );
    }

    #[test]
    fn test_resolve_without_host_is_rejected() {
        let page = PageUri::parse("/no/host");
        assert_eq!(page.resolve_href("/icon.png"), None);
        assert_eq!(page.resolve_href("icon.png"), None);
    }

    #[test]
    fn test_is_absolute_http() {
        assert!(is_absolute_http("http://a"));
        assert!(is_absolute_http("HTTPS://a"));
        assert!(!is_absolute_http("//a"));
        assert!(!is_absolute_http("ftp://a"));
        assert!(!is_absolute_http("h"));
    }
}
