//! # favicon-core
//!
//! Find the favicons of a web page.
//!
//! Resolution is a best-effort, two-stage heuristic:
//!
//! 1. **Declared icons**: fetch the page and read the `<link rel="icon">`
//!    tags in its markup. Relative hrefs are resolved against the page URL
//!    and `sizes="WxH"` is reported when present.
//! 2. **Guessed icons**: if the page declares none, probe `favicon.ico`,
//!    `favicon.png`, `favicon.gif` and `favicon.svg` at the origin root and
//!    keep the ones served with an `image/*` content type.
//!
//! No JavaScript is run, no DOM is built and image bytes are never decoded.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use favicon_core::{ResolutionOptions, resolve};
//!
//! # async fn example() {
//! let icons = resolve("https://www.rust-lang.org", &ResolutionOptions::default()).await;
//! if let Some(icon) = icons.first() {
//!     println!("favicon: {}", icon.url);
//! }
//! # }
//! ```
//!
//! ## Options
//!
//! [`ResolutionOptions`] selects the accepted `rel` keywords (default
//! `icon`), the per-request timeout (default 5 s) and extra request headers,
//! merged over a browser-like default User-Agent.
//!
//! ## Error Handling
//!
//! [`resolve`] and [`FaviconResolver::resolve`] never fail: network errors,
//! timeouts and malformed markup all shrink the result rather than abort it.
//! [`Error`] is only returned where a caller can act on it, such as building
//! the HTTP client or loading options from TOML.
//!
//! ## Custom transports
//!
//! Requests go through the [`Transport`] trait. [`ReqwestTransport`] is the
//! default; implement the trait to route requests elsewhere or to observe
//! them in tests.

/// Resolution options and their defaults
pub mod config;
/// Declared-icon and guessed-icon discovery stages
pub mod discovery;
/// Error types and result aliases
pub mod error;
/// Two-stage resolution orchestrator
pub mod resolver;
/// HTTP collaborator trait and the reqwest implementation
pub mod transport;
/// Result value objects
pub mod types;
/// Page URI decomposition and href resolution
pub mod uri;

pub use config::{DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT, EffectiveOptions, ResolutionOptions};
pub use error::{Error, Result};
pub use resolver::FaviconResolver;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use types::{FaviconCandidate, IconSize};

use tracing::warn;

/// Find the favicons of `uri` using the default HTTP transport.
///
/// Shorthand for [`FaviconResolver::new`] followed by
/// [`FaviconResolver::resolve`]. If the HTTP client cannot be built the
/// failure is logged and an empty list is returned.
pub async fn resolve(uri: &str, options: &ResolutionOptions) -> Vec<FaviconCandidate> {
    match FaviconResolver::new() {
        Ok(resolver) => resolver.resolve(uri, options).await,
        Err(e) => {
            warn!(error = %e, "Failed to build HTTP client");
            Vec::new()
        },
    }
}
