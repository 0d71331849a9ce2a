//! The two favicon discovery stages.
//!
//! - [`link`] reads the icons a page declares in its `<link>` tags.
//! - [`guess`] probes well-known file names at the page's origin.
//!
//! [`FaviconResolver`](crate::FaviconResolver) runs them in that order and
//! only falls back to guessing when the page declares nothing usable. Both
//! stages are usable on their own with any [`Transport`](crate::Transport).

pub mod guess;
pub mod link;

pub use guess::{FAVICON_FILENAMES, discover_by_guessing};
pub use link::{discover_from_html, extract_link_candidates, parse_link_tag};
