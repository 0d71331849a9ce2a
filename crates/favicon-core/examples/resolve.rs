//! Print the favicons of the URLs given on the command line.
//!
//! ```sh
//! cargo run -p favicon-core --example resolve -- https://www.rust-lang.org example.com
//! ```
//!
//! Set `FAVICON_DEBUG=1` for per-request logging on stderr and
//! `FAVICON_OPTIONS=path/to/options.toml` to load resolution options.

use favicon_core::{ResolutionOptions, resolve};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> favicon_core::Result<()> {
    let level = if std::env::var_os("FAVICON_DEBUG").is_some() {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| favicon_core::Error::Other(e.to_string()))?;

    let options = match std::env::var_os("FAVICON_OPTIONS") {
        Some(path) => ResolutionOptions::load(&PathBuf::from(path))?,
        None => ResolutionOptions::default(),
    };

    for uri in std::env::args().skip(1) {
        let icons = resolve(&uri, &options).await;
        if icons.is_empty() {
            println!("{uri}: no favicon found");
            continue;
        }
        for icon in icons {
            match icon.size {
                Some(size) => println!("{uri}: {} ({}x{})", icon.url, size.width, size.height),
                None => println!("{uri}: {}", icon.url),
            }
        }
    }

    Ok(())
}
