//! Opening store listings outside the app.

use super::{Platform, StoreLinks};
use crate::error::{Error, Result};

/// Platform mechanism that launches a URL
pub trait LinkOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Opens links with the system handler
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl LinkOpener for SystemOpener {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that(url)
    }
}

/// Open the listing for `platform`. Returns the URL that was opened.
pub fn open_store_link<'a>(
    opener: &dyn LinkOpener,
    platform: Platform,
    links: &'a StoreLinks,
) -> Result<&'a str> {
    let url = links.require(platform)?;

    opener.open(url).map_err(|source| Error::OpenLink {
        url: url.to_string(),
        source,
    })?;

    tracing::info!("Opened {} store listing: {}", platform, url);
    Ok(url)
}
