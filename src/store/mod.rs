//! Store listing access: fetching product pages and scraping them.
//!
//! This module handles:
//! - Selecting the store for the target platform (`Platform`, `StoreLinks`)
//! - Downloading listing pages through a pluggable `PageFetcher`
//! - Extracting the published version and release notes with a per-store
//!   `StoreStrategy`
//! - Opening the listing in the system browser / store app
//!
//! Adding a store means adding a `StoreStrategy` implementation and a
//! `Platform` arm in `strategy_for`; the decision engine is untouched.

mod app_store;
mod fetch;
mod link;
mod play_store;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::version::{MalformedVersionError, Version};

pub use app_store::AppStoreStrategy;
pub use fetch::{HttpFetcher, PageFetcher, DEFAULT_TIMEOUT_SECS};
pub use link::{open_store_link, LinkOpener, SystemOpener};
pub use play_store::PlayStoreStrategy;

/// Target platform, which decides the store consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    /// Platform of the build target
    pub fn current() -> Self {
        if cfg!(any(target_os = "ios", target_os = "macos")) {
            Platform::Ios
        } else {
            Platform::Android
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            other => Err(format!("unknown platform '{}' (expected ios or android)", other)),
        }
    }
}

/// Store listing URLs for both platforms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreLinks {
    pub ios: Option<String>,
    pub android: Option<String>,
}

impl StoreLinks {
    pub fn new(ios: impl Into<String>, android: impl Into<String>) -> Self {
        Self {
            ios: Some(ios.into()),
            android: Some(android.into()),
        }
    }

    /// Link for the platform, if configured and non-empty
    pub fn for_platform(&self, platform: Platform) -> Option<&str> {
        let link = match platform {
            Platform::Ios => self.ios.as_deref(),
            Platform::Android => self.android.as_deref(),
        };
        link.filter(|l| !l.trim().is_empty())
    }

    /// Like `for_platform`, but missing links are an error
    pub fn require(&self, platform: Platform) -> Result<&str> {
        self.for_platform(platform)
            .ok_or(Error::MissingLink(platform.as_str()))
    }
}

/// What could be scraped from a listing page.
///
/// Both fields are optional: a pattern that finds nothing leaves its field
/// empty instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreMetadata {
    /// Raw version token, normalized (trimmed, no trailing dots)
    pub latest_version: Option<String>,
    /// Inner text of the release notes element
    pub changelog: Option<String>,
}

impl StoreMetadata {
    /// Parse the scraped version token
    pub fn parsed_version(&self) -> std::result::Result<Option<Version>, MalformedVersionError> {
        self.latest_version.as_deref().map(Version::parse).transpose()
    }
}

/// Store-specific markup scraping.
///
/// Implementations only look at page text; fetching is the caller's job so
/// one downloaded page can serve both extractions.
pub trait StoreStrategy: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Latest published version, if the page shows one
    fn extract_version(&self, page: &str) -> Option<String>;

    /// Release notes snippet, if the page shows one
    fn extract_changelog(&self, page: &str) -> Option<String>;

    /// Separator the store uses between changelog lines
    fn line_break(&self) -> &str;

    /// Run both extractions over one page
    fn extract(&self, page: &str) -> StoreMetadata {
        StoreMetadata {
            latest_version: self.extract_version(page),
            changelog: self.extract_changelog(page),
        }
    }
}

/// Pick the scraping strategy for a platform
pub fn strategy_for(platform: Platform) -> Box<dyn StoreStrategy> {
    match platform {
        Platform::Ios => Box::new(AppStoreStrategy::new()),
        Platform::Android => Box::new(PlayStoreStrategy::new()),
    }
}

/// Captured release notes; an empty element carries no changelog
pub(crate) fn changelog_text(raw: &str) -> Option<String> {
    (!raw.is_empty()).then(|| raw.to_string())
}

/// Clean up a captured version token.
///
/// Captures such as "1.2.3." happen when the version ends a sentence.
pub(crate) fn normalize_version_token(raw: &str) -> Option<String> {
    let token = raw.trim().trim_end_matches('.');
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Fetches one store's listing and scrapes it
#[derive(Clone)]
pub struct StoreMetadataFetcher {
    fetcher: Arc<dyn PageFetcher>,
    strategy: Arc<dyn StoreStrategy>,
    url: String,
}

impl StoreMetadataFetcher {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        strategy: Arc<dyn StoreStrategy>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            strategy,
            url: url.into(),
        }
    }

    /// Build a fetcher for the platform's store, using its link from `links`
    pub fn for_platform(
        fetcher: Arc<dyn PageFetcher>,
        platform: Platform,
        links: &StoreLinks,
    ) -> Result<Self> {
        let url = links.require(platform)?;
        Ok(Self::new(fetcher, Arc::from(strategy_for(platform)), url))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn strategy(&self) -> &dyn StoreStrategy {
        self.strategy.as_ref()
    }

    /// Download the listing page (one request)
    pub async fn fetch_page(&self) -> Result<String> {
        tracing::debug!("Fetching {} listing from {}", self.strategy.name(), self.url);
        self.fetcher.fetch_text(&self.url).await
    }

    /// Download the listing and extract version and changelog
    pub async fn fetch_metadata(&self) -> Result<StoreMetadata> {
        let page = self.fetch_page().await?;
        let metadata = self.strategy.extract(&page);

        if metadata.latest_version.is_none() {
            tracing::debug!("No version found on {} listing", self.strategy.name());
        }
        Ok(metadata)
    }

    /// Download the listing and extract only the changelog
    pub async fn fetch_changelog(&self) -> Result<Option<String>> {
        let page = self.fetch_page().await?;
        Ok(self.strategy.extract_changelog(&page))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::StaticFetcher;
    use super::*;

    #[test]
    fn test_platform_parse() {
        assert_eq!("ios".parse::<Platform>().unwrap(), Platform::Ios);
        assert_eq!(" Android ".parse::<Platform>().unwrap(), Platform::Android);
        assert!("windows".parse::<Platform>().is_err());
        assert_eq!(Platform::Ios.to_string(), "ios");
    }

    #[test]
    fn test_links_for_platform() {
        let links = StoreLinks::new("https://example.com/ios", "https://example.com/android");
        assert_eq!(links.for_platform(Platform::Ios), Some("https://example.com/ios"));
        assert_eq!(
            links.for_platform(Platform::Android),
            Some("https://example.com/android")
        );

        let links = StoreLinks {
            ios: Some("  ".to_string()),
            android: None,
        };
        assert!(links.for_platform(Platform::Ios).is_none());
        assert!(matches!(
            links.require(Platform::Android),
            Err(Error::MissingLink("android"))
        ));
    }

    #[test]
    fn test_normalize_version_token() {
        assert_eq!(normalize_version_token(" 1.2.3 ").as_deref(), Some("1.2.3"));
        assert_eq!(normalize_version_token("1.2.3.").as_deref(), Some("1.2.3"));
        assert_eq!(normalize_version_token("."), None);
        assert_eq!(normalize_version_token(""), None);
    }

    #[test]
    fn test_strategy_for_platform() {
        assert_eq!(strategy_for(Platform::Ios).name(), "app-store");
        assert_eq!(strategy_for(Platform::Android).name(), "play-store");
    }

    #[test]
    fn test_parsed_version() {
        let metadata = StoreMetadata {
            latest_version: Some("1.2.3".to_string()),
            changelog: None,
        };
        assert_eq!(
            metadata.parsed_version().unwrap(),
            Some(Version::parse("1.2.3").unwrap())
        );

        let metadata = StoreMetadata::default();
        assert_eq!(metadata.parsed_version().unwrap(), None);

        let metadata = StoreMetadata {
            latest_version: Some("1..3".to_string()),
            changelog: None,
        };
        assert!(metadata.parsed_version().is_err());
    }

    #[tokio::test]
    async fn test_fetch_metadata_single_request() {
        let fetcher = Arc::new(StaticFetcher::new(
            "<div class=\"we-truncate we-truncate--multi-line we-truncate--interactive \" dir>\
             <p dir=\"false\" data-test-bidi>Hello</p></div> Version 1.1.0 ",
        ));
        let links = StoreLinks::new("https://example.com/ios", "https://example.com/android");
        let store = StoreMetadataFetcher::for_platform(fetcher.clone(), Platform::Ios, &links)
            .unwrap();

        let metadata = store.fetch_metadata().await.unwrap();
        assert_eq!(metadata.latest_version.as_deref(), Some("1.1.0"));
        assert_eq!(metadata.changelog.as_deref(), Some("Hello"));
        assert_eq!(fetcher.requests(), 1);
    }

    #[tokio::test]
    async fn test_fetch_metadata_miss_is_not_an_error() {
        let fetcher = Arc::new(StaticFetcher::new("<html>nothing here</html>"));
        let store = StoreMetadataFetcher::new(
            fetcher,
            Arc::new(PlayStoreStrategy::new()),
            "https://example.com/android",
        );

        let metadata = store.fetch_metadata().await.unwrap();
        assert_eq!(metadata, StoreMetadata::default());
    }

    #[tokio::test]
    async fn test_fetch_metadata_network_error() {
        let fetcher = Arc::new(StaticFetcher::failing());
        let store = StoreMetadataFetcher::new(
            fetcher,
            Arc::new(AppStoreStrategy::new()),
            "https://example.com/ios",
        );

        let err = store.fetch_metadata().await.unwrap_err();
        assert!(err.is_network());
    }
}
