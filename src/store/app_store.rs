//! Primary store (App Store) listing scraper.
//!
//! The version is read from the "Version 1.2.3" label of the version history.
//! Release notes live in a truncated multi-line container; the text is the
//! first bidi-marked paragraph inside that container.

use regex::Regex;
use std::sync::OnceLock;

use super::{changelog_text, normalize_version_token, StoreStrategy};
use crate::app_data::{compile_pattern, store_patterns};

struct Patterns {
    version: Regex,
    container: Regex,
    changelog: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let config = &store_patterns().app_store;
        Patterns {
            version: compile_pattern("app_store.version", &config.version),
            container: compile_pattern("app_store.container", &config.container),
            changelog: compile_pattern("app_store.changelog", &config.changelog),
        }
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AppStoreStrategy;

impl AppStoreStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl StoreStrategy for AppStoreStrategy {
    fn name(&self) -> &'static str {
        "app-store"
    }

    fn extract_version(&self, page: &str) -> Option<String> {
        let captures = patterns().version.captures(page)?;
        normalize_version_token(captures.get(1)?.as_str())
    }

    fn extract_changelog(&self, page: &str) -> Option<String> {
        let patterns = patterns();
        // Only the first container is considered
        let container = patterns.container.find(page)?;
        let captures = patterns.changelog.captures(container.as_str())?;
        changelog_text(captures.get(1)?.as_str())
    }

    fn line_break(&self) -> &str {
        &store_patterns().app_store.line_break
    }
}
