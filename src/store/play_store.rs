//! Secondary store (Play Store) listing scraper.

use regex::Regex;
use std::sync::OnceLock;

use super::{changelog_text, normalize_version_token, StoreStrategy};
use crate::app_data::{compile_pattern, store_patterns};

struct Patterns {
    version: Regex,
    changelog: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let config = &store_patterns().play_store;
        Patterns {
            version: compile_pattern("play_store.version", &config.version),
            changelog: compile_pattern("play_store.changelog", &config.changelog),
        }
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlayStoreStrategy;

impl PlayStoreStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl StoreStrategy for PlayStoreStrategy {
    fn name(&self) -> &'static str {
        "play-store"
    }

    fn extract_version(&self, page: &str) -> Option<String> {
        let captures = patterns().version.captures(page)?;
        normalize_version_token(captures.get(1)?.as_str())
    }

    fn extract_changelog(&self, page: &str) -> Option<String> {
        let captures = patterns().changelog.captures(page)?;
        changelog_text(captures.get(1)?.as_str())
    }

    fn line_break(&self) -> &str {
        &store_patterns().play_store.line_break
    }
}
