//! Application data embedded from TOML files at compile time.
//!
//! This module provides access to application-level constants that are:
//! - Embedded at compile time via `include_str!`
//! - Parsed lazily on first access via `OnceLock`
//! - Immutable at runtime (not user-configurable)
//!
//! This is distinct from `config.rs` which handles user preferences.
//! App data defines *how the stores are read* (markup patterns, overlay copy),
//! while config defines *user choices* (store links, timeouts).
//!
//! Data files are located in `embedded/`:
//! - `store_patterns.toml` - Regular expressions for each store's listing markup
//! - `overlay_copy.toml` - Default text for the update and what's-new overlays

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

// Embed data files at compile time
const STORE_PATTERNS_TOML: &str = include_str!("../embedded/store_patterns.toml");
const OVERLAY_COPY_TOML: &str = include_str!("../embedded/overlay_copy.toml");

// ============================================================================
// Store Patterns
// ============================================================================

/// Markup patterns for every supported store
#[derive(Debug, Deserialize)]
pub struct StorePatterns {
    pub app_store: AppStorePatterns,
    pub play_store: PlayStorePatterns,
}

#[derive(Debug, Deserialize)]
pub struct AppStorePatterns {
    pub version: String,
    pub container: String,
    pub changelog: String,
    pub line_break: String,
}

#[derive(Debug, Deserialize)]
pub struct PlayStorePatterns {
    pub version: String,
    pub changelog: String,
    pub line_break: String,
}

/// Get store patterns (lazy-loaded)
pub fn store_patterns() -> &'static StorePatterns {
    static PATTERNS: OnceLock<StorePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        toml::from_str(STORE_PATTERNS_TOML).unwrap_or_else(|e| {
            panic!("Failed to parse store_patterns.toml: {}", e);
        })
    })
}

/// Compile an embedded pattern, panicking with its name on failure.
///
/// Patterns are compile-time data, so a bad one is a build defect.
pub fn compile_pattern(name: &str, pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| {
        panic!("Invalid embedded pattern {}: {}", name, e);
    })
}

// ============================================================================
// Overlay Copy
// ============================================================================

/// Default text shown on the overlays
#[derive(Debug, Deserialize)]
pub struct OverlayCopy {
    pub update: UpdateCopy,
    pub whats_new: WhatsNewCopy,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCopy {
    pub title: String,
    pub description: String,
    pub button: String,
    pub dismiss_button: String,
}

#[derive(Debug, Deserialize)]
pub struct WhatsNewCopy {
    pub title: String,
    pub version_prefix: String,
    pub button: String,
}

/// Get overlay copy (lazy-loaded)
pub fn overlay_copy() -> &'static OverlayCopy {
    static COPY: OnceLock<OverlayCopy> = OnceLock::new();
    COPY.get_or_init(|| {
        toml::from_str(OVERLAY_COPY_TOML).unwrap_or_else(|e| {
            panic!("Failed to parse overlay_copy.toml: {}", e);
        })
    })
}
