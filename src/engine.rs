//! Update state reconciliation.
//!
//! One evaluation fetches the store listing, compares its version with the
//! running one, consults the persisted keys and yields an [`Evaluation`]:
//! an optional [`UpdateDecision`] for the update prompt and an orthogonal
//! [`ChangelogDecision`] for the what's-new overlay.
//!
//! Policy:
//! - Major or minor gap: mandatory prompt on every evaluation.
//! - Patch gap: optional prompt, shown once per install (guarded by the
//!   `availableUpdate` sentinel).
//! - Running version differs from `storedVersion`: the app was upgraded,
//!   so the changelog is surfaced once and `storedVersion` is rewritten.
//!
//! Network and storage failures never escape an evaluation; they are logged
//! and degrade to "no decision" or "state unchanged".
//!
//! Both one-shot keys are only written by the newest evaluation. One that is
//! superseded before its write leaves the key alone and reports nothing for
//! it, so the newer evaluation still sees the untouched state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::db::{AVAILABLE_UPDATE_KEY, KeyValueStore, SHOWN_SENTINEL, STORED_VERSION_KEY};
use crate::store::{PageFetcher, Platform, StoreLinks, StoreMetadataFetcher};
use crate::version::{self, MalformedVersionError, Version};

/// Update prompt state for one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UpdateDecision {
    NoUpdate,
    UpdateAvailable { mandatory: bool },
}

impl UpdateDecision {
    /// Whether the prompt may be dismissed without updating
    pub fn is_dismissible(&self) -> bool {
        matches!(self, UpdateDecision::UpdateAvailable { mandatory: false })
    }
}

/// What's-new overlay state for one evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChangelogDecision {
    /// Nothing to announce
    Unchanged,
    /// The running version is new since the last launch
    AppJustUpdated { changelog: String, version: String },
}

impl ChangelogDecision {
    /// Changelog split on the store's line separator
    pub fn lines<'a>(&'a self, line_break: &str) -> Vec<&'a str> {
        match self {
            ChangelogDecision::Unchanged => Vec::new(),
            ChangelogDecision::AppJustUpdated { changelog, .. } => {
                changelog.split(line_break).collect()
            }
        }
    }
}

/// Result of one engine run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    /// Ticket taken when the evaluation started
    pub generation: u64,
    /// `None` when no decision could be made this cycle (fetch failure,
    /// malformed version, manual mode); callers keep their prior state
    pub update: Option<UpdateDecision>,
    pub changelog: ChangelogDecision,
}

/// What's-new feature settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhatsNew {
    pub enabled: bool,
    /// Static changelog used instead of scraping the store
    pub description: Option<String>,
}

impl Default for WhatsNew {
    fn default() -> Self {
        Self {
            enabled: true,
            description: None,
        }
    }
}

impl WhatsNew {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            description: None,
        }
    }

    /// Non-empty static description, if any
    fn static_description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }
}

/// Inputs for the automatic mode (engine decides the prompt)
#[derive(Debug, Clone)]
pub struct AutoUpdateRequest {
    pub current_version: String,
    pub links: StoreLinks,
    pub whats_new: WhatsNew,
}

/// Inputs for the manual mode (caller owns the prompt)
#[derive(Debug, Clone)]
pub struct ManualUpdateRequest {
    pub current_version: String,
    pub links: StoreLinks,
    pub mandatory: bool,
    pub whats_new: WhatsNew,
}

/// Fetch, compare, decide, persist
pub struct UpdateEngine {
    store: Arc<dyn KeyValueStore>,
    fetcher: Arc<dyn PageFetcher>,
    platform: Platform,
    generation: AtomicU64,
}

impl UpdateEngine {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn PageFetcher>,
        platform: Platform,
    ) -> Self {
        Self {
            store,
            fetcher,
            platform,
            generation: AtomicU64::new(0),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Start a new evaluation, invalidating every earlier one
    pub fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Most recently started evaluation
    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether `generation` is the most recently started evaluation
    pub fn is_current(&self, generation: u64) -> bool {
        self.latest_generation() == generation
    }

    /// Evaluate the update prompt and the what's-new overlay
    pub async fn evaluate_auto_update(&self, request: &AutoUpdateRequest) -> Evaluation {
        let generation = self.begin();
        self.run_auto(generation, request).await
    }

    /// Like `evaluate_auto_update`, with a generation already taken by `begin`
    pub async fn run_auto(&self, generation: u64, request: &AutoUpdateRequest) -> Evaluation {
        let store_fetcher = self.store_fetcher(&request.links);

        let page = match &store_fetcher {
            Some(store_fetcher) => match store_fetcher.fetch_page().await {
                Ok(page) => Some(page),
                Err(e) => {
                    tracing::warn!("Error fetching {} listing: {}", self.platform, e);
                    None
                }
            },
            None => None,
        };

        let update = match (&store_fetcher, &page) {
            (Some(store_fetcher), Some(page)) => {
                let latest = store_fetcher.strategy().extract_version(page);
                match self
                    .decide_from_token(generation, &request.current_version, latest.as_deref())
                    .await
                {
                    Ok(decision) => Some(decision),
                    Err(e) => {
                        tracing::warn!("Skipping update check: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        let changelog = if request.whats_new.enabled {
            self.check_just_updated(
                generation,
                &request.current_version,
                &request.whats_new,
                store_fetcher.as_ref(),
                page.as_deref(),
            )
            .await
        } else {
            ChangelogDecision::Unchanged
        };

        Evaluation {
            generation,
            update,
            changelog,
        }
    }

    /// Evaluate only the what's-new overlay; the prompt is the caller's
    pub async fn evaluate_manual_update(&self, request: &ManualUpdateRequest) -> Evaluation {
        let generation = self.begin();
        self.run_manual(generation, request).await
    }

    /// Like `evaluate_manual_update`, with a generation already taken by `begin`
    pub async fn run_manual(&self, generation: u64, request: &ManualUpdateRequest) -> Evaluation {
        let changelog = if request.whats_new.enabled {
            let store_fetcher = self.store_fetcher(&request.links);
            self.check_just_updated(
                generation,
                &request.current_version,
                &request.whats_new,
                store_fetcher.as_ref(),
                None,
            )
            .await
        } else {
            ChangelogDecision::Unchanged
        };

        Evaluation {
            generation,
            update: None,
            changelog,
        }
    }

    /// Decide the prompt for a scraped version token
    async fn decide_from_token(
        &self,
        generation: u64,
        current_version: &str,
        latest: Option<&str>,
    ) -> Result<UpdateDecision, MalformedVersionError> {
        let latest = latest.map(Version::parse).transpose()?;
        self.decide(Some(generation), current_version, latest.as_ref())
            .await
    }

    /// Decide the prompt for the running version against the store version.
    ///
    /// A patch-only gap reads and writes the `availableUpdate` sentinel.
    pub async fn decide_update(
        &self,
        current_version: &str,
        latest: Option<&Version>,
    ) -> Result<UpdateDecision, MalformedVersionError> {
        self.decide(None, current_version, latest).await
    }

    /// `generation` is the evaluation on whose behalf the sentinel is claimed;
    /// `None` claims it unconditionally.
    async fn decide(
        &self,
        generation: Option<u64>,
        current_version: &str,
        latest: Option<&Version>,
    ) -> Result<UpdateDecision, MalformedVersionError> {
        let Some(latest) = latest else {
            return Ok(UpdateDecision::NoUpdate);
        };

        let current = Version::parse(current_version)?;
        let comparison = version::compare(&current, latest);

        if !comparison.is_outdated() {
            return Ok(UpdateDecision::NoUpdate);
        }

        if !comparison.is_patch_only() {
            tracing::info!("Update required: {} -> {}", current, latest);
            return Ok(UpdateDecision::UpdateAvailable { mandatory: true });
        }

        let shown = match self.store.get(AVAILABLE_UPDATE_KEY).await {
            Ok(value) => value.is_some(),
            Err(e) => {
                tracing::warn!("Error reading {}: {}", AVAILABLE_UPDATE_KEY, e);
                false
            }
        };

        if shown {
            tracing::debug!("Optional update {} already offered", latest);
            return Ok(UpdateDecision::NoUpdate);
        }

        if !self.still_current(generation) {
            tracing::debug!("Superseded before offering optional update {}", latest);
            return Ok(UpdateDecision::NoUpdate);
        }

        if let Err(e) = self.store.set(AVAILABLE_UPDATE_KEY, SHOWN_SENTINEL).await {
            tracing::warn!("Error storing {}: {}", AVAILABLE_UPDATE_KEY, e);
        }

        tracing::info!("Optional update available: {} -> {}", current, latest);
        Ok(UpdateDecision::UpdateAvailable { mandatory: false })
    }

    /// Detect a completed upgrade and resolve its changelog.
    ///
    /// `page` is listing text already fetched in this evaluation, if any.
    async fn check_just_updated(
        &self,
        generation: u64,
        current_version: &str,
        whats_new: &WhatsNew,
        store_fetcher: Option<&StoreMetadataFetcher>,
        page: Option<&str>,
    ) -> ChangelogDecision {
        let stored = match self.store.get(STORED_VERSION_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Error reading {}: {}", STORED_VERSION_KEY, e);
                return ChangelogDecision::Unchanged;
            }
        };

        match stored.as_deref() {
            None => {
                if self.still_current(Some(generation)) {
                    self.store_current_version(current_version).await;
                }
                return ChangelogDecision::Unchanged;
            }
            Some(stored) if stored == current_version => {
                return ChangelogDecision::Unchanged;
            }
            Some(stored) => {
                if !self.still_current(Some(generation)) {
                    tracing::debug!("Superseded before recording update to {}", current_version);
                    return ChangelogDecision::Unchanged;
                }
                tracing::info!("App updated from {} to {}", stored, current_version);
                self.store_current_version(current_version).await;
            }
        }

        let changelog = match whats_new.static_description() {
            Some(description) => Some(description.to_string()),
            None => self.scrape_changelog(store_fetcher, page).await,
        };

        match changelog {
            Some(changelog) => ChangelogDecision::AppJustUpdated {
                changelog,
                version: current_version.to_string(),
            },
            None => ChangelogDecision::Unchanged,
        }
    }

    async fn scrape_changelog(
        &self,
        store_fetcher: Option<&StoreMetadataFetcher>,
        page: Option<&str>,
    ) -> Option<String> {
        let store_fetcher = store_fetcher?;

        if let Some(page) = page {
            return store_fetcher.strategy().extract_changelog(page);
        }

        match store_fetcher.fetch_changelog().await {
            Ok(changelog) => changelog,
            Err(e) => {
                tracing::warn!("Error fetching changelog: {}", e);
                None
            }
        }
    }

    fn still_current(&self, generation: Option<u64>) -> bool {
        generation.is_none_or(|generation| self.is_current(generation))
    }

    async fn store_current_version(&self, current_version: &str) {
        if let Err(e) = self.store.set(STORED_VERSION_KEY, current_version).await {
            tracing::warn!("Error storing current version: {}", e);
        }
    }

    fn store_fetcher(&self, links: &StoreLinks) -> Option<StoreMetadataFetcher> {
        match StoreMetadataFetcher::for_platform(self.fetcher.clone(), self.platform, links) {
            Ok(store_fetcher) => Some(store_fetcher),
            Err(e) => {
                tracing::warn!("Cannot check store: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::store::testing::StaticFetcher;

    const IOS_CHANGELOG_PAGE: &str = "<div class=\"we-truncate we-truncate--multi-line \
        we-truncate--interactive \" dir><p dir=\"false\" data-test-bidi>Hello</p></div> Version 1.1.0 ";

    struct Harness {
        store: Arc<MemoryStore>,
        fetcher: Arc<StaticFetcher>,
        engine: UpdateEngine,
    }

    fn harness(page: &str, platform: Platform) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(StaticFetcher::new(page));
        let engine = UpdateEngine::new(store.clone(), fetcher.clone(), platform);
        Harness {
            store,
            fetcher,
            engine,
        }
    }

    fn auto(current: &str) -> AutoUpdateRequest {
        AutoUpdateRequest {
            current_version: current.to_string(),
            links: StoreLinks::new("https://example.com/ios", "https://example.com/android"),
            whats_new: WhatsNew::default(),
        }
    }

    fn manual(current: &str, mandatory: bool) -> ManualUpdateRequest {
        ManualUpdateRequest {
            current_version: current.to_string(),
            links: StoreLinks::new("https://example.com/ios", "https://example.com/android"),
            mandatory,
            whats_new: WhatsNew::default(),
        }
    }

    const MANDATORY: Option<UpdateDecision> =
        Some(UpdateDecision::UpdateAvailable { mandatory: true });
    const OPTIONAL: Option<UpdateDecision> =
        Some(UpdateDecision::UpdateAvailable { mandatory: false });
    const NO_UPDATE: Option<UpdateDecision> = Some(UpdateDecision::NoUpdate);

    #[tokio::test]
    async fn test_minor_gap_is_mandatory() {
        let h = harness("Version 1.2.3", Platform::Ios);

        let result = h.engine.evaluate_auto_update(&auto("1.0.0")).await;
        assert_eq!(result.update, MANDATORY);
        assert_eq!(h.store.peek(AVAILABLE_UPDATE_KEY), None);
    }

    #[tokio::test]
    async fn test_mandatory_repeats_and_ignores_sentinel() {
        let h = harness("Version 2.0.0", Platform::Ios);
        h.store.set(AVAILABLE_UPDATE_KEY, SHOWN_SENTINEL).await.unwrap();

        for _ in 0..3 {
            let result = h.engine.evaluate_auto_update(&auto("1.9.9")).await;
            assert_eq!(result.update, MANDATORY);
        }
    }

    #[tokio::test]
    async fn test_patch_gap_shown_once() {
        let h = harness("Version 1.2.3", Platform::Ios);

        let first = h.engine.evaluate_auto_update(&auto("1.2.0")).await;
        assert_eq!(first.update, OPTIONAL);
        assert_eq!(
            h.store.peek(AVAILABLE_UPDATE_KEY).as_deref(),
            Some(SHOWN_SENTINEL)
        );

        let second = h.engine.evaluate_auto_update(&auto("1.2.0")).await;
        assert_eq!(second.update, NO_UPDATE);
    }

    #[tokio::test]
    async fn test_patch_prompt_returns_after_sentinel_cleared() {
        let h = harness("Version 1.2.3", Platform::Ios);

        h.engine.evaluate_auto_update(&auto("1.2.0")).await;
        h.store.remove(AVAILABLE_UPDATE_KEY).await.unwrap();

        let result = h.engine.evaluate_auto_update(&auto("1.2.0")).await;
        assert_eq!(result.update, OPTIONAL);
    }

    #[tokio::test]
    async fn test_sentinel_value_is_irrelevant() {
        let h = harness("Version 1.2.3", Platform::Ios);
        h.store.set(AVAILABLE_UPDATE_KEY, "anything").await.unwrap();

        let result = h.engine.evaluate_auto_update(&auto("1.2.0")).await;
        assert_eq!(result.update, NO_UPDATE);
    }

    #[tokio::test]
    async fn test_up_to_date_or_newer() {
        let h = harness("Version 1.2.3", Platform::Ios);

        assert_eq!(h.engine.evaluate_auto_update(&auto("1.2.3")).await.update, NO_UPDATE);
        assert_eq!(h.engine.evaluate_auto_update(&auto("1.3.0")).await.update, NO_UPDATE);
        assert_eq!(h.engine.evaluate_auto_update(&auto("1.2.3.0")).await.update, NO_UPDATE);
        assert_eq!(h.store.peek(AVAILABLE_UPDATE_KEY), None);
    }

    #[tokio::test]
    async fn test_numeric_patch_comparison() {
        let h = harness("Version 1.2.10", Platform::Ios);

        let result = h.engine.evaluate_auto_update(&auto("1.2.3")).await;
        assert_eq!(result.update, OPTIONAL);
    }

    #[tokio::test]
    async fn test_gap_beyond_patch_is_mandatory() {
        let h = harness("Version 1.2.3.4", Platform::Ios);

        let result = h.engine.evaluate_auto_update(&auto("1.2.3")).await;
        assert_eq!(result.update, MANDATORY);
    }

    #[tokio::test]
    async fn test_android_listing() {
        let h = harness(r#"<script>[[["1.4.2"]],null]</script>"#, Platform::Android);

        let result = h.engine.evaluate_auto_update(&auto("1.4.0")).await;
        assert_eq!(result.update, OPTIONAL);
    }

    #[tokio::test]
    async fn test_empty_release_notes_show_nothing() {
        let h = harness(r#"<div itemprop="description"></div>"#, Platform::Android);
        h.store.set(STORED_VERSION_KEY, "1.0.0").await.unwrap();

        let result = h.engine.evaluate_auto_update(&auto("1.1.0")).await;
        assert_eq!(result.changelog, ChangelogDecision::Unchanged);
        assert_eq!(h.store.peek(STORED_VERSION_KEY).as_deref(), Some("1.1.0"));
    }

    #[tokio::test]
    async fn test_version_miss_is_no_update() {
        let h = harness("<html>maintenance</html>", Platform::Ios);

        let result = h.engine.evaluate_auto_update(&auto("1.0.0")).await;
        assert_eq!(result.update, NO_UPDATE);
        assert_eq!(h.store.peek(AVAILABLE_UPDATE_KEY), None);
    }

    #[tokio::test]
    async fn test_network_failure_is_no_decision() {
        let h = harness("", Platform::Ios);
        let fetcher = Arc::new(StaticFetcher::failing());
        let engine = UpdateEngine::new(h.store.clone(), fetcher, Platform::Ios);

        let result = engine.evaluate_auto_update(&auto("1.0.0")).await;
        assert_eq!(result.update, None);
        // The just-updated check still records the running version
        assert_eq!(h.store.peek(STORED_VERSION_KEY).as_deref(), Some("1.0.0"));
    }

    #[tokio::test]
    async fn test_malformed_current_version_is_no_decision() {
        let h = harness("Version 1.2.3", Platform::Ios);

        let result = h.engine.evaluate_auto_update(&auto("1.2.beta")).await;
        assert_eq!(result.update, None);
        assert_eq!(h.store.peek(AVAILABLE_UPDATE_KEY), None);
    }

    #[tokio::test]
    async fn test_malformed_store_version_is_no_decision() {
        let h = harness("Version 1..3", Platform::Ios);

        let result = h.engine.evaluate_auto_update(&auto("1.2.0")).await;
        assert_eq!(result.update, None);
    }

    #[tokio::test]
    async fn test_missing_link_is_no_decision() {
        let h = harness("Version 9.0.0", Platform::Android);
        let mut request = auto("1.0.0");
        request.links.android = None;

        let result = h.engine.evaluate_auto_update(&request).await;
        assert_eq!(result.update, None);
        assert_eq!(h.fetcher.requests(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_still_prompts() {
        let h = harness("Version 1.2.3", Platform::Ios);
        h.store.set_fail_reads(true);
        h.store.set_fail_writes(true);

        let first = h.engine.evaluate_auto_update(&auto("1.2.0")).await;
        assert_eq!(first.update, OPTIONAL);
        assert_eq!(first.changelog, ChangelogDecision::Unchanged);

        // Nothing persisted, so the prompt comes back
        let second = h.engine.evaluate_auto_update(&auto("1.2.0")).await;
        assert_eq!(second.update, OPTIONAL);
    }

    #[tokio::test]
    async fn test_first_launch_records_version() {
        let h = harness("Version 1.0.0", Platform::Ios);

        let result = h.engine.evaluate_auto_update(&auto("1.0.0")).await;
        assert_eq!(result.changelog, ChangelogDecision::Unchanged);
        assert_eq!(h.store.peek(STORED_VERSION_KEY).as_deref(), Some("1.0.0"));

        // Second run with the same version is a no-op on the key
        let result = h.engine.evaluate_auto_update(&auto("1.0.0")).await;
        assert_eq!(result.changelog, ChangelogDecision::Unchanged);
        assert_eq!(h.store.peek(STORED_VERSION_KEY).as_deref(), Some("1.0.0"));
    }

    #[tokio::test]
    async fn test_just_updated_with_static_changelog() {
        let h = harness("Version 1.1.0", Platform::Ios);

        let first = h.engine.evaluate_auto_update(&auto("1.0.8")).await;
        assert_eq!(first.update, MANDATORY);
        assert_eq!(first.changelog, ChangelogDecision::Unchanged);

        let mut relaunch = auto("1.1.0");
        relaunch.whats_new.description = Some("New Content".to_string());
        let result = h.engine.evaluate_auto_update(&relaunch).await;

        assert_eq!(
            result.changelog,
            ChangelogDecision::AppJustUpdated {
                changelog: "New Content".to_string(),
                version: "1.1.0".to_string(),
            }
        );
        assert_eq!(result.update, NO_UPDATE);
        assert_eq!(h.store.peek(STORED_VERSION_KEY).as_deref(), Some("1.1.0"));
    }

    #[tokio::test]
    async fn test_just_updated_is_idempotent() {
        let h = harness("Version 1.1.0", Platform::Ios);
        h.store.set(STORED_VERSION_KEY, "1.0.8").await.unwrap();

        let mut request = auto("1.1.0");
        request.whats_new.description = Some("New Content".to_string());

        let first = h.engine.evaluate_auto_update(&request).await;
        assert!(matches!(first.changelog, ChangelogDecision::AppJustUpdated { .. }));

        let second = h.engine.evaluate_auto_update(&request).await;
        assert_eq!(second.changelog, ChangelogDecision::Unchanged);
    }

    #[tokio::test]
    async fn test_just_updated_scrapes_changelog_from_same_page() {
        let h = harness(IOS_CHANGELOG_PAGE, Platform::Ios);
        h.store.set(STORED_VERSION_KEY, "1.0.8").await.unwrap();

        let result = h.engine.evaluate_auto_update(&auto("1.1.0")).await;
        assert_eq!(
            result.changelog,
            ChangelogDecision::AppJustUpdated {
                changelog: "Hello".to_string(),
                version: "1.1.0".to_string(),
            }
        );
        assert_eq!(h.fetcher.requests(), 1);
    }

    #[tokio::test]
    async fn test_empty_static_description_falls_back_to_store() {
        let h = harness(IOS_CHANGELOG_PAGE, Platform::Ios);
        h.store.set(STORED_VERSION_KEY, "1.0.8").await.unwrap();

        let mut request = auto("1.1.0");
        request.whats_new.description = Some(String::new());

        let result = h.engine.evaluate_auto_update(&request).await;
        assert!(matches!(
            result.changelog,
            ChangelogDecision::AppJustUpdated { ref changelog, .. } if changelog == "Hello"
        ));
    }

    #[tokio::test]
    async fn test_just_updated_without_changelog_text() {
        let h = harness("Version 1.1.0", Platform::Ios);
        h.store.set(STORED_VERSION_KEY, "1.0.8").await.unwrap();

        let result = h.engine.evaluate_auto_update(&auto("1.1.0")).await;
        assert_eq!(result.changelog, ChangelogDecision::Unchanged);
        // The version is still recorded, so the overlay cannot show later
        assert_eq!(h.store.peek(STORED_VERSION_KEY).as_deref(), Some("1.1.0"));
    }

    #[tokio::test]
    async fn test_whats_new_disabled() {
        let h = harness(IOS_CHANGELOG_PAGE, Platform::Ios);
        h.store.set(STORED_VERSION_KEY, "1.0.8").await.unwrap();

        let mut request = auto("1.1.0");
        request.whats_new = WhatsNew::disabled();

        let result = h.engine.evaluate_auto_update(&request).await;
        assert_eq!(result.changelog, ChangelogDecision::Unchanged);
        assert_eq!(h.store.peek(STORED_VERSION_KEY).as_deref(), Some("1.0.8"));

        let result = h.engine.evaluate_auto_update(&auto("1.1.0")).await;
        assert!(matches!(result.changelog, ChangelogDecision::AppJustUpdated { .. }));
    }

    #[tokio::test]
    async fn test_manual_mode_fetches_only_for_changelog() {
        let h = harness(
            "<div itemprop=\"description\">Fixes<br>Speedups</div>",
            Platform::Android,
        );

        let result = h.engine.evaluate_manual_update(&manual("2.0.0", true)).await;
        assert_eq!(result.update, None);
        assert_eq!(result.changelog, ChangelogDecision::Unchanged);
        assert_eq!(h.fetcher.requests(), 0);

        let result = h.engine.evaluate_manual_update(&manual("2.1.0", true)).await;
        assert_eq!(
            result.changelog,
            ChangelogDecision::AppJustUpdated {
                changelog: "Fixes<br>Speedups".to_string(),
                version: "2.1.0".to_string(),
            }
        );
        assert_eq!(result.changelog.lines("<br>"), vec!["Fixes", "Speedups"]);
        assert_eq!(h.fetcher.requests(), 1);
    }

    #[tokio::test]
    async fn test_manual_mode_changelog_fetch_failure() {
        let store = Arc::new(MemoryStore::new());
        store.set(STORED_VERSION_KEY, "1.0.0").await.unwrap();
        let engine = UpdateEngine::new(
            store.clone(),
            Arc::new(StaticFetcher::failing()),
            Platform::Ios,
        );

        let result = engine.evaluate_manual_update(&manual("1.1.0", false)).await;
        assert_eq!(result.changelog, ChangelogDecision::Unchanged);
        assert_eq!(store.peek(STORED_VERSION_KEY).as_deref(), Some("1.1.0"));
    }

    #[tokio::test]
    async fn test_generations() {
        let h = harness("Version 1.0.0", Platform::Ios);

        let first = h.engine.evaluate_auto_update(&auto("1.0.0")).await;
        assert!(h.engine.is_current(first.generation));

        let second = h.engine.evaluate_auto_update(&auto("1.0.0")).await;
        assert!(second.generation > first.generation);
        assert!(!h.engine.is_current(first.generation));
        assert!(h.engine.is_current(second.generation));
    }

    #[tokio::test]
    async fn test_superseded_evaluation_leaves_one_shot_keys() {
        let h = harness("Version 1.2.3", Platform::Ios);
        h.store.set(STORED_VERSION_KEY, "1.0.8").await.unwrap();
        let mut request = auto("1.2.0");
        request.whats_new.description = Some("New Content".to_string());

        let older = h.engine.begin();
        let newer = h.engine.begin();

        let first = h.engine.run_auto(older, &request).await;
        assert_eq!(first.update, Some(UpdateDecision::NoUpdate));
        assert_eq!(first.changelog, ChangelogDecision::Unchanged);
        assert_eq!(h.store.peek(AVAILABLE_UPDATE_KEY), None);
        assert_eq!(h.store.peek(STORED_VERSION_KEY).as_deref(), Some("1.0.8"));

        let second = h.engine.run_auto(newer, &request).await;
        assert_eq!(
            second.update,
            Some(UpdateDecision::UpdateAvailable { mandatory: false })
        );
        assert_eq!(
            second.changelog,
            ChangelogDecision::AppJustUpdated {
                changelog: "New Content".to_string(),
                version: "1.2.0".to_string(),
            }
        );
        assert_eq!(h.store.peek(STORED_VERSION_KEY).as_deref(), Some("1.2.0"));
    }

    #[tokio::test]
    async fn test_superseded_first_launch_skips_version_write() {
        let h = harness("Version 1.0.0", Platform::Ios);
        let older = h.engine.begin();
        h.engine.begin();

        let evaluation = h.engine.run_auto(older, &auto("1.0.0")).await;
        assert_eq!(evaluation.changelog, ChangelogDecision::Unchanged);
        assert_eq!(h.store.peek(STORED_VERSION_KEY), None);
    }

    #[tokio::test]
    async fn test_decide_update_directly() {
        let h = harness("", Platform::Ios);
        let latest = Version::parse("3.0").unwrap();

        assert_eq!(
            h.engine.decide_update("2.9.9", Some(&latest)).await.unwrap(),
            UpdateDecision::UpdateAvailable { mandatory: true }
        );
        assert_eq!(
            h.engine.decide_update("2.9.9", None).await.unwrap(),
            UpdateDecision::NoUpdate
        );
        assert!(h.engine.decide_update("two", Some(&latest)).await.is_err());
    }

    #[test]
    fn test_changelog_lines() {
        let decision = ChangelogDecision::AppJustUpdated {
            changelog: "One<br />Two<br />Three".to_string(),
            version: "1.0".to_string(),
        };
        assert_eq!(decision.lines("<br />"), vec!["One", "Two", "Three"]);
        assert!(ChangelogDecision::Unchanged.lines("<br />").is_empty());
    }

    #[test]
    fn test_dismissible() {
        assert!(UpdateDecision::UpdateAvailable { mandatory: false }.is_dismissible());
        assert!(!UpdateDecision::UpdateAvailable { mandatory: true }.is_dismissible());
        assert!(!UpdateDecision::NoUpdate.is_dismissible());
    }

    #[test]
    fn test_decision_json() {
        let json = serde_json::to_string(&UpdateDecision::UpdateAvailable { mandatory: true })
            .unwrap();
        assert_eq!(json, r#"{"state":"update_available","mandatory":true}"#);
    }
}
