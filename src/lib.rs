//! Store-listing update detection for mobile apps.
//!
//! The crate decides whether a running app is behind its public store
//! listing and whether it was just upgraded:
//! - [`version`] compares dotted numeric versions
//! - [`store`] fetches and scrapes App Store / Play Store listings
//! - [`engine`] reconciles the two with persisted state into decisions
//! - [`state`] drives evaluations for a renderer and applies dismissals
//! - [`db`] persists the keys the engine owns
//!
//! Rendering the overlays is left to the host UI.

pub mod app_data;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod state;
pub mod store;
pub mod task;
pub mod version;

pub use engine::{
    AutoUpdateRequest, ChangelogDecision, Evaluation, ManualUpdateRequest, UpdateDecision,
    UpdateEngine, WhatsNew,
};
pub use error::{Error, Result};
pub use store::{Platform, StoreLinks, StoreMetadata};
pub use version::{compare, Comparison, MalformedVersionError, Version};
