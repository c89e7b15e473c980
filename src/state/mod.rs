//! Presentation-facing state
//!
//! The renderer owns an [`OverlayState`], starts evaluations on mount or when
//! its inputs change, polls once per frame and draws whatever overlays the
//! state reports. Dismissals are the only calls that flow back.

mod overlay;

pub use overlay::{DismissCallback, Overlay, OverlayState};

/// Events that poll methods can return.
/// These tell the renderer what changed without it inspecting the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// Update prompt visibility or kind changed
    UpdatePromptChanged,

    /// A what's-new overlay became visible
    WhatsNewReady { version: String },

    /// A finished evaluation was older than the latest one and was dropped
    StaleDiscarded { generation: u64 },

    /// Log an error message
    LogError(String),
}
