//! Overlay state driven by engine evaluations

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::app_data::overlay_copy;
use crate::engine::{
    AutoUpdateRequest, ChangelogDecision, Evaluation, ManualUpdateRequest, UpdateDecision,
    UpdateEngine,
};
use crate::error::Result;
use crate::state::StateEvent;
use crate::store::{open_store_link, strategy_for, LinkOpener, StoreLinks};
use crate::task::drain_finished;

/// A modal the renderer should draw, with its text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "overlay", rename_all = "snake_case")]
pub enum Overlay {
    UpdatePrompt {
        mandatory: bool,
        title: String,
        description: String,
        button: String,
        /// Present only for optional updates
        dismiss_button: Option<String>,
    },
    WhatsNew {
        title: String,
        version_label: String,
        lines: Vec<String>,
        button: String,
    },
}

/// Caller acknowledgement for manual-mode dismissals
pub type DismissCallback = Box<dyn FnMut() + Send>;

/// Current overlays plus the evaluations still in flight
pub struct OverlayState {
    engine: Arc<UpdateEngine>,
    /// Spawned evaluations, newest last
    tasks: Vec<Option<JoinHandle<Evaluation>>>,
    /// Update prompt currently shown
    pub update: UpdateDecision,
    /// What's-new overlay currently shown
    pub whats_new: ChangelogDecision,
    /// Separator between changelog lines for the engine's store
    line_break: String,
    on_dismiss: Option<DismissCallback>,
    /// Evaluation that must not hide an optional prompt claimed by an older one
    claimed_for: Option<u64>,
}

impl OverlayState {
    pub fn new(engine: Arc<UpdateEngine>) -> Self {
        let line_break = strategy_for(engine.platform()).line_break().to_string();
        Self {
            engine,
            tasks: Vec::new(),
            update: UpdateDecision::NoUpdate,
            whats_new: ChangelogDecision::Unchanged,
            line_break,
            on_dismiss: None,
            claimed_for: None,
        }
    }

    /// Check if an evaluation is still running
    pub fn is_evaluating(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Start an automatic-mode evaluation.
    ///
    /// Any evaluation already running becomes stale and its result will be
    /// discarded when it arrives.
    pub fn start_auto(&mut self, request: AutoUpdateRequest) {
        let engine = self.engine.clone();
        let generation = engine.begin();

        tracing::debug!("Starting update evaluation #{}", generation);
        self.tasks.push(Some(tokio::spawn(async move {
            engine.run_auto(generation, &request).await
        })));
    }

    /// Start a manual-mode evaluation.
    ///
    /// The prompt is shown immediately from the caller's flags; only the
    /// what's-new check runs in the background. `on_dismiss` is invoked when
    /// an optional prompt is dismissed.
    pub fn start_manual(
        &mut self,
        request: ManualUpdateRequest,
        update_available: bool,
        on_dismiss: Option<DismissCallback>,
    ) {
        self.update = if update_available {
            UpdateDecision::UpdateAvailable {
                mandatory: request.mandatory,
            }
        } else {
            UpdateDecision::NoUpdate
        };
        self.on_dismiss = on_dismiss;

        let engine = self.engine.clone();
        let generation = engine.begin();

        tracing::debug!("Starting changelog evaluation #{}", generation);
        self.tasks.push(Some(tokio::spawn(async move {
            engine.run_manual(generation, &request).await
        })));
    }

    /// Collect finished evaluations and apply the current one
    pub fn poll(&mut self) -> Vec<StateEvent> {
        let mut events = Vec::new();

        for result in drain_finished(&mut self.tasks) {
            match result {
                Ok(evaluation) => self.apply(evaluation, &mut events),
                Err(e) => {
                    let msg = format!("Update evaluation panicked: {}", e);
                    tracing::error!("{}", msg);
                    events.push(StateEvent::LogError(msg));
                }
            }
        }

        events
    }

    fn apply(&mut self, evaluation: Evaluation, events: &mut Vec<StateEvent>) {
        if !self.engine.is_current(evaluation.generation) {
            tracing::debug!("Discarding stale evaluation #{}", evaluation.generation);
            events.push(StateEvent::StaleDiscarded {
                generation: evaluation.generation,
            });
            self.keep_one_shot(evaluation, events);
            return;
        }

        let claimed = self.claimed_for.take_if(|g| *g == evaluation.generation).is_some();

        // No decision leaves the prompt as it was
        if let Some(update) = evaluation.update {
            let keep_claimed = claimed
                && update == UpdateDecision::NoUpdate
                && self.update.is_dismissible();
            if !keep_claimed && update != self.update {
                self.update = update;
                events.push(StateEvent::UpdatePromptChanged);
            }
        }

        if let ChangelogDecision::AppJustUpdated { version, .. } = &evaluation.changelog {
            events.push(StateEvent::WhatsNewReady {
                version: version.clone(),
            });
            self.whats_new = evaluation.changelog;
        }
    }

    /// Surface one-shot decisions from a superseded evaluation.
    ///
    /// The engine only reports them after persisting their key, so no later
    /// evaluation will report them again.
    fn keep_one_shot(&mut self, evaluation: Evaluation, events: &mut Vec<StateEvent>) {
        let optional = UpdateDecision::UpdateAvailable { mandatory: false };
        if evaluation.update == Some(optional) && self.update == UpdateDecision::NoUpdate {
            tracing::debug!("Keeping optional prompt from evaluation #{}", evaluation.generation);
            self.update = optional;
            self.claimed_for = Some(self.engine.latest_generation());
            events.push(StateEvent::UpdatePromptChanged);
        }

        if let ChangelogDecision::AppJustUpdated { version, .. } = &evaluation.changelog {
            events.push(StateEvent::WhatsNewReady {
                version: version.clone(),
            });
            self.whats_new = evaluation.changelog;
        }
    }

    /// Dismiss the update prompt. Mandatory prompts cannot be dismissed.
    ///
    /// Returns whether the prompt was hidden.
    pub fn dismiss_update(&mut self) -> bool {
        if !self.update.is_dismissible() {
            return false;
        }

        self.update = UpdateDecision::NoUpdate;
        if let Some(on_dismiss) = self.on_dismiss.as_mut() {
            on_dismiss();
        }
        true
    }

    /// Dismiss the what's-new overlay
    pub fn dismiss_whats_new(&mut self) -> bool {
        let was_visible = matches!(self.whats_new, ChangelogDecision::AppJustUpdated { .. });
        self.whats_new = ChangelogDecision::Unchanged;
        was_visible
    }

    /// Open the store listing from the update prompt's button
    pub fn open_store(&self, opener: &dyn LinkOpener, links: &StoreLinks) -> Result<()> {
        open_store_link(opener, self.engine.platform(), links)?;
        Ok(())
    }

    /// Overlays to draw, bottom first (what's-new sits on top)
    pub fn overlays(&self) -> Vec<Overlay> {
        let copy = overlay_copy();
        let mut overlays = Vec::new();

        if let UpdateDecision::UpdateAvailable { mandatory } = self.update {
            overlays.push(Overlay::UpdatePrompt {
                mandatory,
                title: copy.update.title.clone(),
                description: copy.update.description.clone(),
                button: copy.update.button.clone(),
                dismiss_button: (!mandatory).then(|| copy.update.dismiss_button.clone()),
            });
        }

        if let ChangelogDecision::AppJustUpdated { version, .. } = &self.whats_new {
            overlays.push(Overlay::WhatsNew {
                title: copy.whats_new.title.clone(),
                version_label: format!("{}{}", copy.whats_new.version_prefix, version),
                lines: self
                    .whats_new
                    .lines(&self.line_break)
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                button: copy.whats_new.button.clone(),
            });
        }

        overlays
    }
}
