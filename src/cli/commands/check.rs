//! Update check commands

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use update_overlay::state::{Overlay, OverlayState, StateEvent};
use update_overlay::store::{Platform, SystemOpener};
use update_overlay::{
    AutoUpdateRequest, ChangelogDecision, ManualUpdateRequest, UpdateDecision,
};

use super::{AppArgs, Session};
use crate::cli::output::{print_error, print_formatted, print_success, OutputFormat};

/// How often the evaluation is polled
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub app: AppArgs,

    /// Open the store listing if an update prompt is shown
    #[arg(long)]
    pub open: bool,
}

#[derive(Args, Debug)]
pub struct ManualArgs {
    #[command(flatten)]
    pub app: AppArgs,

    /// Show the update prompt
    #[arg(long)]
    pub update_available: bool,

    /// Make the prompt non-dismissible
    #[arg(long)]
    pub mandatory: bool,

    /// Open the store listing if an update prompt is shown
    #[arg(long)]
    pub open: bool,
}

#[derive(Serialize)]
struct CheckResult {
    platform: Platform,
    current_version: String,
    update: UpdateDecision,
    changelog: ChangelogDecision,
    overlays: Vec<Overlay>,
}

pub async fn run_auto(args: CheckArgs, format: OutputFormat, quiet: bool) -> Result<()> {
    let session = Session::load(&args.app)?;
    let current_version = session.current_version(&args.app)?;

    let mut state = OverlayState::new(session.engine(&args.app)?);
    state.start_auto(AutoUpdateRequest {
        current_version: current_version.clone(),
        links: session.links.clone(),
        whats_new: session.whats_new(&args.app),
    });
    settle(&mut state).await;

    finish(&session, &state, current_version, args.open, format, quiet)
}

pub async fn run_manual(args: ManualArgs, format: OutputFormat, quiet: bool) -> Result<()> {
    let session = Session::load(&args.app)?;
    let current_version = session.current_version(&args.app)?;

    let mut state = OverlayState::new(session.engine(&args.app)?);
    state.start_manual(
        ManualUpdateRequest {
            current_version: current_version.clone(),
            links: session.links.clone(),
            mandatory: args.mandatory,
            whats_new: session.whats_new(&args.app),
        },
        args.update_available,
        None,
    );
    settle(&mut state).await;

    finish(&session, &state, current_version, args.open, format, quiet)
}

/// Poll the overlay state until its evaluations have finished
async fn settle(state: &mut OverlayState) {
    loop {
        for event in state.poll() {
            if let StateEvent::LogError(msg) = event {
                print_error(&msg);
            }
        }
        if !state.is_evaluating() {
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn finish(
    session: &Session,
    state: &OverlayState,
    current_version: String,
    open: bool,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let result = CheckResult {
        platform: session.platform,
        current_version,
        update: state.update,
        changelog: state.whats_new.clone(),
        overlays: state.overlays(),
    };

    print_formatted(&result, format, format_check);

    if open && matches!(state.update, UpdateDecision::UpdateAvailable { .. }) {
        state.open_store(&SystemOpener, &session.links)?;
        print_success("Opened store listing.", quiet);
    }

    Ok(())
}

fn format_check(result: &CheckResult) -> String {
    let mut lines = vec![
        format!("Platform:        {}", result.platform),
        format!("Current version: {}", result.current_version),
    ];

    if result.overlays.is_empty() {
        lines.push(String::new());
        lines.push("Nothing to show.".to_string());
    }

    for overlay in &result.overlays {
        lines.push(String::new());
        lines.extend(format_overlay(overlay));
    }

    lines.join("\n")
}

fn format_overlay(overlay: &Overlay) -> Vec<String> {
    match overlay {
        Overlay::UpdatePrompt {
            mandatory,
            title,
            description,
            button,
            dismiss_button,
        } => {
            let kind = if *mandatory { "required" } else { "optional" };
            let mut buttons = format!("  [{}]", button);
            if let Some(dismiss) = dismiss_button {
                buttons.push_str(&format!("  [{}]", dismiss));
            }
            vec![format!("== {} ({}) ==", title, kind), description.clone(), buttons]
        }
        Overlay::WhatsNew {
            title,
            version_label,
            lines,
            button,
        } => {
            let mut out = vec![format!("== {} ==", title), version_label.clone()];
            out.extend(lines.iter().map(|line| format!("  {}", line.trim())));
            out.push(format!("  [{}]", button));
            out
        }
    }
}
