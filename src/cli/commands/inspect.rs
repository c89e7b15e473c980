//! Store listing inspection commands

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use update_overlay::store::{open_store_link, strategy_for, StoreMetadataFetcher, SystemOpener};
use update_overlay::{compare, Comparison, Platform, StoreMetadata, Version};

use super::{AppArgs, Session};
use crate::cli::output::{print_formatted, print_success, OutputFormat};

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub app: AppArgs,

    /// Fetch this URL instead of the configured store link
    #[arg(long)]
    pub url: Option<String>,
}

#[derive(Args, Debug)]
pub struct OpenArgs {
    #[command(flatten)]
    pub app: AppArgs,
}

#[derive(Serialize)]
struct InspectResult {
    platform: Platform,
    strategy: &'static str,
    url: String,
    metadata: StoreMetadata,
    comparison: Option<ComparisonInfo>,
}

#[derive(Serialize)]
struct ComparisonInfo {
    current_version: String,
    outdated: bool,
    patch_only: bool,
}

impl ComparisonInfo {
    fn new(current_version: String, comparison: Comparison) -> Self {
        Self {
            current_version,
            outdated: comparison.is_outdated(),
            patch_only: comparison.is_patch_only(),
        }
    }
}

pub async fn inspect(args: InspectArgs, format: OutputFormat) -> Result<()> {
    let session = Session::load(&args.app)?;
    let fetcher = Arc::new(session.fetcher()?);

    let store = match args.url {
        Some(url) => {
            StoreMetadataFetcher::new(fetcher, Arc::from(strategy_for(session.platform)), url)
        }
        None => StoreMetadataFetcher::for_platform(fetcher, session.platform, &session.links)?,
    };

    let metadata = store.fetch_metadata().await?;

    let current = args
        .app
        .current_version
        .clone()
        .or_else(|| session.config.app.current_version.clone());

    let comparison = match (current, metadata.parsed_version()?) {
        (Some(current), Some(latest)) => {
            let parsed = Version::parse(&current)
                .with_context(|| format!("Invalid current version: {}", current))?;
            Some(ComparisonInfo::new(current, compare(&parsed, &latest)))
        }
        _ => None,
    };

    let result = InspectResult {
        platform: session.platform,
        strategy: store.strategy().name(),
        url: store.url().to_string(),
        metadata,
        comparison,
    };

    print_formatted(&result, format, format_inspect);
    Ok(())
}

pub async fn open(args: OpenArgs, quiet: bool) -> Result<()> {
    let session = Session::load(&args.app)?;
    let url = open_store_link(&SystemOpener, session.platform, &session.links)?;
    print_success(&format!("Opened {}", url), quiet);
    Ok(())
}

fn format_inspect(result: &InspectResult) -> String {
    let none = "<not found>";
    let mut lines = vec![
        format!("Platform:       {} ({})", result.platform, result.strategy),
        format!("URL:            {}", result.url),
        format!(
            "Latest version: {}",
            result.metadata.latest_version.as_deref().unwrap_or(none)
        ),
    ];

    if let Some(info) = &result.comparison {
        let status = match (info.outdated, info.patch_only) {
            (false, _) => "up to date",
            (true, true) => "patch update available",
            (true, false) => "required update available",
        };
        lines.push(format!("Running:        {} ({})", info.current_version, status));
    }

    match &result.metadata.changelog {
        Some(changelog) => {
            lines.push("Changelog:".to_string());
            lines.extend(changelog.lines().map(|line| format!("  {}", line.trim())));
        }
        None => lines.push(format!("Changelog:      {}", none)),
    }

    lines.join("\n")
}
