//! CLI subcommands and the argument plumbing they share

pub mod check;
pub mod config;
pub mod inspect;
pub mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use update_overlay::config::Config;
use update_overlay::db::{Database, KeyValueStore, MemoryStore};
use update_overlay::store::{HttpFetcher, Platform, StoreLinks};
use update_overlay::{UpdateEngine, WhatsNew};

/// App identity and store options accepted by most commands
#[derive(Args, Debug, Clone, Default)]
pub struct AppArgs {
    /// Running app version (defaults to app.current_version from config)
    #[arg(short = 'c', long)]
    pub current_version: Option<String>,

    /// Store platform: ios or android (defaults to app.platform from config)
    #[arg(long)]
    pub platform: Option<Platform>,

    /// App Store listing URL
    #[arg(long)]
    pub ios_link: Option<String>,

    /// Play Store listing URL
    #[arg(long)]
    pub android_link: Option<String>,

    /// Skip the what's-new check
    #[arg(long)]
    pub no_whats_new: bool,

    /// Static changelog shown after an update instead of the store's notes
    #[arg(long, value_name = "TEXT")]
    pub whats_new: Option<String>,

    /// Keep state in memory instead of the on-disk database
    #[arg(long)]
    pub memory: bool,
}

/// Config merged with command-line overrides
pub struct Session {
    pub config: Config,
    pub platform: Platform,
    pub links: StoreLinks,
}

impl Session {
    pub fn load(args: &AppArgs) -> Result<Self> {
        let config = Config::load()?;
        let platform = args.platform.unwrap_or(config.app.platform);

        let mut links = config.store.links();
        if let Some(link) = &args.ios_link {
            links.ios = Some(link.clone());
        }
        if let Some(link) = &args.android_link {
            links.android = Some(link.clone());
        }

        Ok(Self {
            config,
            platform,
            links,
        })
    }

    /// Running version from the arguments or config
    pub fn current_version(&self, args: &AppArgs) -> Result<String> {
        args.current_version
            .clone()
            .or_else(|| self.config.app.current_version.clone())
            .context("No current version given (use --current-version or set app.current_version)")
    }

    pub fn whats_new(&self, args: &AppArgs) -> WhatsNew {
        let mut whats_new = self.config.whats_new.to_whats_new();
        if args.no_whats_new {
            whats_new.enabled = false;
        }
        if let Some(text) = &args.whats_new {
            whats_new.description = Some(text.clone());
        }
        whats_new
    }

    pub fn fetcher(&self) -> Result<HttpFetcher> {
        let network = &self.config.network;
        HttpFetcher::with_options(network.user_agent.as_deref(), network.timeout())
            .context("Failed to create HTTP client")
    }

    pub fn engine(&self, args: &AppArgs) -> Result<Arc<UpdateEngine>> {
        let store: Arc<dyn KeyValueStore> = if args.memory {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(Database::open().context("Failed to open state database")?)
        };

        Ok(Arc::new(UpdateEngine::new(
            store,
            Arc::new(self.fetcher()?),
            self.platform,
        )))
    }
}
