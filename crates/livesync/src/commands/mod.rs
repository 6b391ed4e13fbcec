//! CLI command implementations.

pub(crate) mod seed;
pub(crate) mod serve;

use std::path::PathBuf;

use clap::Args;
use livesync_config::{CliSettings, Config};
use livesync_seed::{PLACEHOLDER, SeedPlan};

use crate::error::CliError;

pub(crate) use seed::SeedArgs;
pub(crate) use serve::ServeArgs;

/// Site and address arguments shared by every command.
#[derive(Args, Debug)]
pub(crate) struct SiteArgs {
    /// Path to configuration file (default: auto-discover livesync.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory tree to watch (overrides config).
    #[arg(short, long, env = "WATCH_ROOT")]
    root: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long, env = "WS_HOST")]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Connection URL written into the companion snippet (default: ws://host:port).
    #[arg(long, env = "WATCHER_URL")]
    public_url: Option<String>,
}

impl SiteArgs {
    /// Load config with these arguments layered on top.
    fn load(
        &self,
        extensions: Option<Vec<String>>,
        seed_enabled: Option<bool>,
    ) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            root: self.root.clone(),
            host: self.host.clone(),
            port: self.port,
            public_url: self.public_url.clone(),
            extensions,
            seed_enabled,
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }
}

/// Build the seeding plan for a loaded configuration.
fn seed_plan(config: &Config) -> SeedPlan {
    SeedPlan {
        snippet: config.seed_resolved.snippet.clone(),
        root: config.watch_resolved.root.clone(),
        plugin_dir: config.seed_resolved.plugin_dir.clone(),
        connection_url: config.connection_url(),
    }
}

/// Shown when the snippet has nowhere to put the URL.
fn placeholder_hint() -> String {
    format!("Companion snippet has no {PLACEHOLDER} placeholder; copied unchanged")
}
