//! `livesync seed` command implementation.

use clap::Args;

use super::{SiteArgs, placeholder_hint, seed_plan};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the seed command.
#[derive(Args, Debug)]
pub(crate) struct SeedArgs {
    #[command(flatten)]
    site: SiteArgs,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl SeedArgs {
    /// Execute the seed command.
    ///
    /// Unlike `serve`, a seeding failure here is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the watch root is invalid,
    /// or the snippet cannot be copied.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = self.site.load(None, None)?;
        livesync_watch::validate_root(&config.watch_resolved.root)?;

        let outcome = livesync_seed::seed(&seed_plan(&config))?;

        if !outcome.substituted {
            output.warning(&placeholder_hint());
        }
        output.status("Seeded", outcome.destination.display());
        output.status("Clients", config.connection_url());

        Ok(())
    }
}
