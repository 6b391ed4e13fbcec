//! `livesync serve` command implementation.

use clap::Args;
use livesync_config::Config;
use livesync_server::{run_server, server_config_from_config};

use super::{SiteArgs, placeholder_hint, seed_plan};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub(crate) struct ServeArgs {
    #[command(flatten)]
    site: SiteArgs,

    /// File extension that triggers a reload; repeat for several (overrides config).
    #[arg(short, long = "extension", value_name = "EXT")]
    extensions: Vec<String>,

    /// Do not copy the companion snippet into the site.
    #[arg(long)]
    no_seed: bool,

    /// Enable verbose output (log every change and connection).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the watch root is invalid,
    /// or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let extensions = (!self.extensions.is_empty()).then_some(self.extensions);
        let seed_enabled = self.no_seed.then_some(false);
        let config = self.site.load(extensions, seed_enabled)?;

        // A bad root must fail before anything is written into it
        livesync_watch::validate_root(&config.watch_resolved.root)?;

        seed_best_effort(&config, &output);
        output.startup(&config);

        run_server(server_config_from_config(&config)).await?;

        output.status("Stopped", "live reload server");
        Ok(())
    }
}

/// Seed the companion snippet, downgrading failures to warnings.
fn seed_best_effort(config: &Config, output: &Output) {
    if !config.seed_resolved.enabled {
        output.status("Skipped", "companion snippet (disabled)");
        return;
    }

    match livesync_seed::seed(&seed_plan(config)) {
        Ok(outcome) => {
            output.status("Seeded", outcome.destination.display());
            if !outcome.substituted {
                output.warning(&placeholder_hint());
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to seed companion snippet");
            output.warning(&format!("Companion snippet not seeded: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        serve: ServeArgs,
    }

    #[test]
    fn test_repeated_extension_flags() {
        let cli = TestCli::parse_from(["test", "--extension", "css", "-e", "scss", "--no-seed"]);

        assert_eq!(cli.serve.extensions, vec!["css", "scss"]);
        assert!(cli.serve.no_seed);
        assert!(!cli.serve.verbose);
    }

    #[tokio::test]
    async fn test_missing_root_fails_before_seeding() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("missing");
        let snippet = dir.path().join("watcher-connector.php");
        std::fs::write(&snippet, "<?php // #PORT#\n").unwrap();
        let config_path = dir.path().join("livesync.toml");
        std::fs::write(
            &config_path,
            format!(
                "[watch]\nroot = {:?}\n\n[seed]\nsnippet = {:?}\n",
                root.to_str().unwrap(),
                snippet.to_str().unwrap()
            ),
        )
        .unwrap();

        let cli = TestCli::parse_from(["test", "--config", config_path.to_str().unwrap()]);
        let result = cli.serve.execute().await;

        assert!(matches!(
            result,
            Err(CliError::Watch(livesync_watch::WatchError::NotFound(_)))
        ));
        assert!(!root.exists());
    }

    #[test]
    fn test_seed_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.watch_resolved.root = dir.path().to_path_buf();
        config.seed_resolved.snippet = dir.path().join("missing.php");

        seed_best_effort(&config, &Output::new());

        assert!(!dir.path().join("wp-content").exists());
    }
}
