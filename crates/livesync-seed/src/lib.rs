//! Companion snippet seeding.
//!
//! Copies the server-side snippet (a WordPress must-use plugin) into the
//! watched site and writes the live reload connection URL into it, so the
//! page can tell the browser where to connect.
//!
//! ```text
//! <exe dir>/watcher-connector.php ──copy──► <root>/wp-content/mu-plugins/watcher-connector.php
//!                                                 │
//!                                                 └─► "#PORT#" replaced by ws://host:port
//! ```

use std::fs;
use std::path::{Path, PathBuf};

/// Token in the snippet replaced by the connection URL.
pub const PLACEHOLDER: &str = "#PORT#";

/// What to copy where.
#[derive(Clone, Debug)]
pub struct SeedPlan {
    /// Source snippet file.
    pub snippet: PathBuf,
    /// Watch root the destination is relative to.
    pub root: PathBuf,
    /// Destination directory relative to `root`.
    pub plugin_dir: PathBuf,
    /// Value substituted for [`PLACEHOLDER`].
    pub connection_url: String,
}

impl SeedPlan {
    /// Destination file path: `<root>/<plugin_dir>/<snippet file name>`.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::NoFileName`] if the snippet path has no file name.
    pub fn destination(&self) -> Result<PathBuf, SeedError> {
        let name = self
            .snippet
            .file_name()
            .ok_or_else(|| SeedError::NoFileName(self.snippet.clone()))?;
        Ok(self.root.join(&self.plugin_dir).join(name))
    }
}

/// Result of a successful seed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedOutcome {
    /// Where the snippet was written.
    pub destination: PathBuf,
    /// Whether the placeholder was found and replaced.
    pub substituted: bool,
}

/// Seeding error.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// Source snippet does not exist.
    #[error("Companion snippet not found: {}", .0.display())]
    MissingSnippet(PathBuf),
    /// Source snippet path has no file name component.
    #[error("Companion snippet path has no file name: {}", .0.display())]
    NoFileName(PathBuf),
    /// I/O error on a specific path.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SeedError + '_ {
    move |source| SeedError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Copy the snippet into place and substitute the connection URL.
///
/// Intermediate directories are created and an existing destination is
/// overwritten. The file is rewritten only if it contains the placeholder,
/// so a snippet without it ends up byte-identical to the source.
///
/// # Errors
///
/// Returns an error if the snippet is missing or any filesystem operation
/// fails. Callers treat this as non-fatal.
pub fn seed(plan: &SeedPlan) -> Result<SeedOutcome, SeedError> {
    if !plan.snippet.is_file() {
        return Err(SeedError::MissingSnippet(plan.snippet.clone()));
    }
    let destination = plan.destination()?;

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    fs::copy(&plan.snippet, &destination).map_err(io_error(&destination))?;

    let substituted = substitute(&destination, &plan.connection_url)?;

    tracing::info!(
        destination = %destination.display(),
        substituted,
        "Seeded companion snippet"
    );

    Ok(SeedOutcome {
        destination,
        substituted,
    })
}

/// Replace every placeholder occurrence in `path` with `url`, in place.
///
/// Returns whether the file was rewritten.
fn substitute(path: &Path, url: &str) -> Result<bool, SeedError> {
    let content = fs::read_to_string(path).map_err(io_error(path))?;
    if !content.contains(PLACEHOLDER) {
        return Ok(false);
    }

    fs::write(path, content.replace(PLACEHOLDER, url)).map_err(io_error(path))?;
    Ok(true)
}
