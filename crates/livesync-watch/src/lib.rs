//! Filesystem change detector for livesync.
//!
//! Watches a directory tree recursively and reports modified asset files as
//! root-relative, forward-slash paths (e.g. `css/app.css`).
//!
//! # Architecture
//!
//! ```text
//! notify thread ──raw events──► livesync-watch thread ──RelativePath──► EventSink
//!                                   │
//!                                   └─► ChangeFilter (allow-list + root-relative path)
//! ```
//!
//! The detector thread owns the notify watcher. [`WatchHandle::stop`] signals
//! it and joins it, so no event reaches the sink after `stop` returns.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::mpsc;
//! use livesync_watch::{ChangeDetector, validate_root};
//!
//! let root = validate_root("/var/www/html".as_ref())?;
//! let (tx, rx) = mpsc::channel::<String>();
//! let handle = ChangeDetector::new(root, &["css", "js"]).start(tx)?;
//! for path in rx.iter() {
//!     println!("{path}");
//! }
//! handle.stop();
//! ```

mod detector;
mod error;
mod event;
mod filter;

pub use detector::{ChangeDetector, validate_root};
pub use error::WatchError;
pub use event::{ChangeEvent, EventSink, WatchHandle};
pub use filter::ChangeFilter;
