//! Change event types and the detector's stop handle.

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread::JoinHandle;

/// A single filesystem change, one per path in a notify event.
///
/// Only lives for the duration of one classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Absolute path that changed.
    pub path: PathBuf,
    /// Whether the path is a directory.
    pub is_dir: bool,
}

/// Destination for relative paths produced by the detector.
///
/// Called on the detector thread. Implementations must not block on network
/// I/O and must swallow their own failures.
pub trait EventSink: Send + 'static {
    /// Hand over one root-relative path.
    fn submit(&self, relative_path: String);
}

impl EventSink for mpsc::Sender<String> {
    fn submit(&self, relative_path: String) {
        let _ = self.send(relative_path);
    }
}

/// Signal consumed by the detector thread.
pub(crate) enum Signal {
    /// Raw event (or backend error) forwarded from the notify callback.
    Fs(notify::Result<notify::Event>),
    /// Stop request from [`WatchHandle`].
    Stop,
}

/// Handle to stop the change detector.
///
/// Stopping sends a stop signal and joins the detector thread, which drops
/// the notify watcher on its way out. Dropping the handle does the same.
pub struct WatchHandle {
    stop: Option<mpsc::Sender<Signal>>,
    thread: Option<JoinHandle<()>>,
}

impl WatchHandle {
    pub(crate) fn new(stop: mpsc::Sender<Signal>, thread: JoinHandle<()>) -> Self {
        Self {
            stop: Some(stop),
            thread: Some(thread),
        }
    }

    /// Stop watching and wait for the detector thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Whether the detector thread is still alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            // Send fails only if the thread already exited
            let _ = stop.send(Signal::Stop);
        }
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("Change detector thread panicked");
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
