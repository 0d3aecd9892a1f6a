//! Change watchers: routing source add/change/remove events to the host.

use std::path::Path;
use std::sync::mpsc;

use notify::{RecursiveMode, Watcher as _};
use tracing::warn;

use modhub_core::{HostError, HostResult};

/// A change reported for a plugin source, carrying the plugin name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// A new plugin source appeared; the host loads it.
    Added(String),
    /// An existing plugin source changed; the host reloads it.
    Changed(String),
    /// A plugin source disappeared; the host unloads it.
    Removed(String),
}

/// External collaborator reporting add/change/remove events for plugin
/// sources.
///
/// Watchers are polled once per host tick, after the initial bulk load
/// has completed, so their events never race the startup scan.
pub trait ChangeWatcher: Send {
    /// Drains every change observed since the last poll, in the order the
    /// underlying watcher reported them.
    fn poll_changes(&mut self) -> Vec<SourceEvent>;
}

/// Filesystem-backed change watcher.
///
/// Watches one directory for files with the configured extensions and
/// translates filesystem events into [`SourceEvent`]s, using the file
/// stem as the plugin name.
pub struct FsChangeWatcher {
    rx: mpsc::Receiver<notify::Result<notify::Event>>,
    extensions: Vec<String>,
    // Kept alive for the watch to stay registered.
    _watcher: notify::RecommendedWatcher,
}

impl FsChangeWatcher {
    /// Starts watching the given directory for sources with any of the
    /// given extensions (without the leading dot).
    pub fn new(dir: &Path, extensions: &[&str]) -> HostResult<Self> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx)
            .map_err(|e| HostError::watcher(format!("Failed to create watcher: {e}")))?;
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| {
                HostError::watcher(format!("Failed to watch '{}': {e}", dir.display()))
            })?;
        Ok(Self {
            rx,
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            _watcher: watcher,
        })
    }

    /// Translates one filesystem event into source events for matching
    /// plugin sources.
    fn classify(event: &notify::Event, extensions: &[String]) -> Vec<SourceEvent> {
        let mut out = Vec::new();
        for path in &event.paths {
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| extensions.iter().any(|known| known == e));
            if !matches {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let name = name.to_string();
            match event.kind {
                notify::EventKind::Create(_) => out.push(SourceEvent::Added(name)),
                notify::EventKind::Modify(_) => out.push(SourceEvent::Changed(name)),
                notify::EventKind::Remove(_) => out.push(SourceEvent::Removed(name)),
                _ => {}
            }
        }
        out
    }
}

impl ChangeWatcher for FsChangeWatcher {
    fn poll_changes(&mut self) -> Vec<SourceEvent> {
        let mut events = Vec::new();
        while let Ok(result) = self.rx.try_recv() {
            match result {
                Ok(event) => events.extend(Self::classify(&event, &self.extensions)),
                Err(e) => warn!(error = %e, "Filesystem watcher reported an error"),
            }
        }
        events
    }
}

impl std::fmt::Debug for FsChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsChangeWatcher")
            .field("extensions", &self.extensions)
            .finish()
    }
}
