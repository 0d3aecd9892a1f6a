//! Extension manager: owns the loaders, watchers, and library registry
//! that extensions contribute to a host.

use std::sync::Arc;

use tracing::info;

use modhub_core::HostResult;

use crate::library::{Library, LibraryRegistry};
use crate::loader::PluginLoader;
use crate::watcher::{ChangeWatcher, SourceEvent};

/// Holds everything extensions register with the host: plugin loaders,
/// change watchers, and named libraries.
pub struct ExtensionManager {
    loaders: Vec<Arc<dyn PluginLoader>>,
    watchers: Vec<Box<dyn ChangeWatcher>>,
    libraries: Arc<LibraryRegistry>,
}

impl ExtensionManager {
    /// Creates an empty extension manager.
    pub fn new() -> Self {
        Self {
            loaders: Vec::new(),
            watchers: Vec::new(),
            libraries: Arc::new(LibraryRegistry::new()),
        }
    }

    /// Registers a plugin loader.
    pub fn register_loader(&mut self, loader: Arc<dyn PluginLoader>) {
        info!("Plugin loader registered");
        self.loaders.push(loader);
    }

    /// Returns the registered loaders in registration order.
    pub fn loaders(&self) -> &[Arc<dyn PluginLoader>] {
        &self.loaders
    }

    /// Registers a change watcher.
    pub fn register_watcher(&mut self, watcher: Box<dyn ChangeWatcher>) {
        info!("Plugin change watcher registered");
        self.watchers.push(watcher);
    }

    /// Polls every watcher, returning observed events in report order.
    pub fn poll_watchers(&mut self) -> Vec<SourceEvent> {
        let mut events = Vec::new();
        for watcher in &mut self.watchers {
            events.extend(watcher.poll_changes());
        }
        events
    }

    /// Registers a library under the given name (at most once per name).
    pub fn register_library(
        &self,
        name: impl Into<String>,
        library: Arc<dyn Library>,
    ) -> HostResult<()> {
        self.libraries.register(name, library)
    }

    /// Returns a handle to the library registry.
    pub fn libraries(&self) -> Arc<LibraryRegistry> {
        Arc::clone(&self.libraries)
    }
}

impl Default for ExtensionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExtensionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionManager")
            .field("loaders", &self.loaders.len())
            .field("watchers", &self.watchers.len())
            .field("libraries", &self.libraries.names())
            .finish()
    }
}
