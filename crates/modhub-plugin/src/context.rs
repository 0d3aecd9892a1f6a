//! Plugin context: services and resources available to plugin code.

use std::sync::Arc;

use crate::library::LibraryRegistry;
use crate::scheduler::NextTickScheduler;

/// Context handed to plugins when they are committed to the registry.
///
/// This is the only surface plugins get back into the host: they may
/// schedule deferred work onto the tick and look up registered libraries.
/// Structural host operations (load/unload) are not reachable from here.
#[derive(Clone)]
pub struct PluginContext {
    /// Handle for scheduling work onto the host's next tick, from any thread.
    pub scheduler: NextTickScheduler,
    /// Registry of named singleton services.
    pub libraries: Arc<LibraryRegistry>,
}

impl PluginContext {
    /// Creates a new plugin context.
    pub fn new(scheduler: NextTickScheduler, libraries: Arc<LibraryRegistry>) -> Self {
        Self {
            scheduler,
            libraries,
        }
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext").finish()
    }
}
