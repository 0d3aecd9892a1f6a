//! Library registry: named singleton services plugins can call into.

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use modhub_core::{HostError, HostResult};

/// A named singleton service registered for plugins (e.g. scheduling).
///
/// Libraries with periodic maintenance (timer expiry, request pumping)
/// override [`Library::on_tick`], which the host invokes once per logical
/// tick in registration order.
pub trait Library: Send + Sync + 'static {
    /// Upcasts the library for typed lookup.
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Periodic maintenance, run once per host tick.
    fn on_tick(&self) {}
}

/// Registry of libraries by name.
///
/// Registration happens during host bootstrap; lookups come from plugin
/// code on the tick thread. A lookup with the wrong expected type fails
/// (returns `None`) rather than crashing.
#[derive(Default)]
pub struct LibraryRegistry {
    entries: RwLock<Vec<(String, Arc<dyn Library>)>>,
}

impl LibraryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a library under the given name.
    ///
    /// A name may be registered at most once.
    pub fn register(&self, name: impl Into<String>, library: Arc<dyn Library>) -> HostResult<()> {
        let name = name.into();
        let mut entries = self.entries.write();
        if entries.iter().any(|(n, _)| *n == name) {
            return Err(HostError::conflict(format!(
                "Library '{name}' is already registered"
            )));
        }
        info!(library = %name, "Library registered");
        entries.push((name, library));
        Ok(())
    }

    /// Looks up a library by name and expected type.
    ///
    /// Returns `None` when the name is unknown or the registered library
    /// is not of type `T`; a mismatch is logged but never fatal.
    pub fn get<T: Library>(&self, name: &str) -> Option<Arc<T>> {
        let library = {
            let entries = self.entries.read();
            entries.iter().find(|(n, _)| n == name)?.1.clone()
        };
        match library.as_any_arc().downcast::<T>() {
            Ok(typed) => Some(typed),
            Err(_) => {
                warn!(library = %name, "Library lookup with mismatched type");
                None
            }
        }
    }

    /// Returns whether a library is registered under the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().iter().any(|(n, _)| n == name)
    }

    /// Returns the registered library names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.read().iter().map(|(n, _)| n.clone()).collect()
    }

    /// Runs the maintenance pass of every library in registration order.
    ///
    /// Libraries are cloned out of the lock first so a maintenance
    /// callback may look other libraries up without deadlocking.
    pub fn tick_all(&self) {
        let libraries: Vec<Arc<dyn Library>> = {
            let entries = self.entries.read();
            entries.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for library in libraries {
            library.on_tick();
        }
    }
}

impl std::fmt::Debug for LibraryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryRegistry")
            .field("names", &self.names())
            .finish()
    }
}
