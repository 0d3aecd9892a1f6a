//! # modhub-plugin
//!
//! Plugin framework for ModHub. Provides:
//!
//! - Typed multicast hooks with recursion and conflict handling
//! - Plugin registry with name-based hook fan-out and error isolation
//! - Plugin lifecycle management (bulk load, load, unload, hot reload)
//! - Library registry for named singleton services
//! - Thread-safe next-tick scheduling onto the host's logical tick
//! - Change-watcher routing for source add/change/remove events
//! - Optional dynamic loading via `libloading` (feature `dynamic`)

pub mod context;
pub mod extension;
pub mod hooks;
pub mod host;
pub mod library;
pub mod loader;
pub mod plugin;
pub mod prelude;
pub mod registry;
pub mod scheduler;
pub mod timers;
pub mod watcher;

pub use context::PluginContext;
pub use extension::ExtensionManager;
pub use hooks::hook::{ConflictPolicy, Hook, Signal, SubscriberId};
pub use host::{Host, PluginState};
pub use library::{Library, LibraryRegistry};
pub use loader::{CompletedLoad, LoadOutcome, PluginLoader};
pub use plugin::{ErrorSink, Plugin, PluginMeta};
pub use registry::PluginRegistry;
pub use scheduler::NextTickScheduler;
pub use timers::{TimerId, TimerLibrary};
pub use watcher::{ChangeWatcher, SourceEvent};
