//! Prelude for convenient imports.

pub use serde_json::{Value, json};

pub use modhub_core::{HostError, HostResult};

pub use crate::context::PluginContext;
pub use crate::hooks::hook::{ConflictPolicy, Hook, Signal, SubscriberId};
pub use crate::hooks::names;
pub use crate::host::{Host, PluginState};
pub use crate::library::{Library, LibraryRegistry};
pub use crate::loader::{CompletedLoad, LoadOutcome, PluginLoader};
pub use crate::plugin::{ErrorSink, Plugin, PluginMeta};
pub use crate::scheduler::NextTickScheduler;
pub use crate::timers::{TimerId, TimerLibrary};
pub use crate::watcher::{ChangeWatcher, SourceEvent};
