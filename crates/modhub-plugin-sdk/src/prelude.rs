//! Prelude for convenient imports in plugin crates.

pub use serde_json::{Value, json};

pub use modhub_core::{HostError, HostResult};

pub use modhub_plugin::context::PluginContext;
pub use modhub_plugin::hooks::names;
pub use modhub_plugin::plugin::{ErrorSink, Plugin, PluginMeta};
pub use modhub_plugin::timers::TimerLibrary;

pub use crate::table::{HookHandler, HookTable};

pub use crate::{export_plugin, plugin_meta};
