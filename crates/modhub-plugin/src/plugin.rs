//! The plugin contract: metadata, hook handling, and the error event sink.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use modhub_core::HostResult;

use crate::context::PluginContext;

/// Metadata describing a plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMeta {
    /// Unique plugin name, derived from source identity.
    pub name: String,
    /// Human-readable title.
    pub title: String,
    /// Author or maintainer.
    pub author: String,
    /// Plugin version.
    pub version: semver::Version,
}

impl PluginMeta {
    /// Creates plugin metadata, parsing the semantic version string.
    pub fn parse(
        name: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        version: &str,
    ) -> HostResult<Self> {
        let version = version
            .parse()
            .map_err(|e| modhub_core::HostError::plugin(format!("Invalid plugin version: {e}")))?;
        Ok(Self {
            name: name.into(),
            title: title.into(),
            author: author.into(),
            version,
        })
    }

    /// Serializes this metadata into a hook argument value.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Clonable sink through which a plugin raises error events.
///
/// The host installs one on every plugin it loads; the default sink
/// discards events, so a plugin constructed outside a host stays inert.
#[derive(Clone)]
pub struct ErrorSink {
    inner: Arc<dyn Fn(&str, &str) + Send + Sync>,
}

impl ErrorSink {
    /// Creates a sink from a callback receiving `(plugin_name, message)`.
    pub fn new(callback: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(callback),
        }
    }

    /// Creates a sink that discards every event.
    pub fn discard() -> Self {
        Self::new(|_, _| {})
    }

    /// Reports an error raised by the named plugin.
    pub fn report(&self, plugin: &str, message: &str) {
        (self.inner)(plugin, message);
    }
}

impl fmt::Debug for ErrorSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorSink").finish()
    }
}

/// Trait implemented by every plugin the host can manage.
///
/// A plugin is either fully committed (present in the registry, hooks
/// active) or fully absent; `init` failing leaves it absent.
pub trait Plugin: Send + Sync + fmt::Debug {
    /// Returns the plugin's metadata.
    fn meta(&self) -> PluginMeta;

    /// Called once while the plugin is committed to the registry.
    ///
    /// Failure here is an init error: the plugin is logged and stays
    /// absent even though construction succeeded.
    fn init(&self, ctx: &PluginContext) -> HostResult<()> {
        let _ = ctx;
        Ok(())
    }

    /// Returns whether this plugin has a handler for the named hook.
    fn handles_hook(&self, hook: &str) -> bool;

    /// Invokes the plugin's handler for the named hook.
    ///
    /// Returns `Ok(None)` when the handler contributes no value. An `Err`
    /// is a runtime hook-handler error: the registry logs it and keeps
    /// delivering to the remaining plugins.
    fn call_hook(&self, hook: &str, args: &[Value]) -> HostResult<Option<Value>>;

    /// Called after the plugin has been removed from the registry.
    ///
    /// Cleanup point for timers and other host resources the plugin
    /// acquired; its hooks are already inactive when this runs.
    fn teardown(&self) {}

    /// Installs the sink through which this plugin raises error events.
    fn attach_error_sink(&self, sink: ErrorSink) {
        let _ = sink;
    }
}
