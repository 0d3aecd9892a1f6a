//! Plugin registry: live plugin instances and named hook fan-out.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, warn};

use modhub_core::{HostError, HostResult};

use crate::hooks::hook::ConflictPolicy;
use crate::plugin::Plugin;

/// Registry of all committed plugins, in registration order.
///
/// `call_hook` fans a named call out to every plugin that handles it and
/// folds the answers into at most one result: first present value wins,
/// later present values are conflicts resolved per the registry's
/// [`ConflictPolicy`]. A handler error is logged with the plugin's
/// identity and never stops delivery to the remaining plugins.
///
/// Mutation happens only on the tick thread; the `RefCell` reentrancy
/// bookkeeping makes the type `!Sync`, so firing hooks from two threads
/// at once is rejected by the compiler rather than by documentation.
#[derive(Debug)]
pub struct PluginRegistry {
    plugins: Vec<(String, Arc<dyn Plugin>)>,
    policy: ConflictPolicy,
    in_flight: RefCell<HashSet<String>>,
}

impl PluginRegistry {
    /// Creates an empty registry with the given conflict policy.
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            plugins: Vec::new(),
            policy,
            in_flight: RefCell::new(HashSet::new()),
        }
    }

    /// Adds a plugin to the registry.
    ///
    /// A given name maps to at most one live instance.
    pub fn add(&mut self, plugin: Arc<dyn Plugin>) -> HostResult<()> {
        let meta = plugin.meta();
        if self.contains(&meta.name) {
            return Err(HostError::conflict(format!(
                "Plugin '{}' is already registered",
                meta.name
            )));
        }
        info!(plugin = %meta.name, version = %meta.version, "Plugin registered");
        self.plugins.push((meta.name, plugin));
        Ok(())
    }

    /// Removes a plugin by name, returning it if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Plugin>> {
        let index = self.plugins.iter().position(|(n, _)| n == name)?;
        let (_, plugin) = self.plugins.remove(index);
        info!(plugin = %name, "Plugin unregistered");
        Some(plugin)
    }

    /// Gets a plugin by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| Arc::clone(p))
    }

    /// Returns whether a plugin with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|(n, _)| n == name)
    }

    /// Returns the number of registered plugins.
    pub fn count(&self) -> usize {
        self.plugins.len()
    }

    /// Returns registered plugin names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.plugins.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Fans the named hook out to every registered plugin that handles it.
    ///
    /// Plugins are invoked in registration order. A reentrant call for the
    /// same hook name (a handler re-firing the hook it is handling) is
    /// refused with a logged warning and returns `None` without invoking
    /// anyone, mirroring the typed-hook recursion guard.
    pub fn call_hook(&self, hook: &str, args: &[Value]) -> Option<Value> {
        if !self.in_flight.borrow_mut().insert(hook.to_string()) {
            warn!(
                hook = %hook,
                "Hook recursion refused: a plugin handler caused the hook to refire"
            );
            return None;
        }

        let mut result = None;
        for (name, plugin) in &self.plugins {
            if !plugin.handles_hook(hook) {
                continue;
            }
            match plugin.call_hook(hook, args) {
                Ok(Some(value)) => {
                    if result.is_none() {
                        result = Some(value);
                    } else if self.policy == ConflictPolicy::Warn {
                        warn!(
                            hook = %hook,
                            plugin = %name,
                            "Hook conflict: multiple plugins returned a value"
                        );
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!(
                        plugin = %name,
                        hook = %hook,
                        error = %e,
                        "Plugin hook handler failed"
                    );
                }
            }
        }

        self.in_flight.borrow_mut().remove(hook);
        result
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new(ConflictPolicy::Warn)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::plugin::PluginMeta;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Runs `f` with a subscriber capturing warnings, returning the output.
    fn captured_warnings(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .without_time()
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        String::from_utf8(buffer.0.lock().clone()).expect("log output is utf8")
    }

    /// Test plugin driven by a closure per hook call.
    struct ScriptedPlugin {
        meta: PluginMeta,
        hooks: Vec<String>,
        #[allow(clippy::type_complexity)]
        script: Box<dyn Fn(&str, &[Value]) -> HostResult<Option<Value>> + Send + Sync>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedPlugin {
        fn new(
            name: &str,
            hooks: &[&str],
            script: impl Fn(&str, &[Value]) -> HostResult<Option<Value>> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                meta: PluginMeta::parse(name, name, "test", "1.0.0").expect("meta"),
                hooks: hooks.iter().map(|h| h.to_string()).collect(),
                script: Box::new(script),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl std::fmt::Debug for ScriptedPlugin {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ScriptedPlugin")
                .field("name", &self.meta.name)
                .finish()
        }
    }

    impl Plugin for ScriptedPlugin {
        fn meta(&self) -> PluginMeta {
            self.meta.clone()
        }

        fn handles_hook(&self, hook: &str) -> bool {
            self.hooks.iter().any(|h| h == hook)
        }

        fn call_hook(&self, hook: &str, args: &[Value]) -> HostResult<Option<Value>> {
            self.calls.lock().push(hook.to_string());
            (self.script)(hook, args)
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = PluginRegistry::default();
        registry
            .add(ScriptedPlugin::new("a", &[], |_, _| Ok(None)))
            .expect("first");
        assert!(registry.add(ScriptedPlugin::new("a", &[], |_, _| Ok(None))).is_err());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn fan_out_respects_registration_order_and_first_value_wins() {
        let mut registry = PluginRegistry::default();
        registry
            .add(ScriptedPlugin::new("quiet", &["greet"], |_, _| Ok(None)))
            .expect("add");
        registry
            .add(ScriptedPlugin::new("first", &["greet"], |_, _| {
                Ok(Some(json!("from first")))
            }))
            .expect("add");
        registry
            .add(ScriptedPlugin::new("second", &["greet"], |_, _| {
                Ok(Some(json!("from second")))
            }))
            .expect("add");

        assert_eq!(registry.call_hook("greet", &[]), Some(json!("from first")));
    }

    #[test]
    fn cross_plugin_conflict_is_logged_under_warn() {
        let logs = captured_warnings(|| {
            let mut registry = PluginRegistry::new(ConflictPolicy::Warn);
            registry
                .add(ScriptedPlugin::new("first", &["greet"], |_, _| {
                    Ok(Some(json!(1)))
                }))
                .expect("add");
            registry
                .add(ScriptedPlugin::new("second", &["greet"], |_, _| {
                    Ok(Some(json!(2)))
                }))
                .expect("add");
            assert_eq!(registry.call_hook("greet", &[]), Some(json!(1)));
        });
        assert!(logs.contains("Hook conflict"));
        assert!(logs.contains("second"));
    }

    #[test]
    fn cross_plugin_conflict_under_ignore_is_silent() {
        let logs = captured_warnings(|| {
            let mut registry = PluginRegistry::new(ConflictPolicy::Ignore);
            registry
                .add(ScriptedPlugin::new("first", &["greet"], |_, _| {
                    Ok(Some(json!(1)))
                }))
                .expect("add");
            registry
                .add(ScriptedPlugin::new("second", &["greet"], |_, _| {
                    Ok(Some(json!(2)))
                }))
                .expect("add");
            assert_eq!(registry.call_hook("greet", &[]), Some(json!(1)));
        });
        assert!(!logs.contains("Hook conflict"));
    }

    #[test]
    fn handler_error_does_not_stop_delivery() {
        let mut registry = PluginRegistry::default();
        registry
            .add(ScriptedPlugin::new("broken", &["greet"], |_, _| {
                Err(HostError::plugin("handler blew up"))
            }))
            .expect("add");
        registry
            .add(ScriptedPlugin::new("healthy", &["greet"], |_, _| {
                Ok(Some(json!(42)))
            }))
            .expect("add");

        assert_eq!(registry.call_hook("greet", &[]), Some(json!(42)));
    }

    #[test]
    fn only_handling_plugins_are_invoked() {
        let mut registry = PluginRegistry::default();
        let deaf = ScriptedPlugin::new("deaf", &["other"], |_, _| Ok(None));
        registry.add(deaf.clone()).expect("add");

        registry.call_hook("greet", &[]);
        assert!(deaf.calls.lock().is_empty());
    }

    #[test]
    fn unhandled_hook_returns_none() {
        let registry = PluginRegistry::default();
        assert_eq!(registry.call_hook("nobody_home", &[]), None);
    }
}
