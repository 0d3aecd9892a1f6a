//! The host: plugin lifecycle management and hook forwarding.
//!
//! One long-lived [`Host`] is constructed at startup and owns the plugin
//! registry, the extension manager, and the next-tick scheduler. All
//! plugin-visible state transitions happen on the thread driving
//! [`Host::call_hook`] (the tick thread); other threads reach the host
//! only through the [`NextTickScheduler`] handle.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{error, info, warn};

use modhub_core::config::HostConfig;
use modhub_core::{HostError, HostResult};

use crate::context::PluginContext;
use crate::extension::ExtensionManager;
use crate::hooks::names;
use crate::loader::{LoadOutcome, PluginLoader};
use crate::plugin::{ErrorSink, Plugin};
use crate::registry::PluginRegistry;
use crate::scheduler::NextTickScheduler;
use crate::timers::TimerLibrary;
use crate::watcher::SourceEvent;

/// Lifecycle state of a plugin name as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// No plugin of this name is known.
    Absent,
    /// An asynchronous load is in progress.
    Loading,
    /// The plugin is committed to the registry with hooks active.
    Active,
    /// The most recent load or init attempt failed.
    Errored,
}

/// The root lifecycle manager.
#[derive(Debug)]
pub struct Host {
    config: HostConfig,
    registry: PluginRegistry,
    extensions: ExtensionManager,
    scheduler: NextTickScheduler,
    states: HashMap<String, PluginState>,
    watchers_armed: bool,
    error_sink: ErrorSink,
}

impl Host {
    /// Creates a host with the given configuration.
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            registry: PluginRegistry::default(),
            extensions: ExtensionManager::new(),
            scheduler: NextTickScheduler::new(),
            states: HashMap::new(),
            watchers_armed: false,
            error_sink: ErrorSink::new(|plugin, message| {
                error!(plugin = %plugin, "{message}");
            }),
        }
    }

    /// Returns the host configuration.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Returns the plugin registry.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Returns a clonable handle onto the next-tick queue.
    pub fn scheduler(&self) -> NextTickScheduler {
        self.scheduler.clone()
    }

    /// Returns the extension manager for registering loaders, watchers,
    /// and libraries during bootstrap.
    pub fn extensions_mut(&mut self) -> &mut ExtensionManager {
        &mut self.extensions
    }

    /// Returns the extension manager.
    pub fn extensions(&self) -> &ExtensionManager {
        &self.extensions
    }

    /// Returns the context handed to plugins at init.
    pub fn context(&self) -> PluginContext {
        PluginContext::new(self.scheduler.clone(), self.extensions.libraries())
    }

    /// Queues a callback for the next tick. Callable from any thread via
    /// [`Host::scheduler`]; this is the in-place convenience.
    pub fn next_tick(&self, callback: impl FnOnce() -> HostResult<()> + Send + 'static) {
        self.scheduler.next_tick(callback);
    }

    /// Returns the lifecycle state of the named plugin.
    pub fn plugin_state(&self, name: &str) -> PluginState {
        if self.registry.contains(name) {
            return PluginState::Active;
        }
        self.states.get(name).copied().unwrap_or(PluginState::Absent)
    }

    /// Boots the host: ensures the instance directories exist, registers
    /// the core libraries, performs the initial bulk load, and arms the
    /// change watchers so their events never race the startup scan.
    pub fn init(&mut self) -> HostResult<()> {
        std::fs::create_dir_all(&self.config.directories.plugins)?;
        std::fs::create_dir_all(&self.config.directories.data)?;
        std::fs::create_dir_all(&self.config.directories.logs)?;

        if !self.extensions.libraries().contains(TimerLibrary::NAME) {
            self.extensions
                .register_library(TimerLibrary::NAME, Arc::new(TimerLibrary::new()))?;
        }

        info!("Loading plugins...");
        self.load_all_plugins();
        self.arm_watchers();
        Ok(())
    }

    /// Starts routing change-watcher events on each tick.
    pub fn arm_watchers(&mut self) {
        self.watchers_armed = true;
    }

    /// Scans every registered loader and loads every plugin it reports.
    ///
    /// One broken plugin never blocks the rest: each load and each commit
    /// failure is logged with the plugin name and isolated. Loaders that
    /// report asynchronous loads in progress are waited for in a bounded
    /// poll loop that pumps the tick hook each iteration, so timers and
    /// deferred callbacks keep running during the wait.
    pub fn load_all_plugins(&mut self) {
        let loaders: Vec<Arc<dyn PluginLoader>> = self.extensions.loaders().to_vec();
        let dir = self.config.directories.plugins.clone();
        let mut staged: Vec<Arc<dyn Plugin>> = Vec::new();

        for loader in &loaders {
            let names = match loader.scan_directory(&dir) {
                Ok(names) => names,
                Err(e) => {
                    error!(error = %e, "Plugin loader scan failed");
                    continue;
                }
            };
            for name in names {
                if self.registry.contains(&name)
                    || staged.iter().any(|p| p.meta().name == name)
                    || self.plugin_state(&name) == PluginState::Loading
                {
                    continue;
                }
                match loader.load(&dir, &name) {
                    Ok(LoadOutcome::Loaded(plugin)) => staged.push(plugin),
                    Ok(LoadOutcome::Pending) => {
                        self.states.insert(name, PluginState::Loading);
                    }
                    Err(e) => {
                        error!(plugin = %name, error = %e, "Failed to load plugin");
                        self.states.insert(name, PluginState::Errored);
                    }
                }
            }
        }

        // Wait for asynchronous loads, pumping the tick so deferred work
        // and library maintenance keep moving. Completed loads commit via
        // the tick maintenance pass.
        let poll = Duration::from_millis(self.config.runtime.load_poll_ms);
        let deadline = Instant::now() + Duration::from_secs(self.config.runtime.load_wait_secs);
        loop {
            let pending: usize = loaders.iter().map(|l| l.loading_count()).sum();
            if pending == 0 {
                break;
            }
            if Instant::now() >= deadline {
                warn!(pending, "Gave up waiting for asynchronous plugin loads");
                break;
            }
            thread::sleep(poll);
            self.call_hook(names::ON_TICK, &[]);
        }

        for plugin in staged {
            let name = plugin.meta().name;
            if let Err(e) = self.commit_plugin(plugin) {
                error!(plugin = %name, error = %e, "Failed to initialise plugin");
            }
        }
    }

    /// Loads the plugin with the given name.
    ///
    /// Exactly one loader must claim the name: zero claims is a
    /// no-source-found error and more than one is an ambiguous-source
    /// error; both are logged and leave the registry unchanged.
    pub fn load_plugin(&mut self, name: &str) -> HostResult<()> {
        if self.registry.contains(name) {
            return Ok(());
        }

        let dir = self.config.directories.plugins.clone();
        let claims = self.claiming_loaders(name);
        let loader = match claims.len() {
            1 => &claims[0],
            0 => {
                let err =
                    HostError::not_found(format!("Failed to load plugin '{name}': no source found"));
                error!(plugin = %name, "{}", err.message);
                return Err(err);
            }
            _ => {
                let err = HostError::ambiguous(format!(
                    "Failed to load plugin '{name}': multiple sources found"
                ));
                error!(plugin = %name, "{}", err.message);
                return Err(err);
            }
        };

        match loader.load(&dir, name) {
            Ok(LoadOutcome::Loaded(plugin)) => self.commit_plugin(plugin).map_err(|e| {
                error!(plugin = %name, error = %e, "Failed to initialise plugin");
                e
            }),
            Ok(LoadOutcome::Pending) => {
                self.states.insert(name.to_string(), PluginState::Loading);
                Ok(())
            }
            Err(e) => {
                error!(plugin = %name, error = %e, "Failed to load plugin");
                self.states.insert(name.to_string(), PluginState::Errored);
                Err(e)
            }
        }
    }

    /// Commits an already-constructed plugin to the registry.
    ///
    /// Public for embedders installing compiled-in plugins; also the
    /// commit step behind every loader path. The plugin is either fully
    /// committed (registry entry, error sink, `on_plugin_loaded` fired)
    /// or fully absent.
    pub fn install_plugin(&mut self, plugin: Arc<dyn Plugin>) -> HostResult<()> {
        let name = plugin.meta().name;
        self.commit_plugin(plugin).map_err(|e| {
            error!(plugin = %name, error = %e, "Failed to initialise plugin");
            e
        })
    }

    /// Unloads the named plugin. Returns false if it was not loaded.
    pub fn unload_plugin(&mut self, name: &str) -> bool {
        let Some(plugin) = self.registry.remove(name) else {
            return false;
        };
        self.states.remove(name);
        plugin.teardown();
        let meta = plugin.meta();
        self.registry
            .call_hook(names::ON_PLUGIN_UNLOADED, &[meta.to_value()]);
        info!(
            plugin = %meta.name,
            version = %meta.version,
            author = %meta.author,
            "Unloaded plugin"
        );
        true
    }

    /// Reloads the named plugin.
    ///
    /// Prefers an in-place hot-swap when the single claiming loader
    /// supports one; otherwise unloads and loads, then re-fires the
    /// server-ready notification on the fresh instance since it missed
    /// the original boot sequence. Reloading an absent plugin behaves
    /// like loading it.
    pub fn reload_plugin(&mut self, name: &str) -> bool {
        let dir = self.config.directories.plugins.clone();
        let claims = self.claiming_loaders(name);
        if claims.len() == 1 {
            match claims[0].reload(&dir, name) {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    error!(plugin = %name, error = %e, "In-place reload failed");
                }
            }
        }

        self.unload_plugin(name);
        if self.load_plugin(name).is_err() {
            return false;
        }
        let Some(plugin) = self.registry.get(name) else {
            // Asynchronous load still pending; commits on a later tick.
            return true;
        };
        if plugin.handles_hook(names::ON_SERVER_INITIALIZED) {
            if let Err(e) = plugin.call_hook(names::ON_SERVER_INITIALIZED, &[]) {
                error!(
                    plugin = %name,
                    hook = names::ON_SERVER_INITIALIZED,
                    error = %e,
                    "Plugin hook handler failed"
                );
            }
        }
        true
    }

    /// Broadcasts a named hook to every active plugin.
    ///
    /// This is the single entry point the rest of the host uses. The tick
    /// hook receives host-internal handling first: the next-tick queue is
    /// drained, armed change watchers are polled and their events routed,
    /// finished asynchronous loads are committed, and every library's
    /// maintenance pass runs. The call is then fanned out to the registry.
    pub fn call_hook(&mut self, hook: &str, args: &[Value]) -> Option<Value> {
        if hook == names::ON_TICK {
            self.tick_maintenance();
        }
        self.registry.call_hook(hook, args)
    }

    fn tick_maintenance(&mut self) {
        self.scheduler.drain();

        if self.watchers_armed {
            for event in self.extensions.poll_watchers() {
                self.route_source_event(event);
            }
        }

        self.commit_completed_loads();
        self.extensions.libraries().tick_all();
    }

    fn route_source_event(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::Changed(name) => {
                self.reload_plugin(&name);
            }
            SourceEvent::Added(name) => {
                // Failures are already logged; the batch continues.
                let _ = self.load_plugin(&name);
            }
            SourceEvent::Removed(name) => {
                self.unload_plugin(&name);
            }
        }
    }

    fn commit_completed_loads(&mut self) {
        let loaders: Vec<Arc<dyn PluginLoader>> = self.extensions.loaders().to_vec();
        for loader in loaders {
            for completed in loader.take_completed() {
                match completed.result {
                    Ok(plugin) => {
                        if let Err(e) = self.commit_plugin(plugin) {
                            error!(
                                plugin = %completed.name,
                                error = %e,
                                "Failed to initialise plugin"
                            );
                        }
                    }
                    Err(e) => {
                        error!(plugin = %completed.name, error = %e, "Failed to load plugin");
                        self.states.insert(completed.name, PluginState::Errored);
                    }
                }
            }
        }
    }

    fn commit_plugin(&mut self, plugin: Arc<dyn Plugin>) -> HostResult<()> {
        let meta = plugin.meta();
        if self.registry.contains(&meta.name) {
            return Err(HostError::conflict(format!(
                "Plugin '{}' is already loaded",
                meta.name
            )));
        }

        plugin.attach_error_sink(self.error_sink.clone());
        let ctx = self.context();
        if let Err(e) = plugin.init(&ctx) {
            self.states.insert(meta.name.clone(), PluginState::Errored);
            return Err(e);
        }

        self.registry.add(Arc::clone(&plugin))?;
        self.states.remove(&meta.name);
        info!(
            plugin = %meta.title,
            version = %meta.version,
            author = %meta.author,
            "Loaded plugin"
        );
        self.registry
            .call_hook(names::ON_PLUGIN_LOADED, &[meta.to_value()]);
        Ok(())
    }

    fn claiming_loaders(&self, name: &str) -> Vec<Arc<dyn PluginLoader>> {
        let dir = &self.config.directories.plugins;
        let mut claims = Vec::new();
        for loader in self.extensions.loaders() {
            match loader.scan_directory(dir) {
                Ok(names) => {
                    if names.iter().any(|n| n == name) {
                        claims.push(Arc::clone(loader));
                    }
                }
                Err(e) => warn!(error = %e, "Plugin loader scan failed"),
            }
        }
        claims
    }
}
