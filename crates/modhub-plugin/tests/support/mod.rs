//! Shared test doubles for the host integration tests.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::mem;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tempfile::TempDir;

use modhub_core::config::HostConfig;
use modhub_core::{HostError, HostResult};
use modhub_plugin::prelude::*;

/// Plugin that records every hook call it receives.
#[derive(Debug)]
pub struct RecordingPlugin {
    meta: PluginMeta,
    hooks: Vec<String>,
    responses: HashMap<String, Value>,
    fail_init: bool,
    calls: Arc<Mutex<Vec<String>>>,
    last_args: Arc<Mutex<Vec<Value>>>,
    torn_down: Arc<AtomicBool>,
}

impl RecordingPlugin {
    pub fn new(name: &str) -> Self {
        Self {
            meta: PluginMeta::parse(name, name, "test", "1.0.0").expect("meta"),
            hooks: Vec::new(),
            responses: HashMap::new(),
            fail_init: false,
            calls: Arc::new(Mutex::new(Vec::new())),
            last_args: Arc::new(Mutex::new(Vec::new())),
            torn_down: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn handling(mut self, hooks: &[&str]) -> Self {
        self.hooks = hooks.iter().map(|h| h.to_string()).collect();
        self
    }

    pub fn responding(mut self, hook: &str, value: Value) -> Self {
        if !self.hooks.iter().any(|h| h == hook) {
            self.hooks.push(hook.to_string());
        }
        self.responses.insert(hook.to_string(), value);
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Handle onto the recorded hook names, usable after the plugin has
    /// been handed to a host.
    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }

    /// Handle onto the arguments of the most recent hook call.
    pub fn last_args(&self) -> Arc<Mutex<Vec<Value>>> {
        Arc::clone(&self.last_args)
    }

    pub fn teardown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.torn_down)
    }
}

impl Plugin for RecordingPlugin {
    fn meta(&self) -> PluginMeta {
        self.meta.clone()
    }

    fn init(&self, _ctx: &PluginContext) -> HostResult<()> {
        if self.fail_init {
            return Err(HostError::plugin("init failed on purpose"));
        }
        Ok(())
    }

    fn handles_hook(&self, hook: &str) -> bool {
        self.hooks.iter().any(|h| h == hook)
    }

    fn call_hook(&self, hook: &str, args: &[Value]) -> HostResult<Option<Value>> {
        self.calls.lock().push(hook.to_string());
        *self.last_args.lock() = args.to_vec();
        Ok(self.responses.get(hook).cloned())
    }

    fn teardown(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
    }
}

type Factory = Box<dyn Fn() -> HostResult<Arc<dyn Plugin>> + Send + Sync>;

enum StubBehavior {
    Sync(Factory),
    Fail(String),
    /// Load completes through `take_completed` after this many polls.
    Deferred(usize, Factory),
}

#[derive(Default)]
struct StubState {
    entries: Vec<(String, StubBehavior)>,
    pending: Vec<(String, usize)>,
    hot_swap: bool,
    reloads: usize,
}

/// Loader claiming a scripted set of plugin names, with optional
/// deferred (asynchronous) completion and hot-swap reload support.
#[derive(Default)]
pub struct StubLoader {
    state: Mutex<StubState>,
}

impl StubLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claims(self, name: &str, factory: impl Fn() -> Arc<dyn Plugin> + Send + Sync + 'static) -> Self {
        self.state.lock().entries.push((
            name.to_string(),
            StubBehavior::Sync(Box::new(move || Ok(factory()))),
        ));
        self
    }

    pub fn claims_failing(self, name: &str, message: &str) -> Self {
        self.state
            .lock()
            .entries
            .push((name.to_string(), StubBehavior::Fail(message.to_string())));
        self
    }

    pub fn claims_deferred(
        self,
        name: &str,
        polls: usize,
        factory: impl Fn() -> HostResult<Arc<dyn Plugin>> + Send + Sync + 'static,
    ) -> Self {
        self.state.lock().entries.push((
            name.to_string(),
            StubBehavior::Deferred(polls, Box::new(factory)),
        ));
        self
    }

    /// Makes `reload` report success without re-instantiating.
    pub fn hot_swapping(self) -> Self {
        self.state.lock().hot_swap = true;
        self
    }

    pub fn reload_count(&self) -> usize {
        self.state.lock().reloads
    }
}

impl PluginLoader for StubLoader {
    fn scan_directory(&self, _dir: &Path) -> HostResult<Vec<String>> {
        Ok(self
            .state
            .lock()
            .entries
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn load(&self, _dir: &Path, name: &str) -> HostResult<LoadOutcome> {
        let mut state = self.state.lock();
        let behavior = state
            .entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| b)
            .ok_or_else(|| HostError::loader(format!("unknown plugin '{name}'")))?;
        match behavior {
            StubBehavior::Sync(factory) => Ok(LoadOutcome::Loaded(factory()?)),
            StubBehavior::Fail(message) => Err(HostError::loader(message.clone())),
            StubBehavior::Deferred(polls, _) => {
                let polls = *polls;
                state.pending.push((name.to_string(), polls));
                Ok(LoadOutcome::Pending)
            }
        }
    }

    fn loading_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    fn take_completed(&self) -> Vec<CompletedLoad> {
        let mut state = self.state.lock();
        for pending in &mut state.pending {
            pending.1 = pending.1.saturating_sub(1);
        }
        let (done, rest): (Vec<_>, Vec<_>) =
            mem::take(&mut state.pending).into_iter().partition(|p| p.1 == 0);
        state.pending = rest;

        done.into_iter()
            .map(|(name, _)| {
                let result = match state.entries.iter().find(|(n, _)| n == &name) {
                    Some((_, StubBehavior::Deferred(_, factory))) => factory(),
                    _ => Err(HostError::loader("deferred entry disappeared")),
                };
                CompletedLoad { name, result }
            })
            .collect()
    }

    fn reload(&self, _dir: &Path, _name: &str) -> HostResult<bool> {
        let mut state = self.state.lock();
        if state.hot_swap {
            state.reloads += 1;
            return Ok(true);
        }
        Ok(false)
    }
}

/// Clonable queue feeding a [`ScriptedWatcher`].
#[derive(Clone, Default)]
pub struct EventQueue {
    events: Arc<Mutex<Vec<SourceEvent>>>,
}

impl EventQueue {
    pub fn push(&self, event: SourceEvent) {
        self.events.lock().push(event);
    }
}

/// Watcher replaying events pushed through its [`EventQueue`].
pub struct ScriptedWatcher {
    queue: EventQueue,
}

impl ScriptedWatcher {
    pub fn new() -> (Self, EventQueue) {
        let queue = EventQueue::default();
        (
            Self {
                queue: queue.clone(),
            },
            queue,
        )
    }
}

impl ChangeWatcher for ScriptedWatcher {
    fn poll_changes(&mut self) -> Vec<SourceEvent> {
        mem::take(&mut *self.queue.events.lock())
    }
}

/// Host rooted in a temp directory, with fast load polling.
pub fn test_host(dir: &TempDir) -> Host {
    let mut config = HostConfig::default();
    config.directories.plugins = dir.path().join("plugins");
    config.directories.data = dir.path().join("data");
    config.directories.logs = dir.path().join("logs");
    config.runtime.load_poll_ms = 1;
    config.runtime.load_wait_secs = 2;
    Host::new(config)
}
