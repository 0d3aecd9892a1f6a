//! Heartbeat demo plugin.
//!
//! Counts host ticks, answers `heartbeat_status` queries, and starts a
//! repeating one-second beat timer once the server reports ready.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

use modhub_plugin::library::LibraryRegistry;
use modhub_plugin::timers::TimerId;
use modhub_plugin_sdk::plugin_meta;
use modhub_plugin_sdk::prelude::*;

/// Hook answered with the current tick and beat counts.
pub const HEARTBEAT_STATUS: &str = "heartbeat_status";

const BEAT_INTERVAL: Duration = Duration::from_secs(1);

struct HeartbeatState {
    ticks: AtomicU64,
    beats: AtomicU64,
    libraries: Mutex<Option<Arc<LibraryRegistry>>>,
    beat_timer: Mutex<Option<TimerId>>,
    sink: Mutex<ErrorSink>,
}

/// The plugin: delegates hook dispatch to its [`HookTable`].
pub struct HeartbeatPlugin {
    meta: PluginMeta,
    table: HookTable,
    state: Arc<HeartbeatState>,
}

impl HeartbeatPlugin {
    pub fn new() -> HostResult<Self> {
        let meta = plugin_meta!(
            name: "heartbeat",
            title: "Heartbeat",
            author: "ModHub Team",
            version: "1.0.0"
        )?;

        let state = Arc::new(HeartbeatState {
            ticks: AtomicU64::new(0),
            beats: AtomicU64::new(0),
            libraries: Mutex::new(None),
            beat_timer: Mutex::new(None),
            sink: Mutex::new(ErrorSink::discard()),
        });

        let tick_state = Arc::clone(&state);
        let status_state = Arc::clone(&state);
        let ready_state = Arc::clone(&state);
        let table = HookTable::new()
            .on(names::ON_TICK, move |_| {
                tick_state.ticks.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            })
            .on(HEARTBEAT_STATUS, move |_| {
                Ok(Some(json!({
                    "ticks": status_state.ticks.load(Ordering::Relaxed),
                    "beats": status_state.beats.load(Ordering::Relaxed),
                })))
            })
            .on(names::ON_SERVER_INITIALIZED, move |_| {
                Self::start_beat(&ready_state);
                Ok(None)
            });

        Ok(Self { meta, table, state })
    }

    /// Current tick count.
    pub fn ticks(&self) -> u64 {
        self.state.ticks.load(Ordering::Relaxed)
    }

    /// Current beat count.
    pub fn beats(&self) -> u64 {
        self.state.beats.load(Ordering::Relaxed)
    }

    fn start_beat(state: &Arc<HeartbeatState>) {
        let libraries = state.libraries.lock().clone();
        let Some(timers) = libraries.and_then(|l| l.get::<TimerLibrary>(TimerLibrary::NAME))
        else {
            state
                .sink
                .lock()
                .report("heartbeat", "timer library unavailable, beat disabled");
            return;
        };

        // A reload hands the fresh instance a fresh state, so the old
        // timer must not outlive the old instance.
        let mut beat_timer = state.beat_timer.lock();
        if beat_timer.is_some() {
            return;
        }

        let beat_state = Arc::clone(state);
        *beat_timer = Some(timers.repeat(BEAT_INTERVAL, move || {
            let beats = beat_state.beats.fetch_add(1, Ordering::Relaxed) + 1;
            info!(beats, "Heartbeat");
        }));
        info!("Heartbeat started");
    }
}

impl Plugin for HeartbeatPlugin {
    fn meta(&self) -> PluginMeta {
        self.meta.clone()
    }

    fn init(&self, ctx: &PluginContext) -> HostResult<()> {
        *self.state.libraries.lock() = Some(Arc::clone(&ctx.libraries));
        Ok(())
    }

    fn handles_hook(&self, hook: &str) -> bool {
        self.table.handles(hook)
    }

    fn call_hook(&self, hook: &str, args: &[Value]) -> HostResult<Option<Value>> {
        self.table.dispatch(hook, args)
    }

    fn attach_error_sink(&self, sink: ErrorSink) {
        *self.state.sink.lock() = sink;
    }

    fn teardown(&self) {
        let timer = self.state.beat_timer.lock().take();
        let libraries = self.state.libraries.lock().clone();
        if let (Some(timer), Some(libraries)) = (timer, libraries) {
            if let Some(timers) = libraries.get::<TimerLibrary>(TimerLibrary::NAME) {
                timers.cancel(timer);
            }
        }
    }
}

impl std::fmt::Debug for HeartbeatPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatPlugin")
            .field("ticks", &self.ticks())
            .field("beats", &self.beats())
            .finish()
    }
}
