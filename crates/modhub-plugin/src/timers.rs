//! Timer library: once/repeat timers expired on the host tick.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::library::Library;

/// Token identifying a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

type TimerCallback = Box<dyn FnMut() + Send>;

struct TimerEntry {
    id: TimerId,
    due: Instant,
    repeat: Option<Duration>,
    callback: TimerCallback,
}

#[derive(Default)]
struct TimerState {
    next_id: u64,
    entries: Vec<TimerEntry>,
    // Ids detached for the tick pass currently running, and the subset
    // cancelled while detached. Both empty outside a pass.
    running: Vec<TimerId>,
    cancelled: Vec<TimerId>,
}

/// Core library `"timer"`: schedules callbacks against the host tick.
///
/// Expiry happens during the library maintenance pass of each tick, so
/// timer resolution is the tick interval. Due callbacks are detached
/// under the lock and run outside it; a callback may therefore schedule
/// further timers.
#[derive(Default)]
pub struct TimerLibrary {
    state: Mutex<TimerState>,
}

impl TimerLibrary {
    /// The name the host registers this library under.
    pub const NAME: &'static str = "timer";

    /// Creates an empty timer library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a one-shot callback after the given delay.
    pub fn once(&self, delay: Duration, callback: impl FnOnce() + Send + 'static) -> TimerId {
        // Adapt the FnOnce to the FnMut entry; it fires at most once.
        let mut callback = Some(callback);
        self.schedule(delay, None, Box::new(move || {
            if let Some(callback) = callback.take() {
                callback();
            }
        }))
    }

    /// Schedules a repeating callback with the given interval.
    pub fn repeat(&self, every: Duration, callback: impl FnMut() + Send + 'static) -> TimerId {
        self.schedule(every, Some(every), Box::new(callback))
    }

    /// Cancels a scheduled timer. Returns whether it was still pending.
    ///
    /// A timer whose callback is part of the tick pass in flight counts
    /// as pending: cancelling it (from its own callback or a sibling's)
    /// prevents a repeating entry from re-arming.
    pub fn cancel(&self, id: TimerId) -> bool {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|entry| entry.id != id);
        if state.entries.len() != before {
            return true;
        }
        if state.running.contains(&id) && !state.cancelled.contains(&id) {
            state.cancelled.push(id);
            return true;
        }
        false
    }

    /// Returns the number of pending timers.
    pub fn pending(&self) -> usize {
        self.state.lock().entries.len()
    }

    fn schedule(&self, delay: Duration, repeat: Option<Duration>, callback: TimerCallback) -> TimerId {
        let mut state = self.state.lock();
        let id = TimerId(state.next_id);
        state.next_id += 1;
        state.entries.push(TimerEntry {
            id,
            due: Instant::now() + delay,
            repeat,
            callback,
        });
        id
    }
}

impl Library for TimerLibrary {
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn on_tick(&self) {
        let now = Instant::now();
        let mut due = {
            let mut state = self.state.lock();
            let mut due = Vec::new();
            let mut i = 0;
            while i < state.entries.len() {
                if state.entries[i].due <= now {
                    due.push(state.entries.remove(i));
                } else {
                    i += 1;
                }
            }
            state.running = due.iter().map(|entry| entry.id).collect();
            due
        };

        for entry in &mut due {
            (entry.callback)();
        }

        // Re-arm repeating timers that were not cancelled mid-callback.
        let mut state = self.state.lock();
        let cancelled = std::mem::take(&mut state.cancelled);
        state.running.clear();
        for mut entry in due {
            if let Some(every) = entry.repeat {
                if cancelled.contains(&entry.id) {
                    continue;
                }
                entry.due = now + every;
                state.entries.push(entry);
            }
        }
    }
}

impl std::fmt::Debug for TimerLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerLibrary")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn once_fires_exactly_once_when_due() {
        let timers = TimerLibrary::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&fired);
        timers.once(Duration::ZERO, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        });

        timers.on_tick();
        timers.on_tick();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn not_yet_due_timers_stay_pending() {
        let timers = TimerLibrary::new();
        timers.once(Duration::from_secs(3600), || {});
        timers.on_tick();
        assert_eq!(timers.pending(), 1);
    }

    #[test]
    fn repeat_fires_every_tick_once_due() {
        let timers = TimerLibrary::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&fired);
        timers.repeat(Duration::ZERO, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        });

        timers.on_tick();
        timers.on_tick();
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(timers.pending(), 1);
    }

    #[test]
    fn cancel_prevents_firing() {
        let timers = TimerLibrary::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&fired);
        let id = timers.once(Duration::ZERO, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        });

        assert!(timers.cancel(id));
        timers.on_tick();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!timers.cancel(id));
    }

    #[test]
    fn repeat_timer_cancelling_itself_mid_callback_stops() {
        let timers = Arc::new(TimerLibrary::new());
        let fired = Arc::new(AtomicUsize::new(0));
        let own_id = Arc::new(parking_lot::Mutex::new(None));

        let inner_timers = Arc::clone(&timers);
        let inner_fired = Arc::clone(&fired);
        let inner_id = Arc::clone(&own_id);
        let id = timers.repeat(Duration::ZERO, move || {
            inner_fired.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *inner_id.lock() {
                // Still in flight, so the cancel must count as pending.
                assert!(inner_timers.cancel(id));
            }
        });
        *own_id.lock() = Some(id);

        timers.on_tick();
        timers.on_tick();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(timers.pending(), 0);
        assert!(!timers.cancel(id));
    }

    #[test]
    fn callback_may_schedule_another_timer() {
        let timers = Arc::new(TimerLibrary::new());
        let fired = Arc::new(AtomicUsize::new(0));
        let outer_timers = Arc::clone(&timers);
        let inner_fired = Arc::clone(&fired);
        timers.once(Duration::ZERO, move || {
            let fired = Arc::clone(&inner_fired);
            outer_timers.once(Duration::ZERO, move || {
                fired.fetch_add(1, Ordering::SeqCst);
            });
        });

        timers.on_tick();
        timers.on_tick();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
