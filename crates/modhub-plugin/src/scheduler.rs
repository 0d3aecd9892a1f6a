//! Thread-safe deferred-callback scheduling onto the host's logical tick.

use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use modhub_core::HostResult;

type TickCallback = Box<dyn FnOnce() -> HostResult<()> + Send>;

/// A clonable handle onto the next-tick queue.
///
/// Any thread may enqueue a callback; callbacks execute exclusively on
/// whichever thread drives [`NextTickScheduler::drain`] (the tick thread),
/// in enqueue order per drain batch. This is the only structure in the
/// runtime that takes a lock; everything else is single-writer on the tick
/// thread.
#[derive(Clone, Default)]
pub struct NextTickScheduler {
    queue: Arc<Mutex<Vec<TickCallback>>>,
}

impl NextTickScheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a callback to run on the next tick.
    pub fn next_tick(&self, callback: impl FnOnce() -> HostResult<()> + Send + 'static) {
        self.queue.lock().push(Box::new(callback));
    }

    /// Returns the number of callbacks waiting for the next drain.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Runs every queued callback on the calling thread.
    ///
    /// The queue is detached under the lock and executed outside it, so a
    /// callback may enqueue further work without deadlocking; such work
    /// runs on the following drain. A failing callback is logged and does
    /// not prevent the remaining callbacks from running. Returns how many
    /// callbacks ran.
    pub fn drain(&self) -> usize {
        let batch = mem::take(&mut *self.queue.lock());
        let count = batch.len();
        for callback in batch {
            if let Err(e) = callback() {
                error!(error = %e, "Next-tick callback failed");
            }
        }
        count
    }
}

impl std::fmt::Debug for NextTickScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NextTickScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn drains_in_enqueue_order_on_the_draining_thread() {
        let scheduler = NextTickScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let drain_thread = thread::current().id();

        for i in 0..3u32 {
            let order = Arc::clone(&order);
            scheduler.next_tick(move || {
                assert_eq!(thread::current().id(), drain_thread);
                order.lock().push(i);
                Ok(())
            });
        }

        assert_eq!(scheduler.drain(), 3);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn cross_thread_enqueues_all_run_exactly_once_despite_a_failure() {
        let scheduler = NextTickScheduler::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..3)
            .map(|i| {
                let scheduler = scheduler.clone();
                let ran = Arc::clone(&ran);
                thread::spawn(move || {
                    scheduler.next_tick(move || {
                        ran.fetch_add(1, Ordering::SeqCst);
                        if i == 1 {
                            Err(modhub_core::HostError::plugin("deliberate failure"))
                        } else {
                            Ok(())
                        }
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("enqueue thread");
        }

        assert_eq!(scheduler.drain(), 3);
        assert_eq!(ran.load(Ordering::SeqCst), 3);
        // Nothing left over; failed callbacks are not retried.
        assert_eq!(scheduler.drain(), 0);
    }

    #[test]
    fn work_enqueued_during_drain_runs_on_the_next_drain() {
        let scheduler = NextTickScheduler::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let inner_scheduler = scheduler.clone();
        let inner_ran = Arc::clone(&ran);
        scheduler.next_tick(move || {
            let ran = Arc::clone(&inner_ran);
            inner_scheduler.next_tick(move || {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            Ok(())
        });

        assert_eq!(scheduler.drain(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.drain(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
