//! The typed multicast hook primitive.
//!
//! A [`Hook`] is a named slot that fans one call out to every subscriber
//! in subscription order and folds their answers into at most one
//! authoritative result: the first subscriber to return `Some` wins, and
//! every later `Some` is a conflict resolved per [`ConflictPolicy`].
//!
//! The primitive itself never catches subscriber failures; that boundary
//! lives in the registry fan-out path. What it does enforce, hard:
//!
//! - a reentrant call on the same hook instance is refused and returns
//!   `None` without invoking anyone, so two plugins reacting to their own
//!   hook cannot recurse forever;
//! - subscribe/unsubscribe during an in-flight call are refused and have
//!   no effect, so the subscriber list never mutates mid-iteration.
//!
//! `Cell`/`RefCell` bookkeeping makes the type `!Sync` on purpose: hooks
//! are dispatched from the tick thread only, and the type system enforces
//! that instead of a doc comment.

use std::cell::{Cell, RefCell};

use tracing::warn;

/// How a hook resolves multiple subscribers returning a value for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Later values are silently discarded.
    Ignore,
    /// Later values are discarded with a logged warning naming the hook.
    Warn,
}

/// Token identifying one subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct Subscriber<A, R> {
    id: SubscriberId,
    callback: Box<dyn Fn(&A) -> Option<R>>,
}

/// A named, typed multicast hook.
pub struct Hook<A, R> {
    name: String,
    policy: ConflictPolicy,
    subscribers: RefCell<Vec<Subscriber<A, R>>>,
    in_call: Cell<bool>,
    next_id: Cell<u64>,
}

impl<A, R> Hook<A, R> {
    /// Creates a new hook with the given name and conflict policy.
    pub fn new(name: impl Into<String>, policy: ConflictPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            subscribers: RefCell::new(Vec::new()),
            in_call: Cell::new(false),
            next_id: Cell::new(0),
        }
    }

    /// Returns the hook name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Subscribes a callback, returning its token.
    ///
    /// Refused with a logged warning if a call on this hook is in flight;
    /// the caller must retry after the call completes.
    pub fn subscribe(&self, callback: impl Fn(&A) -> Option<R> + 'static) -> Option<SubscriberId> {
        if self.in_call.get() {
            warn!(
                hook = %self.name,
                "Hook subscribe refused: a subscriber tried to add another subscriber mid-call"
            );
            return None;
        }
        let id = SubscriberId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers.borrow_mut().push(Subscriber {
            id,
            callback: Box::new(callback),
        });
        Some(id)
    }

    /// Unsubscribes a previously subscribed callback.
    ///
    /// Refused with a logged warning if a call on this hook is in flight.
    /// Returns whether a subscriber was removed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        if self.in_call.get() {
            warn!(
                hook = %self.name,
                "Hook unsubscribe refused: a subscriber tried to remove a subscriber mid-call"
            );
            return false;
        }
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// Calls the hook, invoking every subscriber in subscription order.
    ///
    /// Returns the first present value; later present values are conflicts
    /// handled per the hook's [`ConflictPolicy`]. A reentrant call on the
    /// same hook returns `None` immediately without invoking anyone.
    pub fn call(&self, arg: &A) -> Option<R> {
        if self.in_call.get() {
            warn!(
                hook = %self.name,
                "Hook recursion refused: a subscriber caused the hook to refire"
            );
            return None;
        }
        self.in_call.set(true);

        let mut result = None;
        let subscribers = self.subscribers.borrow();
        for subscriber in subscribers.iter() {
            let Some(value) = (subscriber.callback)(arg) else {
                continue;
            };
            if result.is_none() {
                result = Some(value);
            } else if self.policy == ConflictPolicy::Warn {
                warn!(
                    hook = %self.name,
                    "Hook conflict: multiple subscribers returned a value"
                );
            }
        }
        drop(subscribers);

        self.in_call.set(false);
        result
    }
}

impl<A, R> std::fmt::Debug for Hook<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("subscribers", &self.subscribers.borrow().len())
            .field("in_call", &self.in_call.get())
            .finish()
    }
}

struct SignalSubscriber {
    id: SubscriberId,
    callback: Box<dyn Fn()>,
}

/// A no-argument, no-result hook variant for broadcast-only notifications.
///
/// Shares the recursion and mutation guards of [`Hook`], but has no
/// conflict concept since it never accumulates a result.
pub struct Signal {
    name: String,
    subscribers: RefCell<Vec<SignalSubscriber>>,
    in_call: Cell<bool>,
    next_id: Cell<u64>,
}

impl Signal {
    /// Creates a new signal with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscribers: RefCell::new(Vec::new()),
            in_call: Cell::new(false),
            next_id: Cell::new(0),
        }
    }

    /// Returns the signal name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribes a callback, returning its token.
    pub fn subscribe(&self, callback: impl Fn() + 'static) -> Option<SubscriberId> {
        if self.in_call.get() {
            warn!(
                signal = %self.name,
                "Signal subscribe refused: a subscriber tried to add another subscriber mid-raise"
            );
            return None;
        }
        let id = SubscriberId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers.borrow_mut().push(SignalSubscriber {
            id,
            callback: Box::new(callback),
        });
        Some(id)
    }

    /// Unsubscribes a previously subscribed callback.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        if self.in_call.get() {
            warn!(
                signal = %self.name,
                "Signal unsubscribe refused: a subscriber tried to remove a subscriber mid-raise"
            );
            return false;
        }
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// Raises the signal, invoking every subscriber in subscription order.
    ///
    /// A reentrant raise is refused without invoking anyone.
    pub fn raise(&self) {
        if self.in_call.get() {
            warn!(
                signal = %self.name,
                "Signal recursion refused: a subscriber caused the signal to re-raise"
            );
            return;
        }
        self.in_call.set(true);
        let subscribers = self.subscribers.borrow();
        for subscriber in subscribers.iter() {
            (subscriber.callback)();
        }
        drop(subscribers);
        self.in_call.set(false);
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}
