//! Hook system: the typed multicast primitive and well-known hook names.

pub mod hook;
pub mod names;

pub use hook::{ConflictPolicy, Hook, Signal, SubscriberId};
