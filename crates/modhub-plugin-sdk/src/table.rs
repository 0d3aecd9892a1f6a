//! Closure-based hook dispatch table.

use std::fmt;

use serde_json::Value;

use modhub_core::HostResult;

/// A single hook handler closure.
pub type HookHandler = Box<dyn Fn(&[Value]) -> HostResult<Option<Value>> + Send + Sync>;

/// Maps hook names to handler closures.
///
/// Plugin developers build one at construction time and delegate their
/// `handles_hook` and `call_hook` implementations to it, instead of
/// hand-writing a match over hook names.
#[derive(Default)]
pub struct HookTable {
    handlers: Vec<(String, HookHandler)>,
}

impl HookTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for the named hook. A later registration for
    /// the same name replaces the earlier one.
    pub fn on(
        mut self,
        hook: impl Into<String>,
        handler: impl Fn(&[Value]) -> HostResult<Option<Value>> + Send + Sync + 'static,
    ) -> Self {
        let hook = hook.into();
        self.handlers.retain(|(name, _)| name != &hook);
        self.handlers.push((hook, Box::new(handler)));
        self
    }

    /// Returns whether a handler is registered for the named hook.
    pub fn handles(&self, hook: &str) -> bool {
        self.handlers.iter().any(|(name, _)| name == hook)
    }

    /// Invokes the handler for the named hook, or contributes nothing if
    /// no handler is registered.
    pub fn dispatch(&self, hook: &str, args: &[Value]) -> HostResult<Option<Value>> {
        match self.handlers.iter().find(|(name, _)| name == hook) {
            Some((_, handler)) => handler(args),
            None => Ok(None),
        }
    }

    /// Returns the registered hook names.
    pub fn hook_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl fmt::Debug for HookTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookTable")
            .field("hooks", &self.hook_names())
            .finish()
    }
}
