//! Well-known hook names raised by the host itself.
//!
//! Hooks are identified by snake_case string names. Game integrations add
//! their own names on top of these; the constants here are the ones the
//! lifecycle manager fires or intercepts.

/// Fired once per host tick; intercepted by the host to drain the
/// next-tick queue, poll watchers, commit finished asynchronous loads,
/// and run library maintenance before being forwarded to plugins.
pub const ON_TICK: &str = "on_tick";

/// Fired after a plugin has been committed to the registry. The single
/// argument is the new plugin's metadata object.
pub const ON_PLUGIN_LOADED: &str = "on_plugin_loaded";

/// Fired after a plugin has been removed from the registry. The single
/// argument is the removed plugin's metadata object.
pub const ON_PLUGIN_UNLOADED: &str = "on_plugin_unloaded";

/// Fired when the hosting server has finished booting. Re-fired on a
/// freshly reloaded plugin, which missed the original boot sequence.
pub const ON_SERVER_INITIALIZED: &str = "on_server_initialized";
