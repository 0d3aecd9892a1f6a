//! Convenience macros for plugin development.

/// Macro for building plugin metadata.
///
/// Expands to a `HostResult<PluginMeta>`; the version string is parsed
/// as a semantic version.
///
/// # Example
/// ```rust,ignore
/// let meta = plugin_meta!(
///     name: "heartbeat",
///     title: "Heartbeat",
///     author: "ModHub Team",
///     version: "1.0.0"
/// )?;
/// ```
#[macro_export]
macro_rules! plugin_meta {
    (
        name: $name:expr,
        title: $title:expr,
        author: $author:expr,
        version: $version:expr
    ) => {
        $crate::prelude::PluginMeta::parse($name, $title, $author, $version)
    };
}

/// Macro exporting a plugin from a dynamic library.
///
/// Generates the `create_plugin` constructor the dynamic loader resolves.
/// The expression must produce the plugin value infallibly.
///
/// # Example
/// ```rust,ignore
/// modhub_plugin_sdk::export_plugin!(HeartbeatPlugin::default());
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($plugin:expr) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn create_plugin() -> *mut dyn $crate::prelude::Plugin {
            let plugin: Box<dyn $crate::prelude::Plugin> = Box::new($plugin);
            Box::into_raw(plugin)
        }
    };
}
