//! Plugin loader contract and the optional dynamic shared-library loader.

use std::path::Path;
use std::sync::Arc;

use modhub_core::HostResult;

use crate::plugin::Plugin;

/// Outcome of asking a loader to produce a plugin.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The plugin was produced synchronously.
    Loaded(Arc<dyn Plugin>),
    /// The load continues in the background; the result will surface
    /// through [`PluginLoader::take_completed`].
    Pending,
}

/// A finished background load, successful or not.
#[derive(Debug)]
pub struct CompletedLoad {
    /// The plugin name the load was started for.
    pub name: String,
    /// The produced plugin, or the load failure.
    pub result: HostResult<Arc<dyn Plugin>>,
}

/// External collaborator that discovers and constructs plugins from a
/// source location.
pub trait PluginLoader: Send + Sync {
    /// Scans the directory and returns the plugin names this loader
    /// claims. Side-effect free and restartable.
    fn scan_directory(&self, dir: &Path) -> HostResult<Vec<String>>;

    /// Produces the named plugin, or reports that an asynchronous load is
    /// now in progress.
    fn load(&self, dir: &Path, name: &str) -> HostResult<LoadOutcome>;

    /// Number of asynchronous loads currently in flight.
    fn loading_count(&self) -> usize {
        0
    }

    /// Drains finished asynchronous loads for the host to commit.
    ///
    /// The host polls this during its tick maintenance pass; loaders with
    /// no asynchronous path keep the default empty implementation.
    fn take_completed(&self) -> Vec<CompletedLoad> {
        Vec::new()
    }

    /// Reloads the named plugin in place, returning whether the loader
    /// handled it. Loaders without hot-swap support keep the default,
    /// and the host falls back to unload-then-load.
    fn reload(&self, dir: &Path, name: &str) -> HostResult<bool> {
        let _ = (dir, name);
        Ok(false)
    }
}

/// Dynamic plugin loading via `libloading` (feature-gated).
#[cfg(feature = "dynamic")]
pub mod dynamic {
    use std::path::Path;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tracing::info;

    use modhub_core::{HostError, HostResult};

    use super::{LoadOutcome, PluginLoader};
    use crate::plugin::Plugin;

    /// Type of the constructor function exported by dynamic plugins.
    ///
    /// Dynamic plugins must export:
    /// `#[no_mangle] extern "C" fn create_plugin() -> *mut dyn Plugin`
    /// with the pointer produced by `Box::into_raw`.
    pub type CreatePluginFn = unsafe extern "C" fn() -> *mut dyn Plugin;

    #[cfg(target_os = "windows")]
    const DYLIB_EXTENSION: &str = "dll";
    #[cfg(target_os = "macos")]
    const DYLIB_EXTENSION: &str = "dylib";
    #[cfg(all(unix, not(target_os = "macos")))]
    const DYLIB_EXTENSION: &str = "so";

    /// Loads plugins from shared libraries (.so / .dll / .dylib).
    ///
    /// Loaded libraries are kept alive for the lifetime of the loader;
    /// unloading a plugin does not unmap its code.
    pub struct DynamicLoader {
        libraries: Mutex<Vec<libloading::Library>>,
    }

    impl DynamicLoader {
        /// Creates a new dynamic loader.
        pub fn new() -> Self {
            Self {
                libraries: Mutex::new(Vec::new()),
            }
        }

        fn library_path(dir: &Path, name: &str) -> std::path::PathBuf {
            dir.join(format!("{name}.{DYLIB_EXTENSION}"))
        }
    }

    impl Default for DynamicLoader {
        fn default() -> Self {
            Self::new()
        }
    }

    impl PluginLoader for DynamicLoader {
        fn scan_directory(&self, dir: &Path) -> HostResult<Vec<String>> {
            let mut names = Vec::new();
            if !dir.is_dir() {
                return Ok(names);
            }
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                let is_dylib = path
                    .extension()
                    .is_some_and(|ext| ext == DYLIB_EXTENSION);
                if !is_dylib {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
            names.sort();
            Ok(names)
        }

        fn load(&self, dir: &Path, name: &str) -> HostResult<LoadOutcome> {
            let path = Self::library_path(dir, name);

            // SAFETY: loading a shared library executes arbitrary code from
            // its initializers. Only trusted plugin directories should be
            // configured.
            let lib = unsafe { libloading::Library::new(&path) }.map_err(|e| {
                HostError::loader(format!(
                    "Failed to load plugin library '{}': {e}",
                    path.display()
                ))
            })?;

            let plugin = unsafe {
                let create_fn: libloading::Symbol<CreatePluginFn> =
                    lib.get(b"create_plugin").map_err(|e| {
                        HostError::loader(format!(
                            "Plugin '{}' missing 'create_plugin' symbol: {e}",
                            path.display()
                        ))
                    })?;
                // SAFETY: the exported constructor hands over a Box-allocated
                // trait object per the `CreatePluginFn` contract.
                Arc::from(Box::from_raw(create_fn()))
            };

            info!(path = %path.display(), plugin = %name, "Dynamic plugin loaded");
            self.libraries.lock().push(lib);
            Ok(LoadOutcome::Loaded(plugin))
        }
    }

    impl std::fmt::Debug for DynamicLoader {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("DynamicLoader")
                .field("loaded_count", &self.libraries.lock().len())
                .finish()
        }
    }
}

#[cfg(feature = "dynamic")]
pub use dynamic::DynamicLoader;
