//! ModHub Host — plugin-hosting runtime
//!
//! Main entry point that wires the host together and drives the tick loop.

use std::sync::Arc;
use std::time::Duration;

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use modhub_core::HostResult;
use modhub_core::config::HostConfig;
use modhub_plugin::Host;
use modhub_plugin::hooks::names;
use modhub_plugin::watcher::FsChangeWatcher;
use plugin_heartbeat::HeartbeatPlugin;

/// Source extensions the change watcher reacts to.
const WATCHED_EXTENSIONS: &[&str] = &["so", "dll", "dylib"];

fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config) {
        tracing::error!("Host error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> HostResult<HostConfig> {
    match std::env::var("MODHUB_CONFIG") {
        Ok(config_path) => {
            // An explicitly requested config file must exist.
            let exists = std::path::Path::new(&config_path).exists()
                || std::path::Path::new(&format!("{config_path}.toml")).exists();
            if !exists {
                return Err(modhub_core::HostError::configuration(format!(
                    "Config file '{config_path}' not found"
                )));
            }
            HostConfig::load(&config_path)
        }
        Err(_) => HostConfig::load("config/default"),
    }
}

/// Initialize tracing/logging
fn init_logging(config: &HostConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main host run function
fn run(config: HostConfig) -> HostResult<()> {
    tracing::info!("Starting ModHub v{}", env!("CARGO_PKG_VERSION"));

    let tick_interval = Duration::from_millis(config.runtime.tick_interval_ms);
    let plugins_dir = config.directories.plugins.clone();
    std::fs::create_dir_all(&plugins_dir)?;

    let mut host = Host::new(config);

    #[cfg(feature = "dynamic")]
    {
        host.extensions_mut()
            .register_loader(Arc::new(modhub_plugin::loader::DynamicLoader::new()));
        tracing::info!("Dynamic plugin loader enabled");
    }

    host.extensions_mut()
        .register_watcher(Box::new(FsChangeWatcher::new(
            &plugins_dir,
            WATCHED_EXTENSIONS,
        )?));

    host.install_plugin(Arc::new(HeartbeatPlugin::new()?))?;

    host.init()?;
    tracing::info!(plugins = host.registry().count(), "Host initialised");

    host.call_hook(names::ON_SERVER_INITIALIZED, &[]);

    loop {
        std::thread::sleep(tick_interval);
        host.call_hook(names::ON_TICK, &[]);
    }
}
