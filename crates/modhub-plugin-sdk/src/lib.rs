//! # modhub-plugin-sdk
//!
//! Convenience layer for writing ModHub plugins: a closure-based hook
//! dispatch table, metadata helpers, and the export macro for dynamic
//! plugins. The raw [`modhub_plugin::Plugin`] trait stays available for
//! plugins that need full control.

pub mod macros;
pub mod prelude;
pub mod table;

pub use table::{HookHandler, HookTable};
