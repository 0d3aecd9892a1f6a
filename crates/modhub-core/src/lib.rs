//! # modhub-core
//!
//! Core crate for ModHub. Contains the unified error system, the
//! `HostResult` alias, and the host configuration schema.
//!
//! This crate has **no** internal dependencies on other ModHub crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::HostError;
pub use result::HostResult;
