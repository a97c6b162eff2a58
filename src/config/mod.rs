// src/config/mod.rs

//! Launcher configuration.
//!
//! - [`model`] defines `LauncherConfig`, the flat JSON-persisted record.
//! - [`loader`] reads/writes it next to the launcher (`ConfigStore`).
//! - [`env_file`] is the `.env` key/value store inside the install root.

pub mod env_file;
pub mod loader;
pub mod model;

pub use env_file::{DbSettings, EnvFile};
pub use loader::ConfigStore;
pub use model::LauncherConfig;
