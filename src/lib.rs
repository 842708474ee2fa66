//! Conflab - layered JSON configuration with live remote synchronisation.
//!
//! Configuration is resolved from an inline object, a fixed sequence of
//! JSON files (with recursive includes), command-line arguments and an
//! override object. When the merged result names an etcd store, the
//! service's live tree is overlaid on top and kept current from a watch.
//!
//! - Deterministic deep merge with fixed precedence
//! - `CF_additionalFiles` includes and `CF_export` mirroring control
//! - Change streams for whole snapshots or individual paths
//! - Admin API and CLI for inspecting and editing remote configuration
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use conflab::{Conflab, LoadOptions};
//!
//! # async fn example() -> conflab::Result<()> {
//! let live = Conflab::new().load(LoadOptions::default()).await?;
//!
//! let port: u16 = live.extract("server.port")?;
//! println!("Listening on {port}");
//! # Ok(())
//! # }
//! ```

/// Core error types and result aliases.
pub mod core;

/// Configuration tree and path addressing.
pub mod value;

/// Deep merge of configuration trees.
pub mod merge;

/// Source layers: inline objects, files and arguments.
pub mod sources;

/// Remote store clients, synchronisation and admin access.
pub mod remote;

/// Load entry point and live configuration handle.
pub mod facade;

/// Command-line interface for inspecting and editing configuration.
pub mod cli;

/// Tracing subscriber setup for the binary.
pub mod tracing_config;

/// Re-exported core types for convenience.
pub use crate::core::{ConflabError, Result};
pub use facade::{ConfigChange, Conflab, LiveConfig, LoadOptions};
pub use value::{ConfigValue, KeyPath};
