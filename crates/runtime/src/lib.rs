//! Fixed-step runtime for the idle RPG rules core.
//!
//! This crate drives an [`idle_core::Simulation`] on a fixed tick, loads
//! configuration and content packs from RON, and persists snapshots.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the driver and its builder
//! - [`config`] and [`content`] load RON inputs
//! - [`store`] saves snapshots and computes their digests
//! - [`logging`] installs a `tracing` subscriber
pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod store;

pub use config::RuntimeConfig;
pub use content::ContentPack;
pub use error::{Result, RuntimeError};
pub use runtime::{Runtime, RuntimeBuilder};
pub use store::{SnapshotStore, digest};
