//! Vigia - in-process call watcher with dependency tree reconstruction
//!
//! This library wraps storage, process-spawn, network and module-load
//! primitives so every call is recorded before it is delegated, rebuilds the
//! module dependency tree from observed loads, and writes a deduplicated or
//! frequency-counted usage summary at shutdown.

pub mod cli;
pub mod config;
pub mod dependency_tree;
pub mod error;
pub mod export;
pub mod filter;
pub mod intercept;
pub mod json_output;
pub mod platform;
pub mod probe;
pub mod resolver;
pub mod session;
pub mod stats;
pub mod tracker;

pub use config::{Config, ConfigLayer};
pub use error::{Result, VigiaError};
pub use filter::{Subsystem, SubsystemFilter};
pub use session::{Session, ShutdownReport};
