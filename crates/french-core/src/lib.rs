//! Shared types, configuration, and error definitions for Mr. French.
//!
//! Every other crate in the workspace depends on this one. It holds the
//! domain vocabulary (channels, speakers, tasks, messages, zones), the
//! TOML-backed application configuration, and the top-level error type.

pub mod config;
pub mod error;
pub mod types;

pub use config::FrenchConfig;
pub use error::{FrenchError, Result};
