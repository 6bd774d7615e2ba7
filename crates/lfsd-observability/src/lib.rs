//! LFSD Observability
//!
//! Structured logging for the git-lfsd binaries. Git reads the filter
//! protocol from our standard output, so logs always go to stderr by
//! default.
//!
//! # Example
//!
//! ```ignore
//! use lfsd_observability::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::Compact, None)?;
//! tracing::info!("ready");
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, LogOutput, DEFAULT_LEVEL};
pub use initialization::{init_tracing, init_tracing_with_config};
