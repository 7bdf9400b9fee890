//! Postboard Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the postboard project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all postboard
//! workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Logging configuration and initialization
//! - **Types**: The post/comment record types exchanged between the remote
//!   API boundary and the persistence boundary
//!
//! # Example
//!
//! ```no_run
//! use postboard_common::logging::{init_logging, LogConfig};
//! use tracing::info;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!
//!     info!("application started");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{PostboardError, Result};
