//! Postboard Ingest Library
//!
//! Concurrent ingestion of a two-level post/comment hierarchy from a remote
//! JSON API into PostgreSQL.
//!
//! The pipeline fetches the post collection for one user, then fans out one
//! worker per post; each post worker persists its post, fetches the post's
//! comments, and fans out one nested worker per comment. Both fan-out levels
//! are drained before the pipeline reports completion.
//!
//! # Example
//!
//! ```no_run
//! use postboard_ingest::config::Config;
//! use postboard_ingest::fetch::ApiClient;
//! use postboard_ingest::pipeline::Pipeline;
//! use postboard_ingest::store::{self, RecordWriter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let client = ApiClient::new(&config.api)?;
//!     let pool = store::connect(&config.database).await?;
//!     let writer = RecordWriter::prepare(pool).await?;
//!
//!     let pipeline = Pipeline::new(Arc::new(client), Arc::new(writer));
//!     pipeline.run("7").await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod store;
