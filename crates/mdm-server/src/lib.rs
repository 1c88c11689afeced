//! Master-data bulk import server
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Accepts CSV/JSON uploads destined for a master-data table, imports them
//! row by row on a background task, and exposes progress for polling.
//!
//! # Architecture
//!
//! - [`imports`]: the engine (job registry, executor, retry, progress reporting)
//! - [`features`]: CQRS slices wiring commands and queries to axum routes
//! - [`api`]: router assembly, envelopes, server loop
//! - [`config`]: environment-based configuration
//!
//! A job that ran but rejected some rows still ends `completed`; `failed` means
//! the upload itself could not be processed. Rejected rows keep their original
//! position and can be fixed and retried one at a time.
//!
//! # Example
//!
//! ```no_run
//! use mdm_server::{api, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     api::serve(config).await
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod imports;
pub mod middleware;

pub use error::AppError;
