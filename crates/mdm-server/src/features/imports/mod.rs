//! Imports feature module
//!
//! Accepts uploads, exposes job progress and results, and retries single
//! records that failed an import.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::{imports_routes, tables_routes};
