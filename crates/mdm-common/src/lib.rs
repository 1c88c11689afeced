//! MDM Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the MDM import service.
//!
//! # Overview
//!
//! This crate is used by both the server and the CLI:
//!
//! - **Types**: Wire types for import jobs, snapshots, and results
//! - **View**: Caller-side view of an import result used to reconcile per-record retries
//! - **Error Handling**: Shared error and result types
//! - **Logging**: Tracing subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use mdm_common::types::ImportResult;
//! use mdm_common::view::ImportResultView;
//! use uuid::Uuid;
//!
//! fn show(result: ImportResult) -> mdm_common::Result<()> {
//!     let mut view = ImportResultView::new(Uuid::new_v4(), "items", result);
//!     if let Some(first) = view.failed_records().first().map(|r| r.original_index) {
//!         view.apply_retry_success(first)?;
//!     }
//!     println!("{} imported, {} still failing", view.success(), view.failed());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;
pub mod view;

// Re-export commonly used types
pub use error::{MdmError, Result};
