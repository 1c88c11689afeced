//! Import commands

pub mod retry;
pub mod submit;

pub use retry::{RetryRecordCommand, RetryRecordError};
pub use submit::{SubmitImportCommand, SubmitImportError, UploadGuard};
