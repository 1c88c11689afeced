//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod import;
pub mod jobs;
pub mod result;
pub mod retry;
pub mod status;
pub mod tables;

use colored::{ColoredString, Colorize};
use mdm_common::types::JobStatus;

/// Status text colored by outcome
pub(crate) fn colored_status(status: JobStatus) -> ColoredString {
    match status {
        JobStatus::Uploading | JobStatus::Processing => status.as_str().yellow(),
        JobStatus::Completed => status.as_str().green(),
        JobStatus::Failed => status.as_str().red(),
    }
}

/// Shorten a string for table display
pub(crate) fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
