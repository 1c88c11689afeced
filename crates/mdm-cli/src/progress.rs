//! Progress bar utilities for CLI operations

use indicatif::{ProgressBar, ProgressStyle};
use mdm_common::types::JobSnapshot;

/// Create a progress bar that follows an import job
///
/// Starts as a spinner; [`update_import_progress`] switches it to a bar once
/// the job knows its row count.
pub fn create_import_progress(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Reflect a polled snapshot on the progress bar
pub fn update_import_progress(pb: &ProgressBar, snapshot: &JobSnapshot) {
    if snapshot.total > 0 && pb.length() != Some(snapshot.total) {
        pb.set_length(snapshot.total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
    }
    pb.set_position(snapshot.current);
    pb.set_message(describe_progress(snapshot));
}

/// Short progress text: stage, failures so far, and ETA when known
pub fn describe_progress(snapshot: &JobSnapshot) -> String {
    let mut text = snapshot.stage.clone();
    if snapshot.failed_count > 0 {
        text.push_str(&format!(" ({} failed)", snapshot.failed_count));
    }
    if let Some(eta) = snapshot.eta_secs.filter(|_| !snapshot.is_complete) {
        text.push_str(&format!(", {} left", format_duration(eta)));
    }
    text
}

/// Format seconds into a short human-readable duration
pub fn format_duration(secs: f64) -> String {
    let secs = secs.max(0.0).round() as u64;
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3599 => format!("{}m {}s", secs / 60, secs % 60),
        _ => format!("{}h {}m", secs / 3600, (secs % 3600) / 60),
    }
}
