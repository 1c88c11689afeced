//! `mdm import` command implementation
//!
//! Uploads a file and follows the job until it finishes.

use crate::api::ApiClient;
use crate::error::{CliError, Result};
use crate::progress::{create_import_progress, update_import_progress};
use colored::Colorize;
use mdm_common::types::{JobSnapshot, JobStatus};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

/// Lower bound on the poll interval
const MIN_POLL_INTERVAL_MS: u64 = 50;

pub async fn run(
    client: &ApiClient,
    table: &str,
    file: &Path,
    format: Option<&str>,
    no_wait: bool,
    interval_ms: u64,
) -> Result<()> {
    if !file.is_file() {
        return Err(CliError::FileNotFound(file.display().to_string()));
    }

    let bytes = tokio::fs::read(file).await?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    tracing::info!(table, file_name = %file_name, size = bytes.len(), "Uploading import file");

    let submitted = client
        .submit_import(table, &file_name, bytes, format)
        .await?;

    println!(
        "{} Import {} accepted for table '{}'",
        "✓".green(),
        submitted.job_id.to_string().cyan(),
        submitted.table_name
    );

    if no_wait {
        println!("Follow it with 'mdm status {}'", submitted.job_id);
        return Ok(());
    }

    let interval = Duration::from_millis(interval_ms.max(MIN_POLL_INTERVAL_MS));
    let snapshot = follow(client, submitted.job_id, interval).await?;
    print_outcome(&snapshot);

    if snapshot.status == JobStatus::Failed {
        return Err(CliError::ImportFailed(
            snapshot.error.unwrap_or_else(|| "no reason given".to_string()),
        ));
    }

    Ok(())
}

/// Poll a job until it reaches a terminal status
pub async fn follow(client: &ApiClient, job_id: Uuid, interval: Duration) -> Result<JobSnapshot> {
    let pb = create_import_progress("waiting for the server");

    loop {
        let snapshot = match client.get_job(job_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                pb.abandon();
                return Err(e);
            }
        };

        update_import_progress(&pb, &snapshot);

        if snapshot.is_complete {
            pb.finish_and_clear();
            return Ok(snapshot);
        }

        tokio::time::sleep(interval).await;
    }
}

fn print_outcome(snapshot: &JobSnapshot) {
    match snapshot.status {
        JobStatus::Completed if snapshot.failed_count == 0 => {
            println!(
                "{} Imported {} rows into '{}'",
                "✓".green(),
                snapshot.success_count,
                snapshot.table_name
            );
        }
        JobStatus::Completed => {
            println!(
                "{} Imported {} rows into '{}', {} failed",
                "!".yellow(),
                snapshot.success_count,
                snapshot.table_name,
                snapshot.failed_count
            );
            println!(
                "Review the failed rows with 'mdm result {}'",
                snapshot.job_id
            );
        }
        _ => {
            println!(
                "{} Import {} {}",
                "✗".red(),
                snapshot.job_id,
                snapshot.status
            );
        }
    }
}
