//! `mdm status` command implementation

use crate::api::ApiClient;
use crate::commands::colored_status;
use crate::error::Result;
use crate::progress::format_duration;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use uuid::Uuid;

/// Show one job snapshot
pub async fn run(client: &ApiClient, job_id: Uuid) -> Result<()> {
    let job = client.get_job(job_id).await?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).apply_modifier(UTF8_ROUND_CORNERS);

    table.add_row(vec!["Job".to_string(), job.job_id.to_string()]);
    table.add_row(vec!["Table".to_string(), job.table_name.clone()]);
    if let Some(ref file) = job.file_name {
        table.add_row(vec!["File".to_string(), file.clone()]);
    }
    table.add_row(vec!["Status".to_string(), colored_status(job.status).to_string()]);
    table.add_row(vec!["Stage".to_string(), job.stage.clone()]);

    let rows = match job.percent_complete() {
        Some(pct) if job.total > 0 => format!("{}/{} ({:.0}%)", job.current, job.total, pct),
        _ => job.current.to_string(),
    };
    table.add_row(vec!["Rows".to_string(), rows]);
    table.add_row(vec!["Imported".to_string(), job.success_count.to_string()]);
    table.add_row(vec!["Failed".to_string(), job.failed_count.to_string()]);

    if let Some(rps) = job.throughput_rps {
        table.add_row(vec!["Throughput".to_string(), format!("{:.1} rows/s", rps)]);
    }
    if let Some(eta) = job.eta_secs.filter(|_| !job.is_complete) {
        table.add_row(vec!["ETA".to_string(), format_duration(eta)]);
    }
    if let Some(ref error) = job.error {
        table.add_row(vec!["Error".to_string(), error.clone()]);
    }

    table.add_row(vec![
        "Created".to_string(),
        job.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    ]);
    if let Some(finished) = job.finished_at {
        table.add_row(vec![
            "Finished".to_string(),
            finished.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{}", table);

    Ok(())
}
