//! `mdm jobs` command implementation

use crate::api::ApiClient;
use crate::commands::{colored_status, truncate_string};
use crate::error::Result;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

/// List import jobs, oldest first
pub async fn run(client: &ApiClient, status: Option<&str>, table: Option<&str>) -> Result<()> {
    let response = client.list_jobs(status, table).await?;

    if response.jobs.is_empty() {
        println!("No import jobs found.");
        return Ok(());
    }

    let mut out = Table::new();
    out.load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Job", "Table", "File", "Status", "Rows", "Failed", "Created"]);

    for job in &response.jobs {
        let rows = if job.total > 0 {
            format!("{}/{}", job.current, job.total)
        } else {
            "-".to_string()
        };

        out.add_row(vec![
            job.job_id.to_string(),
            job.table_name.clone(),
            job.file_name
                .as_deref()
                .map(|f| truncate_string(f, 30))
                .unwrap_or_else(|| "-".to_string()),
            colored_status(job.status).to_string(),
            rows,
            job.failed_count.to_string(),
            job.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{}", out);
    println!("{} job(s)", response.jobs.len());

    Ok(())
}
