//! `mdm result` command implementation
//!
//! Fetches the result of a finished import once and keeps it locally, so
//! later `mdm retry` calls reconcile against the same copy. `--refresh`
//! throws the local copy away and fetches again.

use crate::api::ApiClient;
use crate::commands::{colored_status, truncate_string};
use crate::error::Result;
use crate::state::ResultStore;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use mdm_common::types::RawRow;
use mdm_common::view::ImportResultView;
use uuid::Uuid;

pub async fn run(
    client: &ApiClient,
    store: &ResultStore,
    job_id: Uuid,
    json: bool,
    refresh: bool,
) -> Result<()> {
    let job = client.get_job(job_id).await?;

    let view = match store.load(job_id)? {
        Some(view) if !refresh => view,
        _ => {
            let result = client.get_result(job_id).await?;
            let view = ImportResultView::new(job_id, job.table_name.clone(), result);
            let path = store.save(&view)?;
            tracing::debug!(path = %path.display(), "Stored fresh import result");
            view
        }
    };

    if json {
        let mut result = view.to_result();
        // A pipeline-fatal error leads the list, the way the server reports it
        if let Some(error) = job.error {
            result.errors.insert(0, error);
        }
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "Import {} into '{}': {}",
        job_id.to_string().cyan(),
        view.table_name(),
        colored_status(job.status)
    );
    if let Some(ref error) = job.error {
        println!("  {} {}", "Error:".red().bold(), error);
    }
    println!("  Imported: {}", view.success());
    println!("  Failed:   {}", view.failed());

    if view.is_clean() {
        println!();
        println!("{} No failed rows", "✓".green());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Row", "Error", "Record"]);

    for failed in view.failed_records() {
        table.add_row(vec![
            (failed.original_index + 1).to_string(),
            failed.error.clone(),
            truncate_string(&format_record(&failed.record), 60),
        ]);
    }

    println!();
    println!("{}", table);
    println!();
    println!(
        "Fix a row with 'mdm retry {} <ROW> --set field=value'",
        job_id
    );

    Ok(())
}

fn format_record(record: &RawRow) -> String {
    record
        .iter()
        .map(|(field, value)| match value {
            serde_json::Value::String(s) => format!("{}={}", field, s),
            other => format!("{}={}", field, other),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
