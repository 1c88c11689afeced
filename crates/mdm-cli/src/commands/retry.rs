//! `mdm retry` command implementation
//!
//! Applies field edits to one failed row of the locally stored result, sends
//! the row to the server, and reconciles the outcome into the local copy
//! only. Other failed rows keep their position, edits and error.

use crate::api::ApiClient;
use crate::error::{CliError, Result};
use crate::state::ResultStore;
use colored::Colorize;
use uuid::Uuid;

/// Parse a `FIELD=VALUE` edit; the value may be empty
pub fn parse_edit(edit: &str) -> Result<(String, String)> {
    let (field, value) = edit
        .split_once('=')
        .ok_or_else(|| CliError::InvalidEdit(edit.to_string()))?;

    let field = field.trim();
    if field.is_empty() {
        return Err(CliError::InvalidEdit(edit.to_string()));
    }

    Ok((field.to_string(), value.to_string()))
}

/// Retry row `row` (1-based, as `mdm result` shows it)
pub async fn run(
    client: &ApiClient,
    store: &ResultStore,
    job_id: Uuid,
    row: u64,
    edits: &[String],
) -> Result<()> {
    let mut view = store.require(job_id)?;
    let index = row.saturating_sub(1);

    // Validate every edit before touching the view
    let edits = edits
        .iter()
        .map(|e| parse_edit(e))
        .collect::<Result<Vec<_>>>()?;

    for (field, value) in edits {
        view.edit_field(index, field, serde_json::Value::String(value))?;
    }

    let record = view.record_for_retry(index)?;
    let outcome = client.retry_record(view.table_name(), record).await;

    let result = match outcome {
        Ok(stored) => {
            view.apply_retry_success(index)?;
            println!(
                "{} Row {} stored as '{}'",
                "✓".green(),
                row,
                stored.record_key
            );
            Ok(())
        }
        Err(CliError::Api {
            status,
            code,
            message,
        }) if code == "VALIDATION_ERROR" => {
            view.apply_retry_failure(index, message.clone())?;
            println!("{} Row {} rejected: {}", "✗".red(), row, message);
            Err(CliError::api(status, code, message))
        }
        // Keep the edits even when the retry never reached the validator
        Err(e) => Err(e),
    };

    store.save(&view)?;

    println!(
        "{} imported, {} still failing",
        view.success(),
        view.failed()
    );

    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edit() {
        assert_eq!(
            parse_edit("price=3.75").unwrap(),
            ("price".to_string(), "3.75".to_string())
        );
        assert_eq!(
            parse_edit("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_edit(" name =").unwrap(),
            ("name".to_string(), String::new())
        );
    }

    #[test]
    fn test_parse_edit_rejects_malformed() {
        assert!(matches!(parse_edit("price"), Err(CliError::InvalidEdit(_))));
        assert!(matches!(parse_edit("=3"), Err(CliError::InvalidEdit(_))));
    }
}
