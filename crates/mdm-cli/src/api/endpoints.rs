//! API endpoint URL builders

use uuid::Uuid;

/// Build import submission URL
pub fn submit_import_url(base_url: &str, table: &str) -> String {
    format!(
        "{}/api/v1/imports?table={}",
        base_url,
        urlencoding::encode(table)
    )
}

/// Build job list URL
pub fn jobs_url(base_url: &str, status: Option<&str>, table: Option<&str>) -> String {
    let mut params = Vec::new();

    if let Some(s) = status {
        params.push(format!("status={}", urlencoding::encode(s)));
    }

    if let Some(t) = table {
        params.push(format!("table={}", urlencoding::encode(t)));
    }

    if params.is_empty() {
        format!("{}/api/v1/imports", base_url)
    } else {
        format!("{}/api/v1/imports?{}", base_url, params.join("&"))
    }
}

/// Build job details URL
pub fn job_url(base_url: &str, job_id: Uuid) -> String {
    format!("{}/api/v1/imports/{}", base_url, job_id)
}

/// Build job result URL
pub fn job_result_url(base_url: &str, job_id: Uuid) -> String {
    format!("{}/api/v1/imports/{}/result", base_url, job_id)
}

/// Build table list URL
pub fn tables_url(base_url: &str) -> String {
    format!("{}/api/v1/tables", base_url)
}

/// Build record retry URL
pub fn retry_url(base_url: &str, table: &str) -> String {
    format!(
        "{}/api/v1/tables/{}/retry",
        base_url,
        urlencoding::encode(table)
    )
}

/// Build health check URL
pub fn health_url(base_url: &str) -> String {
    format!("{}/health", base_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_import_url_encodes_table() {
        assert_eq!(
            submit_import_url("http://localhost:8000", "payment methods"),
            "http://localhost:8000/api/v1/imports?table=payment%20methods"
        );
    }

    #[test]
    fn test_jobs_url() {
        let base = "http://localhost:8000";
        assert_eq!(jobs_url(base, None, None), "http://localhost:8000/api/v1/imports");
        assert_eq!(
            jobs_url(base, Some("failed"), Some("items")),
            "http://localhost:8000/api/v1/imports?status=failed&table=items"
        );
    }

    #[test]
    fn test_retry_url() {
        assert_eq!(
            retry_url("http://localhost:8000", "items"),
            "http://localhost:8000/api/v1/tables/items/retry"
        );
    }
}
