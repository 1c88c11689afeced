//! End-to-end tests for the mdm CLI
//!
//! Each test runs the real binary against a wiremock server standing in for
//! the import API, with a temporary state directory.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;
use uuid::Uuid;
use wiremock::{
    matchers::{body_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn mdm(server: &MockServer, state: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mdm").unwrap();
    cmd.arg("--server-url")
        .arg(server.uri())
        .arg("--state-dir")
        .arg(state.path())
        .env_remove("LOG_LEVEL")
        .env_remove("LOG_OUTPUT");
    cmd
}

fn snapshot(job_id: Uuid, status: &str, success: u64, failed: u64) -> Value {
    let done = status == "completed" || status == "failed";
    let (stage, current) = if done {
        (status.to_string(), success + failed)
    } else {
        ("validating row 4 of 10".to_string(), 4)
    };
    json!({
        "job_id": job_id,
        "table_name": "items",
        "file_name": "items.csv",
        "status": status,
        "stage": stage,
        "current": current,
        "total": 10,
        "success_count": success,
        "failed_count": failed,
        "is_complete": done,
        "created_at": "2026-10-01T12:00:00Z"
    })
}

fn failed_result() -> Value {
    json!({
        "success": true,
        "data": {
            "success": 8,
            "failed": 2,
            "errors": ["Row 3: price: must be a number", "Row 7: name: is required"],
            "failed_records": [
                {
                    "original_index": 2,
                    "record": { "sku": "SKU-3", "name": "Pear", "price": "abc" },
                    "error": "price: must be a number"
                },
                {
                    "original_index": 6,
                    "record": { "sku": "SKU-7", "name": "", "price": "4.00" },
                    "error": "name: is required"
                }
            ]
        }
    })
}

async fn mount_job(server: &MockServer, job_id: Uuid, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/imports/{job_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": body })))
        .mount(server)
        .await;
}

async fn mount_result(server: &MockServer, job_id: Uuid) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/imports/{job_id}/result")))
        .respond_with(ResponseTemplate::new(200).set_body_json(failed_result()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_tables_lists_fields() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v1/tables"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{
                "name": "items",
                "key_field": "sku",
                "fields": [
                    { "name": "sku", "kind": "text", "required": true },
                    { "name": "price", "kind": "decimal", "required": false }
                ]
            }]
        })))
        .mount(&server)
        .await;

    mdm(&server, &state)
        .arg("tables")
        .assert()
        .success()
        .stdout(predicate::str::contains("items"))
        .stdout(predicate::str::contains("sku (text, required)"))
        .stdout(predicate::str::contains("price (decimal)"));
}

#[tokio::test]
async fn test_jobs_empty() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v1/imports"))
        .and(query_param("status", "failed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "revision": 0, "jobs": [] }
        })))
        .mount(&server)
        .await;

    mdm(&server, &state)
        .args(["jobs", "--status", "failed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No import jobs found."));
}

#[tokio::test]
async fn test_status_unknown_job() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();
    let job_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/imports/{job_id}")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "error": { "code": "NOT_FOUND", "message": format!("Import job {job_id} not found") }
        })))
        .mount(&server)
        .await;

    mdm(&server, &state)
        .args(["status", &job_id.to_string()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NOT_FOUND"));
}

#[tokio::test]
async fn test_import_missing_file() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();

    mdm(&server, &state)
        .args(["import", "items", "does-not-exist.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[tokio::test]
async fn test_import_no_wait() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();
    let job_id = Uuid::new_v4();

    let file = state.path().join("items.csv");
    fs::write(&file, "sku,name,price\nSKU-1,Apple,1.50\n").unwrap();

    Mock::given(method("POST"))
        .and(path("/api/v1/imports"))
        .and(query_param("table", "items"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "success": true,
            "data": { "job_id": job_id, "table_name": "items", "status": "processing" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    mdm(&server, &state)
        .args(["import", "items"])
        .arg(&file)
        .arg("--no-wait")
        .assert()
        .success()
        .stdout(predicate::str::contains(job_id.to_string()))
        .stdout(predicate::str::contains(format!("mdm status {job_id}")));
}

#[tokio::test]
async fn test_import_follows_job_to_completion() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();
    let job_id = Uuid::new_v4();

    let file = state.path().join("items.csv");
    fs::write(&file, "sku,name,price\nSKU-1,Apple,1.50\n").unwrap();

    Mock::given(method("POST"))
        .and(path("/api/v1/imports"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "success": true,
            "data": { "job_id": job_id, "table_name": "items", "status": "processing" }
        })))
        .mount(&server)
        .await;
    mount_job(&server, job_id, snapshot(job_id, "completed", 8, 2)).await;

    mdm(&server, &state)
        .args(["import", "items"])
        .arg(&file)
        .args(["--interval-ms", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 8 rows into 'items', 2 failed"))
        .stdout(predicate::str::contains(format!("mdm result {job_id}")));
}

#[tokio::test]
async fn test_import_failed_job_exits_nonzero() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();
    let job_id = Uuid::new_v4();

    let file = state.path().join("stores.json");
    fs::write(&file, "[{\"code\": ").unwrap();

    Mock::given(method("POST"))
        .and(path("/api/v1/imports"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "success": true,
            "data": { "job_id": job_id, "table_name": "stores", "status": "processing" }
        })))
        .mount(&server)
        .await;

    let mut failed = snapshot(job_id, "failed", 0, 0);
    failed["error"] = json!("File could not be read: Malformed JSON");
    mount_job(&server, job_id, failed).await;

    mdm(&server, &state)
        .args(["import", "stores"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Import failed: File could not be read"));
}

#[tokio::test]
async fn test_result_then_retry_reconciles_locally() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();
    let job_id = Uuid::new_v4();

    mount_job(&server, job_id, snapshot(job_id, "completed", 8, 2)).await;
    mount_result(&server, job_id).await;

    mdm(&server, &state)
        .args(["result", &job_id.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported: 8"))
        .stdout(predicate::str::contains("price: must be a number"))
        .stdout(predicate::str::contains("name: is required"));

    assert!(state
        .path()
        .join("results")
        .join(format!("{job_id}.json"))
        .exists());

    Mock::given(method("POST"))
        .and(path("/api/v1/tables/items/retry"))
        .and(body_json(json!({ "record": { "sku": "SKU-3", "name": "Pear", "price": "3.75" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "table_name": "items", "record_key": "SKU-3", "record_id": Uuid::new_v4() }
        })))
        .expect(1)
        .mount(&server)
        .await;

    mdm(&server, &state)
        .args(["retry", &job_id.to_string(), "3", "--set", "price=3.75"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Row 3 stored as 'SKU-3'"))
        .stdout(predicate::str::contains("9 imported, 1 still failing"));

    Mock::given(method("POST"))
        .and(path("/api/v1/tables/items/retry"))
        .and(body_json(json!({ "record": { "sku": "SKU-7", "name": "", "price": "4.00" } })))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "success": false,
            "error": { "code": "VALIDATION_ERROR", "message": "name: is required" }
        })))
        .mount(&server)
        .await;

    mdm(&server, &state)
        .args(["retry", &job_id.to_string(), "7"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Row 7 rejected: name: is required"))
        .stdout(predicate::str::contains("9 imported, 1 still failing"));

    // The stored copy now holds only row 7; the server result was fetched once.
    mdm(&server, &state)
        .args(["result", &job_id.to_string(), "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\": 9"))
        .stdout(predicate::str::contains("\"original_index\": 6"))
        .stdout(predicate::str::contains("SKU-3").not());
}

#[tokio::test]
async fn test_retry_without_stored_result() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();
    let job_id = Uuid::new_v4();

    mdm(&server, &state)
        .args(["retry", &job_id.to_string(), "1", "--set", "price=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(format!("Run 'mdm result {job_id}' first")));
}

#[tokio::test]
async fn test_retry_unknown_row() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();
    let job_id = Uuid::new_v4();

    mount_job(&server, job_id, snapshot(job_id, "completed", 8, 2)).await;
    mount_result(&server, job_id).await;

    mdm(&server, &state)
        .args(["result", &job_id.to_string()])
        .assert()
        .success();

    mdm(&server, &state)
        .args(["retry", &job_id.to_string(), "5", "--set", "price=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No failed record at original index 4"));
}

#[tokio::test]
async fn test_retry_rejects_malformed_edit() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();
    let job_id = Uuid::new_v4();

    mount_job(&server, job_id, snapshot(job_id, "completed", 8, 2)).await;
    mount_result(&server, job_id).await;

    mdm(&server, &state)
        .args(["result", &job_id.to_string()])
        .assert()
        .success();

    mdm(&server, &state)
        .args(["retry", &job_id.to_string(), "3", "--set", "price"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid field edit 'price'"));
}

#[tokio::test]
async fn test_result_json_keeps_job_error() {
    let server = MockServer::start().await;
    let state = TempDir::new().unwrap();
    let job_id = Uuid::new_v4();

    let mut failed = snapshot(job_id, "failed", 0, 0);
    failed["error"] = json!("File could not be read: Malformed JSON");
    mount_job(&server, job_id, failed).await;

    Mock::given(method("GET"))
        .and(path(format!("/api/v1/imports/{job_id}/result")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "success": 0,
                "failed": 0,
                "errors": ["File could not be read: Malformed JSON"],
                "failed_records": []
            }
        })))
        .mount(&server)
        .await;

    let output = mdm(&server, &state)
        .args(["result", &job_id.to_string(), "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["errors"], json!(["File could not be read: Malformed JSON"]));
    assert_eq!(result["success"], json!(0));
}
