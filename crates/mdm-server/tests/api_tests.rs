//! Integration tests for the import API
//!
//! Drives the full router in-process with `tower::ServiceExt::oneshot`
//! against an in-memory record store.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use mdm_common::types::{ImportResult, JobListResponse, JobSnapshot, JobStatus, SubmitImportResponse};
use mdm_common::view::ImportResultView;
use futures::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

use mdm_server::api::create_router;
use mdm_server::config::Config;
use mdm_server::features::FeatureState;
use mdm_server::imports::{ImportService, ImportSettings, JobFilter};

const BOUNDARY: &str = "mdm-test-boundary";

fn test_app() -> Router {
    test_app_with(ImportService::in_memory(ImportSettings::default()))
}

fn test_app_with(service: ImportService) -> Router {
    let config = Config::default();
    let state = FeatureState {
        imports: service,
        long_poll_max: Duration::from_millis(500),
    };
    create_router(state, &config)
}

fn multipart_body(file_name: &str, contents: &str, format: Option<&str>) -> String {
    let mut body = String::new();
    if let Some(format) = format {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"format\"\r\n\r\n{format}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: text/plain\r\n\r\n{contents}\r\n--{BOUNDARY}--\r\n"
    ));
    body
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn submit(app: &Router, table: &str, file_name: &str, contents: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/imports?table={table}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(file_name, contents, None)))
        .unwrap();
    send(app, request).await
}

async fn retry(app: &Router, table: &str, record: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/tables/{table}/retry"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "record": record }).to_string()))
        .unwrap();
    send(app, request).await
}

async fn wait_until_done(app: &Router, job_id: Uuid) -> JobSnapshot {
    for _ in 0..200 {
        let (status, body) = get(app, &format!("/api/v1/imports/{job_id}")).await;
        assert_eq!(status, StatusCode::OK);
        let snapshot: JobSnapshot = serde_json::from_value(body["data"].clone()).unwrap();
        if snapshot.is_complete {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("import job {job_id} did not finish");
}

fn items_csv() -> String {
    let mut csv = String::from("sku,name,price\n");
    for i in 1..=10 {
        match i {
            3 => csv.push_str("SKU-3,Pear,abc\n"),
            7 => csv.push_str("SKU-7,,4.00\n"),
            _ => csv.push_str(&format!("SKU-{i},Item {i},{i}.50\n")),
        }
    }
    csv
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
}

#[tokio::test]
async fn test_import_with_partial_failures_then_retry() {
    let app = test_app();

    let (status, body) = submit(&app, "items", "items.csv", &items_csv()).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let submitted: SubmitImportResponse = serde_json::from_value(body["data"].clone()).unwrap();
    assert_eq!(submitted.table_name, "items");

    let snapshot = wait_until_done(&app, submitted.job_id).await;
    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.file_name.as_deref(), Some("items.csv"));
    assert_eq!((snapshot.current, snapshot.total), (10, 10));

    let (status, body) = get(&app, &format!("/api/v1/imports/{}/result", submitted.job_id)).await;
    assert_eq!(status, StatusCode::OK);
    let result: ImportResult = serde_json::from_value(body["data"].clone()).unwrap();
    assert_eq!((result.success, result.failed), (8, 2));

    let mut view = ImportResultView::new(submitted.job_id, "items", result);
    view.edit_field(2, "price", json!("3.75")).unwrap();

    let (status, _) = retry(&app, "items", Value::Object(view.record_for_retry(2).unwrap())).await;
    assert_eq!(status, StatusCode::OK);
    view.apply_retry_success(2).unwrap();

    let (status, body) = retry(&app, "items", Value::Object(view.record_for_retry(6).unwrap())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));
    view.apply_retry_failure(6, body["error"]["message"].as_str().unwrap())
        .unwrap();

    assert_eq!(view.success(), 9);
    assert_eq!(view.failed(), 1);
    assert_eq!(view.failed_records()[0].original_index, 6);
    assert_eq!(view.failed_records()[0].error, "name: is required");

    // Retries never touch the job itself.
    let (_, body) = get(&app, &format!("/api/v1/imports/{}/result", submitted.job_id)).await;
    assert_eq!(body["data"]["success"], json!(8));
    assert_eq!(body["data"]["failed"], json!(2));
}

#[tokio::test]
async fn test_unknown_table_fails_job_but_accepts_upload() {
    let app = test_app();

    let (status, body) = submit(&app, "customers", "c.csv", "id\n1\n").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id: Uuid = serde_json::from_value(body["data"]["job_id"].clone()).unwrap();

    let snapshot = wait_until_done(&app, job_id).await;
    assert_eq!(snapshot.status, JobStatus::Failed);
    assert_eq!(snapshot.error.as_deref(), Some("Unknown target table 'customers'"));
    assert_eq!(snapshot.current, 0);
}

#[tokio::test]
async fn test_malformed_json_fails_job() {
    let app = test_app();

    let (status, body) = submit(&app, "stores", "stores.json", "[{\"code\": \"S1\"").await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id: Uuid = serde_json::from_value(body["data"]["job_id"].clone()).unwrap();

    let snapshot = wait_until_done(&app, job_id).await;
    assert_eq!(snapshot.status, JobStatus::Failed);
    assert!(snapshot.error.unwrap().starts_with("File could not be read: Malformed JSON"));
    assert_eq!(snapshot.failed_count, 0);
}

#[tokio::test]
async fn test_explicit_format_field() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/imports?table=payment_methods")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(
            "upload.txt",
            "{\"code\": \"CASH\", \"name\": \"Cash\"}\n{\"code\": \"CARD\", \"name\": \"Card\", \"enabled\": false}",
            Some("jsonl"),
        )))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id: Uuid = serde_json::from_value(body["data"]["job_id"].clone()).unwrap();

    let snapshot = wait_until_done(&app, job_id).await;
    assert_eq!(snapshot.status, JobStatus::Completed);
    assert_eq!(snapshot.success_count, 2);
}

#[tokio::test]
async fn test_missing_file_field_is_upload_error() {
    let app = test_app();
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"format\"\r\n\r\ncsv\r\n--{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/imports?table=items")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("UPLOAD_ERROR"));

    let (_, body) = get(&app, "/api/v1/imports?status=failed").await;
    let list: JobListResponse = serde_json::from_value(body["data"].clone()).unwrap();
    assert_eq!(list.jobs.len(), 1);
    assert!(list.jobs[0].error.as_deref().unwrap().starts_with("Upload could not be received"));
}

#[tokio::test]
async fn test_get_unknown_job_is_404() {
    let app = test_app();
    let (status, body) = get(&app, &format!("/api/v1/imports/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("NOT_FOUND"));

    let (status, _) = get(&app, &format!("/api/v1/imports/{}/result", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_jobs_polls_are_stable() {
    let app = test_app();
    let (_, body) = submit(&app, "stores", "stores.csv", "code,name\nS1,Main\n").await;
    let job_id: Uuid = serde_json::from_value(body["data"]["job_id"].clone()).unwrap();
    wait_until_done(&app, job_id).await;

    let (status, first) = get(&app, "/api/v1/imports?table=stores").await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = get(&app, "/api/v1/imports?table=stores").await;
    assert_eq!(first, second);

    let list: JobListResponse = serde_json::from_value(first["data"].clone()).unwrap();
    assert_eq!(list.jobs.len(), 1);

    // Nothing changes, so the long-poll runs out its (capped) wait and returns the same revision.
    let (_, waited) = get(
        &app,
        &format!("/api/v1/imports?since={}&wait_ms=50", list.revision),
    )
    .await;
    assert_eq!(waited["data"]["revision"], json!(list.revision));
}

#[tokio::test]
async fn test_invalid_status_filter_is_400() {
    let app = test_app();
    let (status, body) = get(&app, "/api/v1/imports?status=running").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("BAD_REQUEST"));
}

#[tokio::test]
async fn test_retry_unknown_table_is_404() {
    let app = test_app();
    let (status, body) = retry(&app, "customers", json!({"id": "1"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("UNKNOWN_TABLE"));
}

#[tokio::test]
async fn test_list_tables() {
    let app = test_app();
    let (status, body) = get(&app, "/api/v1/tables").await;
    assert_eq!(status, StatusCode::OK);

    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"items"));
    assert!(names.contains(&"staff"));
}

#[tokio::test]
async fn test_interrupted_upload_fails_job() {
    let service = ImportService::in_memory(ImportSettings::default());
    let app = test_app_with(service.clone());

    // The first part header arrives, then the body stalls forever
    let head = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"slow.csv\"\r\n\r\nsku,name\r\n"
    );
    let stream = futures::stream::once(async move { Ok::<_, std::io::Error>(head) })
        .chain(futures::stream::pending());
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/imports?table=items")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from_stream(stream))
        .unwrap();

    let timed_out = tokio::time::timeout(Duration::from_millis(100), app.oneshot(request)).await;
    assert!(timed_out.is_err());

    for _ in 0..200 {
        let jobs = service.registry().list(&JobFilter::default()).await;
        assert_eq!(jobs.len(), 1);
        if jobs[0].is_complete {
            assert_eq!(jobs[0].status, JobStatus::Failed);
            assert_eq!(
                jobs[0].error.as_deref(),
                Some("Upload could not be received: upload interrupted")
            );
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("interrupted upload stayed in uploading");
}

#[tokio::test]
async fn test_list_table_records() {
    let app = test_app();
    let (_, body) = submit(&app, "stores", "stores.csv", "code,name\nS1,Main\nS2,North\n").await;
    let job_id: Uuid = serde_json::from_value(body["data"]["job_id"].clone()).unwrap();
    wait_until_done(&app, job_id).await;

    let (status, body) = get(&app, "/api/v1/tables/stores/records?limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], json!(2));
    assert_eq!(body["data"]["records"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["records"][0]["key"], json!("S2"));

    let (status, body) = get(&app, "/api/v1/tables/customers/records").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("UNKNOWN_TABLE"));
}
