//! API surface tests that do not require a live database.

mod common;

use axum::http::StatusCode;
use common::TestApp;

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::lazy();
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("healthy"));
}

#[tokio::test]
async fn liveness_check_works() {
    let app = TestApp::lazy();
    let (status, body) = app.get("/health/live").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("alive"));
}

#[tokio::test]
async fn predict_rejects_out_of_range_age() {
    let app = TestApp::lazy();
    let (status, body) = app
        .post_json(
            "/api/prediction/predict",
            r#"{"name":"Alex","weight":70,"height":175,"age":5,"sitUpCounts":35,"broadJump":220}"#,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"]["field"], "age");
}

#[tokio::test]
async fn predict_rejects_short_name() {
    let app = TestApp::lazy();
    let (status, body) = app
        .post_json(
            "/api/prediction/predict",
            r#"{"name":"A","weight":70,"height":175,"age":28,"sitUpCounts":35,"broadJump":220}"#,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"]["field"], "name");
}

#[tokio::test]
async fn predict_rejects_missing_fields() {
    let app = TestApp::lazy();
    let (status, _) = app
        .post_json("/api/prediction/predict", r#"{"name":"Alex"}"#)
        .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn detail_rejects_malformed_id() {
    let app = TestApp::lazy();
    let (status, _) = app.get("/api/prediction/not-a-uuid").await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn upload_rejects_empty_body() {
    let app = TestApp::lazy();
    let (status, body) = app.post_csv("/api/data/upload", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("CSV"));
}

#[tokio::test]
async fn upload_rejects_missing_columns() {
    let app = TestApp::lazy();
    let (status, body) = app
        .post_csv("/api/data/upload", "age,height_cm\n30,170\n")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("missing required CSV column"));
}
