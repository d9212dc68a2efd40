//! Integration tests for the prediction server endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use charges_server::api::{create_router, AppState};
use predictor_lib::{train, ArtifactPaths, ArtifactStore, TrainingConfig};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn sample_data() -> PathBuf {
    PathBuf::from(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../data/insurance_sample.csv"
    ))
}

fn train_into(dir: &TempDir) -> ArtifactPaths {
    let config = TrainingConfig {
        data_path: sample_data(),
        artifacts: ArtifactPaths::in_dir(dir.path()),
        ..Default::default()
    };
    train(&config).unwrap();
    config.artifacts
}

fn setup_test_app(paths: ArtifactPaths) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(Arc::new(ArtifactStore::new(paths))));
    (create_router(Arc::clone(&state)), state)
}

fn predict_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn applicant(smoker: &str) -> Value {
    json!({
        "age": 40,
        "sex": "male",
        "bmi": 28.0,
        "children": 2,
        "smoker": smoker,
        "region": "northwest"
    })
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_returns_ok_without_artifacts() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_test_app(ArtifactPaths::in_dir(dir.path()));

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_predict_returns_charges() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_test_app(train_into(&dir));

    let (status, body) = send(&app, predict_request(applicant("no"))).await;
    assert_eq!(status, StatusCode::OK);

    let charges = body["predicted_charges"].as_f64().unwrap();
    assert!(charges.is_finite());
    assert!(charges > 0.0);
}

#[tokio::test]
async fn test_smoker_is_predicted_higher() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_test_app(train_into(&dir));

    let (_, non_smoker) = send(&app, predict_request(applicant("no"))).await;
    let (_, smoker) = send(&app, predict_request(applicant("yes"))).await;

    let non_smoker = non_smoker["predicted_charges"].as_f64().unwrap();
    let smoker = smoker["predicted_charges"].as_f64().unwrap();
    assert!(smoker > non_smoker);
}

#[tokio::test]
async fn test_predict_rejects_unknown_field() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_test_app(train_into(&dir));

    let mut body = applicant("no");
    body["income"] = json!(50000);
    let (status, body) = send(&app, predict_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("income"));
}

#[tokio::test]
async fn test_predict_rejects_wrong_type() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_test_app(train_into(&dir));

    let mut body = applicant("no");
    body["age"] = json!("forty");
    let (status, body) = send(&app, predict_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_predict_rejects_unknown_region() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_test_app(train_into(&dir));

    let mut body = applicant("no");
    body["region"] = json!("mars");
    let (status, body) = send(&app, predict_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("mars"));
}

#[tokio::test]
async fn test_predict_rejects_out_of_range_age() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_test_app(train_into(&dir));

    let mut body = applicant("no");
    body["age"] = json!(90);
    let (status, body) = send(&app, predict_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("age"));
}

#[tokio::test]
async fn test_predict_before_training_is_server_error() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_test_app(ArtifactPaths::in_dir(dir.path()));

    let (status, body) = send(&app, predict_request(applicant("no"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_readyz_reflects_artifacts() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_test_app(ArtifactPaths::in_dir(dir.path()));

    let (status, body) = send(&app, get("/readyz")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);
    assert!(body["reason"].is_string());
    assert!(body.get("loaded_at").is_none());

    train_into(&dir);
    let (status, body) = send(&app, get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    assert!(body["model_version"].as_str().unwrap().starts_with("lr-"));
    assert_eq!(body["schema_fingerprint"].as_str().unwrap().len(), 64);
    assert!(body["loaded_at"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn test_reload_keeps_previous_pair_on_failure() {
    let dir = TempDir::new().unwrap();
    let paths = train_into(&dir);
    let (app, state) = setup_test_app(paths.clone());

    let reload = || {
        Request::builder()
            .method("POST")
            .uri("/admin/reload")
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send(&app, reload()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "reloaded");
    let version = body["model_version"].as_str().unwrap().to_string();

    std::fs::write(&paths.model, b"{ not json").unwrap();
    let (status, body) = send(&app, reload()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("corrupt"));

    // Still serving the pair that was active before the failed reload
    assert_eq!(state.store().current().unwrap().model_version(), version);
    let (status, _) = send(&app, predict_request(applicant("yes"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_test_app(train_into(&dir));
    send(&app, predict_request(applicant("no"))).await;

    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("charges_prediction_latency_seconds_bucket"));
    assert!(metrics_text.contains("charges_predictions_served_total"));
    assert!(metrics_text.contains("charges_model_info"));
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let dir = TempDir::new().unwrap();
    let (app, _state) = setup_test_app(ArtifactPaths::in_dir(dir.path()));

    let request = Request::builder()
        .uri("/health")
        .header("origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}
