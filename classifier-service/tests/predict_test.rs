mod common;

use axum::http::StatusCode;
use classifier_service::config::{ClassifierConfig, ModelBackend};
use classifier_service::dtos::PREDICTION_FAILED;
use common::{gradient_png, solid_png, TestApp};

const LABELS: [&str; 2] = ["Benigno", "Maligno"];

async fn prediction_of(response: reqwest::Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    (status, body)
}

#[tokio::test]
async fn valid_image_yields_one_of_two_labels() {
    let app = TestApp::spawn().await;

    let (status, body) = prediction_of(app.post_image("lesion.png", gradient_png(300, 200)).await).await;

    assert_eq!(status, StatusCode::OK);
    let label = body["prediction"].as_str().expect("prediction must be a string");
    assert!(LABELS.contains(&label), "unexpected label {label}");
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn same_image_always_yields_same_label() {
    let app = TestApp::spawn().await;
    let image = gradient_png(97, 131);

    let (_, first) = prediction_of(app.post_image("a.png", image.clone()).await).await;
    for _ in 0..3 {
        let (status, again) = prediction_of(app.post_image("a.png", image.clone()).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again["prediction"], first["prediction"]);
    }
}

#[tokio::test]
async fn bright_and_dark_images_map_to_both_labels() {
    let app = TestApp::spawn().await;

    let (_, bright) = prediction_of(app.post_image("bright.png", solid_png(64, 64, 255)).await).await;
    let (_, dark) = prediction_of(app.post_image("dark.png", solid_png(64, 64, 0)).await).await;

    assert_eq!(bright["prediction"], "Maligno");
    assert_eq!(dark["prediction"], "Benigno");
}

#[tokio::test]
async fn unparseable_upload_returns_fixed_error_string() {
    let app = TestApp::spawn().await;

    let (status, body) =
        prediction_of(app.post_image("notes.png", b"this is not an image".to_vec()).await).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["prediction"], PREDICTION_FAILED);
    assert!(body["error"].as_str().unwrap().contains("decode"));
}

#[tokio::test]
async fn empty_upload_returns_fixed_error_string() {
    let app = TestApp::spawn().await;

    let (status, body) = prediction_of(app.post_image("empty.png", Vec::new()).await).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["prediction"], PREDICTION_FAILED);
}

#[tokio::test]
async fn service_keeps_serving_after_bad_upload() {
    let app = TestApp::spawn().await;

    app.post_image("junk.png", vec![0xFF; 64]).await;
    let (status, body) = prediction_of(app.post_image("ok.png", solid_png(8, 8, 0)).await).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "Benigno");
}

#[tokio::test]
async fn first_field_is_used_when_no_file_field() {
    let app = TestApp::spawn().await;

    let form = reqwest::multipart::Form::new().part(
        "image",
        reqwest::multipart::Part::bytes(solid_png(16, 16, 255)).file_name("other.png"),
    );
    let response = reqwest::Client::new()
        .post(format!("{}/predict", app.address))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request");

    let (status, body) = prediction_of(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "Maligno");
}

#[tokio::test]
async fn missing_file_is_a_bad_request() {
    let app = TestApp::spawn().await;

    let response = reqwest::Client::new()
        .post(format!("{}/predict", app.address))
        .multipart(reqwest::multipart::Form::new())
        .send()
        .await
        .expect("Failed to execute request");

    let (status, body) = prediction_of(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["prediction"], PREDICTION_FAILED);
}

#[tokio::test]
async fn non_multipart_request_is_a_bad_request() {
    let app = TestApp::spawn().await;

    let response = reqwest::Client::new()
        .post(format!("{}/predict", app.address))
        .header("content-type", "application/json")
        .body(r#"{"file": "lesion.png"}"#)
        .send()
        .await
        .expect("Failed to execute request");

    let (status, body) = prediction_of(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["prediction"], PREDICTION_FAILED);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let mut config = ClassifierConfig::mock();
    config.upload.max_bytes = 1024;
    let app = TestApp::spawn_with(config).await;

    let (status, body) = prediction_of(app.post_image("big.png", vec![7u8; 8 * 1024]).await).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["prediction"], PREDICTION_FAILED);
}

#[tokio::test]
async fn onnx_backend_serves_predictions() {
    let mut config = ClassifierConfig::mock();
    config.model.backend = ModelBackend::Onnx;
    config.model.path = format!("{}/tests/fixtures/mean_logit.onnx", env!("CARGO_MANIFEST_DIR"));
    let app = TestApp::spawn_with(config).await;

    let (status, bright) = prediction_of(app.post_image("bright.png", solid_png(50, 50, 255)).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bright["prediction"], "Maligno");

    let (_, dark) = prediction_of(app.post_image("dark.png", solid_png(50, 50, 0)).await).await;
    assert_eq!(dark["prediction"], "Benigno");
}
