#![allow(dead_code)]

use classifier_service::config::ClassifierConfig;
use classifier_service::startup::{build_router, load_predictor, AppState, Application};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

pub struct TestApp {
    pub address: String,
    pub port: u16,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(ClassifierConfig::mock()).await
    }

    pub async fn spawn_with(mut config: ClassifierConfig) -> Self {
        config.common.port = 0; // Random port for testing

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling the liveness endpoint
        let client = reqwest::Client::new();
        let ping_url = format!("{}/ping", address);
        for _ in 0..50 {
            if client.get(&ping_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp { address, port }
    }

    pub async fn post_image(&self, file_name: &str, bytes: Vec<u8>) -> reqwest::Response {
        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(bytes)
                .file_name(file_name.to_string())
                .mime_str("image/png")
                .unwrap(),
        );

        reqwest::Client::new()
            .post(format!("{}/predict", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Router backed by the mock model, for `oneshot` tests.
pub fn mock_router() -> axum::Router {
    let config = ClassifierConfig::mock();
    let predictor = load_predictor(&config.model).expect("mock backend always loads");
    build_router(AppState::new(config, predictor))
}

pub fn solid_png(width: u32, height: u32, value: u8) -> Vec<u8> {
    encode_png(RgbImage::from_pixel(width, height, Rgb([value, value, value])))
}

pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    encode_png(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            90,
        ])
    }))
}

fn encode_png(img: RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .expect("Failed to encode test image");
    buf.into_inner()
}
