//! End-to-end tests for the generation endpoint
//!
//! Tests the full path from a JSON request to a stored artifact and a
//! history entry.

mod common;

use common::{
    decode_wav, FailingSynthesizer, MockSynthesizer, TestClient, TestServer, CALM_MOOD,
    EMPTY_PROMPT_ERROR, JAZZ_GENRE, MODEL_UNAVAILABLE_ERROR, MOCK_SAMPLE_RATE, SUNSET_PROMPT,
};
use composer_server::generation::Synthesizer;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;

#[tokio::test]
async fn test_generate_sunset_track() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .generate(Some(SUNSET_PROMPT), Some(JAZZ_GENRE), Some(CALM_MOOD))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = response.json().await.unwrap();
    let url = json["url"].as_str().unwrap();
    assert!(url.starts_with("/download/"), "unexpected url {}", url);

    let download = client.download(url).await;
    assert_eq!(download.status(), StatusCode::OK);
    assert_eq!(download.headers()["content-type"], "audio/wav");

    let bytes = download.bytes().await.unwrap();
    let (spec, samples) = decode_wav(&bytes);
    assert_eq!(spec.sample_rate, MOCK_SAMPLE_RATE);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(samples.len(), MOCK_SAMPLE_RATE as usize);
    assert!(samples.iter().all(|s| *s == 0));

    let entries = server.history.list_all();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].prompt, SUNSET_PROMPT);
    assert_eq!(entries[0].genre, JAZZ_GENRE);
    assert_eq!(entries[0].mood, CALM_MOOD);
    assert_eq!(entries[0].url, url);
}

#[tokio::test]
async fn test_generate_forwards_instruction_with_defaults() {
    let mock = Arc::new(MockSynthesizer::silence(1, MOCK_SAMPLE_RATE));
    let synthesizer: Arc<dyn Synthesizer> = mock.clone();
    let server = TestServer::spawn_with(Some(synthesizer)).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.generate(Some("rainy city"), None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(mock.calls(), 1);
    assert_eq!(
        mock.instructions(),
        vec!["Create a Any style track with a Calm mood. Theme: rainy city"]
    );
    let entries = server.history.list_all();
    assert_eq!(entries[0].genre, "Any");
    assert_eq!(entries[0].mood, "Calm");
}

#[tokio::test]
async fn test_generate_empty_prompt_returns_400() {
    let mock = Arc::new(MockSynthesizer::silence(1, MOCK_SAMPLE_RATE));
    let synthesizer: Arc<dyn Synthesizer> = mock.clone();
    let server = TestServer::spawn_with(Some(synthesizer)).await;
    let client = TestClient::new(server.base_url.clone());

    for prompt in [None, Some(""), Some("   \t")] {
        let response = client.generate(prompt, Some(JAZZ_GENRE), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json: Value = response.json().await.unwrap();
        assert_eq!(json["error"], EMPTY_PROMPT_ERROR);
    }

    assert_eq!(mock.calls(), 0);
    assert_eq!(server.artifact_count(), 0);
    assert!(server.history.is_empty());
}

#[tokio::test]
async fn test_generate_invalid_body_returns_400() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    for body in ["not json", "[1, 2, 3]", "\"prompt\""] {
        let response = client.generate_raw(body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);

        let json: Value = response.json().await.unwrap();
        assert_eq!(json["error"], EMPTY_PROMPT_ERROR);
    }
    assert!(server.history.is_empty());
}

#[tokio::test]
async fn test_generate_without_model_returns_500() {
    let server = TestServer::spawn_without_model().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.generate(Some(SUNSET_PROMPT), None, None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json: Value = response.json().await.unwrap();
    assert_eq!(json["error"], MODEL_UNAVAILABLE_ERROR);
    assert_eq!(server.artifact_count(), 0);
}

#[tokio::test]
async fn test_generate_model_failure_returns_500() {
    let synthesizer: Arc<dyn Synthesizer> = Arc::new(FailingSynthesizer {
        message: "CUDA out of memory".to_string(),
    });
    let server = TestServer::spawn_with(Some(synthesizer)).await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.generate(Some(SUNSET_PROMPT), None, None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json: Value = response.json().await.unwrap();
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("CUDA out of memory"));
    assert!(server.history.is_empty());
    assert_eq!(server.artifact_count(), 0);
}

#[tokio::test]
async fn test_generate_clips_out_of_range_samples() {
    let synthesizer: Arc<dyn Synthesizer> = Arc::new(MockSynthesizer::new(
        vec![1.5, -2.0, 0.25, 0.0],
        1,
        MOCK_SAMPLE_RATE,
    ));
    let server = TestServer::spawn_with(Some(synthesizer)).await;
    let client = TestClient::new(server.base_url.clone());

    let url = client.generate_ok("clipping").await;
    let bytes = client.download(&url).await.bytes().await.unwrap();

    let (_spec, samples) = decode_wav(&bytes);
    assert_eq!(samples, vec![32767, -32767, 8191, 0]);
}

#[tokio::test]
async fn test_generate_keeps_channel_count() {
    let synthesizer: Arc<dyn Synthesizer> = Arc::new(MockSynthesizer::new(
        vec![0.5, -0.5, 0.5, -0.5],
        2,
        32000,
    ));
    let server = TestServer::spawn_with(Some(synthesizer)).await;
    let client = TestClient::new(server.base_url.clone());

    let url = client.generate_ok("stereo").await;
    let bytes = client.download(&url).await.bytes().await.unwrap();

    let (spec, samples) = decode_wav(&bytes);
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 32000);
    assert_eq!(samples, vec![16383, -16383, 16383, -16383]);
}
