//! HTTP client for end-to-end tests
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Map, Value};
use std::io::Cursor;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

#[allow(dead_code)]
impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    // ========================================================================
    // Pages
    // ========================================================================

    pub async fn get_page(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Page request failed")
    }

    // ========================================================================
    // Generation
    // ========================================================================

    /// POST /generate, leaving out fields passed as `None`
    pub async fn generate(
        &self,
        prompt: Option<&str>,
        genre: Option<&str>,
        mood: Option<&str>,
    ) -> Response {
        let mut body = Map::new();
        if let Some(prompt) = prompt {
            body.insert("prompt".to_string(), json!(prompt));
        }
        if let Some(genre) = genre {
            body.insert("genre".to_string(), json!(genre));
        }
        if let Some(mood) = mood {
            body.insert("mood".to_string(), json!(mood));
        }

        self.client
            .post(format!("{}/generate", self.base_url))
            .json(&Value::Object(body))
            .send()
            .await
            .expect("Generate request failed")
    }

    /// POST /generate with an arbitrary body
    pub async fn generate_raw(&self, body: &str) -> Response {
        self.client
            .post(format!("{}/generate", self.base_url))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("Generate request failed")
    }

    /// Generates and returns the retrieval path, panicking on failure
    pub async fn generate_ok(&self, prompt: &str) -> String {
        let response = self.generate(Some(prompt), None, None).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let json: Value = response.json().await.expect("Invalid generate response");
        json["url"]
            .as_str()
            .expect("Missing url in generate response")
            .to_string()
    }

    // ========================================================================
    // Download
    // ========================================================================

    /// GET a retrieval path as returned by /generate
    pub async fn download(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Download request failed")
    }

    pub async fn download_id(&self, id: &str) -> Response {
        self.download(&format!("/download/{}", id)).await
    }

    // ========================================================================
    // History
    // ========================================================================

    pub async fn get_history_json(&self) -> Vec<Value> {
        let response = self.get_page("/api/history").await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        response.json().await.expect("Invalid history response")
    }
}

/// Decoded WAV contents: (spec, interleaved samples)
#[allow(dead_code)]
pub fn decode_wav(bytes: &[u8]) -> (hound::WavSpec, Vec<i16>) {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).expect("Invalid WAV data");
    let spec = reader.spec();
    let samples = reader
        .samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .expect("Invalid WAV samples");
    (spec, samples)
}
