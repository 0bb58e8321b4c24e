//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, SUNSET_PROMPT};
//! use reqwest::StatusCode;
//!
//! #[tokio::test]
//! async fn test_generate() {
//!     let server = TestServer::spawn().await;
//!     let client = TestClient::new(server.base_url.clone());
//!
//!     let response = client.generate(Some(SUNSET_PROMPT), None, None).await;
//!     assert_eq!(response.status(), StatusCode::OK);
//! }
//! ```

mod client;
mod constants;
mod mocks;
mod server;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use client::{decode_wav, TestClient};
pub use constants::*;
#[allow(unused_imports)]
pub use mocks::{FailingSynthesizer, MockSynthesizer};
pub use server::TestServer;
