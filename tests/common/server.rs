//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own audio directory and
//! history.

use super::constants::*;
use super::mocks::MockSynthesizer;
use composer_server::generation::{GenerationService, SamplingParams, Synthesizer};
use composer_server::server::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use composer_server::{FsArtifactStore, HistoryLedger};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with an isolated audio directory
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// History shared with the running server
    pub history: Arc<HistoryLedger>,

    // Private fields - keep resources alive until drop
    temp_audio_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

#[allow(dead_code)]
impl TestServer {
    /// Spawns a server backed by a mock model returning one second of silence
    pub async fn spawn() -> Self {
        let synthesizer: Arc<dyn Synthesizer> = Arc::new(MockSynthesizer::silence(
            MOCK_DURATION_SECS,
            MOCK_SAMPLE_RATE,
        ));
        Self::spawn_with(Some(synthesizer)).await
    }

    /// Spawns a server as if the model had failed to load
    pub async fn spawn_without_model() -> Self {
        Self::spawn_with(None).await
    }

    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if the audio directory cannot be created, the port cannot be
    /// bound or the server doesn't become ready within timeout.
    pub async fn spawn_with(synthesizer: Option<Arc<dyn Synthesizer>>) -> Self {
        let temp_audio_dir = TempDir::new().expect("Failed to create temp audio dir");
        let artifact_store = Arc::new(
            FsArtifactStore::new(temp_audio_dir.path()).expect("Failed to create artifact store"),
        );
        let history = Arc::new(HistoryLedger::new());

        let generation_service = Arc::new(GenerationService::new(
            synthesizer,
            artifact_store,
            history.clone(),
            SamplingParams::default(),
        ));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            content_cache_age_sec: 0,
            ..Default::default()
        };
        let app = make_app(ServerState::new(config, generation_service));

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            history,
            temp_audio_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    pub fn audio_dir(&self) -> &Path {
        self.temp_audio_dir.path()
    }

    /// Number of files currently in the audio directory
    pub fn artifact_count(&self) -> usize {
        std::fs::read_dir(self.audio_dir())
            .expect("Failed to read audio dir")
            .count()
    }

    /// Waits for the server to become ready by polling the landing page
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
