use anyhow::{Context, Result};
use std::time::Instant;

use tracing::{error, info, warn};

use crate::artifact_store::{artifact_file_name, ArtifactStoreError};
use crate::generation::{GenerationError, GenerationRequest};
use tower_http::services::ServeDir;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{http_cache, log_requests, metrics, pages, state::*};

const WAV_MIME_TYPE: &str = "audio/wav";

#[derive(Deserialize, Debug, Default)]
struct GenerateBody {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
}

impl From<GenerateBody> for GenerationRequest {
    fn from(body: GenerateBody) -> Self {
        GenerationRequest::new(body.prompt.unwrap_or_default(), body.genre, body.mood)
    }
}

#[derive(Serialize)]
struct GenerateSuccessResponse {
    url: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for GenerationError {
    fn into_response(self) -> Response {
        let status = match self {
            GenerationError::BadRequest => StatusCode::BAD_REQUEST,
            GenerationError::ServiceUnavailable | GenerationError::Failed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

fn generation_result_label(result: &Result<String, GenerationError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(GenerationError::BadRequest) => "bad_request",
        Err(GenerationError::ServiceUnavailable) => "unavailable",
        Err(GenerationError::Failed(_)) => "failure",
    }
}

async fn home() -> Html<String> {
    Html(pages::landing())
}

async fn composer() -> Html<String> {
    Html(pages::composer())
}

async fn history_page(State(history): State<GuardedHistoryLedger>) -> Html<String> {
    Html(pages::history(&history.list_all()))
}

async fn get_history(State(history): State<GuardedHistoryLedger>) -> Response {
    Json(history.list_all()).into_response()
}

async fn generate(
    State(state): State<ServerState>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Response {
    // A malformed body is treated like a missing prompt.
    let request: GenerationRequest = match body {
        Ok(Json(body)) => body.into(),
        Err(rejection) => {
            info!("Rejected generate body: {}", rejection);
            GenerateBody::default().into()
        }
    };

    let start = Instant::now();
    let result = state.generation_service.generate(&request).await;
    metrics::record_generation(generation_result_label(&result), start.elapsed());
    metrics::set_history_size(state.history.len());

    match result {
        Ok(url) => Json(GenerateSuccessResponse { url }).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn download(
    State(artifact_store): State<GuardedArtifactStore>,
    Path(id): Path<String>,
) -> Response {
    let store = artifact_store.clone();
    let lookup_id = id.clone();
    let read_result = match tokio::task::spawn_blocking(move || store.read(&lookup_id)).await {
        Ok(result) => result,
        Err(err) => {
            error!("Artifact read task failed: {}", err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let bytes = match read_result {
        Ok(bytes) => bytes,
        Err(ArtifactStoreError::NotFound(_)) => {
            return (StatusCode::NOT_FOUND, "File not found").into_response()
        }
        Err(err) => {
            error!("Failed to read artifact {}: {}", id, err);
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    };

    let content_type = if infer::audio::is_wav(&bytes) {
        WAV_MIME_TYPE
    } else {
        let mime = infer::get(&bytes)
            .map(|kind| kind.mime_type())
            .unwrap_or("application/octet-stream");
        warn!("Artifact {} is not a WAV file, serving as {}", id, mime);
        mime
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact_file_name(&id)),
            ),
        ],
        bytes,
    )
        .into_response()
}

pub fn make_app(state: ServerState) -> Router {
    let config = state.config.clone();
    let download_routes: Router = Router::new()
        .route("/download/{id}", get(download))
        .layer(middleware::from_fn_with_state(
            config.content_cache_age_sec,
            http_cache,
        ))
        .with_state(state.clone());

    let mut app: Router = Router::new()
        .route("/", get(home))
        .route("/composer", get(composer))
        .route("/history", get(history_page))
        .route("/api/history", get(get_history))
        .route("/generate", post(generate))
        .with_state(state.clone())
        .merge(download_routes);

    if let Some(frontend_path) = config.frontend_dir_path {
        app = app.nest_service("/static", ServeDir::new(frontend_path));
    }

    app.layer(middleware::from_fn_with_state(state, log_requests))
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics::metrics_handler))
}

pub async fn run_server(state: ServerState) -> Result<()> {
    let config = state.config.clone();
    metrics::set_model_available(state.generation_service.is_available());
    metrics::set_history_size(state.history.len());

    let metrics_listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.metrics_port))
            .await
            .with_context(|| format!("Failed to bind metrics port {}", config.metrics_port))?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, make_metrics_app()).await {
            error!("Metrics server stopped: {}", err);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;

    info!("Listening on {}:{}", config.host, config.port);
    let app = make_app(state);
    Ok(axum::serve(listener, app).await?)
}
