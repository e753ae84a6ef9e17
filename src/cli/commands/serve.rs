//! HTTP API server.
//!
//! Exposes the greeting endpoint and the RAG query endpoint used by the
//! web client.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{ErrorMode, ServerSettings, Settings};
use crate::corpus::ResultItem;
use crate::error::MedragError;
use crate::orchestrator::Orchestrator;
use crate::rag::RagEngine;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Payload of `GET /`.
pub const GREETING: &str = "welcome, I am a medical AI assistant";

/// Shared application state.
struct AppState {
    engine: Arc<RagEngine>,
    error_mode: ErrorMode,
}

/// Build the API router around an engine.
pub fn router(engine: Arc<RagEngine>, server: &ServerSettings) -> Router {
    let state = Arc::new(AppState {
        engine,
        error_mode: server.error_mode,
    });

    let app = Router::new()
        .route("/", get(hello))
        .route("/health", get(health))
        .route("/query", post(query));

    let app = if server.cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app.layer(cors)
    } else {
        app
    };

    app.with_state(state)
}

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    error_mode: Option<ErrorMode>,
    mut settings: Settings,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }
    if let Some(mode) = error_mode {
        settings.server.error_mode = mode;
    }

    if let Err(e) = preflight::check(Operation::Answer, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let engine = orchestrator.engine();
    let server = &orchestrator.settings().server;
    let app = router(engine.clone(), server);

    let addr = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("medrag API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Greeting", "GET  /");
    Output::kv("Health", "GET  /health");
    Output::kv("Query (RAG)", "POST /query");
    Output::kv("Errors", &server.error_mode.to_string());
    let k_range = engine.k_range();
    Output::kv(
        "Top-k",
        &format!(
            "default {}, accepted {}..={}",
            engine.default_k(),
            k_range.start(),
            k_range.end()
        ),
    );
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    info!("Serving on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    k: Option<usize>,
}

/// Body of every `/query` response; `answer` is null exactly when `error` is set.
#[derive(Debug, Serialize)]
struct QueryResponse {
    query: String,
    results: Vec<ResultItem>,
    answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl QueryResponse {
    fn failed(query: String, error: String) -> Self {
        Self {
            query,
            results: Vec::new(),
            answer: None,
            error: Some(error),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    documents: usize,
    indexed: usize,
}

/// Status code for a failed step in `status` error mode.
fn status_for(err: &MedragError) -> StatusCode {
    match err {
        MedragError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MedragError::Embedding(_) | MedragError::Generation(_) => StatusCode::BAD_GATEWAY,
        MedragError::GenerationTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond(mode: ErrorMode, status: StatusCode, body: QueryResponse) -> axum::response::Response {
    match mode {
        ErrorMode::Inline => Json(body).into_response(),
        ErrorMode::Status => (status, Json(body)).into_response(),
    }
}

// === Handlers ===

async fn hello() -> impl IntoResponse {
    Json(serde_json::json!({ "hello": GREETING }))
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        documents: state.engine.corpus().len(),
        indexed: state.engine.vector_store().len(),
    })
}

async fn query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!("Rejected query body: {}", rejection.body_text());
            return respond(
                state.error_mode,
                rejection.status(),
                QueryResponse::failed(String::new(), rejection.body_text()),
            );
        }
    };

    match state.engine.ask(&req.query, req.k).await {
        Ok(response) => {
            info!(hits = response.sources.len(), "Answered query");
            Json(QueryResponse {
                query: req.query,
                results: response.sources.into_iter().map(|s| s.item).collect(),
                answer: Some(response.answer),
                error: None,
            })
            .into_response()
        }
        Err(e) => {
            warn!(step = e.kind(), "Query failed: {}", e);
            let status = status_for(&e);
            respond(state.error_mode, status, QueryResponse::failed(req.query, e.to_string()))
        }
    }
}
