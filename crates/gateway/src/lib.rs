//! HTTP API gateway for StrataChat.
//!
//! Exposes the engine over REST: chat, usage stats, session clearing, and
//! a health probe. Built on Axum.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use stratachat_config::AppConfig;
use stratachat_core::error::{Error, RouteError};
use stratachat_engine::{ChatEngine, ChatReply};
use stratachat_ledger::LedgerStats;

type SharedEngine = Arc<ChatEngine>;

/// Build the Axum router with all gateway routes.
pub fn build_router(engine: SharedEngine) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/chat", post(chat_handler))
        .route("/v1/stats", get(stats_handler))
        .route("/v1/sessions/{id}", delete(clear_session_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1 MB body limit
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(engine)
}

/// Start the gateway HTTP server. Runs until the process is stopped.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let engine = Arc::new(ChatEngine::from_config(&config)?);

    let app = build_router(engine);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub model: String,
    pub provider: String,
    pub cache_hit: bool,
    pub attempts: usize,
    /// Prompt plus completion tokens of the exchange.
    pub tokens: u32,
    pub memory_tokens: usize,
}

impl From<ChatReply> for ChatResponse {
    fn from(reply: ChatReply) -> Self {
        Self {
            response: reply.text,
            model: reply.model,
            provider: reply.provider,
            cache_hit: reply.cache_hit,
            attempts: reply.attempts.len(),
            tokens: reply.tokens,
            memory_tokens: reply.memory_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn chat_handler(
    State(engine): State<SharedEngine>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    if request.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "message must not be empty".into(),
            }),
        ));
    }
    if request.session_id.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "session_id must not be empty".into(),
            }),
        ));
    }

    match engine.chat(&request.session_id, &request.message).await {
        Ok(reply) => Ok(Json(reply.into())),
        Err(Error::Route(RouteError::AllProvidersExhausted { attempts })) => {
            // The per-provider failure detail stays in the logs; clients get
            // a generic signal.
            error!(
                session = %request.session_id,
                attempts = attempts.len(),
                detail = ?attempts,
                "All providers exhausted"
            );
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: "all models are currently unavailable, try again shortly".into(),
                }),
            ))
        }
        Err(e) => {
            error!(session = %request.session_id, error = %e, "Chat failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "internal error".into(),
                }),
            ))
        }
    }
}

async fn stats_handler(State(engine): State<SharedEngine>) -> Json<LedgerStats> {
    Json(engine.stats())
}

async fn clear_session_handler(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
) -> StatusCode {
    engine.clear_session(&id);
    StatusCode::NO_CONTENT
}
