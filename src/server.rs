// HTTP surface of the gateway: status, chat, streaming chat, and history
// routes. Each streaming turn owns a fresh reasoning filter; the handlers
// wire the upstream chunk stream through it and into the SSE response.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::UnboundedReceiverStream};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    app_context::AppContext,
    config::GatewayConfig,
    history::ConversationHistory,
    protocols::{ChatMessage, ChatRequest, ChatResponse, HistoryResponse, StreamEvent},
    reasoning_filter::{MarkerPair, StreamingFilter, canonicalize, normalize_whitespace},
    upstream::UpstreamError,
};

/// Upstream failure surfaced on the non-streaming path, mapped to the status
/// codes the frontend expects.
pub struct ApiError(pub UpstreamError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_connect() {
            StatusCode::SERVICE_UNAVAILABLE
        } else if self.0.is_timeout() {
            StatusCode::GATEWAY_TIMEOUT
        } else {
            StatusCode::BAD_GATEWAY
        };
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn startup(config: GatewayConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let context = Arc::new(AppContext::new(config)?);

    info!(
        "starting gateway on {} (upstream {}, model {})",
        addr,
        context.upstream.base_url(),
        context.upstream.model().unwrap_or("backend default"),
    );
    if context.upstream.check().await {
        info!("upstream backend reachable");
    } else {
        info!("upstream backend not reachable yet; requests will fail until it is up");
    }

    let app = build_app(context);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_app(context: Arc<AppContext>) -> Router {
    let cors = create_cors_layer(context.config.cors_allowed_origins.clone());
    Router::new()
        .route("/", get(status))
        .route("/api/chat", post(chat))
        .route("/api/stream_chat", post(stream_chat))
        .route("/api/history", get(get_history).delete(clear_history))
        .layer(cors)
        .with_state(context)
}

async fn status(State(context): State<Arc<AppContext>>) -> Json<Value> {
    let connected = context.upstream.check().await;
    Json(json!({
        "status": "running",
        "upstream_url": context.upstream.base_url(),
        "model": context.upstream.model(),
        "upstream_connected": connected,
        "endpoints": {
            "chat": "/api/chat",
            "stream_chat": "/api/stream_chat",
            "history": "/api/history",
        },
    }))
}

/// Record the user message and assemble the context window sent upstream.
fn begin_turn(context: &AppContext, history: &mut ConversationHistory, text: &str) -> Vec<ChatMessage> {
    history.push_user(text);
    let mut messages = Vec::new();
    if let Some(prompt) = &context.config.system_prompt {
        messages.push(ChatMessage::system(prompt));
    }
    messages.extend_from_slice(history.recent(context.config.context_window));
    messages
}

/// Strip reasoning spans and markdown emphasis characters from a complete
/// reply, collapsing the whitespace left behind.
fn clean_reply(raw: &str, markers: &MarkerPair) -> String {
    let stripped = canonicalize(raw, markers);
    normalize_whitespace(&stripped.replace(['*', '_', '`'], ""))
}

async fn chat(
    State(context): State<Arc<AppContext>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let messages = {
        let mut history = context.history.write().await;
        begin_turn(&context, &mut history, &request.text)
    };

    let raw = context.upstream.chat(&messages).await.map_err(ApiError)?;
    let reply = clean_reply(&raw, &context.config.marker_pair());

    let history = {
        let mut history = context.history.write().await;
        history.push_assistant(&reply);
        history.snapshot()
    };
    Ok(Json(ChatResponse {
        response: reply,
        history,
    }))
}

async fn stream_chat(
    State(context): State<Arc<AppContext>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let turn_id = Uuid::new_v4();
    let messages = {
        let mut history = context.history.write().await;
        begin_turn(&context, &mut history, &request.text)
    };
    info!(%turn_id, context_messages = messages.len(), "streaming turn started");

    let markers = context.config.marker_pair();
    let mut source = context.upstream.stream_chat(messages);
    let (tx, rx) = mpsc::unbounded_channel::<Result<Bytes, Infallible>>();

    tokio::spawn(async move {
        let mut filter = StreamingFilter::new(markers.clone());
        let mut failure: Option<UpstreamError> = None;

        while let Some(item) = source.next().await {
            match item {
                Ok(delta) => {
                    let emitted = filter.process_chunk(&delta);
                    if !emitted.is_empty()
                        && tx.send(Ok(sse_frame(&StreamEvent::token(emitted)))).is_err()
                    {
                        // Consumer disconnected; abandon the turn.
                        return;
                    }
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        // End-of-stream flush. Confirmed text still goes out when the
        // upstream failed mid-stream, so the consumer sees partial-but-
        // correct output before the failure notification.
        let tail = filter.finish();
        if !tail.is_empty() {
            let _ = tx.send(Ok(sse_frame(&StreamEvent::token(tail))));
        }

        match failure {
            Some(e) => {
                error!(%turn_id, "upstream stream failed: {e}");
                let _ = tx.send(Ok(sse_frame(&StreamEvent::error(&e))));
            }
            None => {
                let full_text = canonicalize(filter.visible_text(), &markers);
                {
                    let mut history = context.history.write().await;
                    history.push_assistant(&full_text);
                }
                info!(%turn_id, chars = full_text.len(), "streaming turn complete");
                let _ = tx.send(Ok(sse_frame(&StreamEvent::done(full_text))));
            }
        }
    });

    let body = Body::from_stream(UnboundedReceiverStream::new(rx));
    let mut response = Response::new(body);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, http::HeaderValue::from_static("text/event-stream"));
    response
}

async fn get_history(State(context): State<Arc<AppContext>>) -> Json<HistoryResponse> {
    let history = context.history.read().await;
    Json(HistoryResponse {
        history: history.snapshot(),
    })
}

async fn clear_history(State(context): State<Arc<AppContext>>) -> Json<Value> {
    context.history.write().await.clear();
    Json(json!({ "message": "History cleared" }))
}

fn sse_frame(event: &StreamEvent) -> Bytes {
    match serde_json::to_string(event) {
        Ok(json) => Bytes::from(format!("data: {json}\n\n")),
        Err(e) => {
            error!("failed to serialize stream event: {e}");
            Bytes::new()
        }
    }
}

fn create_cors_layer(allowed_origins: Vec<String>) -> tower_http::cors::CorsLayer {
    use tower_http::cors::Any;

    let cors = if allowed_origins.is_empty() {
        tower_http::cors::CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<http::HeaderValue> = allowed_origins
            .into_iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        tower_http::cors::CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                http::Method::GET,
                http::Method::POST,
                http::Method::DELETE,
                http::Method::OPTIONS,
            ])
            .allow_headers([http::header::CONTENT_TYPE])
    };

    cors.max_age(Duration::from_secs(3600))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("received terminate signal, starting graceful shutdown");
        },
    }
}
