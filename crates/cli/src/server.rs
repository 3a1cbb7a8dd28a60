//! HTTP/SSE boundary for the chat pipeline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/chat/ask` | Answer a question, return the persisted outcome |
//! | `GET`  | `/chat/stream?q=&scope=&session=&owner=` | Stream an answer as SSE (`start`, `token`, `done`, `error`) |
//! | `POST` | `/chat/turns/{id}/regenerate` | Replace an answer |
//! | `POST` | `/chat/turns/{id}/feedback` | Rate an answer |
//! | `GET`  | `/chat/turns/{id}/citations` | Citations of an answer |
//! | `GET`  | `/chat/sessions/{id}/turns` | Turns of a session |
//! | `POST` | `/chat/sessions/{id}/share` | Mint a share token |
//! | `GET`  | `/chat/shared/{token}` | Resolve a share token |
//! | `GET`  | `/health` | Health check |
//!
//! Errors use the body `{ "error": { "code": "...", "message": "..." } }`.

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use docent_chat::{
    AnswerOutcome, AskRequest, ChatController, ChatEvent, Citation, EventSink, Rating,
    SessionTranscript, Turn,
};
use docent_core::{AppError, AppResult};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};

type SharedController = Arc<ChatController>;

/// Start the server and run until the process is stopped.
pub async fn run_server(bind: &str, controller: SharedController) -> anyhow::Result<()> {
    let app = router(controller);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Chat server listening on http://{}", listener.local_addr()?);
    eprintln!("docent listening on http://{}", bind);

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(controller: SharedController) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat/ask", post(handle_ask))
        .route("/chat/stream", get(handle_stream))
        .route("/chat/turns/{id}/regenerate", post(handle_regenerate))
        .route("/chat/turns/{id}/feedback", post(handle_feedback))
        .route("/chat/turns/{id}/citations", get(handle_citations))
        .route("/chat/sessions/{id}/turns", get(handle_session_turns))
        .route("/chat/sessions/{id}/share", post(handle_share))
        .route("/chat/shared/{token}", get(handle_shared))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(controller)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let (status, code) = match &err {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            e if e.is_generation_failure() => (StatusCode::BAD_GATEWAY, "generation_failed"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        if status.is_server_error() {
            tracing::error!(error = %err, "Request failed");
        }

        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ POST /chat/ask ============

async fn handle_ask(
    State(controller): State<SharedController>,
    Json(request): Json<AskRequest>,
) -> ApiResult<AnswerOutcome> {
    Ok(Json(controller.ask(request).await?))
}

// ============ GET /chat/stream ============

#[derive(Deserialize)]
struct StreamQuery {
    q: String,
    scope: String,
    session: Option<String>,
    owner: Option<String>,
}

enum StreamMessage {
    Event(ChatEvent),
    Error(ApiError),
}

/// Forwards controller events into the SSE response channel.
struct ChannelSink(mpsc::Sender<StreamMessage>);

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&mut self, event: ChatEvent) -> AppResult<()> {
        self.0
            .send(StreamMessage::Event(event))
            .await
            .map_err(|_| AppError::Other("SSE client disconnected".to_string()))
    }
}

fn to_sse(message: StreamMessage) -> Event {
    let (name, data) = match message {
        StreamMessage::Event(event) => (
            event.name(),
            serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string()),
        ),
        StreamMessage::Error(err) => (
            "error",
            serde_json::to_string(&ErrorBody {
                error: ErrorDetail {
                    code: err.code,
                    message: err.message,
                },
            })
            .unwrap_or_else(|_| "{}".to_string()),
        ),
    };
    Event::default().event(name).data(data)
}

async fn handle_stream(
    State(controller): State<SharedController>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(64);

    let mut request = AskRequest::new(query.scope, query.q);
    request.session_id = query.session;
    request.owner = query.owner;

    tokio::spawn(async move {
        let mut sink = ChannelSink(tx);
        if let Err(e) = controller.ask_stream(request, &mut sink).await {
            tracing::warn!(error = %e, "Streaming request rejected");
            let _ = sink.0.send(StreamMessage::Error(ApiError::from(e))).await;
        }
    });

    // Dropping this stream (client gone) closes the channel, which the
    // controller observes as a disconnect.
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|message| (Ok::<_, Infallible>(to_sse(message)), rx))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ============ POST /chat/turns/{id}/regenerate ============

#[derive(Deserialize)]
struct OwnerQuery {
    owner: Option<String>,
}

async fn handle_regenerate(
    State(controller): State<SharedController>,
    Path(turn_id): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<AnswerOutcome> {
    Ok(Json(
        controller
            .regenerate(&turn_id, query.owner.as_deref())
            .await?,
    ))
}

// ============ POST /chat/turns/{id}/feedback ============

#[derive(Deserialize)]
struct FeedbackBody {
    rating: String,
    #[serde(default)]
    tag: Option<String>,
}

async fn handle_feedback(
    State(controller): State<SharedController>,
    Path(turn_id): Path<String>,
    Json(body): Json<FeedbackBody>,
) -> ApiResult<Turn> {
    let rating = Rating::parse(&body.rating)?;
    Ok(Json(controller.rate_turn(
        &turn_id,
        rating,
        body.tag.as_deref(),
    )?))
}

// ============ GET /chat/turns/{id}/citations ============

#[derive(Serialize)]
struct CitationsResponse {
    citations: Vec<Citation>,
}

async fn handle_citations(
    State(controller): State<SharedController>,
    Path(turn_id): Path<String>,
) -> ApiResult<CitationsResponse> {
    Ok(Json(CitationsResponse {
        citations: controller.citations_for_turn(&turn_id)?,
    }))
}

// ============ GET /chat/sessions/{id}/turns ============

#[derive(Serialize)]
struct TurnsResponse {
    turns: Vec<Turn>,
}

async fn handle_session_turns(
    State(controller): State<SharedController>,
    Path(session_id): Path<String>,
) -> ApiResult<TurnsResponse> {
    Ok(Json(TurnsResponse {
        turns: controller.session_turns(&session_id)?,
    }))
}

// ============ POST /chat/sessions/{id}/share ============

#[derive(Serialize)]
struct ShareResponse {
    share_token: String,
}

async fn handle_share(
    State(controller): State<SharedController>,
    Path(session_id): Path<String>,
) -> ApiResult<ShareResponse> {
    Ok(Json(ShareResponse {
        share_token: controller.share_session(&session_id)?,
    }))
}

// ============ GET /chat/shared/{token} ============

async fn handle_shared(
    State(controller): State<SharedController>,
    Path(token): Path<String>,
) -> ApiResult<SessionTranscript> {
    Ok(Json(controller.shared_session(&token)?))
}
