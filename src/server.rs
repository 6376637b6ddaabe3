//! HTTP front end: login-gated search, chat, chat history and pipeline runs.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::answer::answer;
use crate::embedder::embed_one;
use crate::llm::CompletionService;
use crate::pipeline::{Pipeline, PipelineConfig, PipelineReport};
use crate::query::QueryService;
use crate::session::{ChatTurn, LastSearch, SessionStore};
use crate::store::ChunkMetadata;

/// Header carrying the token issued by `/login`.
pub const SESSION_HEADER: &str = "x-session-token";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    sessions: Arc<SessionStore>,
    query: QueryService,
    completion: Arc<dyn CompletionService>,
    pipeline_config: Arc<PipelineConfig>,
    run_lock: Arc<Mutex<()>>,
    embedding_cache: Option<Arc<Mutex<LruCache<String, Vec<f32>>>>>,
    default_top_k: usize,
    max_top_k: usize,
}

impl AppState {
    /// Builds state around a query service, completion service and pipeline paths.
    ///
    /// `embedding_cache_size == 0` disables the query-embedding cache.
    pub fn new(
        query: QueryService,
        completion: Arc<dyn CompletionService>,
        pipeline_config: PipelineConfig,
        embedding_cache_size: usize,
        default_top_k: usize,
        max_top_k: usize,
    ) -> Self {
        let max_top_k = max_top_k.max(1);
        Self {
            sessions: Arc::new(SessionStore::new()),
            query,
            completion,
            pipeline_config: Arc::new(pipeline_config),
            run_lock: Arc::new(Mutex::new(())),
            embedding_cache: build_cache(embedding_cache_size),
            default_top_k: default_top_k.clamp(1, max_top_k),
            max_top_k,
        }
    }

    /// Lock held for the duration of a `/pipeline` run.
    pub fn run_lock(&self) -> &Arc<Mutex<()>> {
        &self.run_lock
    }

    fn top_k(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_top_k)
            .clamp(1, self.max_top_k)
    }
}

/// Router with every front-end route.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/search", post(search_handler))
        .route("/chat", post(chat_handler))
        .route("/chat/history", get(history_handler))
        .route("/pipeline", post(pipeline_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    query: String,
    results: Vec<ChunkMetadata>,
    latency_ms: f64,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    question: String,
    #[serde(default)]
    top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    question: String,
    answer: String,
    sources: Vec<ChunkMetadata>,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    username: String,
    chat_history: Vec<ChatTurn>,
    last_search: Option<LastSearch>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    match state
        .sessions
        .login(request.username.trim(), &request.password)
        .await
    {
        Some(token) => {
            info!(username = %request.username.trim(), "login");
            Ok(Json(LoginResponse { token }))
        }
        None => Err(unauthorized("Invalid username or password")),
    }
}

async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = session_token(&headers)?;
    if state.sessions.logout(&token).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(unauthorized("unknown session"))
    }
}

async fn search_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let token = require_session(&state, &headers).await?;
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err(bad_request("query text must not be empty"));
    }
    let top_k = state.top_k(request.top_k);
    let start = Instant::now();
    let results = search(&state, &query, top_k)
        .await
        .map_err(internal_error)?;
    state
        .sessions
        .with_session(&token, |session| {
            session.record_search(query.clone(), results.clone())
        })
        .await;
    Ok(Json(SearchResponse {
        query,
        results,
        latency_ms: start.elapsed().as_secs_f64() * 1000.0,
    }))
}

async fn chat_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let token = require_session(&state, &headers).await?;
    let question = request.question.trim().to_string();
    if question.is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    let top_k = state.top_k(request.top_k);
    let sources = search(&state, &question, top_k)
        .await
        .map_err(internal_error)?;
    let reply = answer(&question, &sources, state.completion.as_ref()).await;
    state
        .sessions
        .with_session(&token, |session| {
            session.record_chat(question.clone(), reply.clone())
        })
        .await;
    Ok(Json(ChatResponse {
        question,
        answer: reply,
        sources,
    }))
}

async fn history_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<HistoryResponse>, ApiError> {
    let token = session_token(&headers)?;
    let session = state
        .sessions
        .get(&token)
        .await
        .ok_or_else(|| unauthorized("please log in"))?;
    Ok(Json(HistoryResponse {
        username: session.username,
        chat_history: session.chat_history,
        last_search: session.last_search,
    }))
}

async fn pipeline_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<PipelineReport>), ApiError> {
    require_session(&state, &headers).await?;
    let Ok(_guard) = state.run_lock.try_lock() else {
        return Err((
            StatusCode::CONFLICT,
            Json(ErrorBody {
                message: "a pipeline run is already in progress".into(),
            }),
        ));
    };
    let pipeline = Pipeline::new(
        state.pipeline_config.as_ref().clone(),
        state.query.store().as_ref(),
        state.query.embedder().as_ref(),
    );
    let report = pipeline.run().await;
    let status = if report.succeeded() {
        StatusCode::OK
    } else {
        warn!("pipeline run failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(report)))
}

async fn search(state: &AppState, query: &str, top_k: usize) -> Result<Vec<ChunkMetadata>> {
    let embedding = embed_query(state, query).await?;
    state.query.query_embedding(&embedding, top_k).await
}

async fn embed_query(state: &AppState, query: &str) -> Result<Vec<f32>> {
    if let Some(cache) = &state.embedding_cache {
        if let Some(hit) = cache.lock().await.get(query).cloned() {
            return Ok(hit);
        }
    }
    let embedding = embed_one(state.query.embedder().as_ref(), query).await?;
    if let Some(cache) = &state.embedding_cache {
        cache.lock().await.put(query.to_string(), embedding.clone());
    }
    Ok(embedding)
}

async fn require_session(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    let token = session_token(headers)?;
    if state.sessions.get(&token).await.is_none() {
        return Err(unauthorized("please log in"));
    }
    Ok(token)
}

fn session_token(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| unauthorized("missing session token"))
}

fn build_cache(size: usize) -> Option<Arc<Mutex<LruCache<String, Vec<f32>>>>> {
    NonZeroUsize::new(size).map(|capacity| Arc::new(Mutex::new(LruCache::new(capacity))))
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            message: message.into(),
        }),
    )
}

fn unauthorized(message: impl Into<String>) -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody {
            message: message.into(),
        }),
    )
}

fn internal_error(err: anyhow::Error) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            message: format!("{err:#}"),
        }),
    )
}
