//! Dashboard HTTP API.
//!
//! A JSON API over the dashboard query and the write operations the
//! dashboard offers (highlights, keyword registration, ad deletion,
//! collection trigger). The UI keeps its own view state and sends it whole
//! with every `POST /api/query`.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `POST`   | `/api/query` | Run a dashboard query |
//! | `GET`    | `/api/keywords` | List keyword registrations |
//! | `POST`   | `/api/keywords` | Register a keyword |
//! | `DELETE` | `/api/keywords/{query}` | Unregister a keyword |
//! | `GET`    | `/api/highlights` | List highlights, newest first |
//! | `POST`   | `/api/highlights` | Highlight an ad |
//! | `DELETE` | `/api/highlights/{id}` | Remove a highlight |
//! | `DELETE` | `/api/ads/{identity}` | Delete every stored copy of an ad |
//! | `POST`   | `/api/collect/{keyword}` | Start a collection run (202) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid keyword registration: query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a locally served UI
//! can call the API.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use adshelf_core::error::CoreError;
use adshelf_core::filter::{AdvertiserSelection, DateRange};
use adshelf_core::models::{Ad, Highlight, KeywordRegistration};
use adshelf_core::query::{run_query, QueryResponse, View, ViewRequest};
use adshelf_core::store::{AddOutcome, DeleteOutcome, RemoveOutcome};

use crate::collect;
use crate::config::Config;
use crate::keywords;
use crate::stores::{self, Stores};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    stores: Stores,
}

impl AppState {
    pub fn new(config: Config, stores: Stores) -> Self {
        Self {
            config: Arc::new(config),
            stores,
        }
    }
}

/// Build the API router. Separate from [`run_server`] so tests can drive it
/// in-process.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/query", post(handle_query))
        .route(
            "/api/keywords",
            get(handle_list_keywords).post(handle_add_keyword),
        )
        .route("/api/keywords/{query}", delete(handle_remove_keyword))
        .route(
            "/api/highlights",
            get(handle_list_highlights).post(handle_add_highlight),
        )
        .route("/api/highlights/{id}", delete(handle_remove_highlight))
        .route("/api/ads/{identity}", delete(handle_delete_ad))
        .route("/api/collect/{keyword}", post(handle_collect))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Open the configured backend and serve until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let stores = stores::open(config).await?;
    let app = router(AppState::new(config.clone(), stores));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(backend = %config.store.backend, "dashboard API listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

/// Domain errors are the caller's fault; anything else is ours.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(core) = err.downcast_ref::<CoreError>() {
            return bad_request(core.to_string());
        }
        tracing::error!(error = %format!("{:#}", err), "request failed");
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

#[derive(Serialize)]
struct StatusBody {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
}

impl StatusBody {
    fn new(status: &'static str) -> Self {
        Self {
            status,
            id: None,
            count: None,
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/query ============

/// Wire form of a view request. Omitted paging fields take the configured
/// defaults.
#[derive(Deserialize, Default)]
#[serde(default)]
struct QueryRequest {
    view: View,
    keyword: Option<String>,
    date_range: DateRange,
    advertiser_selection: AdvertiserSelection,
    keyword_selection: Vec<String>,
    page_number: Option<usize>,
    page_size: Option<usize>,
}

async fn handle_query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(body) = body?;
    let req = ViewRequest {
        view: body.view,
        keyword: body.keyword,
        date_range: body.date_range,
        advertiser_selection: body.advertiser_selection,
        keyword_selection: body.keyword_selection,
        page_number: body.page_number.unwrap_or(1).max(1),
        page_size: state.config.dashboard.effective_page_size(body.page_size),
    };
    let resp = run_query(
        state.stores.ads.as_ref(),
        state.stores.highlights.as_ref(),
        &req,
    )
    .await;
    Ok(Json(resp))
}

// ============ /api/keywords ============

async fn handle_list_keywords(
    State(state): State<AppState>,
) -> Result<Json<Vec<KeywordRegistration>>, AppError> {
    Ok(Json(state.stores.ads.load_registrations().await?))
}

#[derive(Deserialize)]
struct AddKeywordRequest {
    query: String,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    limit: Option<u32>,
}

async fn handle_add_keyword(
    State(state): State<AppState>,
    body: Result<Json<AddKeywordRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StatusBody>), AppError> {
    let Json(body) = body?;
    let created = keywords::add(
        state.stores.ads.as_ref(),
        &body.query,
        body.country.as_deref(),
        body.limit,
    )
    .await?;

    let mut resp = StatusBody::new(if created { "created" } else { "already_exists" });
    resp.id = Some(body.query.trim().to_string());
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(resp)))
}

async fn handle_remove_keyword(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Result<Json<StatusBody>, AppError> {
    if !state.stores.ads.unregister_keyword(&query).await? {
        return Err(not_found(format!("keyword not registered: {}", query)));
    }
    Ok(Json(StatusBody::new("removed")))
}

// ============ /api/highlights ============

async fn handle_list_highlights(
    State(state): State<AppState>,
) -> Result<Json<Vec<Highlight>>, AppError> {
    Ok(Json(state.stores.highlights.list().await?))
}

async fn handle_add_highlight(
    State(state): State<AppState>,
    body: Result<Json<Ad>, JsonRejection>,
) -> Result<(StatusCode, Json<StatusBody>), AppError> {
    let Json(ad) = body?;
    let outcome = state.stores.highlights.add(&ad).await?;

    let (status, label) = match outcome {
        AddOutcome::Created => (StatusCode::CREATED, "created"),
        AddOutcome::AlreadyExists => (StatusCode::OK, "already_exists"),
    };
    let mut resp = StatusBody::new(label);
    resp.id = Some(ad.identity());
    Ok((status, Json(resp)))
}

async fn handle_remove_highlight(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusBody>, AppError> {
    match state.stores.highlights.remove(&id).await? {
        RemoveOutcome::Removed => Ok(Json(StatusBody::new("removed"))),
        RemoveOutcome::NotFound => Err(not_found(format!("no highlight with id: {}", id))),
    }
}

// ============ DELETE /api/ads/{identity} ============

async fn handle_delete_ad(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<StatusBody>, AppError> {
    match state.stores.ads.delete_ad(&identity).await? {
        DeleteOutcome::Deleted(n) => {
            let mut resp = StatusBody::new("deleted");
            resp.count = Some(n);
            Ok(Json(resp))
        }
        DeleteOutcome::NotFound => Err(not_found(format!("no ad with identity: {}", identity))),
    }
}

// ============ POST /api/collect/{keyword} ============

async fn handle_collect(
    State(state): State<AppState>,
    Path(keyword): Path<String>,
) -> Result<(StatusCode, Json<StatusBody>), AppError> {
    if state.config.collector.is_none() {
        return Err(bad_request("no [collector] command configured"));
    }
    if keyword.trim().is_empty() {
        return Err(bad_request("keyword must not be empty"));
    }
    collect::trigger(&state.config, &keyword)?;

    let mut resp = StatusBody::new("started");
    resp.id = Some(keyword.trim().to_string());
    Ok((StatusCode::ACCEPTED, Json(resp)))
}
