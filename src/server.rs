//! HTTP JSON API over the submission flow.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/languages` | Language options offered to contributors |
//! | `GET`  | `/items/{category}` | Stored items, newest first |
//! | `POST` | `/check` | Duplicate preview, nothing saved |
//! | `POST` | `/submit` | Submit a contribution |
//! | `GET`  | `/export/{category}?format=csv\|json` | Download the corpus |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "please enter the text before submitting" } }
//! ```
//!
//! Error codes: `bad_request` (400), `duplicate` (409), `save_failed` (500),
//! `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser form can
//! post directly.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::browse;
use crate::config::Config;
use crate::embedding::SharedEmbedder;
use crate::error::SubmitError;
use crate::export::{self, ExportFormat};
use crate::models::{Category, Item, LANGUAGE_OPTIONS, OTHER_LANGUAGE};
use crate::store::{self, CorpusStore};
use crate::submit::{CheckReport, Collector, Outcome, SubmitReport, SubmitRequest};

#[derive(Clone)]
struct AppState {
    collector: Arc<Collector>,
}

/// Open the configured store and serve the API on `[server].bind`.
///
/// The embedding model is loaded on the first check, not at startup.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = store::open_store(&config.store).await?;
    store.prepare().await?;

    let collector = Collector::new(
        store,
        SharedEmbedder::new(config.embedding.clone()),
        config.dedup.clone(),
    );

    let app = router(Arc::new(collector));

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "server listening");
    println!("Local Wisdom API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router around an existing collector.
pub fn router(collector: Arc<Collector>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/languages", get(handle_languages))
        .route("/items/{category}", get(handle_items))
        .route("/check", post(handle_check))
        .route("/submit", post(handle_submit))
        .route("/export/{category}", get(handle_export))
        .layer(cors)
        .with_state(AppState { collector })
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
    code: String,
    message: String,
}

impl IntoResponse for AppError {
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

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<SubmitError> for AppError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::EmptyText => bad_request(err.to_string()),
            SubmitError::SaveFailed { ref source, .. } => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "save_failed".to_string(),
                message: format!("{}: {:#}", err, source),
            },
        }
    }
}

fn parse_category(raw: &str) -> Result<Category, AppError> {
    raw.parse::<Category>()
        .map_err(|e| bad_request(e.to_string()))
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

// ============ GET /languages ============

#[derive(Serialize)]
struct LanguagesResponse {
    options: Vec<&'static str>,
    other: &'static str,
}

async fn handle_languages() -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        options: LANGUAGE_OPTIONS.to_vec(),
        other: OTHER_LANGUAGE,
    })
}

// ============ GET /items/{category} ============

#[derive(Serialize)]
struct ItemsResponse {
    category: Category,
    items: Vec<Item>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

async fn handle_items(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<ItemsResponse>, AppError> {
    let category = parse_category(&category)?;
    let store: &dyn CorpusStore = state.collector.store().as_ref();

    let (items, warning) = match browse::list_items(store, category).await {
        Ok(items) => (items, None),
        Err(e) => (
            Vec::new(),
            Some(format!("could not load {}: {:#}", category.plural(), e)),
        ),
    };

    Ok(Json(ItemsResponse {
        category,
        items,
        warning,
    }))
}

// ============ POST /check ============

#[derive(Deserialize)]
struct CheckRequest {
    category: Category,
    text: String,
}

async fn handle_check(
    State(state): State<AppState>,
    Json(req): Json<CheckRequest>,
) -> Result<Json<CheckReport>, AppError> {
    let report = state.collector.preview(req.category, &req.text).await?;
    Ok(Json(report))
}

// ============ POST /submit ============

/// 201 when saved, 409 when blocked as a duplicate. The body is the
/// submission report in both cases.
async fn handle_submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let category = req.category;
    let report: SubmitReport = state.collector.submit(req).await?;

    let status = match report.outcome {
        Outcome::Accepted => StatusCode::CREATED,
        Outcome::Blocked => StatusCode::CONFLICT,
    };

    let mut body = serde_json::to_value(&report).map_err(|e| internal_error(e.to_string()))?;
    if report.outcome == Outcome::Blocked {
        let matched = report.verdict.matched_text.clone().unwrap_or_default();
        body["error"] = serde_json::json!({
            "code": "duplicate",
            "message": format!(
                "a very similar {} already exists: {}",
                category.label().to_lowercase(),
                matched
            ),
        });
    }

    Ok((status, Json(body)))
}

// ============ GET /export/{category} ============

#[derive(Deserialize)]
struct ExportQuery {
    #[serde(default)]
    format: Option<String>,
}

async fn handle_export(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let category = parse_category(&category)?;
    let format = match query.format.as_deref() {
        Some(raw) => raw
            .parse::<ExportFormat>()
            .map_err(|e| bad_request(e.to_string()))?,
        None => ExportFormat::default(),
    };

    let items = state
        .collector
        .store()
        .load_all(category)
        .await
        .map_err(|e| internal_error(format!("could not load {}: {:#}", category.plural(), e)))?;

    let body = export::render(&items, format).map_err(|e| internal_error(e.to_string()))?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::default_file_name(category, format)
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
