//! Grower Stock API Library
//!
//! Stock-update validation workflow for a farmers-market platform: growers
//! propose new stock quantities, admins approve or reject them from a queue.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod commands;
pub mod common;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use services::{
    catalog::CatalogService,
    stock_updates::{StockUpdatePolicy, StockUpdateService},
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub stock_updates: Arc<StockUpdateService>,
    pub catalog: Arc<CatalogService>,
}

impl AppState {
    /// Wires the services on top of a connection pool and an event channel
    pub fn new(db: Arc<db::DbPool>, config: config::AppConfig, event_sender: events::EventSender) -> Self {
        let event_sender = Arc::new(event_sender);
        let stock_updates = Arc::new(StockUpdateService::new(
            db.clone(),
            event_sender.clone(),
            StockUpdatePolicy::from(&config),
        ));
        let catalog = Arc::new(CatalogService::new(db.clone()));

        Self {
            db,
            config,
            event_sender,
            stock_updates,
            catalog,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }
}



/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes mounted under `/api/v1`
pub fn api_v1_routes() -> Router<AppState> {
    let stock_updates = Router::new()
        .route(
            "/stock-updates",
            post(handlers::stock_updates::submit_stock_update),
        )
        .route(
            "/stock-updates/pending",
            get(handlers::stock_updates::list_pending),
        )
        .route(
            "/stock-updates/pending/by-grower",
            get(handlers::stock_updates::list_pending_by_grower),
        )
        .route(
            "/stock-updates/pending/count",
            get(handlers::stock_updates::pending_count),
        )
        .route(
            "/stock-updates/batch",
            post(handlers::stock_updates::resolve_stock_updates_batch),
        )
        .route(
            "/stock-updates/:id",
            get(handlers::stock_updates::get_stock_update)
                .patch(handlers::stock_updates::resolve_stock_update),
        )
        .route(
            "/growers/:id/stock-updates",
            get(handlers::stock_updates::list_grower_stock_updates),
        );

    let catalog = Router::new()
        .route("/growers", post(handlers::catalog::create_grower))
        .route("/growers/:id", get(handlers::catalog::get_grower))
        .route("/products", post(handlers::catalog::create_product))
        .route("/products/:id", get(handlers::catalog::get_product))
        .route(
            "/products/:id/variants",
            post(handlers::catalog::create_variant),
        );

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(stock_updates)
        .merge(catalog)
}

/// Full application router without deployment-specific layers (CORS, compression)
pub fn app_router(state: AppState) -> Router {
    let router = Router::<AppState>::new()
        .route("/", get(|| async { "grower-stock-api up" }))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui());
    with_request_layers(router).with_state(state)
}

/// Request id outermost, then a single `http.request` span around the access log.
fn with_request_layers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(axum::middleware::from_fn(request_logging_middleware))
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
}

async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "grower-stock-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": state.config.environment,
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };
    let pending = state.stock_updates.pending_count(None).await.ok();

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "pending_stock_updates": pending,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

// Request logging middleware
async fn request_logging_middleware(
    request: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    ::tracing::debug!(method = %method, uri = %uri, "Incoming request");

    let response = next.run(request).await;

    ::tracing::info!(
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}

pub mod prelude {
    pub use crate::db::*;
    pub use crate::entities::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::services::*;
}
