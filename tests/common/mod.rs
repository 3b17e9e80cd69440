use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use grower_stock_api::{
    config::AppConfig,
    db,
    entities::{grower, product, product_variant},
    events::{Event, EventSender},
    services::{catalog::CatalogService, stock_updates::StockUpdateService},
    AppState,
};

/// Helper harness for spinning up the full router backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    events: Mutex<mpsc::Receiver<Event>>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Same as `new`, letting the caller tune the configuration first.
    pub async fn with_config(tune: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // Every connection to sqlite::memory: opens its own database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.event_channel_capacity = 1024;
        tune(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
        let state = AppState::new(Arc::new(pool), cfg, EventSender::new(event_tx));
        let router = grower_stock_api::app_router(state.clone());

        Self {
            router,
            state,
            events: Mutex::new(event_rx),
        }
    }

    pub fn stock_updates(&self) -> Arc<StockUpdateService> {
        self.state.stock_updates.clone()
    }

    pub fn catalog(&self) -> Arc<CatalogService> {
        self.state.catalog.clone()
    }

    /// Events emitted so far, in order.
    #[allow(dead_code)]
    pub async fn drain_events(&self) -> Vec<Event> {
        let mut rx = self.events.lock().await;
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Send a request against the router.
    #[allow(dead_code)]
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request_with_headers(method, uri, body, &[]).await
    }

    #[allow(dead_code)]
    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a request and decodes the JSON body.
    #[allow(dead_code)]
    pub async fn request_json(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn seed_grower(&self, name: &str) -> grower::Model {
        self.catalog()
            .create_grower(name, None)
            .await
            .expect("seed grower for tests")
    }

    pub async fn seed_product(&self, grower_id: Uuid, name: &str, stock: f64) -> product::Model {
        self.catalog()
            .create_product(grower_id, name, Some(&json!(stock)))
            .await
            .expect("seed product for tests")
    }

    #[allow(dead_code)]
    pub async fn seed_variant(
        &self,
        product_id: Uuid,
        name: &str,
        stock: f64,
    ) -> product_variant::Model {
        self.catalog()
            .create_variant(product_id, name, Some(&json!(stock)))
            .await
            .expect("seed product variant for tests")
    }

    /// Grower with one variant-less product.
    #[allow(dead_code)]
    pub async fn seed_simple_product(&self, stock: f64) -> (grower::Model, product::Model) {
        let grower = self.seed_grower("Green Acres").await;
        let product = self.seed_product(grower.id, "Tomatoes", stock).await;
        (grower, product)
    }
}

/// Collects a response body into JSON (`Null` for an empty body).
#[allow(dead_code)]
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("response body is not JSON")
}
