use super::common::{created, json_body, path_id, query_params, PaginationMeta};
use crate::{
    commands::stock_updates::BatchItemOutcome,
    entities::stock_update_request::{self, StockUpdateDecision, StockUpdateStatus},
    errors::ServiceError,
    services::stock_updates::{PendingGroup, PendingPage},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Grower proposal body
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitStockUpdateRequest {
    pub grower_id: Uuid,
    pub product_id: Uuid,
    #[serde(default)]
    pub variant_id: Option<Uuid>,
    /// Number or numeric string, >= 0
    #[schema(value_type = f64, example = 42)]
    pub new_stock: Value,
    #[serde(default)]
    #[schema(example = "recount")]
    pub reason: Option<String>,
}

/// Admin decision on one request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveStockUpdateRequest {
    pub status: StockUpdateDecision,
    #[schema(example = "admin-1")]
    pub approved_by: String,
    #[serde(default)]
    pub admin_comment: Option<String>,
}

/// Admin decision applied to several requests
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchResolveRequest {
    pub request_ids: Vec<Uuid>,
    pub status: StockUpdateDecision,
    pub approved_by: String,
    #[serde(default)]
    pub admin_comment: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PendingQuery {
    /// Only this grower's requests
    pub grower_id: Option<Uuid>,
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size, clamped to the configured maximum
    pub limit: Option<u64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PendingCountQuery {
    pub grower_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GrowerHistoryQuery {
    /// PENDING, APPROVED or REJECTED
    pub status: Option<StockUpdateStatus>,
}

/// Stock update request as exposed over HTTP
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdateRequestView {
    pub id: Uuid,
    pub grower_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub current_stock: f64,
    pub new_stock: f64,
    pub reason: Option<String>,
    pub status: StockUpdateStatus,
    pub approved_by: Option<String>,
    pub admin_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<stock_update_request::Model> for StockUpdateRequestView {
    fn from(model: stock_update_request::Model) -> Self {
        Self {
            id: model.id,
            grower_id: model.grower_id,
            product_id: model.product_id,
            variant_id: model.variant_id,
            current_stock: model.current_stock,
            new_stock: model.new_stock,
            reason: model.reason,
            status: model.status,
            approved_by: model.approved_by,
            admin_comment: model.admin_comment,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingPageView {
    pub items: Vec<StockUpdateRequestView>,
    pub pagination: PaginationMeta,
}

impl From<PendingPage> for PendingPageView {
    fn from(page: PendingPage) -> Self {
        Self {
            items: page.items.into_iter().map(Into::into).collect(),
            pagination: PaginationMeta::new(page.page, page.limit, page.total),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingGroupView {
    pub grower_id: Uuid,
    pub grower_name: String,
    pub count: usize,
    pub requests: Vec<StockUpdateRequestView>,
}

impl From<PendingGroup> for PendingGroupView {
    fn from(group: PendingGroup) -> Self {
        Self {
            grower_id: group.grower_id,
            grower_name: group.grower_name.clone(),
            count: group.count(),
            requests: group.requests.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingCountView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grower_id: Option<Uuid>,
    pub count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchErrorView {
    /// not_found, invalid_state, persistence_error, ...
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemView {
    pub request_id: Uuid,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<StockUpdateRequestView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BatchErrorView>,
}

impl From<BatchItemOutcome> for BatchItemView {
    fn from(outcome: BatchItemOutcome) -> Self {
        match outcome.result {
            Ok(request) => Self {
                request_id: outcome.request_id,
                ok: true,
                request: Some(request.into()),
                error: None,
            },
            Err(err) => Self {
                request_id: outcome.request_id,
                ok: false,
                request: None,
                error: Some(BatchErrorView {
                    kind: err.kind().to_string(),
                    message: err.response_message(),
                }),
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResolveView {
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItemView>,
}

/// Submit a stock update proposal
#[utoipa::path(
    post,
    path = "/api/v1/stock-updates",
    request_body = SubmitStockUpdateRequest,
    responses(
        (status = 201, description = "Request stored as PENDING", body = StockUpdateRequestView,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid quantity or payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown grower, product or variant", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-updates"
)]
pub async fn submit_stock_update(
    State(state): State<AppState>,
    payload: Result<Json<SubmitStockUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let body = json_body(payload)?;
    let saved = state
        .stock_updates
        .submit(
            body.grower_id,
            body.product_id,
            body.variant_id,
            &body.new_stock,
            body.reason,
        )
        .await?;

    Ok(created(
        StockUpdateRequestView::from(saved),
        "Stock update request submitted",
    ))
}

/// Validation queue
#[utoipa::path(
    get,
    path = "/api/v1/stock-updates/pending",
    params(PendingQuery),
    responses(
        (status = 200, description = "PENDING requests, most recent first", body = PendingPageView),
        (status = 400, description = "Invalid query", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-updates"
)]
pub async fn list_pending(
    State(state): State<AppState>,
    query: Result<Query<PendingQuery>, QueryRejection>,
) -> ApiResult<PendingPageView> {
    let query = query_params(query)?;
    let page = state
        .stock_updates
        .list_pending_page(query.grower_id, query.page.unwrap_or(1), query.limit)
        .await?;

    Ok(Json(ApiResponse::success(PendingPageView::from(page))))
}

/// Validation queue grouped by grower
#[utoipa::path(
    get,
    path = "/api/v1/stock-updates/pending/by-grower",
    responses(
        (status = 200, description = "One group per grower with pending requests", body = [PendingGroupView]),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-updates"
)]
pub async fn list_pending_by_grower(
    State(state): State<AppState>,
) -> ApiResult<Vec<PendingGroupView>> {
    let groups = state.stock_updates.pending_by_grower().await?;
    Ok(Json(ApiResponse::success(
        groups.into_iter().map(Into::into).collect(),
    )))
}

/// Number of PENDING requests
#[utoipa::path(
    get,
    path = "/api/v1/stock-updates/pending/count",
    params(PendingCountQuery),
    responses(
        (status = 200, description = "Pending count", body = PendingCountView),
        (status = 400, description = "Invalid query", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-updates"
)]
pub async fn pending_count(
    State(state): State<AppState>,
    query: Result<Query<PendingCountQuery>, QueryRejection>,
) -> ApiResult<PendingCountView> {
    let query = query_params(query)?;
    let count = state.stock_updates.pending_count(query.grower_id).await?;
    Ok(Json(ApiResponse::success(PendingCountView {
        grower_id: query.grower_id,
        count,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock-updates/{id}",
    params(("id" = Uuid, Path, description = "Stock update request id")),
    responses(
        (status = 200, description = "Request found", body = StockUpdateRequestView),
        (status = 400, description = "Malformed id", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-updates"
)]
pub async fn get_stock_update(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StockUpdateRequestView> {
    let id = path_id(id)?;
    let request = state.stock_updates.get(id).await?;
    Ok(Json(ApiResponse::success(StockUpdateRequestView::from(
        request,
    ))))
}

/// Approve or reject one request
#[utoipa::path(
    patch,
    path = "/api/v1/stock-updates/{id}",
    params(("id" = Uuid, Path, description = "Stock update request id")),
    request_body = ResolveStockUpdateRequest,
    responses(
        (status = 200, description = "Request resolved", body = StockUpdateRequestView),
        (status = 400, description = "Invalid decision or admin", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Request is no longer PENDING", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-updates"
)]
pub async fn resolve_stock_update(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ResolveStockUpdateRequest>, JsonRejection>,
) -> ApiResult<StockUpdateRequestView> {
    let id = path_id(id)?;
    let body = json_body(payload)?;
    let resolved = state
        .stock_updates
        .resolve(id, body.status, &body.approved_by, body.admin_comment)
        .await?;

    let message = format!("Stock update request {}", resolved.status);
    Ok(Json(
        ApiResponse::success(StockUpdateRequestView::from(resolved)).with_message(&message),
    ))
}

/// Approve or reject several requests, each independently
#[utoipa::path(
    post,
    path = "/api/v1/stock-updates/batch",
    request_body = BatchResolveRequest,
    responses(
        (status = 200, description = "Per-request outcomes", body = BatchResolveView),
        (status = 400, description = "Empty or oversized batch", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-updates"
)]
pub async fn resolve_stock_updates_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchResolveRequest>, JsonRejection>,
) -> ApiResult<BatchResolveView> {
    let body = json_body(payload)?;
    let outcomes = state
        .stock_updates
        .resolve_many(
            body.request_ids,
            body.status,
            &body.approved_by,
            body.admin_comment,
        )
        .await?;

    let results: Vec<BatchItemView> = outcomes.into_iter().map(Into::into).collect();
    let succeeded = results.iter().filter(|r| r.ok).count();
    Ok(Json(ApiResponse::success(BatchResolveView {
        succeeded,
        failed: results.len() - succeeded,
        results,
    })))
}

/// A grower's own requests
#[utoipa::path(
    get,
    path = "/api/v1/growers/{id}/stock-updates",
    params(("id" = Uuid, Path, description = "Grower id"), GrowerHistoryQuery),
    responses(
        (status = 200, description = "Requests, most recent first", body = [StockUpdateRequestView]),
        (status = 404, description = "Unknown grower", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-updates"
)]
pub async fn list_grower_stock_updates(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<GrowerHistoryQuery>, QueryRejection>,
) -> ApiResult<Vec<StockUpdateRequestView>> {
    let grower_id = path_id(id)?;
    let query = query_params(query)?;
    let requests = state
        .stock_updates
        .list_for_grower(grower_id, query.status)
        .await?;

    Ok(Json(ApiResponse::success(
        requests.into_iter().map(Into::into).collect(),
    )))
}
