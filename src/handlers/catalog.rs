use super::common::{created, json_body, path_id, validate_input};
use crate::{
    entities::{grower, product, product_variant},
    errors::ServiceError,
    services::catalog::ProductWithVariants,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGrowerRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub grower_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Initial stock, defaults to 0
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub stock: Option<Value>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVariantRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    pub stock: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrowerView {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<grower::Model> for GrowerView {
    fn from(model: grower::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VariantView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub stock: f64,
    pub updated_at: DateTime<Utc>,
}

impl From<product_variant::Model> for VariantView {
    fn from(model: product_variant::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            name: model.name,
            stock: model.stock,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: Uuid,
    pub grower_id: Uuid,
    pub name: String,
    pub stock: f64,
    pub variants: Vec<VariantView>,
    pub updated_at: DateTime<Utc>,
}

impl ProductView {
    fn without_variants(model: product::Model) -> Self {
        Self {
            id: model.id,
            grower_id: model.grower_id,
            name: model.name,
            stock: model.stock,
            variants: Vec::new(),
            updated_at: model.updated_at,
        }
    }
}

impl From<ProductWithVariants> for ProductView {
    fn from(value: ProductWithVariants) -> Self {
        let mut view = Self::without_variants(value.product);
        view.variants = value.variants.into_iter().map(Into::into).collect();
        view
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/growers",
    request_body = CreateGrowerRequest,
    responses(
        (status = 201, description = "Grower created", body = GrowerView),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn create_grower(
    State(state): State<AppState>,
    payload: Result<Json<CreateGrowerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let body = json_body(payload)?;
    validate_input(&body)?;
    let grower = state.catalog.create_grower(&body.name, body.email).await?;
    Ok(created(GrowerView::from(grower), "Grower created"))
}

#[utoipa::path(
    get,
    path = "/api/v1/growers/{id}",
    params(("id" = Uuid, Path, description = "Grower id")),
    responses(
        (status = 200, description = "Grower found", body = GrowerView),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn get_grower(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<GrowerView> {
    let grower = state.catalog.get_grower(path_id(id)?).await?;
    Ok(Json(ApiResponse::success(GrowerView::from(grower))))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductView),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown grower", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let body = json_body(payload)?;
    validate_input(&body)?;
    let product = state
        .catalog
        .create_product(body.grower_id, &body.name, body.stock.as_ref())
        .await?;
    Ok(created(ProductView::without_variants(product), "Product created"))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product with its variants", body = ProductView),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<ProductView> {
    let product = state.catalog.get_product(path_id(id)?).await?;
    Ok(Json(ApiResponse::success(ProductView::from(product))))
}

#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/variants",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = CreateVariantRequest,
    responses(
        (status = 201, description = "Variant created", body = VariantView),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn create_variant(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CreateVariantRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let product_id = path_id(id)?;
    let body = json_body(payload)?;
    validate_input(&body)?;
    let variant = state
        .catalog
        .create_variant(product_id, &body.name, body.stock.as_ref())
        .await?;
    Ok(created(VariantView::from(variant), "Variant created"))
}
