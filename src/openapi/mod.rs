use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Grower Stock API",
        version = "0.1.0",
        description = r#"
# Grower Stock Update API

Growers propose new stock quantities for their products; admins review the
validation queue and approve or reject each proposal.

## Lifecycle

```
PENDING --approve--> APPROVED
PENDING --reject---> REJECTED
```

Approval overwrites the live stock of the product (or variant) with the
proposed quantity. Both outcomes are final.

## Error Handling

```json
{
  "error": "Conflict",
  "message": "Invalid state: stock update request ... is already APPROVED",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

`GET /api/v1/stock-updates/pending` accepts `page` (default 1) and `limit`
(default 20, max 100).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "stock-updates", description = "Stock update submission and validation queue"),
        (name = "catalog", description = "Growers, products and variants owning live stock")
    ),
    paths(
        // Stock updates
        crate::handlers::stock_updates::submit_stock_update,
        crate::handlers::stock_updates::list_pending,
        crate::handlers::stock_updates::list_pending_by_grower,
        crate::handlers::stock_updates::pending_count,
        crate::handlers::stock_updates::get_stock_update,
        crate::handlers::stock_updates::resolve_stock_update,
        crate::handlers::stock_updates::resolve_stock_updates_batch,
        crate::handlers::stock_updates::list_grower_stock_updates,

        // Catalog
        crate::handlers::catalog::create_grower,
        crate::handlers::catalog::get_grower,
        crate::handlers::catalog::create_product,
        crate::handlers::catalog::get_product,
        crate::handlers::catalog::create_variant,
    ),
    components(
        schemas(
            // Stock updates
            crate::entities::StockUpdateStatus,
            crate::entities::StockUpdateDecision,
            crate::handlers::stock_updates::SubmitStockUpdateRequest,
            crate::handlers::stock_updates::ResolveStockUpdateRequest,
            crate::handlers::stock_updates::BatchResolveRequest,
            crate::handlers::stock_updates::StockUpdateRequestView,
            crate::handlers::stock_updates::PendingPageView,
            crate::handlers::stock_updates::PendingGroupView,
            crate::handlers::stock_updates::PendingCountView,
            crate::handlers::stock_updates::BatchItemView,
            crate::handlers::stock_updates::BatchErrorView,
            crate::handlers::stock_updates::BatchResolveView,
            crate::handlers::common::PaginationMeta,

            // Catalog
            crate::handlers::catalog::CreateGrowerRequest,
            crate::handlers::catalog::CreateProductRequest,
            crate::handlers::catalog::CreateVariantRequest,
            crate::handlers::catalog::GrowerView,
            crate::handlers::catalog::ProductView,
            crate::handlers::catalog::VariantView,

            // Error types
            crate::errors::ErrorResponse,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
