pub mod resolve_stock_update_command;
pub mod resolve_stock_updates_batch_command;
pub mod submit_stock_update_command;

pub use resolve_stock_update_command::ResolveStockUpdateCommand;
pub use resolve_stock_updates_batch_command::{BatchItemOutcome, ResolveStockUpdatesBatchCommand};
pub use submit_stock_update_command::SubmitStockUpdateCommand;

use crate::{
    entities::{product, product_variant, stock_update_request::StockTarget},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use validator::ValidationError;

/// Reads the live stock of a product or variant.
pub async fn read_live_stock<C: ConnectionTrait>(
    conn: &C,
    target: StockTarget,
) -> Result<f64, ServiceError> {
    match target {
        StockTarget::Product(id) => product::Entity::find_by_id(id)
            .one(conn)
            .await?
            .map(|p| p.stock)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id))),
        StockTarget::Variant(id) => product_variant::Entity::find_by_id(id)
            .one(conn)
            .await?
            .map(|v| v.stock)
            .ok_or_else(|| ServiceError::NotFound(format!("Product variant {} not found", id))),
    }
}

/// Overwrites the live stock of a product or variant.
pub(crate) async fn write_live_stock<C: ConnectionTrait>(
    conn: &C,
    target: StockTarget,
    quantity: f64,
) -> Result<(), ServiceError> {
    let now = Utc::now();
    let result = match target {
        StockTarget::Product(id) => {
            product::Entity::update_many()
                .col_expr(product::Column::Stock, Expr::value(quantity))
                .col_expr(product::Column::UpdatedAt, Expr::value(now))
                .filter(product::Column::Id.eq(id))
                .exec(conn)
                .await?
        }
        StockTarget::Variant(id) => {
            product_variant::Entity::update_many()
                .col_expr(product_variant::Column::Stock, Expr::value(quantity))
                .col_expr(product_variant::Column::UpdatedAt, Expr::value(now))
                .filter(product_variant::Column::Id.eq(id))
                .exec(conn)
                .await?
        }
    };

    if result.rows_affected == 0 {
        return Err(ServiceError::NotFound(format!(
            "Stock record {:?} no longer exists",
            target
        )));
    }
    Ok(())
}

fn validate_quantity(quantity: f64) -> Result<(), ValidationError> {
    if quantity.is_finite() && quantity >= 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("stock_quantity");
        err.message = Some("stock quantity must be a finite number >= 0".into());
        Err(err)
    }
}
