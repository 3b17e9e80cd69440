use super::validate_quantity;
use crate::{
    commands::Command,
    db::DbPool,
    entities::{
        grower, product, product_variant,
        stock_update_request::{self, StockUpdateStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

/// A grower proposes a new stock quantity. The live stock is not touched.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitStockUpdateCommand {
    pub grower_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    #[validate(custom = "validate_quantity")]
    pub new_stock: f64,
    #[validate(length(min = 1))]
    pub reason: Option<String>,
}

#[async_trait::async_trait]
impl Command for SubmitStockUpdateCommand {
    type Result = stock_update_request::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(grower_id = %self.grower_id, product_id = %self.product_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            counter!("grower_stock.stock_updates.submit_failures", 1, "error_type" => "validation_error");
            ServiceError::ValidationError(format!("Invalid stock update: {}", e))
        })?;

        let saved = self.insert_pending(db_pool.as_ref()).await.map_err(|e| {
            counter!("grower_stock.stock_updates.submit_failures", 1, "error_type" => e.kind());
            e
        })?;

        event_sender
            .send_or_log(Event::StockUpdateRequested {
                request_id: saved.id,
                grower_id: saved.grower_id,
                product_id: saved.product_id,
                variant_id: saved.variant_id,
                current_stock: saved.current_stock,
                new_stock: saved.new_stock,
                occurred_at: saved.created_at,
            })
            .await;

        counter!("grower_stock.stock_updates.submitted", 1);
        info!(
            request_id = %saved.id,
            current_stock = saved.current_stock,
            new_stock = saved.new_stock,
            "Stock update request submitted"
        );

        Ok(saved)
    }
}

impl SubmitStockUpdateCommand {
    async fn insert_pending(
        &self,
        db: &DbPool,
    ) -> Result<stock_update_request::Model, ServiceError> {
        let command = self.clone();

        db.transaction::<_, stock_update_request::Model, ServiceError>(|txn| {
            Box::pin(async move {
                grower::Entity::find_by_id(command.grower_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Grower {} not found", command.grower_id))
                    })?;

                let product = product::Entity::find_by_id(command.product_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product {} not found", command.product_id))
                    })?;

                if product.grower_id != command.grower_id {
                    return Err(ServiceError::ValidationError(format!(
                        "Product {} does not belong to grower {}",
                        product.id, command.grower_id
                    )));
                }

                let current_stock = match command.variant_id {
                    Some(variant_id) => {
                        let variant = product_variant::Entity::find_by_id(variant_id)
                            .one(txn)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::NotFound(format!(
                                    "Product variant {} not found",
                                    variant_id
                                ))
                            })?;
                        if variant.product_id != product.id {
                            return Err(ServiceError::ValidationError(format!(
                                "Variant {} does not belong to product {}",
                                variant_id, product.id
                            )));
                        }
                        variant.stock
                    }
                    None => {
                        let variants = product_variant::Entity::find()
                            .filter(product_variant::Column::ProductId.eq(product.id))
                            .count(txn)
                            .await?;
                        if variants > 0 {
                            return Err(ServiceError::ValidationError(format!(
                                "Product {} has variants; variantId is required",
                                product.id
                            )));
                        }
                        product.stock
                    }
                };

                let now = Utc::now();
                let request = stock_update_request::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    grower_id: Set(command.grower_id),
                    product_id: Set(command.product_id),
                    variant_id: Set(command.variant_id),
                    current_stock: Set(current_stock),
                    new_stock: Set(command.new_stock),
                    reason: Set(command.reason.clone()),
                    status: Set(StockUpdateStatus::Pending),
                    approved_by: Set(None),
                    admin_comment: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                };

                let saved = request.insert(txn).await.map_err(|e| {
                    error!("Failed to insert stock update request: {}", e);
                    ServiceError::DatabaseError(e)
                })?;

                Ok(saved)
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }
}
