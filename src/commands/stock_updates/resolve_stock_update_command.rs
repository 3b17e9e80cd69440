use super::{read_live_stock, write_live_stock};
use crate::{
    commands::Command,
    db::DbPool,
    entities::stock_update_request::{self, StockUpdateDecision, StockUpdateStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveEnum, ColumnTrait, EntityTrait, QueryFilter, TransactionError,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Moves one PENDING request to APPROVED or REJECTED.
///
/// On approval the proposed quantity overwrites the live stock. Both writes
/// share one transaction and the status write only matches PENDING rows, so
/// a request is resolved at most once even under concurrent admins.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResolveStockUpdateCommand {
    pub request_id: Uuid,
    pub decision: StockUpdateDecision,
    #[validate(length(min = 1, max = 255))]
    pub approved_by: String,
    #[validate(length(min = 1))]
    pub admin_comment: Option<String>,
    /// Fail instead of overwriting when the live stock drifted since submission
    #[serde(default)]
    pub reject_stale: bool,
}

struct Resolution {
    request: stock_update_request::Model,
    previous_stock: Option<f64>,
}

#[async_trait::async_trait]
impl Command for ResolveStockUpdateCommand {
    type Result = stock_update_request::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(request_id = %self.request_id, decision = %self.decision))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            counter!("grower_stock.stock_updates.resolve_failures", 1, "error_type" => "validation_error");
            ServiceError::ValidationError(format!("Invalid resolution: {}", e))
        })?;

        let resolution = self.apply(db_pool.as_ref()).await.map_err(|e| {
            counter!("grower_stock.stock_updates.resolve_failures", 1, "error_type" => e.kind());
            e
        })?;

        self.publish(&event_sender, &resolution).await;

        counter!("grower_stock.stock_updates.resolved", 1, "decision" => self.decision.to_string());
        info!(
            request_id = %resolution.request.id,
            status = %resolution.request.status,
            approved_by = self.approved_by.as_str(),
            "Stock update request resolved"
        );

        Ok(resolution.request)
    }
}

impl ResolveStockUpdateCommand {
    async fn apply(&self, db: &DbPool) -> Result<Resolution, ServiceError> {
        let command = self.clone();

        db.transaction::<_, Resolution, ServiceError>(|txn| {
            Box::pin(async move {
                let request = stock_update_request::Entity::find_by_id(command.request_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!(
                            "Stock update request {} not found",
                            command.request_id
                        ))
                    })?;

                let next: StockUpdateStatus = command.decision.into();
                if !request.status.can_transition_to(next) {
                    return Err(ServiceError::InvalidState(format!(
                        "stock update request {} is already {}",
                        request.id, request.status
                    )));
                }

                let previous_stock = match command.decision {
                    StockUpdateDecision::Approved => {
                        let target = request.target();
                        let live = read_live_stock(txn, target).await?;
                        if live != request.current_stock {
                            if command.reject_stale {
                                return Err(ServiceError::InvalidState(format!(
                                    "stock changed since request {} was submitted (snapshot {}, live {})",
                                    request.id, request.current_stock, live
                                )));
                            }
                            warn!(
                                request_id = %request.id,
                                snapshot = request.current_stock,
                                live,
                                new_stock = request.new_stock,
                                "Live stock drifted since submission; overwriting"
                            );
                        }
                        write_live_stock(txn, target, request.new_stock).await?;
                        Some(live)
                    }
                    StockUpdateDecision::Rejected => None,
                };

                let updated = stock_update_request::Entity::update_many()
                    .col_expr(
                        stock_update_request::Column::Status,
                        Expr::value(next.to_value()),
                    )
                    .col_expr(
                        stock_update_request::Column::ApprovedBy,
                        Expr::value(Some(command.approved_by.clone())),
                    )
                    .col_expr(
                        stock_update_request::Column::AdminComment,
                        Expr::value(command.admin_comment.clone()),
                    )
                    .col_expr(stock_update_request::Column::UpdatedAt, Expr::value(Utc::now()))
                    .filter(stock_update_request::Column::Id.eq(request.id))
                    .filter(
                        stock_update_request::Column::Status
                            .eq(StockUpdateStatus::Pending.to_value()),
                    )
                    .exec(txn)
                    .await?;

                // Another admin won the race; rolling back undoes the stock write.
                if updated.rows_affected == 0 {
                    return Err(ServiceError::InvalidState(format!(
                        "stock update request {} was resolved concurrently",
                        request.id
                    )));
                }

                let request = stock_update_request::Entity::find_by_id(request.id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "stock update request {} vanished during resolution",
                            request.id
                        ))
                    })?;

                Ok(Resolution {
                    request,
                    previous_stock,
                })
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }

    async fn publish(&self, event_sender: &EventSender, resolution: &Resolution) {
        let request = &resolution.request;
        let event = match self.decision {
            StockUpdateDecision::Approved => Event::StockUpdateApproved {
                request_id: request.id,
                grower_id: request.grower_id,
                product_id: request.product_id,
                variant_id: request.variant_id,
                previous_stock: resolution.previous_stock.unwrap_or(request.current_stock),
                new_stock: request.new_stock,
                approved_by: self.approved_by.clone(),
                occurred_at: request.updated_at,
            },
            StockUpdateDecision::Rejected => Event::StockUpdateRejected {
                request_id: request.id,
                grower_id: request.grower_id,
                rejected_by: self.approved_by.clone(),
                admin_comment: request.admin_comment.clone(),
                occurred_at: request.updated_at,
            },
        };
        event_sender.send_or_log(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approved_by_is_required() {
        let cmd = ResolveStockUpdateCommand {
            request_id: Uuid::new_v4(),
            decision: StockUpdateDecision::Approved,
            approved_by: String::new(),
            admin_comment: None,
            reject_stale: false,
        };
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn decision_deserializes_from_wire_names() {
        let cmd: ResolveStockUpdateCommand = serde_json::from_value(serde_json::json!({
            "request_id": Uuid::nil(),
            "decision": "APPROVED",
            "approved_by": "admin-1",
            "admin_comment": null
        }))
        .unwrap();
        assert_eq!(cmd.decision, StockUpdateDecision::Approved);
        assert!(!cmd.reject_stale);
    }
}
