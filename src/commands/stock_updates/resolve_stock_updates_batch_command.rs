use super::ResolveStockUpdateCommand;
use crate::{
    commands::Command,
    db::DbPool,
    entities::stock_update_request::{self, StockUpdateDecision},
    errors::ServiceError,
    events::EventSender,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Resolves many requests with the same decision.
///
/// Best effort: every id is resolved on its own, and one failure never
/// blocks or undoes the others.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResolveStockUpdatesBatchCommand {
    #[validate(length(min = 1, message = "requestIds must not be empty"))]
    pub request_ids: Vec<Uuid>,
    pub decision: StockUpdateDecision,
    #[validate(length(min = 1, max = 255))]
    pub approved_by: String,
    #[validate(length(min = 1))]
    pub admin_comment: Option<String>,
    #[serde(default)]
    pub reject_stale: bool,
    pub max_batch_size: usize,
}

/// Result of one id inside a batch
#[derive(Debug)]
pub struct BatchItemOutcome {
    pub request_id: Uuid,
    pub result: Result<stock_update_request::Model, ServiceError>,
}

impl BatchItemOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[async_trait::async_trait]
impl Command for ResolveStockUpdatesBatchCommand {
    type Result = Vec<BatchItemOutcome>;

    #[instrument(skip(self, db_pool, event_sender), fields(decision = %self.decision, size = self.request_ids.len()))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(format!("Invalid batch resolution: {}", e)))?;

        let ids = self.unique_ids();
        if ids.len() > self.max_batch_size {
            return Err(ServiceError::ValidationError(format!(
                "at most {} request ids can be resolved at once, got {}",
                self.max_batch_size,
                ids.len()
            )));
        }

        let mut outcomes = Vec::with_capacity(ids.len());
        for request_id in ids {
            let single = ResolveStockUpdateCommand {
                request_id,
                decision: self.decision,
                approved_by: self.approved_by.clone(),
                admin_comment: self.admin_comment.clone(),
                reject_stale: self.reject_stale,
            };

            let result = single
                .execute(db_pool.clone(), event_sender.clone())
                .await;
            if let Err(e) = &result {
                warn!(%request_id, error = %e, "Batch item failed");
            }
            outcomes.push(BatchItemOutcome { request_id, result });
        }

        let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
        let failed = outcomes.len() - succeeded;
        counter!("grower_stock.stock_updates.batches", 1);
        info!(succeeded, failed, "Batch resolution finished");

        Ok(outcomes)
    }
}

impl ResolveStockUpdatesBatchCommand {
    /// Input order, first occurrence wins.
    fn unique_ids(&self) -> Vec<Uuid> {
        let mut seen = HashSet::with_capacity(self.request_ids.len());
        self.request_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }
}
