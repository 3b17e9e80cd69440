use crate::{
    commands::{
        stock_updates::{
            BatchItemOutcome, ResolveStockUpdateCommand, ResolveStockUpdatesBatchCommand,
            SubmitStockUpdateCommand,
        },
        Command,
    },
    common::{normalize_text, parse_stock_quantity, require_text},
    config::AppConfig,
    db::{DatabaseAccess, DbPool},
    entities::{
        grower,
        stock_update_request::{self, StockUpdateDecision, StockUpdateStatus},
    },
    errors::ServiceError,
    events::EventSender,
};
use sea_orm::{
    ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Select,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

const MAX_ADMIN_NAME_LENGTH: usize = 255;

/// Tunables of the validation workflow, taken from [`AppConfig`]
#[derive(Debug, Clone)]
pub struct StockUpdatePolicy {
    pub max_reason_length: usize,
    pub reject_stale_requests: bool,
    pub batch_max_size: usize,
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for StockUpdatePolicy {
    fn default() -> Self {
        Self {
            max_reason_length: 500,
            reject_stale_requests: false,
            batch_max_size: 200,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl From<&AppConfig> for StockUpdatePolicy {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            max_reason_length: cfg.max_reason_length,
            reject_stale_requests: cfg.reject_stale_requests,
            batch_max_size: cfg.batch_max_size,
            default_page_size: cfg.api_default_page_size,
            max_page_size: cfg.api_max_page_size,
        }
    }
}

impl StockUpdatePolicy {
    fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

/// One page of the validation queue
#[derive(Debug, Clone)]
pub struct PendingPage {
    pub items: Vec<stock_update_request::Model>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Pending requests of one grower, as shown in the admin queue
#[derive(Debug, Clone)]
pub struct PendingGroup {
    pub grower_id: Uuid,
    pub grower_name: String,
    pub requests: Vec<stock_update_request::Model>,
}

impl PendingGroup {
    pub fn count(&self) -> usize {
        self.requests.len()
    }
}

/// Service for the grower stock-update workflow
#[derive(Clone)]
pub struct StockUpdateService {
    db_pool: Arc<DbPool>,
    db: DatabaseAccess,
    event_sender: Arc<EventSender>,
    policy: StockUpdatePolicy,
}

impl StockUpdateService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        policy: StockUpdatePolicy,
    ) -> Self {
        Self {
            db: DatabaseAccess::new(db_pool.clone()),
            db_pool,
            event_sender,
            policy,
        }
    }

    pub fn policy(&self) -> &StockUpdatePolicy {
        &self.policy
    }

    /// Records a grower's proposal as a PENDING request
    #[instrument(skip(self, new_stock, reason))]
    pub async fn submit(
        &self,
        grower_id: Uuid,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        new_stock: &Value,
        reason: Option<String>,
    ) -> Result<stock_update_request::Model, ServiceError> {
        let command = SubmitStockUpdateCommand {
            grower_id,
            product_id,
            variant_id,
            new_stock: parse_stock_quantity(new_stock, "newStock")?,
            reason: normalize_text(reason, "reason", self.policy.max_reason_length)?,
        };

        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Every PENDING request, most recent first
    #[instrument(skip(self))]
    pub async fn list_pending(
        &self,
        grower_id: Option<Uuid>,
    ) -> Result<Vec<stock_update_request::Model>, ServiceError> {
        let query = pending_query(grower_id);
        self.db
            .execute("stock_updates.list_pending", |db| query.all(db))
            .await
    }

    /// One page of the validation queue. `page` is 1-based.
    #[instrument(skip(self))]
    pub async fn list_pending_page(
        &self,
        grower_id: Option<Uuid>,
        page: u64,
        limit: Option<u64>,
    ) -> Result<PendingPage, ServiceError> {
        let page = page.max(1);
        let limit = self.policy.page_size(limit);
        if (page - 1)
            .checked_mul(limit)
            .map_or(true, |offset| offset > i64::MAX as u64)
        {
            return Err(ServiceError::ValidationError(format!(
                "page {page} is out of range"
            )));
        }
        let query = pending_query(grower_id);

        let (items, total) = self
            .db
            .execute("stock_updates.list_pending_page", |db| async move {
                let paginator = query.paginate(db, limit);
                let total = paginator.num_items().await?;
                let items = paginator.fetch_page(page - 1).await?;
                Ok::<_, DbErr>((items, total))
            })
            .await?;

        Ok(PendingPage {
            items,
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit),
        })
    }

    /// Pending requests grouped by grower. Groups follow their most recent request.
    #[instrument(skip(self))]
    pub async fn pending_by_grower(&self) -> Result<Vec<PendingGroup>, ServiceError> {
        let pending = self.list_pending(None).await?;

        let mut grower_ids: Vec<Uuid> = Vec::new();
        let mut grouped: HashMap<Uuid, Vec<stock_update_request::Model>> = HashMap::new();
        for request in pending {
            if !grouped.contains_key(&request.grower_id) {
                grower_ids.push(request.grower_id);
            }
            grouped.entry(request.grower_id).or_default().push(request);
        }

        if grower_ids.is_empty() {
            return Ok(Vec::new());
        }

        let lookup = grower_ids.clone();
        let names: HashMap<Uuid, String> = self
            .db
            .execute("stock_updates.pending_growers", |db| {
                grower::Entity::find()
                    .filter(grower::Column::Id.is_in(lookup))
                    .all(db)
            })
            .await?
            .into_iter()
            .map(|g| (g.id, g.name))
            .collect();

        Ok(grower_ids
            .into_iter()
            .map(|grower_id| PendingGroup {
                grower_id,
                grower_name: names.get(&grower_id).cloned().unwrap_or_default(),
                requests: grouped.remove(&grower_id).unwrap_or_default(),
            })
            .collect())
    }

    /// Size of the validation queue, optionally for one grower
    #[instrument(skip(self))]
    pub async fn pending_count(&self, grower_id: Option<Uuid>) -> Result<u64, ServiceError> {
        let query = pending_query(grower_id);
        self.db
            .execute("stock_updates.pending_count", |db| query.count(db))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<stock_update_request::Model, ServiceError> {
        self.db
            .execute("stock_updates.get", |db| {
                stock_update_request::Entity::find_by_id(id).one(db)
            })
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock update request {} not found", id)))
    }

    /// A grower's own requests, most recent first
    #[instrument(skip(self))]
    pub async fn list_for_grower(
        &self,
        grower_id: Uuid,
        status: Option<StockUpdateStatus>,
    ) -> Result<Vec<stock_update_request::Model>, ServiceError> {
        self.db
            .execute("stock_updates.grower_exists", |db| {
                grower::Entity::find_by_id(grower_id).one(db)
            })
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Grower {} not found", grower_id)))?;

        let mut query = stock_update_request::Entity::find()
            .filter(stock_update_request::Column::GrowerId.eq(grower_id));
        if let Some(status) = status {
            query = query.filter(stock_update_request::Column::Status.eq(status));
        }
        let query = query.order_by_desc(stock_update_request::Column::CreatedAt);

        self.db
            .execute("stock_updates.list_for_grower", |db| query.all(db))
            .await
    }

    /// Approves or rejects one PENDING request
    #[instrument(skip(self, admin_comment))]
    pub async fn resolve(
        &self,
        request_id: Uuid,
        decision: StockUpdateDecision,
        approved_by: &str,
        admin_comment: Option<String>,
    ) -> Result<stock_update_request::Model, ServiceError> {
        let command = ResolveStockUpdateCommand {
            request_id,
            decision,
            approved_by: require_text(approved_by, "approvedBy", MAX_ADMIN_NAME_LENGTH)?,
            admin_comment: normalize_text(
                admin_comment,
                "adminComment",
                self.policy.max_reason_length,
            )?,
            reject_stale: self.policy.reject_stale_requests,
        };

        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Resolves each id independently and reports one outcome per distinct id
    #[instrument(skip(self, request_ids, admin_comment), fields(size = request_ids.len()))]
    pub async fn resolve_many(
        &self,
        request_ids: Vec<Uuid>,
        decision: StockUpdateDecision,
        approved_by: &str,
        admin_comment: Option<String>,
    ) -> Result<Vec<BatchItemOutcome>, ServiceError> {
        let command = ResolveStockUpdatesBatchCommand {
            request_ids,
            decision,
            approved_by: require_text(approved_by, "approvedBy", MAX_ADMIN_NAME_LENGTH)?,
            admin_comment: normalize_text(
                admin_comment,
                "adminComment",
                self.policy.max_reason_length,
            )?,
            reject_stale: self.policy.reject_stale_requests,
            max_batch_size: self.policy.batch_max_size,
        };

        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }
}

fn pending_query(grower_id: Option<Uuid>) -> Select<stock_update_request::Entity> {
    let mut query = stock_update_request::Entity::find()
        .filter(stock_update_request::Column::Status.eq(StockUpdateStatus::Pending));
    if let Some(grower_id) = grower_id {
        query = query.filter(stock_update_request::Column::GrowerId.eq(grower_id));
    }
    query.order_by_desc(stock_update_request::Column::CreatedAt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_page_size_is_clamped() {
        let policy = StockUpdatePolicy::default();
        assert_eq!(policy.page_size(None), 20);
        assert_eq!(policy.page_size(Some(0)), 1);
        assert_eq!(policy.page_size(Some(1_000)), 100);
    }

    #[test]
    fn policy_follows_app_config() {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "development".into(),
        );
        cfg.reject_stale_requests = true;
        cfg.batch_max_size = 3;

        let policy = StockUpdatePolicy::from(&cfg);
        assert!(policy.reject_stale_requests);
        assert_eq!(policy.batch_max_size, 3);
        assert_eq!(policy.max_reason_length, 500);
    }
}
