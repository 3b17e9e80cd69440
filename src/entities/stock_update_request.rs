use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::Display;
use utoipa::ToSchema;

/// Lifecycle of a stock update request.
///
/// `Pending` is the only non-terminal state; a request leaves it exactly once.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StockUpdateStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

impl StockUpdateStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StockUpdateStatus::Pending)
    }

    /// PENDING -> APPROVED | REJECTED, nothing else.
    pub fn can_transition_to(&self, next: StockUpdateStatus) -> bool {
        matches!(
            (self, next),
            (StockUpdateStatus::Pending, StockUpdateStatus::Approved)
                | (StockUpdateStatus::Pending, StockUpdateStatus::Rejected)
        )
    }
}

/// Admin decision on a pending request. PENDING is not a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StockUpdateDecision {
    Approved,
    Rejected,
}

impl From<StockUpdateDecision> for StockUpdateStatus {
    fn from(decision: StockUpdateDecision) -> Self {
        match decision {
            StockUpdateDecision::Approved => StockUpdateStatus::Approved,
            StockUpdateDecision::Rejected => StockUpdateStatus::Rejected,
        }
    }
}

/// Where an approved quantity is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockTarget {
    Product(Uuid),
    Variant(Uuid),
}

/// The `stock_update_requests` table. Rows are never deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_update_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Grower who submitted the request
    pub grower_id: Uuid,

    pub product_id: Uuid,

    /// Set when the update targets a single variant
    #[sea_orm(nullable)]
    pub variant_id: Option<Uuid>,

    /// Live stock snapshot taken at submission. Informational only.
    #[sea_orm(column_type = "Double")]
    pub current_stock: f64,

    /// Proposed quantity
    #[sea_orm(column_type = "Double")]
    pub new_stock: f64,

    #[sea_orm(column_type = "Text", nullable)]
    pub reason: Option<String>,

    pub status: StockUpdateStatus,

    /// Admin who resolved the request (both outcomes)
    #[sea_orm(nullable)]
    pub approved_by: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub admin_comment: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_pending(&self) -> bool {
        self.status == StockUpdateStatus::Pending
    }

    pub fn target(&self) -> StockTarget {
        match self.variant_id {
            Some(variant_id) => StockTarget::Variant(variant_id),
            None => StockTarget::Product(self.product_id),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::grower::Entity",
        from = "Column::GrowerId",
        to = "super::grower::Column::Id"
    )]
    Grower,
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::product_variant::Entity",
        from = "Column::VariantId",
        to = "super::product_variant::Column::Id"
    )]
    Variant,
}

impl Related<super::grower::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Grower.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
