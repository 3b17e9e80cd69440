use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product entity. `stock` is the live quantity for products sold without variants.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning grower
    pub grower_id: Uuid,

    /// Display name
    pub name: String,

    /// Live stock quantity
    #[sea_orm(column_type = "Double")]
    pub stock: f64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::grower::Entity",
        from = "Column::GrowerId",
        to = "super::grower::Column::Id"
    )]
    Grower,
    #[sea_orm(has_many = "super::product_variant::Entity")]
    Variants,
}

impl Related<super::grower::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Grower.def()
    }
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
