use crate::{
    commands::stock_updates::read_live_stock,
    common::{normalize_text, parse_stock_quantity, require_text},
    db::{DatabaseAccess, DbPool},
    entities::{grower, product, product_variant, stock_update_request::StockTarget},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const MAX_NAME_LENGTH: usize = 255;

/// A product together with its variants
#[derive(Debug, Clone)]
pub struct ProductWithVariants {
    pub product: product::Model,
    pub variants: Vec<product_variant::Model>,
}

/// Owns the canonical stock records the validation workflow writes to
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
    db: DatabaseAccess,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            db: DatabaseAccess::new(db_pool.clone()),
            db_pool,
        }
    }

    #[instrument(skip(self))]
    pub async fn create_grower(
        &self,
        name: &str,
        email: Option<String>,
    ) -> Result<grower::Model, ServiceError> {
        let now = Utc::now();
        let model = grower::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(require_text(name, "name", MAX_NAME_LENGTH)?),
            email: Set(normalize_text(email, "email", MAX_NAME_LENGTH)?),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let saved = model.insert(self.db_pool.as_ref()).await?;
        info!(grower_id = %saved.id, "Grower created");
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn get_grower(&self, id: Uuid) -> Result<grower::Model, ServiceError> {
        self.db
            .execute("catalog.get_grower", |db| grower::Entity::find_by_id(id).one(db))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Grower {} not found", id)))
    }

    /// Creates a product for an existing grower. Stock defaults to 0.
    #[instrument(skip(self, stock))]
    pub async fn create_product(
        &self,
        grower_id: Uuid,
        name: &str,
        stock: Option<&Value>,
    ) -> Result<product::Model, ServiceError> {
        let name = require_text(name, "name", MAX_NAME_LENGTH)?;
        let stock = initial_stock(stock)?;
        self.get_grower(grower_id).await?;

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            grower_id: Set(grower_id),
            name: Set(name),
            stock: Set(stock),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let saved = model.insert(self.db_pool.as_ref()).await?;
        info!(product_id = %saved.id, %grower_id, "Product created");
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<ProductWithVariants, ServiceError> {
        let product = self
            .db
            .execute("catalog.get_product", |db| product::Entity::find_by_id(id).one(db))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        let variants = self
            .db
            .execute("catalog.list_variants", |db| {
                product_variant::Entity::find()
                    .filter(product_variant::Column::ProductId.eq(id))
                    .order_by_asc(product_variant::Column::CreatedAt)
                    .all(db)
            })
            .await?;

        Ok(ProductWithVariants { product, variants })
    }

    #[instrument(skip(self, stock))]
    pub async fn create_variant(
        &self,
        product_id: Uuid,
        name: &str,
        stock: Option<&Value>,
    ) -> Result<product_variant::Model, ServiceError> {
        let name = require_text(name, "name", MAX_NAME_LENGTH)?;
        let stock = initial_stock(stock)?;
        self.db
            .execute("catalog.get_product", |db| {
                product::Entity::find_by_id(product_id).one(db)
            })
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let now = Utc::now();
        let model = product_variant::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            name: Set(name),
            stock: Set(stock),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let saved = model.insert(self.db_pool.as_ref()).await?;
        info!(variant_id = %saved.id, %product_id, "Product variant created");
        Ok(saved)
    }

    /// Current stock of a variant, or of the product when no variant is given
    #[instrument(skip(self))]
    pub async fn live_stock(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
    ) -> Result<f64, ServiceError> {
        let db = self.db_pool.as_ref();
        match variant_id {
            Some(variant_id) => {
                let variant = product_variant::Entity::find_by_id(variant_id)
                    .one(db)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product variant {} not found", variant_id))
                    })?;
                if variant.product_id != product_id {
                    return Err(ServiceError::ValidationError(format!(
                        "Variant {} does not belong to product {}",
                        variant_id, product_id
                    )));
                }
                Ok(variant.stock)
            }
            None => read_live_stock(db, StockTarget::Product(product_id)).await,
        }
    }
}

fn initial_stock(stock: Option<&Value>) -> Result<f64, ServiceError> {
    match stock {
        None | Some(Value::Null) => Ok(0.0),
        Some(value) => parse_stock_quantity(value, "stock"),
    }
}
