pub mod grower;
pub mod product;
pub mod product_variant;
pub mod stock_update_request;

pub use stock_update_request::{StockUpdateDecision, StockUpdateStatus};
