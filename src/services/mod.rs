pub mod catalog;
pub mod stock_updates;
