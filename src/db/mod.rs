pub mod models;
pub mod repo;

pub use repo::{connect, StockRepo};
