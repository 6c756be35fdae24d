pub mod health;
pub mod latency;
pub mod routes;
pub mod stocks;

pub use routes::{router, AppState};
