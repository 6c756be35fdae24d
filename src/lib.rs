pub mod api;
pub mod auth;
pub mod calculator;
pub mod config;
pub mod db;
pub mod error;
pub mod listing;
pub mod price;
pub mod types;
