// BANTU JEG - Order Client
// Engine pemesanan (lokasi, rute, harga, order, QRIS) + binding HTTP lokal
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod integrations;
pub mod render;
pub mod routes;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use config::{AppConfig, AppState, EngineConfig};
pub use engine::OrderingEngine;
pub use error::{AppError, AppResult};
