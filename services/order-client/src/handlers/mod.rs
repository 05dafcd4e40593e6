pub mod location_handler;
pub mod order_handler;
pub mod session_handler;

use axum::Json;

use crate::domain::location::Field;
use crate::engine::OrderingEngine;
use crate::error::{AppError, AppResult};
use crate::render::{render, ClientSnapshot};

// Semua handler menjawab dengan potret state terbaru
pub(crate) fn current_state(engine: &OrderingEngine) -> Json<ClientSnapshot> {
    Json(render(&engine.snapshot()))
}

pub(crate) fn parse_field(raw: &str) -> AppResult<Field> {
    Field::parse(raw).ok_or_else(|| AppError::not_found(format!("Field lokasi '{}' tidak dikenal", raw)))
}
