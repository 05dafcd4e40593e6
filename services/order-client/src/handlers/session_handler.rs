use axum::{extract::State, Json};

use super::current_state;
use crate::domain::session::MagicLinkVerifyRequest;
use crate::engine::OrderingEngine;
use crate::error::{AppResult, ErrorResponse};
use crate::render::ClientSnapshot;

// Verifikasi magic link, simpan session, lalu pulihkan order aktif
#[utoipa::path(
    post,
    path = "/api/session/verify",
    tag = "session",
    request_body = MagicLinkVerifyRequest,
    responses(
        (status = 200, description = "Login berhasil", body = ClientSnapshot),
        (status = 400, description = "Token kosong", body = ErrorResponse),
        (status = 401, description = "Token tidak valid / kedaluwarsa", body = ErrorResponse),
    )
)]
pub async fn verify_session(
    State(engine): State<OrderingEngine>,
    Json(payload): Json<MagicLinkVerifyRequest>,
) -> AppResult<Json<ClientSnapshot>> {
    engine.verify_session(payload.token).await?;
    Ok(current_state(&engine))
}
