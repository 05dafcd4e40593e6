use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::current_state;
use crate::domain::order::{CancelOutcome, PaymentMethod};
use crate::domain::pricing::{CarOptions, ServiceType};
use crate::engine::OrderingEngine;
use crate::error::{AppResult, ErrorResponse};
use crate::render::ClientSnapshot;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ServiceRequest {
    pub service: ServiceType,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentMethodRequest {
    #[schema(example = "QRIS")]
    pub method: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NoteRequest {
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VisibilityRequest {
    pub visible: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelResponse {
    pub result: CancelOutcome,
    pub state: ClientSnapshot,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub ui_state: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service hidup", body = HealthStatus))
)]
pub async fn health_check(State(engine): State<OrderingEngine>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        ui_state: engine.snapshot().lifecycle.ui.to_string(),
    })
}

// Potret state untuk halaman
#[utoipa::path(
    get,
    path = "/api/state",
    tag = "order",
    responses((status = 200, description = "State halaman order", body = ClientSnapshot))
)]
pub async fn get_state(State(engine): State<OrderingEngine>) -> Json<ClientSnapshot> {
    current_state(&engine)
}

#[utoipa::path(
    post,
    path = "/api/service",
    tag = "order",
    request_body = ServiceRequest,
    responses(
        (status = 200, description = "Layanan diganti", body = ClientSnapshot),
        (status = 409, description = "Order sedang berjalan", body = ErrorResponse),
    )
)]
pub async fn set_service(
    State(engine): State<OrderingEngine>,
    Json(payload): Json<ServiceRequest>,
) -> AppResult<Json<ClientSnapshot>> {
    engine.set_service(payload.service)?;
    Ok(current_state(&engine))
}

#[utoipa::path(
    post,
    path = "/api/car-options",
    tag = "order",
    request_body = CarOptions,
    responses(
        (status = 200, description = "Opsi mobil disimpan", body = ClientSnapshot),
        (status = 400, description = "Jumlah kursi tidak valid", body = ErrorResponse),
    )
)]
pub async fn set_car_options(
    State(engine): State<OrderingEngine>,
    Json(payload): Json<CarOptions>,
) -> AppResult<Json<ClientSnapshot>> {
    engine.set_car_options(payload)?;
    Ok(current_state(&engine))
}

#[utoipa::path(
    post,
    path = "/api/payment-method",
    tag = "order",
    request_body = PaymentMethodRequest,
    responses(
        (status = 200, description = "Metode pembayaran dipilih", body = ClientSnapshot),
        (status = 400, description = "Metode tidak dikenal", body = ErrorResponse),
    )
)]
pub async fn set_payment_method(
    State(engine): State<OrderingEngine>,
    Json(payload): Json<PaymentMethodRequest>,
) -> AppResult<Json<ClientSnapshot>> {
    let method: PaymentMethod = payload
        .method
        .parse()
        .map_err(crate::error::AppError::validation)?;
    engine.set_payment_method(method)?;
    Ok(current_state(&engine))
}

#[utoipa::path(
    post,
    path = "/api/note",
    tag = "order",
    request_body = NoteRequest,
    responses((status = 200, description = "Catatan disimpan", body = ClientSnapshot))
)]
pub async fn set_note(
    State(engine): State<OrderingEngine>,
    Json(payload): Json<NoteRequest>,
) -> AppResult<Json<ClientSnapshot>> {
    engine.set_note(payload.note)?;
    Ok(current_state(&engine))
}

// Kirim order dengan harga terkonfirmasi
#[utoipa::path(
    post,
    path = "/api/orders/submit",
    tag = "order",
    responses(
        (status = 200, description = "Order dibuat", body = ClientSnapshot),
        (status = 400, description = "Data order belum lengkap", body = ErrorResponse),
        (status = 401, description = "Session habis", body = ErrorResponse),
        (status = 422, description = "Rute melebihi batas layanan", body = ErrorResponse),
        (status = 502, description = "Harga belum bisa dikonfirmasi / backend menolak order", body = ErrorResponse),
    )
)]
pub async fn submit_order(State(engine): State<OrderingEngine>) -> AppResult<Json<ClientSnapshot>> {
    let record = engine.submit_order().await?;
    tracing::info!("✅ Order {} dibuat ({})", record.short_id(), record.status);
    Ok(current_state(&engine))
}

#[utoipa::path(
    post,
    path = "/api/orders/cancel",
    tag = "order",
    responses(
        (status = 200, description = "Order dibatalkan", body = CancelResponse),
        (status = 404, description = "Tidak ada order aktif", body = ErrorResponse),
        (status = 409, description = "Pembatalan sedang diproses", body = ErrorResponse),
    )
)]
pub async fn cancel_order(State(engine): State<OrderingEngine>) -> AppResult<Json<CancelResponse>> {
    let result = engine.cancel_order().await?;
    let Json(state) = current_state(&engine);
    Ok(Json(CancelResponse { result, state }))
}

// Tombol "Saya sudah bayar"
#[utoipa::path(
    post,
    path = "/api/payments/confirm",
    tag = "payment",
    responses(
        (status = 200, description = "Pembayaran sedang dicek", body = ClientSnapshot),
        (status = 409, description = "Tidak ada pembayaran menunggu / waktu habis", body = ErrorResponse),
    )
)]
pub async fn confirm_payment(State(engine): State<OrderingEngine>) -> AppResult<Json<ClientSnapshot>> {
    engine.confirm_payment().await?;
    Ok(current_state(&engine))
}

#[utoipa::path(
    post,
    path = "/api/qris/close",
    tag = "payment",
    responses((status = 200, description = "Modal QRIS ditutup", body = ClientSnapshot))
)]
pub async fn close_qris(State(engine): State<OrderingEngine>) -> Json<ClientSnapshot> {
    engine.close_qris().await;
    current_state(&engine)
}

#[utoipa::path(
    post,
    path = "/api/visibility",
    tag = "system",
    request_body = VisibilityRequest,
    responses((status = 200, description = "Visibilitas halaman dicatat", body = ClientSnapshot))
)]
pub async fn set_visibility(
    State(engine): State<OrderingEngine>,
    Json(payload): Json<VisibilityRequest>,
) -> Json<ClientSnapshot> {
    engine.set_visibility(payload.visible);
    current_state(&engine)
}

#[utoipa::path(
    post,
    path = "/api/banner/dismiss",
    tag = "order",
    responses((status = 200, description = "Banner ditutup", body = ClientSnapshot))
)]
pub async fn dismiss_banner(State(engine): State<OrderingEngine>) -> Json<ClientSnapshot> {
    engine.dismiss_banner();
    current_state(&engine)
}
