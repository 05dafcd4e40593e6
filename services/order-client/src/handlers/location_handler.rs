use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::{current_state, parse_field};
use crate::domain::location::{Coordinates, LocationInput};
use crate::engine::OrderingEngine;
use crate::error::{AppResult, ErrorResponse};
use crate::render::ClientSnapshot;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddressTextRequest {
    #[schema(example = "Jl. Diponegoro No. 52, Salatiga")]
    pub address: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GpsFixRequest {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PickerOpenRequest {
    #[schema(example = "dropoff")]
    pub field: String,
}

// Isi titik dari autocomplete / GPS
#[utoipa::path(
    put,
    path = "/api/locations/{field}",
    tag = "locations",
    params(("field" = String, Path, description = "pickup atau dropoff")),
    request_body = LocationInput,
    responses(
        (status = 200, description = "Titik tersimpan", body = ClientSnapshot),
        (status = 400, description = "Koordinat / alamat tidak valid", body = ErrorResponse),
        (status = 409, description = "Picker terbuka atau order sedang berjalan", body = ErrorResponse),
    )
)]
pub async fn set_location(
    State(engine): State<OrderingEngine>,
    Path(field): Path<String>,
    Json(payload): Json<LocationInput>,
) -> AppResult<Json<ClientSnapshot>> {
    let field = parse_field(&field)?;
    engine.set_location(field, payload).await?;
    Ok(current_state(&engine))
}

// Alamat diketik manual tanpa pilih saran
#[utoipa::path(
    post,
    path = "/api/locations/{field}/address",
    tag = "locations",
    params(("field" = String, Path, description = "pickup atau dropoff")),
    request_body = AddressTextRequest,
    responses(
        (status = 200, description = "Alamat ditemukan dan disimpan", body = ClientSnapshot),
        (status = 502, description = "Layanan peta bermasalah", body = ErrorResponse),
    )
)]
pub async fn set_address_text(
    State(engine): State<OrderingEngine>,
    Path(field): Path<String>,
    Json(payload): Json<AddressTextRequest>,
) -> AppResult<Json<ClientSnapshot>> {
    let field = parse_field(&field)?;
    engine.set_address_text(field, payload.address).await?;
    Ok(current_state(&engine))
}

#[utoipa::path(
    post,
    path = "/api/locations/{field}/gps",
    tag = "locations",
    params(("field" = String, Path, description = "pickup atau dropoff")),
    request_body = GpsFixRequest,
    responses(
        (status = 200, description = "Lokasi GPS dipakai", body = ClientSnapshot),
        (status = 409, description = "Titik manual harus dihapus dulu", body = ErrorResponse),
    )
)]
pub async fn use_gps(
    State(engine): State<OrderingEngine>,
    Path(field): Path<String>,
    Json(payload): Json<GpsFixRequest>,
) -> AppResult<Json<ClientSnapshot>> {
    let field = parse_field(&field)?;
    engine
        .use_gps(field, Coordinates::new(payload.lat, payload.lng), payload.address)
        .await?;
    Ok(current_state(&engine))
}

#[utoipa::path(
    delete,
    path = "/api/locations/{field}",
    tag = "locations",
    params(("field" = String, Path, description = "pickup atau dropoff")),
    responses(
        (status = 200, description = "Titik dihapus", body = ClientSnapshot),
        (status = 409, description = "Order sedang berjalan", body = ErrorResponse),
    )
)]
pub async fn clear_location(
    State(engine): State<OrderingEngine>,
    Path(field): Path<String>,
) -> AppResult<Json<ClientSnapshot>> {
    let field = parse_field(&field)?;
    engine.clear_location(field)?;
    Ok(current_state(&engine))
}

#[utoipa::path(
    post,
    path = "/api/picker/open",
    tag = "picker",
    request_body = PickerOpenRequest,
    responses((status = 200, description = "Picker terbuka", body = ClientSnapshot))
)]
pub async fn picker_open(
    State(engine): State<OrderingEngine>,
    Json(payload): Json<PickerOpenRequest>,
) -> AppResult<Json<ClientSnapshot>> {
    let field = parse_field(&payload.field)?;
    engine.picker_open(field)?;
    Ok(current_state(&engine))
}

#[utoipa::path(
    post,
    path = "/api/picker/move",
    tag = "picker",
    request_body = Coordinates,
    responses(
        (status = 200, description = "Titik tengah peta diperbarui", body = ClientSnapshot),
        (status = 409, description = "Picker belum dibuka", body = ErrorResponse),
    )
)]
pub async fn picker_move(
    State(engine): State<OrderingEngine>,
    Json(payload): Json<Coordinates>,
) -> AppResult<Json<ClientSnapshot>> {
    engine.picker_move(payload)?;
    Ok(current_state(&engine))
}

#[utoipa::path(
    post,
    path = "/api/picker/confirm",
    tag = "picker",
    responses(
        (status = 200, description = "Titik manual tersimpan", body = ClientSnapshot),
        (status = 502, description = "Gagal mendapatkan alamat", body = ErrorResponse),
    )
)]
pub async fn picker_confirm(State(engine): State<OrderingEngine>) -> AppResult<Json<ClientSnapshot>> {
    engine.picker_confirm().await?;
    Ok(current_state(&engine))
}

#[utoipa::path(
    post,
    path = "/api/picker/cancel",
    tag = "picker",
    responses((status = 200, description = "Picker ditutup", body = ClientSnapshot))
)]
pub async fn picker_cancel(State(engine): State<OrderingEngine>) -> Json<ClientSnapshot> {
    engine.picker_cancel();
    current_state(&engine)
}

// Pakai rute terakhir dari riwayat
#[utoipa::path(
    post,
    path = "/api/history/use",
    tag = "locations",
    responses(
        (status = 200, description = "Rute riwayat dipakai", body = ClientSnapshot),
        (status = 404, description = "Belum ada riwayat", body = ErrorResponse),
    )
)]
pub async fn use_history(State(engine): State<OrderingEngine>) -> AppResult<Json<ClientSnapshot>> {
    engine.use_history()?;
    Ok(current_state(&engine))
}
