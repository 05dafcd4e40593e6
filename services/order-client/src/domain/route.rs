use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::location::Coordinates;

// Mode perjalanan yang dikirim ke layanan peta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelMode {
    Driving,
    TwoWheeler,
}

// Request rute ke mapping collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub origin: Coordinates,
    pub destination: Coordinates,
    pub mode: TravelMode,
    pub avoid_tolls: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RouteBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteAlternative {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    #[serde(default)]
    pub bounds: Option<RouteBounds>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    #[serde(default)]
    pub alternatives: Vec<RouteAlternative>,
}

/// Estimasi rute yang sudah di-commit.
///
/// `request_id` adalah nomor request yang menghasilkan estimasi ini; hanya estimasi
/// dari request terakhir yang boleh disimpan.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub duration_minutes: u32,
    pub request_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<RouteBounds>,
}

impl RouteEstimate {
    pub fn from_alternative(alternative: &RouteAlternative, request_id: u64) -> Self {
        Self {
            distance_km: alternative.distance_meters / 1000.0,
            duration_minutes: (alternative.duration_seconds / 60.0).ceil().max(0.0) as u32,
            request_id,
            bounds: alternative.bounds,
        }
    }
}

// Pilih alternatif terpendek, kalau sama ambil yang pertama
pub fn select_shortest(alternatives: &[RouteAlternative]) -> Option<&RouteAlternative> {
    alternatives
        .iter()
        .filter(|alt| alt.distance_meters.is_finite() && alt.distance_meters >= 0.0)
        .fold(None, |best: Option<&RouteAlternative>, alt| match best {
            Some(current) if current.distance_meters <= alt.distance_meters => Some(current),
            _ => Some(alt),
        })
}

// Batas jarak per layanan
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceLimit {
    pub max_km: f64,
    pub message: String,
}

impl DistanceLimit {
    pub fn allows(&self, distance_km: f64) -> bool {
        distance_km <= self.max_km
    }
}

// Hasil gagal dari perhitungan rute
#[derive(Debug, Clone, PartialEq)]
pub enum RouteFailure {
    NoRoute,
    LimitExceeded { distance_km: f64, max_km: f64, message: String },
    Mapping(String),
}

impl RouteFailure {
    pub fn banner_message(&self) -> String {
        match self {
            RouteFailure::NoRoute => "Rute tidak ditemukan. Coba titik lain.".to_string(),
            RouteFailure::LimitExceeded { message, .. } => message.clone(),
            RouteFailure::Mapping(_) => "Gagal menghitung rute. Coba lagi.".to_string(),
        }
    }
}
