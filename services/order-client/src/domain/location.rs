use serde::{Deserialize, Serialize};
use shared::utils::validation::is_valid_coordinate;
use utoipa::ToSchema;

use crate::error::AppError;

// Field lokasi di form order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Pickup,
    Dropoff,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Pickup => "pickup",
            Field::Dropoff => "dropoff",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pickup" | "origin" => Some(Field::Pickup),
            "dropoff" | "destination" | "dest" => Some(Field::Dropoff),
            _ => None,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Asal input lokasi
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Autocomplete,
    Gps,
    ManualPick,
}

// Koordinat mentah, format JSON sama dengan pickupLocation/dropoffLocation di backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    #[schema(example = -7.33)]
    pub lat: f64,
    #[schema(example = 110.50)]
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        is_valid_coordinate(self.lat, self.lng)
    }
}

// Input lokasi dari autocomplete atau GPS browser
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LocationInput {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub address: Option<String>,
    pub source: SourceKind,
}

/// Titik jemput/tujuan yang sudah lengkap.
///
/// Titik selalu utuh (koordinat + alamat) atau tidak ada sama sekali
/// (`Option::None` di [`Locations`]); field privat supaya tidak ada penulisan parsial.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LocationPoint {
    latitude: f64,
    longitude: f64,
    source_kind: SourceKind,
    display_address: String,
}

impl LocationPoint {
    pub fn new(
        latitude: f64,
        longitude: f64,
        source_kind: SourceKind,
        display_address: impl Into<String>,
    ) -> Result<Self, AppError> {
        let display_address = clean_address(&display_address.into());

        if !is_valid_coordinate(latitude, longitude) {
            return Err(AppError::validation("Koordinat lokasi tidak valid"));
        }

        if display_address.is_empty() {
            return Err(AppError::validation("Alamat lokasi wajib diisi"));
        }

        Ok(Self {
            latitude,
            longitude,
            source_kind,
            display_address,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn display_address(&self) -> &str {
        &self.display_address
    }
}

// Pasangan pickup & dropoff
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct Locations {
    pub pickup: Option<LocationPoint>,
    pub dropoff: Option<LocationPoint>,
}

impl Locations {
    pub fn get(&self, field: Field) -> Option<&LocationPoint> {
        match field {
            Field::Pickup => self.pickup.as_ref(),
            Field::Dropoff => self.dropoff.as_ref(),
        }
    }

    pub(crate) fn slot_mut(&mut self, field: Field) -> &mut Option<LocationPoint> {
        match field {
            Field::Pickup => &mut self.pickup,
            Field::Dropoff => &mut self.dropoff,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.pickup.is_some() && self.dropoff.is_some()
    }

    pub fn endpoints(&self) -> Option<(Coordinates, Coordinates)> {
        match (&self.pickup, &self.dropoff) {
            (Some(p), Some(d)) => Some((p.coordinates(), d.coordinates())),
            _ => None,
        }
    }
}

// Buang plus code di depan alamat (contoh: "MGX4+2Q, Jl. ...")
pub fn clean_address(address: &str) -> String {
    let trimmed = address.trim();

    if let Some((head, rest)) = trimmed.split_once(',') {
        let head = head.trim();
        let looks_like_plus_code = (4..=12).contains(&head.len())
            && head.contains('+')
            && head.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '+');

        if looks_like_plus_code {
            return rest.trim().to_string();
        }
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_requires_address_and_coordinates() {
        assert!(LocationPoint::new(-7.33, 110.50, SourceKind::Gps, "Jl. Diponegoro").is_ok());
        assert!(LocationPoint::new(-7.33, 110.50, SourceKind::Gps, "   ").is_err());
        assert!(LocationPoint::new(f64::NAN, 110.50, SourceKind::Gps, "Jl. Diponegoro").is_err());
        assert!(LocationPoint::new(-7.33, 200.0, SourceKind::Gps, "Jl. Diponegoro").is_err());
    }

    #[test]
    fn test_clean_address_strips_plus_code() {
        assert_eq!(clean_address("MGX4+2Q, Jl. Sudirman No. 5"), "Jl. Sudirman No. 5");
        assert_eq!(clean_address("Jl. Sudirman, Salatiga"), "Jl. Sudirman, Salatiga");
        assert_eq!(clean_address("  Pasar Raya  "), "Pasar Raya");
    }

    #[test]
    fn test_locations_completeness() {
        let mut locations = Locations::default();
        assert!(!locations.is_complete());
        assert!(locations.endpoints().is_none());

        locations.pickup = Some(LocationPoint::new(-7.33, 110.50, SourceKind::Autocomplete, "A").unwrap());
        assert!(!locations.is_complete());

        locations.dropoff = Some(LocationPoint::new(-7.34, 110.52, SourceKind::ManualPick, "B").unwrap());
        assert!(locations.is_complete());
        let (origin, destination) = locations.endpoints().unwrap();
        assert_eq!(origin, Coordinates::new(-7.33, 110.50));
        assert_eq!(destination, Coordinates::new(-7.34, 110.52));
    }

    #[test]
    fn test_field_parse_accepts_form_ids() {
        assert_eq!(Field::parse("origin"), Some(Field::Pickup));
        assert_eq!(Field::parse("DROPOFF"), Some(Field::Dropoff));
        assert_eq!(Field::parse("destination"), Some(Field::Dropoff));
        assert_eq!(Field::parse("stopover"), None);
    }
}
