use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

use super::location::Coordinates;
use super::route::{DistanceLimit, TravelMode};

// Jenis layanan yang bisa dipesan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    Ride,
    Car,
    CarXl,
    Send,
    FoodMart,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Ride => "RIDE",
            ServiceType::Car => "CAR",
            ServiceType::CarXl => "CAR_XL",
            ServiceType::Send => "SEND",
            ServiceType::FoodMart => "FOOD_MART",
        }
    }

    pub fn is_car(&self) -> bool {
        matches!(self, ServiceType::Car | ServiceType::CarXl)
    }

    // Mobil lewat jalan mobil, sisanya motor
    pub fn travel_mode(&self) -> TravelMode {
        if self.is_car() {
            TravelMode::Driving
        } else {
            TravelMode::TwoWheeler
        }
    }

    // 6 kursi = CAR_XL, 4 kursi = CAR; layanan non-mobil tidak berubah
    pub fn with_seats(self, seats: u8) -> Self {
        match (self.is_car(), seats) {
            (true, 6) => ServiceType::CarXl,
            (true, _) => ServiceType::Car,
            (false, _) => self,
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Opsi tambahan untuk layanan mobil
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CarOptions {
    #[schema(example = 4)]
    pub seats: u8,
    pub toll: bool,
}

impl Default for CarOptions {
    fn default() -> Self {
        Self { seats: 4, toll: false }
    }
}

impl CarOptions {
    pub fn is_valid(&self) -> bool {
        matches!(self.seats, 4 | 6)
    }
}

/// Harga yang sudah dikonfirmasi backend.
///
/// Tidak ada constructor publik: hanya `PricingSyncClient` yang membuat quote dari
/// response `/pricing/preview`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    amount: i64,
    distance_km: f64,
    within_service_limit: bool,
    #[serde(skip)]
    service: ServiceType,
    #[serde(skip)]
    pickup: Coordinates,
    #[serde(skip)]
    dropoff: Coordinates,
}

impl PriceQuote {
    pub(crate) fn confirmed(
        amount: i64,
        distance_km: f64,
        within_service_limit: bool,
        service: ServiceType,
        pickup: Coordinates,
        dropoff: Coordinates,
    ) -> Self {
        Self {
            amount,
            distance_km,
            within_service_limit,
            service,
            pickup,
            dropoff,
        }
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    pub fn within_service_limit(&self) -> bool {
        self.within_service_limit
    }

    pub fn service(&self) -> ServiceType {
        self.service
    }

    // Quote hanya berlaku untuk layanan dan titik yang sama persis
    pub fn matches(&self, service: ServiceType, pickup: Coordinates, dropoff: Coordinates) -> bool {
        self.service == service && self.pickup == pickup && self.dropoff == dropoff
    }

    // Harga coret dekoratif ("sebelum promo"), hanya tampilan
    pub fn strikethrough_amount(&self) -> i64 {
        strikethrough_amount(self.amount)
    }
}

// ceil(amount * 1.10 / 500) * 500 dalam aritmetika integer
pub fn strikethrough_amount(amount: i64) -> i64 {
    if amount <= 0 {
        return 0;
    }
    (amount * 11 + 4_999) / 5_000 * 500
}

// Estimasi lokal selama quote masih loading. Tipe terpisah, tidak pernah jadi PriceQuote.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisplayEstimate {
    pub amount: i64,
    pub distance_km: f64,
}

// ===== Pricing config dari backend =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistanceConstraints {
    #[serde(default)]
    pub max_distance_km: Option<f64>,
    #[serde(default)]
    pub max_distance_error_msg: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingModel {
    #[serde(default, alias = "base", alias = "baseFare")]
    pub base_fare: Option<f64>,
    #[serde(default, alias = "perKm", alias = "distance_rate", alias = "distanceRate")]
    pub per_km: Option<f64>,
    #[serde(default, alias = "roundTo", alias = "rounding")]
    pub round_to: Option<f64>,
    #[serde(default, alias = "sixSeatMultiplier")]
    pub six_seat_multiplier: Option<f64>,
}

impl PricingModel {
    // Estimasi tampilan: ceil((base + km * per_km) * multiplier / round_to) * round_to
    pub fn estimate(&self, distance_km: f64, car_options: Option<CarOptions>) -> Option<i64> {
        let base = self.base_fare?;
        let per_km = self.per_km?;
        let round_to = self.round_to.filter(|r| *r > 0.0).unwrap_or(1.0);

        let mut price = base + distance_km * per_km;
        if let (Some(multiplier), Some(CarOptions { seats: 6, .. })) = (self.six_seat_multiplier, car_options) {
            price *= multiplier;
        }

        let rounded = (price / round_to).ceil() * round_to;
        (rounded.is_finite() && rounded > 0.0).then_some(rounded as i64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicePricingConfig {
    #[serde(default)]
    pub constraints: Option<DistanceConstraints>,
    #[serde(default)]
    pub pricing_model: Option<PricingModel>,
}

// Config per layanan, key = kode layanan ("RIDE", "CAR", ...)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingConfig {
    services: HashMap<String, ServicePricingConfig>,
}

impl PricingConfig {
    pub fn new(services: HashMap<String, ServicePricingConfig>) -> Self {
        let services = services
            .into_iter()
            .map(|(key, value)| (key.to_ascii_uppercase(), value))
            .collect();
        Self { services }
    }

    pub fn for_service(&self, service: ServiceType) -> Option<&ServicePricingConfig> {
        self.services.get(service.as_str())
    }

    pub fn distance_limit(&self, service: ServiceType, fallback_km: f64) -> DistanceLimit {
        let constraints = self
            .for_service(service)
            .and_then(|cfg| cfg.constraints.as_ref());

        let max_km = constraints
            .and_then(|c| c.max_distance_km)
            .filter(|km| *km > 0.0)
            .unwrap_or(fallback_km);

        let message = constraints
            .and_then(|c| c.max_distance_error_msg.clone())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_limit_message(max_km, service));

        DistanceLimit { max_km, message }
    }

    pub fn display_estimate(
        &self,
        service: ServiceType,
        distance_km: f64,
        car_options: Option<CarOptions>,
    ) -> Option<DisplayEstimate> {
        let amount = self
            .for_service(service)?
            .pricing_model
            .as_ref()?
            .estimate(distance_km, car_options)?;

        Some(DisplayEstimate { amount, distance_km })
    }
}

pub fn default_limit_message(max_km: f64, service: ServiceType) -> String {
    format!("Jarak melebihi batas layanan ({}km untuk {})", max_km, service)
}

// ===== DTO backend =====

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePreviewRequest {
    pub service: ServiceType,
    pub pickup_location: Coordinates,
    pub dropoff_location: Coordinates,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PricePreviewResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default, alias = "distanceKm")]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PricingConfigResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<HashMap<String, ServicePricingConfig>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_json() -> &'static str {
        r#"{
            "success": true,
            "data": {
                "RIDE": {
                    "constraints": { "max_distance_km": 25 },
                    "pricing_model": { "base_fare": 8000, "per_km": 2500, "round_to": 500 }
                },
                "car": {
                    "constraints": { "max_distance_km": 80, "max_distance_error_msg": "Maksimal 80 km ya" },
                    "pricing_model": { "baseFare": 15000, "perKm": 4000, "roundTo": 1000, "six_seat_multiplier": 1.5 }
                }
            }
        }"#
    }

    fn config() -> PricingConfig {
        let response: PricingConfigResponse = serde_json::from_str(config_json()).unwrap();
        PricingConfig::new(response.data.unwrap())
    }

    #[test]
    fn test_service_modes_and_seats() {
        assert_eq!(ServiceType::Car.travel_mode(), TravelMode::Driving);
        assert_eq!(ServiceType::CarXl.travel_mode(), TravelMode::Driving);
        assert_eq!(ServiceType::Ride.travel_mode(), TravelMode::TwoWheeler);
        assert_eq!(ServiceType::FoodMart.travel_mode(), TravelMode::TwoWheeler);

        assert_eq!(ServiceType::Car.with_seats(6), ServiceType::CarXl);
        assert_eq!(ServiceType::CarXl.with_seats(4), ServiceType::Car);
        assert_eq!(ServiceType::Send.with_seats(6), ServiceType::Send);
    }

    #[test]
    fn test_service_type_wire_names() {
        assert_eq!(serde_json::to_string(&ServiceType::CarXl).unwrap(), "\"CAR_XL\"");
        let parsed: ServiceType = serde_json::from_str("\"FOOD_MART\"").unwrap();
        assert_eq!(parsed, ServiceType::FoodMart);
    }

    #[test]
    fn test_distance_limit_from_config() {
        let cfg = config();
        let ride = cfg.distance_limit(ServiceType::Ride, 25.0);
        assert_eq!(ride.max_km, 25.0);
        assert_eq!(ride.message, "Jarak melebihi batas layanan (25km untuk RIDE)");

        let car = cfg.distance_limit(ServiceType::Car, 25.0);
        assert_eq!(car.max_km, 80.0);
        assert_eq!(car.message, "Maksimal 80 km ya");

        // Tidak ada di config -> fallback
        let send = cfg.distance_limit(ServiceType::Send, 25.0);
        assert_eq!(send.max_km, 25.0);
    }

    #[test]
    fn test_display_estimate_rounding() {
        let cfg = config();
        // 8000 + 1.7 * 2500 = 12250 -> dibulatkan ke 12500
        let estimate = cfg.display_estimate(ServiceType::Ride, 1.7, None).unwrap();
        assert_eq!(estimate.amount, 12_500);

        // (15000 + 10 * 4000) * 1.5 = 82500 -> 83000
        let estimate = cfg
            .display_estimate(ServiceType::Car, 10.0, Some(CarOptions { seats: 6, toll: true }))
            .unwrap();
        assert_eq!(estimate.amount, 83_000);

        assert!(cfg.display_estimate(ServiceType::Send, 3.0, None).is_none());
        assert!(PricingConfig::default().display_estimate(ServiceType::Ride, 3.0, None).is_none());
    }

    #[test]
    fn test_strikethrough_amount() {
        assert_eq!(strikethrough_amount(12_000), 13_500);
        assert_eq!(strikethrough_amount(25_000), 27_500);
        assert_eq!(strikethrough_amount(10_000), 11_000);
    }

    #[test]
    fn test_preview_request_wire_format() {
        let request = PricePreviewRequest {
            service: ServiceType::Ride,
            pickup_location: Coordinates::new(-7.33, 110.50),
            dropoff_location: Coordinates::new(-7.34, 110.52),
            distance_km: 3.2,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["service"], "RIDE");
        assert_eq!(value["pickupLocation"]["lat"], -7.33);
        assert_eq!(value["dropoffLocation"]["lng"], 110.52);
        assert_eq!(value["distanceKm"], 3.2);
    }
}
