use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::location::Coordinates;
use super::pricing::ServiceType;

// Metode pembayaran order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Cash,
    Qris,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Qris => "QRIS",
        }
    }

    // Endpoint pembuatan order per metode
    pub fn create_endpoint(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "/orders/create",
            PaymentMethod::Qris => "/orders/qris",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "qris" => Ok(PaymentMethod::Qris),
            _ => Err("Metode pembayaran wajib dipilih.".to_string()),
        }
    }
}

// Status order yang dilaporkan backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    WaitingPayment,
    Searching,
    Accepted,
    PickingUp,
    Arrived,
    OnRide,
    Buying,
    Delivering,
    Completed,
    Cancelled,
    Expired,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::WaitingPayment => "WAITING_PAYMENT",
            OrderStatus::Searching => "SEARCHING",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::PickingUp => "PICKING_UP",
            OrderStatus::Arrived => "ARRIVED",
            OrderStatus::OnRide => "ON_RIDE",
            OrderStatus::Buying => "BUYING",
            OrderStatus::Delivering => "DELIVERING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Expired => "EXPIRED",
            OrderStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }

    // Driver sedang dicari / order sedang dijalankan
    pub fn is_fulfillment(&self) -> bool {
        matches!(
            self,
            OrderStatus::Searching
                | OrderStatus::Accepted
                | OrderStatus::PickingUp
                | OrderStatus::Arrived
                | OrderStatus::OnRide
                | OrderStatus::Buying
                | OrderStatus::Delivering
        )
    }

    pub fn status_message(&self) -> String {
        match self {
            OrderStatus::Searching => "🔍 Mencari driver terdekat...".to_string(),
            OrderStatus::Accepted => "✅ Driver ditemukan! Sedang menuju lokasi jemput.".to_string(),
            OrderStatus::PickingUp => "🛵 Driver dalam perjalanan ke lokasi jemput.".to_string(),
            OrderStatus::Arrived => "📍 Driver sudah tiba! Segera keluar ya.".to_string(),
            OrderStatus::OnRide => "🚀 Perjalanan sedang berlangsung.".to_string(),
            OrderStatus::Buying => "🛒 Driver sedang berbelanja.".to_string(),
            OrderStatus::Delivering => "📦 Driver sedang mengantar.".to_string(),
            other => format!("Status: {}", other.as_str()),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentInfo {
    #[serde(alias = "expectedAmount", default)]
    pub expected_amount: f64,
}

impl PaymentInfo {
    pub fn amount(&self) -> Option<i64> {
        (self.expected_amount.is_finite() && self.expected_amount > 0.0)
            .then(|| self.expected_amount.round() as i64)
    }
}

// Dari mana record order ini berasal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderChannel {
    Cash,
    Qris,
    Restored,
}

impl From<PaymentMethod> for OrderChannel {
    fn from(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Cash => OrderChannel::Cash,
            PaymentMethod::Qris => OrderChannel::Qris,
        }
    }
}

/// Order aktif yang sedang dilacak client.
///
/// Hanya diubah dari jawaban backend (submit, cancel, atau poll) dan dibuang saat status terminal.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub order_id: String,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_info: Option<PaymentInfo>,
    pub created_via: OrderChannel,
}

impl OrderRecord {
    // 8 karakter pertama, huruf besar
    pub fn short_id(&self) -> String {
        self.order_id.chars().take(8).collect::<String>().to_uppercase()
    }

    pub fn expected_amount(&self) -> Option<i64> {
        self.payment_info.and_then(|p| p.amount())
    }

    // QRIS hanya boleh tampil kalau status WAITING_PAYMENT dan nominal sudah pasti
    pub fn awaits_payment(&self) -> bool {
        self.status == OrderStatus::WaitingPayment && self.expected_amount().is_some()
    }
}

// ===== DTO backend =====

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateOrderRequest {
    pub service: ServiceType,
    pub customer_phone: String,
    #[serde(rename = "pickupLocation")]
    pub pickup_location: Coordinates,
    #[serde(rename = "dropoffLocation")]
    pub dropoff_location: Coordinates,
    pub origin: String,
    pub destination: String,
    #[serde(rename = "paymentMethod")]
    pub payment_method: PaymentMethod,
    pub note: String,
    #[serde(rename = "priceHint")]
    pub price_hint: i64,
    pub client_request_id: Uuid,
    pub source: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OrderResponse {
    #[serde(default, alias = "orderId", alias = "id")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub payment: Option<PaymentInfo>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl OrderResponse {
    pub fn into_record(self, channel: OrderChannel) -> Option<OrderRecord> {
        let order_id = self.order_id.filter(|id| !id.trim().is_empty())?;
        let status = self.status?;

        Some(OrderRecord {
            order_id,
            status,
            payment_info: self.payment,
            created_via: channel,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActiveOrderResponse {
    #[serde(default, rename = "activeOrder", alias = "active_order")]
    pub active_order: Option<OrderResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelOrderRequest {
    #[serde(rename = "orderId")]
    pub order_id: String,
    pub reason: String,
    pub customer_phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CancelOrderResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub idempotent: bool,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CancelOrderResponse {
    pub fn accepted(&self) -> bool {
        self.success || self.idempotent
    }
}

// Hasil cancel yang dilaporkan ke binding layer
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelOutcome {
    pub order_id: String,
    pub idempotent: bool,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmPaymentRequest {
    #[serde(rename = "orderId")]
    pub order_id: String,
    pub customer_phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfirmPaymentResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Riwayat rute terakhir (cache kenyamanan, bukan sumber kebenaran).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RouteHistory {
    pub origin_addr: String,
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub dest_addr: String,
    pub dest_lat: f64,
    pub dest_lng: f64,
    #[serde(default)]
    pub note: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Expired.is_terminal());
        assert!(!OrderStatus::WaitingPayment.is_terminal());
        assert!(OrderStatus::Searching.is_fulfillment());
        assert!(OrderStatus::Delivering.is_fulfillment());
        assert!(!OrderStatus::WaitingPayment.is_fulfillment());
        assert!(!OrderStatus::Unknown.is_fulfillment());
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let response: OrderResponse =
            serde_json::from_str(r#"{"orderId":"abc","status":"DRIVER_ASSIGNED"}"#).unwrap();
        assert_eq!(response.status, Some(OrderStatus::Unknown));
    }

    #[test]
    fn test_order_response_aliases() {
        let response: OrderResponse = serde_json::from_str(
            r#"{"order_id":"9f1c2d3e-aaaa","status":"WAITING_PAYMENT","payment":{"expected_amount":25000}}"#,
        )
        .unwrap();
        let record = response.into_record(OrderChannel::Qris).unwrap();
        assert_eq!(record.order_id, "9f1c2d3e-aaaa");
        assert_eq!(record.expected_amount(), Some(25_000));
        assert!(record.awaits_payment());
        assert_eq!(record.short_id(), "9F1C2D3E");
    }

    #[test]
    fn test_waiting_payment_without_amount_is_not_payable() {
        let response: OrderResponse = serde_json::from_str(
            r#"{"id":"x1","status":"WAITING_PAYMENT","payment":{"expected_amount":0}}"#,
        )
        .unwrap();
        let record = response.into_record(OrderChannel::Qris).unwrap();
        assert!(!record.awaits_payment(), "Nominal 0 tidak boleh membuka QRIS");
    }

    #[test]
    fn test_record_requires_id_and_status() {
        let missing_id: OrderResponse = serde_json::from_str(r#"{"status":"SEARCHING"}"#).unwrap();
        assert!(missing_id.into_record(OrderChannel::Cash).is_none());

        let missing_status: OrderResponse = serde_json::from_str(r#"{"orderId":"abc"}"#).unwrap();
        assert!(missing_status.into_record(OrderChannel::Cash).is_none());
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("qris".parse::<PaymentMethod>(), Ok(PaymentMethod::Qris));
        assert_eq!("CASH".parse::<PaymentMethod>(), Ok(PaymentMethod::Cash));
        assert!("".parse::<PaymentMethod>().is_err());
        assert_eq!(PaymentMethod::Qris.create_endpoint(), "/orders/qris");
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(OrderStatus::Searching.status_message(), "🔍 Mencari driver terdekat...");
        assert_eq!(OrderStatus::Unknown.status_message(), "Status: UNKNOWN");
    }

    #[test]
    fn test_active_order_null() {
        let response: ActiveOrderResponse = serde_json::from_str(r#"{"activeOrder":null}"#).unwrap();
        assert!(response.active_order.is_none());
    }
}
