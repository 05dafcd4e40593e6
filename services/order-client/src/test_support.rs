// Fake collaborator untuk test timing dan race
use async_trait::async_trait;
use shared::HttpClientError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::domain::location::Coordinates;
use crate::domain::order::{
    ActiveOrderResponse, CancelOrderRequest, CancelOrderResponse, ConfirmPaymentRequest,
    ConfirmPaymentResponse, CreateOrderRequest, OrderResponse, OrderStatus,
};
use crate::domain::pricing::{
    PricePreviewRequest, PricePreviewResponse, PricingConfigResponse, ServiceType,
};
use crate::domain::route::{
    DistanceLimit, RouteAlternative, RouteRequest, RouteResponse, TravelMode,
};
use crate::domain::session::{MagicLinkVerifyRequest, SessionGrant};
use crate::engine::route_guard::RouteQuery;
use crate::integrations::backend::OrderBackend;
use crate::integrations::mapping::{MappingError, MappingProvider};

// Query ke-i: latitude tujuan = i * 0.01, jadi fake bisa tahu ini request ke berapa
pub fn query_to(i: u64) -> RouteQuery {
    RouteQuery {
        request: RouteRequest {
            origin: Coordinates::new(0.0, 110.0),
            destination: Coordinates::new(i as f64 * 0.01, 110.0),
            mode: TravelMode::TwoWheeler,
            avoid_tolls: true,
        },
        service: ServiceType::Ride,
        limit: DistanceLimit {
            max_km: 1_000.0,
            message: "Jarak terlalu jauh".to_string(),
        },
    }
}

/// Layanan peta palsu: request ke-i selesai setelah `delays[i-1]` ms dan
/// menjawab rute sepanjang i km.
pub struct DelayedMapping {
    delays: Vec<u64>,
}

impl DelayedMapping {
    pub fn new(delays: Vec<u64>) -> Self {
        Self { delays }
    }

    fn index_of(request: &RouteRequest) -> u64 {
        (request.destination.lat * 100.0).round().max(1.0) as u64
    }
}

#[async_trait]
impl MappingProvider for DelayedMapping {
    async fn compute_route(&self, request: RouteRequest) -> Result<RouteResponse, MappingError> {
        let i = Self::index_of(&request);
        let delay = self.delays[((i - 1) as usize) % self.delays.len()];
        tokio::time::sleep(Duration::from_millis(delay)).await;

        Ok(RouteResponse {
            alternatives: vec![RouteAlternative {
                distance_meters: i as f64 * 1_000.0,
                duration_seconds: i as f64 * 120.0,
                bounds: None,
            }],
        })
    }

    async fn geocode(&self, point: Coordinates) -> Result<String, MappingError> {
        Ok(format!("Titik {:.4}, {:.4}", point.lat, point.lng))
    }

    async fn reverse_geocode(&self, _address: String) -> Result<Coordinates, MappingError> {
        Err(MappingError::NotFound)
    }
}

/// Backend palsu yang `GET /orders/active`-nya lambat; mencatat fetch yang tumpang tindih.
pub struct SlowActiveOrder {
    delay: Duration,
    started: AtomicUsize,
    running: AtomicUsize,
    max_running: AtomicUsize,
}

impl SlowActiveOrder {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            started: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
        }
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }
}

fn unused() -> HttpClientError {
    HttpClientError::InvalidClient("tidak dipakai di test ini".to_string())
}

#[async_trait]
impl OrderBackend for SlowActiveOrder {
    async fn pricing_config(&self) -> Result<PricingConfigResponse, HttpClientError> {
        Err(unused())
    }

    async fn preview_price(
        &self,
        _request: PricePreviewRequest,
    ) -> Result<PricePreviewResponse, HttpClientError> {
        Err(unused())
    }

    async fn create_order(
        &self,
        _request: CreateOrderRequest,
        _token: Option<String>,
    ) -> Result<OrderResponse, HttpClientError> {
        Err(unused())
    }

    async fn active_order(&self, _token: String) -> Result<ActiveOrderResponse, HttpClientError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(ActiveOrderResponse { active_order: None })
    }

    async fn cancel_order(
        &self,
        _request: CancelOrderRequest,
        _token: Option<String>,
    ) -> Result<CancelOrderResponse, HttpClientError> {
        Err(unused())
    }

    async fn confirm_payment(
        &self,
        _request: ConfirmPaymentRequest,
        _token: Option<String>,
    ) -> Result<ConfirmPaymentResponse, HttpClientError> {
        Err(unused())
    }

    async fn verify_magic_link(
        &self,
        _request: MagicLinkVerifyRequest,
    ) -> Result<SessionGrant, HttpClientError> {
        Err(unused())
    }
}

/// Backend palsu untuk satu siklus order: submit langsung diterima, cancel selalu berhasil,
/// sedangkan `GET /orders/active` lambat dan selalu menjawab order seperti saat dibuat.
pub struct SlowStatusBackend {
    price: f64,
    created: OrderResponse,
    delay: Duration,
    fetches: AtomicUsize,
}

impl SlowStatusBackend {
    pub fn new(price: f64, created: OrderResponse, delay: Duration) -> Self {
        Self {
            price,
            created,
            delay,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderBackend for SlowStatusBackend {
    async fn pricing_config(&self) -> Result<PricingConfigResponse, HttpClientError> {
        Err(unused())
    }

    async fn preview_price(
        &self,
        _request: PricePreviewRequest,
    ) -> Result<PricePreviewResponse, HttpClientError> {
        Ok(PricePreviewResponse {
            success: true,
            price: Some(self.price),
            distance_km: None,
            message: None,
        })
    }

    async fn create_order(
        &self,
        _request: CreateOrderRequest,
        _token: Option<String>,
    ) -> Result<OrderResponse, HttpClientError> {
        Ok(self.created.clone())
    }

    async fn active_order(&self, _token: String) -> Result<ActiveOrderResponse, HttpClientError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(ActiveOrderResponse {
            active_order: Some(self.created.clone()),
        })
    }

    async fn cancel_order(
        &self,
        _request: CancelOrderRequest,
        _token: Option<String>,
    ) -> Result<CancelOrderResponse, HttpClientError> {
        Ok(CancelOrderResponse {
            success: true,
            idempotent: false,
            status: Some(OrderStatus::Cancelled),
            message: None,
        })
    }

    async fn confirm_payment(
        &self,
        _request: ConfirmPaymentRequest,
        _token: Option<String>,
    ) -> Result<ConfirmPaymentResponse, HttpClientError> {
        Err(unused())
    }

    async fn verify_magic_link(
        &self,
        _request: MagicLinkVerifyRequest,
    ) -> Result<SessionGrant, HttpClientError> {
        Err(unused())
    }
}
