use async_trait::async_trait;
use shared::{HttpClientError, ServiceClient};

use crate::domain::order::{
    ActiveOrderResponse, CancelOrderRequest, CancelOrderResponse, ConfirmPaymentRequest,
    ConfirmPaymentResponse, CreateOrderRequest, OrderResponse,
};
use crate::domain::pricing::{PricePreviewRequest, PricePreviewResponse, PricingConfigResponse};
use crate::domain::session::{MagicLinkVerifyRequest, SessionGrant};

/// Kontrak backend order/pricing/payment yang dipakai client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderBackend: Send + Sync {
    async fn pricing_config(&self) -> Result<PricingConfigResponse, HttpClientError>;

    async fn preview_price(
        &self,
        request: PricePreviewRequest,
    ) -> Result<PricePreviewResponse, HttpClientError>;

    // POST /orders/create (cash) atau /orders/qris
    async fn create_order(
        &self,
        request: CreateOrderRequest,
        token: Option<String>,
    ) -> Result<OrderResponse, HttpClientError>;

    async fn active_order(&self, token: String) -> Result<ActiveOrderResponse, HttpClientError>;

    async fn cancel_order(
        &self,
        request: CancelOrderRequest,
        token: Option<String>,
    ) -> Result<CancelOrderResponse, HttpClientError>;

    async fn confirm_payment(
        &self,
        request: ConfirmPaymentRequest,
        token: Option<String>,
    ) -> Result<ConfirmPaymentResponse, HttpClientError>;

    async fn verify_magic_link(
        &self,
        request: MagicLinkVerifyRequest,
    ) -> Result<SessionGrant, HttpClientError>;
}

// Implementasi HTTP di atas ServiceClient
pub struct HttpOrderBackend {
    client: ServiceClient,
}

impl HttpOrderBackend {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OrderBackend for HttpOrderBackend {
    async fn pricing_config(&self) -> Result<PricingConfigResponse, HttpClientError> {
        self.client.get("/pricing/config", None).await
    }

    async fn preview_price(
        &self,
        request: PricePreviewRequest,
    ) -> Result<PricePreviewResponse, HttpClientError> {
        self.client.post("/pricing/preview", &request, None).await
    }

    async fn create_order(
        &self,
        request: CreateOrderRequest,
        token: Option<String>,
    ) -> Result<OrderResponse, HttpClientError> {
        let endpoint = request.payment_method.create_endpoint();
        tracing::info!(
            "📝 Kirim order {} ke {} (client_request_id={})",
            request.service,
            endpoint,
            request.client_request_id
        );
        self.client.post(endpoint, &request, token.as_deref()).await
    }

    async fn active_order(&self, token: String) -> Result<ActiveOrderResponse, HttpClientError> {
        self.client.get("/orders/active", Some(&token)).await
    }

    async fn cancel_order(
        &self,
        request: CancelOrderRequest,
        token: Option<String>,
    ) -> Result<CancelOrderResponse, HttpClientError> {
        self.client.post("/orders/cancel", &request, token.as_deref()).await
    }

    async fn confirm_payment(
        &self,
        request: ConfirmPaymentRequest,
        token: Option<String>,
    ) -> Result<ConfirmPaymentResponse, HttpClientError> {
        self.client.post("/payments/confirm", &request, token.as_deref()).await
    }

    async fn verify_magic_link(
        &self,
        request: MagicLinkVerifyRequest,
    ) -> Result<SessionGrant, HttpClientError> {
        self.client.post("/auth/verify", &request, None).await
    }
}
