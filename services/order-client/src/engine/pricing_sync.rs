use shared::utils::validation::is_valid_price;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

use crate::domain::location::Coordinates;
use crate::domain::pricing::{
    CarOptions, DisplayEstimate, PricePreviewRequest, PriceQuote, PricingConfig, ServiceType,
};
use crate::domain::route::{DistanceLimit, RouteEstimate};
use crate::integrations::backend::OrderBackend;

pub const PRICING_UNAVAILABLE_TEXT: &str = "Server pricing sibuk, coba lagi sebentar";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricingState {
    pub quote: Option<PriceQuote>,
    pub estimate: Option<DisplayEstimate>,
    pub loading: bool,
    pub error: Option<String>,
    pub config_loaded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    Confirmed { generation: u64, quote: PriceQuote },
    Failed { generation: u64, message: String },
    // Ada perubahan input selama request berjalan, hasil dibuang
    Stale,
}

/// Satu-satunya penulis harga terkonfirmasi.
///
/// Harga hanya berasal dari `/pricing/preview`. Gagal dalam bentuk apa pun berarti
/// tidak ada harga; estimasi lokal hanya untuk tampilan selama loading.
pub struct PricingSyncClient {
    backend: Arc<dyn OrderBackend>,
    config: RwLock<PricingConfig>,
    fallback_max_km: f64,
    generation: AtomicU64,
    state: watch::Sender<PricingState>,
}

impl PricingSyncClient {
    pub fn new(backend: Arc<dyn OrderBackend>, fallback_max_km: f64) -> Self {
        let (state, _) = watch::channel(PricingState::default());
        Self {
            backend,
            config: RwLock::new(PricingConfig::default()),
            fallback_max_km,
            generation: AtomicU64::new(0),
            state,
        }
    }

    pub fn snapshot(&self) -> PricingState {
        self.state.borrow().clone()
    }

    // Ambil config pricing dari backend, gagal = pakai batas fallback tanpa estimasi
    pub async fn load_config(&self) -> bool {
        match self.backend.pricing_config().await {
            Ok(response) if response.success => {
                let Some(data) = response.data else {
                    tracing::warn!("⚠️ Pricing config kosong, pakai batas fallback {} km", self.fallback_max_km);
                    return false;
                };
                let services = data.len();
                *self.config.write().unwrap_or_else(|p| p.into_inner()) = PricingConfig::new(data);
                self.state.send_modify(|s| s.config_loaded = true);
                tracing::info!("💰 Pricing config dimuat untuk {} layanan", services);
                true
            }
            Ok(_) => {
                tracing::warn!("⚠️ Pricing config ditolak backend, pakai batas fallback {} km", self.fallback_max_km);
                false
            }
            Err(e) => {
                tracing::warn!("⚠️ Gagal ambil pricing config: {}", e);
                false
            }
        }
    }

    pub fn distance_limit(&self, service: ServiceType) -> DistanceLimit {
        self.config
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .distance_limit(service, self.fallback_max_km)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Buang quote sekarang. Dipanggil setiap layanan atau titik berubah.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_if_modified(|s| {
            let changed = s.quote.is_some() || s.estimate.is_some() || s.loading || s.error.is_some();
            s.quote = None;
            s.estimate = None;
            s.loading = false;
            s.error = None;
            changed
        });
    }

    /// Minta harga ke backend untuk rute yang sudah di-commit.
    pub async fn fetch_quote(
        &self,
        service: ServiceType,
        pickup: Coordinates,
        dropoff: Coordinates,
        route: &RouteEstimate,
        car_options: Option<CarOptions>,
    ) -> QuoteOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let estimate = self
            .config
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .display_estimate(service, route.distance_km, car_options);

        self.state.send_modify(|s| {
            s.quote = None;
            s.estimate = estimate;
            s.loading = true;
            s.error = None;
        });

        let request = PricePreviewRequest {
            service,
            pickup_location: pickup,
            dropoff_location: dropoff,
            distance_km: route.distance_km,
        };

        let result = self.backend.preview_price(request).await;

        if !self.is_current(generation) {
            tracing::debug!("🗑️ Quote generasi {} basi, dibuang", generation);
            return QuoteOutcome::Stale;
        }

        let quote = match result {
            Ok(response) if response.success => {
                let amount = response
                    .price
                    .filter(|p| p.is_finite())
                    .map(|p| p.round() as i64)
                    .filter(|p| is_valid_price(*p));

                match amount {
                    Some(amount) => {
                        let distance_km = response
                            .distance_km
                            .filter(|d| d.is_finite() && *d > 0.0)
                            .unwrap_or(route.distance_km);
                        let within_limit = self.distance_limit(service).allows(distance_km);
                        Some(PriceQuote::confirmed(
                            amount,
                            distance_km,
                            within_limit,
                            service,
                            pickup,
                            dropoff,
                        ))
                    }
                    None => {
                        tracing::warn!("⚠️ Backend kasih harga tidak valid: {:?}", response.price);
                        None
                    }
                }
            }
            Ok(response) => {
                tracing::warn!("⚠️ Pricing preview ditolak: {:?}", response.message);
                None
            }
            Err(e) => {
                tracing::warn!("⚠️ Pricing preview gagal: {}", e);
                None
            }
        };

        let mut outcome = QuoteOutcome::Stale;
        self.state.send_if_modified(|s| {
            if !self.is_current(generation) {
                return false;
            }
            s.loading = false;
            s.estimate = None;
            match &quote {
                Some(q) => {
                    s.quote = Some(q.clone());
                    s.error = None;
                    outcome = QuoteOutcome::Confirmed {
                        generation,
                        quote: q.clone(),
                    };
                }
                None => {
                    s.quote = None;
                    s.error = Some(PRICING_UNAVAILABLE_TEXT.to_string());
                    outcome = QuoteOutcome::Failed {
                        generation,
                        message: PRICING_UNAVAILABLE_TEXT.to_string(),
                    };
                }
            }
            true
        });

        if let QuoteOutcome::Confirmed { quote, .. } = &outcome {
            tracing::info!("💰 Harga terkonfirmasi Rp {} ({:.2} km)", quote.amount(), quote.distance_km());
        }

        outcome
    }

    pub fn confirmed_quote(&self) -> Option<PriceQuote> {
        self.state.borrow().quote.clone()
    }

    pub fn has_confirmed_price(&self) -> bool {
        self.state
            .borrow()
            .quote
            .as_ref()
            .is_some_and(|q| q.amount() > 0 && q.within_service_limit())
    }
}
