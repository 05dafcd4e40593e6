use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::EngineEvent;
use crate::domain::pricing::ServiceType;
use crate::domain::route::{
    select_shortest, DistanceLimit, RouteEstimate, RouteFailure, RouteRequest, RouteResponse,
};
use crate::integrations::mapping::{MappingError, MappingProvider};

// Input satu perhitungan rute, diambil saat request dibuat
#[derive(Debug, Clone, PartialEq)]
pub struct RouteQuery {
    pub request: RouteRequest,
    pub service: ServiceType,
    pub limit: DistanceLimit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Committed(RouteEstimate),
    Failed(RouteFailure),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteState {
    pub estimate: Option<RouteEstimate>,
    pub failure: Option<RouteFailure>,
    pub pending: bool,
}

/// Debounce perhitungan rute + penolakan response basi.
///
/// Setiap request yang benar-benar dikirim dapat nomor naik (`request_id`). Response
/// hanya boleh di-commit kalau nomornya masih sama dengan nomor terakhir yang dikeluarkan.
pub struct RouteGuard {
    mapping: Arc<dyn MappingProvider>,
    quiet_period: Duration,
    latest_id: AtomicU64,
    state: watch::Sender<RouteState>,
    timer: Mutex<Option<JoinHandle<()>>>,
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl RouteGuard {
    pub fn new(
        mapping: Arc<dyn MappingProvider>,
        quiet_period: Duration,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        let (state, _) = watch::channel(RouteState::default());
        Self {
            mapping,
            quiet_period,
            latest_id: AtomicU64::new(0),
            state,
            timer: Mutex::new(None),
            events,
        }
    }

    pub fn snapshot(&self) -> RouteState {
        self.state.borrow().clone()
    }

    pub fn estimate(&self) -> Option<RouteEstimate> {
        self.state.borrow().estimate.clone()
    }

    /// Jadwalkan hitung ulang rute setelah jeda tenang. Timer sebelumnya dibatalkan,
    /// jadi edit beruntun hanya menghasilkan satu request.
    pub fn request_route(self: &Arc<Self>, query: RouteQuery) {
        let mut timer = self.timer.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        self.state.send_if_modified(|s| !std::mem::replace(&mut s.pending, true));

        let guard = Arc::clone(self);
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(guard.quiet_period).await;
            let ticket = guard.issue();
            // Request yang sudah terkirim tidak ikut dibatalkan timer berikutnya
            tokio::spawn(async move {
                guard.run(ticket, query).await;
            });
        }));
    }

    // Nomor request baru
    pub fn issue(&self) -> u64 {
        self.latest_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest(&self) -> u64 {
        self.latest_id.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, request_id: u64) -> bool {
        self.latest() == request_id
    }

    async fn run(&self, ticket: u64, query: RouteQuery) {
        if let Some(outcome) = self.resolve(ticket, &query).await {
            let _ = self.events.send(EngineEvent::RouteSettled {
                request_id: ticket,
                query,
                outcome,
            });
        }
    }

    /// Kirim request ke layanan peta lalu commit hasilnya kalau masih terbaru.
    /// `None` berarti response basi dan dibuang tanpa mengubah state.
    pub async fn resolve(&self, ticket: u64, query: &RouteQuery) -> Option<RouteOutcome> {
        tracing::debug!("🗺️ Hitung rute #{} ({})", ticket, query.service);
        let result = self.mapping.compute_route(query.request).await;

        if !self.is_current(ticket) {
            tracing::debug!("🗑️ Rute #{} basi (terbaru #{}), dibuang", ticket, self.latest());
            return None;
        }

        let outcome = evaluate(ticket, query, result);

        let committed = self.state.send_if_modified(|s| {
            if !self.is_current(ticket) {
                return false;
            }
            match &outcome {
                RouteOutcome::Committed(estimate) => {
                    s.estimate = Some(estimate.clone());
                    s.failure = None;
                }
                RouteOutcome::Failed(failure) => {
                    s.estimate = None;
                    s.failure = Some(failure.clone());
                }
            }
            s.pending = false;
            true
        });

        committed.then_some(outcome)
    }

    // Batalkan timer, buang request yang masih jalan, kosongkan estimasi
    pub fn clear(&self) {
        if let Some(previous) = self.timer.lock().unwrap_or_else(|p| p.into_inner()).take() {
            previous.abort();
        }
        self.latest_id.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(RouteState::default());
    }
}

fn evaluate(
    ticket: u64,
    query: &RouteQuery,
    result: Result<RouteResponse, MappingError>,
) -> RouteOutcome {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("⚠️ Rute #{} gagal: {}", ticket, e);
            return RouteOutcome::Failed(RouteFailure::Mapping(e.to_string()));
        }
    };

    let Some(shortest) = select_shortest(&response.alternatives) else {
        return RouteOutcome::Failed(RouteFailure::NoRoute);
    };

    let estimate = RouteEstimate::from_alternative(shortest, ticket);

    if !query.limit.allows(estimate.distance_km) {
        tracing::info!(
            "🚫 Jarak {:.2} km melebihi batas {} km untuk {}",
            estimate.distance_km,
            query.limit.max_km,
            query.service
        );
        return RouteOutcome::Failed(RouteFailure::LimitExceeded {
            distance_km: estimate.distance_km,
            max_km: query.limit.max_km,
            message: query.limit.message.clone(),
        });
    }

    RouteOutcome::Committed(estimate)
}
