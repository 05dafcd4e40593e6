use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::EngineEvent;
use crate::domain::order::OrderResponse;
use crate::integrations::backend::OrderBackend;
use crate::storage::ClientStorage;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollerState {
    pub running: bool,
    pub paused: bool,
    pub last_error: Option<String>,
    pub completed_fetches: u64,
}

// Hasil satu fetch status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Delivered,
    SkippedInFlight,
    NoSession,
    Failed,
}

/// Poll `GET /orders/active` selama ada order terbuka.
///
/// Paling banyak satu fetch berjalan; tick yang menemukan fetch lain masih jalan
/// langsung dilewati. Tick juga dilewati selama halaman tidak terlihat.
/// Setiap `start`/`stop` menaikkan epoch; hasil fetch dari epoch lama dibuang oleh engine.
pub struct ActiveOrderPoller {
    backend: Arc<dyn OrderBackend>,
    storage: Arc<ClientStorage>,
    period: Duration,
    in_flight: AtomicBool,
    epoch: AtomicU64,
    state: watch::Sender<PollerState>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl ActiveOrderPoller {
    pub fn new(
        backend: Arc<dyn OrderBackend>,
        storage: Arc<ClientStorage>,
        period: Duration,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        let (state, _) = watch::channel(PollerState::default());
        Self {
            backend,
            storage,
            period,
            in_flight: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            state,
            ticker: Mutex::new(None),
            events,
        }
    }

    pub fn snapshot(&self) -> PollerState {
        self.state.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch() == epoch
    }

    pub fn start(self: &Arc<Self>) {
        let mut ticker = self.ticker.lock().unwrap_or_else(|p| p.into_inner());
        if ticker.is_some() {
            return;
        }

        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| {
            s.running = true;
            s.last_error = None;
        });
        tracing::info!("🔄 Polling status order tiap {:?}", self.period);

        let poller = Arc::clone(self);
        *ticker = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + poller.period, poller.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                if poller.state.borrow().paused {
                    tracing::debug!("⏸️ Halaman tidak terlihat, tick poll dilewati");
                    continue;
                }

                let p = Arc::clone(&poller);
                tokio::spawn(async move {
                    p.fetch_now().await;
                });
            }
        }));
    }

    pub fn stop(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(previous) = self.ticker.lock().unwrap_or_else(|p| p.into_inner()).take() {
            previous.abort();
            tracing::info!("⏹️ Polling status order berhenti");
        }
        self.state.send_if_modified(|s| !std::mem::replace(&mut s.running, false));
    }

    pub fn pause(&self) {
        self.state.send_if_modified(|s| !std::mem::replace(&mut s.paused, true));
    }

    // Halaman terlihat lagi: langsung fetch sekali kalau polling aktif
    pub fn resume(self: &Arc<Self>) {
        let was_paused = self.state.send_if_modified(|s| std::mem::replace(&mut s.paused, false));

        if was_paused && self.is_running() {
            let poller = Arc::clone(self);
            tokio::spawn(async move {
                poller.fetch_now().await;
            });
        }
    }

    /// Ambil status order sekarang juga. Tidak pernah tumpang tindih dengan fetch lain.
    pub async fn fetch_now(&self) -> FetchOutcome {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("⏭️ Fetch status masih jalan, tick dilewati");
            return FetchOutcome::SkippedInFlight;
        }

        let outcome = self.fetch_once().await;
        self.in_flight.store(false, Ordering::SeqCst);
        outcome
    }

    async fn fetch_once(&self) -> FetchOutcome {
        let Some(token) = self.storage.session_token() else {
            tracing::debug!("🔒 Belum login, fetch status dilewati");
            return FetchOutcome::NoSession;
        };

        let epoch = self.epoch();
        match self.backend.active_order(token).await {
            Ok(response) => {
                self.state.send_modify(|s| {
                    s.last_error = None;
                    s.completed_fetches += 1;
                });
                let order: Option<OrderResponse> = response.active_order;
                let _ = self.events.send(EngineEvent::OrderFetched { epoch, order });
                FetchOutcome::Delivered
            }
            Err(e) if e.is_session_error() => {
                tracing::warn!("🔒 Session ditolak saat poll status: {}", e);
                let _ = self.events.send(EngineEvent::SessionRejected);
                FetchOutcome::Failed
            }
            Err(e) => {
                // Status terakhir tetap dipakai, polling jalan terus
                tracing::warn!("⚠️ Poll status gagal: {}", e);
                self.state.send_modify(|s| s.last_error = Some(e.to_string()));
                FetchOutcome::Failed
            }
        }
    }
}
