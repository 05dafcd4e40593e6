use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::EngineEvent;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountdownState {
    pub order_id: Option<String>,
    pub remaining_secs: u64,
    pub active: bool,
    pub expired: bool,
}

/// Countdown pembayaran QRIS. Murni tampilan: saat habis, engine diminta
/// mengambil status terbaru dari backend, bukan langsung menganggap order expired.
pub struct PaymentCountdownManager {
    duration_secs: u64,
    state: watch::Sender<CountdownState>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl PaymentCountdownManager {
    pub fn new(duration_secs: u64, events: mpsc::UnboundedSender<EngineEvent>) -> Self {
        let (state, _) = watch::channel(CountdownState::default());
        Self {
            duration_secs,
            state,
            ticker: Mutex::new(None),
            events,
        }
    }

    pub fn snapshot(&self) -> CountdownState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CountdownState> {
        self.state.subscribe()
    }

    pub fn is_expired(&self) -> bool {
        self.state.borrow().expired
    }

    // Mulai dari durasi penuh; ticker lama dihentikan dulu
    pub fn start(self: &Arc<Self>, order_id: &str) {
        let mut ticker = self.ticker.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = ticker.take() {
            previous.abort();
        }

        self.state.send_replace(CountdownState {
            order_id: Some(order_id.to_string()),
            remaining_secs: self.duration_secs,
            active: true,
            expired: false,
        });

        tracing::info!("⏳ Countdown QRIS {} detik untuk order {}", self.duration_secs, order_id);

        let manager = Arc::clone(self);
        let order_id = order_id.to_string();
        *ticker = Some(tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let mut finished = false;
                manager.state.send_modify(|s| {
                    s.remaining_secs = s.remaining_secs.saturating_sub(1);
                    if s.remaining_secs == 0 {
                        s.active = false;
                        s.expired = true;
                        finished = true;
                    }
                });

                if finished {
                    tracing::info!("⌛ Countdown QRIS order {} habis, cek status ke backend", order_id);
                    let _ = manager.events.send(EngineEvent::CountdownExpired { order_id });
                    break;
                }
            }
        }));
    }

    // Hentikan ticker; sisa detik tetap untuk tampilan
    pub fn stop(&self) {
        if let Some(previous) = self.ticker.lock().unwrap_or_else(|p| p.into_inner()).take() {
            previous.abort();
        }
        self.state.send_if_modified(|s| !std::mem::replace(&mut s.active, false));
    }

    // Lupakan countdown (order sudah bukan WAITING_PAYMENT)
    pub fn reset(&self) {
        self.stop();
        self.state.send_replace(CountdownState::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(secs: u64) -> (Arc<PaymentCountdownManager>, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(PaymentCountdownManager::new(secs, tx)), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_down_monotonically_and_expires() {
        let (countdown, mut rx) = manager(5);
        let mut watcher = countdown.subscribe();

        countdown.start("order-1");
        assert_eq!(countdown.snapshot().remaining_secs, 5);

        let mut seen = vec![watcher.borrow_and_update().remaining_secs];
        while watcher.changed().await.is_ok() {
            let state = watcher.borrow_and_update().clone();
            seen.push(state.remaining_secs);
            if state.expired {
                break;
            }
        }

        assert!(seen.windows(2).all(|w| w[1] <= w[0]), "Countdown tidak boleh naik: {:?}", seen);
        assert_eq!(*seen.last().unwrap(), 0);
        assert!(countdown.is_expired());
        assert!(!countdown.snapshot().active);

        match rx.recv().await {
            Some(EngineEvent::CountdownExpired { order_id }) => assert_eq!(order_id, "order-1"),
            other => panic!("Harusnya CountdownExpired, dapat {:?}", other.is_some()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_freezes_and_emits_nothing() {
        let (countdown, mut rx) = manager(10);
        countdown.start("order-2");

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        countdown.stop();
        let frozen = countdown.snapshot();
        assert_eq!(frozen.remaining_secs, 7);
        assert!(!frozen.active);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(countdown.snapshot().remaining_secs, 7, "Ticker sudah berhenti");
        assert!(rx.try_recv().is_err(), "Tidak ada event expired setelah stop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_to_full() {
        let (countdown, _rx) = manager(10);
        countdown.start("order-3");
        tokio::time::sleep(Duration::from_millis(4_500)).await;
        assert_eq!(countdown.snapshot().remaining_secs, 6);

        countdown.start("order-4");
        assert_eq!(countdown.snapshot().remaining_secs, 10);
        assert_eq!(countdown.snapshot().order_id.as_deref(), Some("order-4"));
    }
}
