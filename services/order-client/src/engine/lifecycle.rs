use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use utoipa::ToSchema;

use super::countdown::PaymentCountdownManager;
use super::location_store::LocationStore;
use super::poller::ActiveOrderPoller;
use crate::domain::order::{OrderRecord, OrderStatus, PaymentMethod};
use crate::domain::pricing::{CarOptions, ServiceType};
use crate::domain::ui_state::{LifecycleEvent, UiState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleState {
    pub ui: UiState,
    pub service: ServiceType,
    pub car_options: CarOptions,
    pub payment_method: Option<PaymentMethod>,
    pub note: String,
    pub active_order: Option<OrderRecord>,
    pub last_outcome: Option<OrderStatus>,
    pub last_order_id: Option<String>,
    pub banner: Option<String>,
    pub last_toast: Option<Toast>,
    pub qris_confirming: bool,
    pub qris_dismissed: bool,
    pub cancelling: bool,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self {
            ui: UiState::Idle,
            service: ServiceType::Ride,
            car_options: CarOptions::default(),
            payment_method: None,
            note: String::new(),
            active_order: None,
            last_outcome: None,
            last_order_id: None,
            banner: None,
            last_toast: None,
            qris_confirming: false,
            qris_dismissed: false,
            cancelling: false,
        }
    }
}

// Perubahan state UI yang benar-benar terjadi
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: UiState,
    pub to: UiState,
}

/// Pemilik tunggal state UI order.
///
/// Komponen lain hanya melaporkan fakta (`LifecycleEvent`); controller yang memutuskan
/// transisi dan menjalankan efeknya: kunci form, countdown QRIS, dan polling status.
pub struct OrderLifecycleController {
    state: watch::Sender<LifecycleState>,
    locations: Arc<LocationStore>,
    countdown: Arc<PaymentCountdownManager>,
    poller: Arc<ActiveOrderPoller>,
    toasts: broadcast::Sender<Toast>,
}

impl OrderLifecycleController {
    pub fn new(
        locations: Arc<LocationStore>,
        countdown: Arc<PaymentCountdownManager>,
        poller: Arc<ActiveOrderPoller>,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::default());
        let (toasts, _) = broadcast::channel(32);
        Self {
            state,
            locations,
            countdown,
            poller,
            toasts,
        }
    }

    pub fn snapshot(&self) -> LifecycleState {
        self.state.borrow().clone()
    }

    pub fn subscribe_toasts(&self) -> broadcast::Receiver<Toast> {
        self.toasts.subscribe()
    }

    pub fn ui(&self) -> UiState {
        self.state.borrow().ui
    }

    pub fn active_order(&self) -> Option<OrderRecord> {
        self.state.borrow().active_order.clone()
    }

    /// Terapkan event tanpa mengubah order yang dilacak.
    pub fn apply(&self, event: LifecycleEvent) -> Option<Transition> {
        self.advance(event, None)
    }

    /// Terapkan event yang membawa jawaban backend tentang order.
    /// Record hanya disimpan kalau transisinya berlaku.
    pub fn apply_with_order(&self, event: LifecycleEvent, record: OrderRecord) -> Option<Transition> {
        self.advance(event, Some(record))
    }

    fn advance(&self, event: LifecycleEvent, record: Option<OrderRecord>) -> Option<Transition> {
        let mut transition = None;

        self.state.send_if_modified(|s| {
            let Some(next) = s.ui.next(event) else {
                return false;
            };
            transition = Some(Transition { from: s.ui, to: next });
            s.ui = next;
            if let Some(record) = &record {
                if s.active_order.as_ref().map(|o| &o.order_id) != Some(&record.order_id) {
                    s.qris_dismissed = false;
                    s.qris_confirming = false;
                }
                s.active_order = Some(record.clone());
            }
            true
        });

        match transition {
            Some(t) => {
                if t.from != t.to {
                    tracing::info!("🔀 UI {} -> {} ({:?})", t.from, t.to, event);
                }
                self.run_effects(t);
            }
            None => tracing::debug!("⏭️ Event {:?} diabaikan di state {}", event, self.ui()),
        }

        transition
    }

    fn run_effects(&self, t: Transition) {
        match t.to {
            UiState::Submitting => self.locations.set_inputs_enabled(false),
            UiState::WaitingPayment => {
                self.locations.set_inputs_enabled(false);
                // Countdown hanya dimulai sekali per masuk WAITING_PAYMENT
                if t.from != UiState::WaitingPayment {
                    if let Some(order) = self.active_order() {
                        self.countdown.start(&order.order_id);
                    }
                }
                self.poller.start();
            }
            UiState::Active => {
                self.locations.set_inputs_enabled(false);
                if t.from != UiState::Active {
                    self.countdown.reset();
                }
                self.poller.start();
            }
            terminal if terminal.is_terminal() => self.finish(terminal),
            _ => {
                if t.from.inputs_locked() {
                    self.release();
                }
            }
        }
    }

    // Order selesai: catat hasilnya lalu kembali ke IDLE
    fn finish(&self, terminal: UiState) {
        let outcome = match terminal {
            UiState::Completed => OrderStatus::Completed,
            UiState::Cancelled => OrderStatus::Cancelled,
            _ => OrderStatus::Expired,
        };

        self.release();

        self.state.send_modify(|s| {
            s.last_order_id = s.active_order.take().map(|o| o.order_id).or(s.last_order_id.take());
            s.last_outcome = Some(outcome);
            s.qris_confirming = false;
            s.qris_dismissed = false;
            s.cancelling = false;
        });

        let (level, message) = match outcome {
            OrderStatus::Completed => (ToastLevel::Success, "✅ Order selesai. Terima kasih!"),
            OrderStatus::Cancelled => (ToastLevel::Info, "Order dibatalkan."),
            _ => (ToastLevel::Warning, "⌛ Waktu pembayaran habis, order kedaluwarsa."),
        };
        self.notify(level, message);

        self.advance(LifecycleEvent::Reset, None);
    }

    // Lepas kunci form, hentikan timer order
    fn release(&self) {
        self.countdown.reset();
        self.poller.stop();
        self.locations.set_inputs_enabled(true);
    }

    /// Backend tidak lagi punya order terbuka untuk customer ini.
    pub fn close_order(&self) -> Option<Transition> {
        let transition = self.apply(LifecycleEvent::OrderClosed);
        if transition.is_some() {
            self.state.send_modify(|s| {
                s.last_order_id = s.active_order.take().map(|o| o.order_id);
            });
        }
        transition
    }

    pub fn notify(&self, level: ToastLevel, message: impl Into<String>) {
        let toast = Toast {
            level,
            message: message.into(),
        };
        match level {
            ToastLevel::Error | ToastLevel::Warning => tracing::warn!("🔔 {}", toast.message),
            _ => tracing::info!("🔔 {}", toast.message),
        }
        let _ = self.toasts.send(toast.clone());
        self.state.send_modify(|s| s.last_toast = Some(toast));
    }

    pub fn set_banner(&self, banner: Option<String>) {
        self.state.send_if_modified(|s| {
            if s.banner == banner {
                return false;
            }
            s.banner = banner;
            true
        });
    }

    pub fn set_service(&self, service: ServiceType) {
        self.state.send_modify(|s| {
            s.service = service;
            if service.is_car() {
                s.car_options.seats = if service == ServiceType::CarXl { 6 } else { 4 };
            }
        });
    }

    pub fn set_car_options(&self, options: CarOptions) -> ServiceType {
        let mut service = ServiceType::Ride;
        self.state.send_modify(|s| {
            s.car_options = options;
            s.service = s.service.with_seats(options.seats);
            service = s.service;
        });
        service
    }

    pub fn set_payment_method(&self, method: PaymentMethod) {
        self.state.send_modify(|s| s.payment_method = Some(method));
    }

    pub fn set_note(&self, note: String) {
        self.state.send_modify(|s| s.note = note);
    }

    // Flag single-flight; false berarti sudah ada aksi yang sama berjalan
    pub fn begin_cancel(&self) -> bool {
        self.state.send_if_modified(|s| !std::mem::replace(&mut s.cancelling, true))
    }

    pub fn end_cancel(&self) {
        self.state.send_if_modified(|s| std::mem::replace(&mut s.cancelling, false));
    }

    pub fn begin_qris_confirm(&self) -> bool {
        self.state.send_if_modified(|s| !std::mem::replace(&mut s.qris_confirming, true))
    }

    pub fn end_qris_confirm(&self) {
        self.state.send_if_modified(|s| std::mem::replace(&mut s.qris_confirming, false));
    }

    pub fn dismiss_qris(&self) {
        self.countdown.stop();
        self.state.send_if_modified(|s| !std::mem::replace(&mut s.qris_dismissed, true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderChannel, PaymentInfo};
    use crate::domain::ui_state::OrderPhase;
    use crate::engine::picker::PickerCoordinator;
    use crate::integrations::backend::MockOrderBackend;
    use crate::storage::ClientStorage;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn controller() -> (OrderLifecycleController, Arc<PaymentCountdownManager>, Arc<ActiveOrderPoller>, Arc<LocationStore>) {
        let (tx, _rx) = mpsc::unbounded_channel();
        let locations = Arc::new(LocationStore::new(Arc::new(PickerCoordinator::new())));
        let countdown = Arc::new(PaymentCountdownManager::new(900, tx.clone()));
        let poller = Arc::new(ActiveOrderPoller::new(
            Arc::new(MockOrderBackend::new()),
            Arc::new(ClientStorage::in_memory()),
            Duration::from_secs(5),
            tx,
        ));
        let controller = OrderLifecycleController::new(locations.clone(), countdown.clone(), poller.clone());
        (controller, countdown, poller, locations)
    }

    fn qris_order(status: OrderStatus) -> OrderRecord {
        OrderRecord {
            order_id: "ab12cd34-9999".into(),
            status,
            payment_info: Some(PaymentInfo { expected_amount: 25_000.0 }),
            created_via: OrderChannel::Qris,
        }
    }

    fn to_submitting(c: &OrderLifecycleController) {
        c.apply(LifecycleEvent::LocationsChanged { complete: true });
        c.apply(LifecycleEvent::PricingStarted);
        c.apply(LifecycleEvent::QuoteConfirmed);
        c.apply(LifecycleEvent::SubmitRequested);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_payment_starts_countdown_once() {
        let (c, countdown, poller, locations) = controller();
        to_submitting(&c);
        assert!(!locations.inputs_enabled(), "Input dikunci selama submit");

        c.apply_with_order(
            LifecycleEvent::SubmissionAccepted(OrderPhase::AwaitingPayment),
            qris_order(OrderStatus::WaitingPayment),
        );
        assert_eq!(c.ui(), UiState::WaitingPayment);
        assert!(countdown.snapshot().active);
        assert!(poller.is_running());

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(countdown.snapshot().remaining_secs, 897);

        // Poll berikutnya masih WAITING_PAYMENT: countdown tidak boleh diulang
        c.apply_with_order(
            LifecycleEvent::StatusReported(OrderStatus::WaitingPayment),
            qris_order(OrderStatus::WaitingPayment),
        );
        assert_eq!(countdown.snapshot().remaining_secs, 897, "Countdown tidak boleh reset");
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_status_returns_to_idle() {
        let (c, countdown, poller, locations) = controller();
        to_submitting(&c);
        c.apply_with_order(
            LifecycleEvent::SubmissionAccepted(OrderPhase::AwaitingPayment),
            qris_order(OrderStatus::WaitingPayment),
        );

        let mut toasts = c.subscribe_toasts();

        c.apply_with_order(
            LifecycleEvent::StatusReported(OrderStatus::Expired),
            qris_order(OrderStatus::Expired),
        );

        let s = c.snapshot();
        assert_eq!(s.ui, UiState::Idle);
        assert!(s.active_order.is_none());
        assert_eq!(s.last_outcome, Some(OrderStatus::Expired));
        assert_eq!(s.last_order_id.as_deref(), Some("ab12cd34-9999"));
        assert!(locations.inputs_enabled());
        assert!(!poller.is_running());
        assert!(!countdown.snapshot().active);
        assert_eq!(toasts.try_recv().unwrap().level, ToastLevel::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_payment_to_fulfillment_resets_countdown() {
        let (c, countdown, _poller, _locations) = controller();
        to_submitting(&c);
        c.apply_with_order(
            LifecycleEvent::SubmissionAccepted(OrderPhase::AwaitingPayment),
            qris_order(OrderStatus::WaitingPayment),
        );

        c.apply_with_order(
            LifecycleEvent::StatusReported(OrderStatus::Searching),
            qris_order(OrderStatus::Searching),
        );

        assert_eq!(c.ui(), UiState::Active);
        assert_eq!(countdown.snapshot(), Default::default());
        assert_eq!(c.active_order().unwrap().status, OrderStatus::Searching);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_submission_unlocks_inputs() {
        let (c, _countdown, _poller, locations) = controller();
        to_submitting(&c);

        let t = c.apply(LifecycleEvent::SubmissionFailed { quote_still_valid: true }).unwrap();
        assert_eq!(t.to, UiState::Priced);
        assert!(locations.inputs_enabled());
    }

    #[tokio::test]
    async fn test_single_flight_flags() {
        let (c, _countdown, _poller, _locations) = controller();
        assert!(c.begin_cancel());
        assert!(!c.begin_cancel(), "Cancel kedua diabaikan");
        c.end_cancel();
        assert!(c.begin_cancel());

        assert!(c.begin_qris_confirm());
        assert!(!c.begin_qris_confirm());
    }

    #[tokio::test]
    async fn test_six_seats_switch_to_car_xl() {
        let (c, _, _, _) = controller();
        c.set_service(ServiceType::Car);
        assert_eq!(c.set_car_options(CarOptions { seats: 6, toll: true }), ServiceType::CarXl);
        assert_eq!(c.set_car_options(CarOptions { seats: 4, toll: false }), ServiceType::Car);

        c.set_service(ServiceType::Send);
        assert_eq!(c.set_car_options(CarOptions { seats: 6, toll: false }), ServiceType::Send);
    }
}
