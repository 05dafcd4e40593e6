pub mod countdown;
pub mod lifecycle;
pub mod location_store;
pub mod picker;
pub mod poller;
pub mod pricing_sync;
pub mod route_guard;


use shared::utils::validation::{is_valid_phone, normalize_phone};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::domain::location::{Coordinates, Field, LocationInput, LocationPoint, SourceKind};
use crate::domain::order::{
    CancelOrderRequest, CancelOutcome, ConfirmPaymentRequest, CreateOrderRequest, OrderChannel,
    OrderRecord, OrderResponse, OrderStatus, PaymentMethod, RouteHistory,
};
use crate::domain::pricing::{CarOptions, ServiceType};
use crate::domain::route::RouteRequest;
use crate::domain::session::MagicLinkVerifyRequest;
use crate::domain::ui_state::{LifecycleEvent, OrderPhase, UiState};
use crate::error::{AppError, AppResult};
use crate::integrations::backend::OrderBackend;
use crate::integrations::mapping::MappingProvider;
use crate::storage::ClientStorage;

use countdown::{CountdownState, PaymentCountdownManager};
use lifecycle::{LifecycleState, OrderLifecycleController, Toast, ToastLevel};
use location_store::{LocationState, LocationStore, WriteOutcome};
use picker::{PickerCoordinator, PickerState};
use poller::{ActiveOrderPoller, PollerState};
use pricing_sync::{PricingState, PricingSyncClient, QuoteOutcome};
use route_guard::{RouteGuard, RouteOutcome, RouteQuery, RouteState};

pub const ORDER_SOURCE: &str = "web_client";
pub const PICKER_GEOCODE_FAILED: &str = "Gagal mendapatkan alamat. Coba lagi.";
pub const SESSION_EXPIRED: &str = "Sesi kamu sudah berakhir. Silakan login ulang.";
const ORDER_IN_PROGRESS: &str = "Order sedang berjalan, form tidak bisa diubah.";
const PHONE_MISSING: &str = "Nomor pelanggan tidak ditemukan. Silakan login ulang.";
const PHONE_INVALID: &str = "Nomor HP tidak valid. Silakan login ulang.";

// Fakta dari task latar belakang, diproses berurutan oleh event loop engine
#[derive(Debug)]
pub enum EngineEvent {
    RouteSettled {
        request_id: u64,
        query: RouteQuery,
        outcome: RouteOutcome,
    },
    QuoteSettled(QuoteOutcome),
    // Hasil poll, dicap epoch poller saat fetch dimulai
    OrderFetched {
        epoch: u64,
        order: Option<OrderResponse>,
    },
    CountdownExpired {
        order_id: String,
    },
    SessionRejected,
}

// Potret mentah semua komponen, bahan untuk render
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub lifecycle: LifecycleState,
    pub locations: LocationState,
    pub picker: PickerState,
    pub route: RouteState,
    pub pricing: PricingState,
    pub countdown: CountdownState,
    pub poller: PollerState,
    pub signed_in: bool,
    pub history: Option<RouteHistory>,
}

struct EngineInner {
    backend: Arc<dyn OrderBackend>,
    mapping: Arc<dyn MappingProvider>,
    storage: Arc<ClientStorage>,
    picker: Arc<PickerCoordinator>,
    locations: Arc<LocationStore>,
    route: Arc<RouteGuard>,
    pricing: Arc<PricingSyncClient>,
    countdown: Arc<PaymentCountdownManager>,
    poller: Arc<ActiveOrderPoller>,
    lifecycle: Arc<OrderLifecycleController>,
    events: mpsc::UnboundedSender<EngineEvent>,
}

/// Engine pemesanan: satu pintu untuk semua aksi user dan semua jawaban backend.
///
/// Setiap komponen memegang state-nya sendiri; engine hanya merangkai urutan kerja
/// (lokasi -> rute -> harga -> submit -> lacak order) dan meneruskan fakta ke
/// lifecycle controller.
#[derive(Clone)]
pub struct OrderingEngine {
    inner: Arc<EngineInner>,
}

impl OrderingEngine {
    pub fn new(
        config: EngineConfig,
        backend: Arc<dyn OrderBackend>,
        mapping: Arc<dyn MappingProvider>,
        storage: Arc<ClientStorage>,
    ) -> Self {
        let (events, rx) = mpsc::unbounded_channel();

        let picker = Arc::new(PickerCoordinator::new());
        let locations = Arc::new(LocationStore::new(picker.clone()));
        let route = Arc::new(RouteGuard::new(
            mapping.clone(),
            config.route_debounce,
            events.clone(),
        ));
        let pricing = Arc::new(PricingSyncClient::new(
            backend.clone(),
            config.fallback_max_distance_km,
        ));
        let countdown = Arc::new(PaymentCountdownManager::new(
            config.qris_countdown_secs,
            events.clone(),
        ));
        let poller = Arc::new(ActiveOrderPoller::new(
            backend.clone(),
            storage.clone(),
            config.poll_interval,
            events.clone(),
        ));
        let lifecycle = Arc::new(OrderLifecycleController::new(
            locations.clone(),
            countdown.clone(),
            poller.clone(),
        ));

        let inner = Arc::new(EngineInner {
            backend,
            mapping,
            storage,
            picker,
            locations,
            route,
            pricing,
            countdown,
            poller,
            lifecycle,
            events,
        });

        tokio::spawn(run_events(Arc::downgrade(&inner), rx));

        Self { inner }
    }

    /// Muat pricing config lalu pulihkan order aktif kalau sudah login.
    pub async fn start(&self) {
        if !self.inner.pricing.load_config().await {
            tracing::warn!("⚠️ Engine jalan tanpa pricing config");
        }

        if self.inner.storage.session_token().is_some() {
            if let Err(e) = self.restore_active_order().await {
                tracing::warn!("⚠️ Gagal memulihkan order aktif: {}", e);
            }
        }

        tracing::info!("✅ Ordering engine siap");
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let inner = &self.inner;
        EngineSnapshot {
            lifecycle: inner.lifecycle.snapshot(),
            locations: inner.locations.snapshot(),
            picker: inner.picker.snapshot(),
            route: inner.route.snapshot(),
            pricing: inner.pricing.snapshot(),
            countdown: inner.countdown.snapshot(),
            poller: inner.poller.snapshot(),
            signed_in: inner.storage.session_token().is_some(),
            history: inner.storage.last_route(),
        }
    }

    pub fn subscribe_toasts(&self) -> broadcast::Receiver<Toast> {
        self.inner.lifecycle.subscribe_toasts()
    }

    // ===== Form =====

    fn ensure_form_editable(&self) -> AppResult<()> {
        if self.inner.lifecycle.ui().inputs_locked() {
            return Err(AppError::conflict(ORDER_IN_PROGRESS));
        }
        Ok(())
    }

    pub fn set_service(&self, service: ServiceType) -> AppResult<()> {
        self.ensure_form_editable()?;
        self.inner.lifecycle.set_service(service);
        tracing::debug!("🛵 Layanan diganti ke {}", service);
        self.refresh_route();
        Ok(())
    }

    pub fn set_car_options(&self, options: CarOptions) -> AppResult<()> {
        if !options.is_valid() {
            return Err(AppError::validation("Jumlah kursi hanya 4 atau 6"));
        }
        self.ensure_form_editable()?;

        let service = self.inner.lifecycle.set_car_options(options);
        if service.is_car() {
            self.refresh_route();
        }
        Ok(())
    }

    pub fn set_payment_method(&self, method: PaymentMethod) -> AppResult<()> {
        self.ensure_form_editable()?;
        self.inner.lifecycle.set_payment_method(method);
        Ok(())
    }

    pub fn set_note(&self, note: String) -> AppResult<()> {
        self.ensure_form_editable()?;
        self.inner.lifecycle.set_note(note.trim().to_string());
        Ok(())
    }

    // ===== Lokasi =====

    /// Tulis titik dari autocomplete atau GPS.
    pub async fn set_location(&self, field: Field, input: LocationInput) -> AppResult<()> {
        match input.source {
            SourceKind::ManualPick => Err(AppError::validation("Titik manual hanya lewat picker peta")),
            SourceKind::Gps => {
                self.use_gps(field, Coordinates::new(input.lat, input.lng), input.address)
                    .await
            }
            SourceKind::Autocomplete => {
                let address = input.address.unwrap_or_default();
                let point = LocationPoint::new(input.lat, input.lng, SourceKind::Autocomplete, address)?;
                self.write_point(field, point)
            }
        }
    }

    // Alamat diketik tanpa memilih saran: cari koordinatnya dulu
    pub async fn set_address_text(&self, field: Field, address: String) -> AppResult<()> {
        let address = address.trim().to_string();
        if address.is_empty() {
            return Err(AppError::validation("Alamat lokasi wajib diisi"));
        }
        self.ensure_writable()?;

        let coordinates = self.inner.mapping.reverse_geocode(address.clone()).await?;
        let point = LocationPoint::new(
            coordinates.lat,
            coordinates.lng,
            SourceKind::Autocomplete,
            address,
        )?;
        self.write_point(field, point)
    }

    pub async fn use_gps(
        &self,
        field: Field,
        coordinates: Coordinates,
        address: Option<String>,
    ) -> AppResult<()> {
        if !coordinates.is_valid() {
            return Err(AppError::validation("Koordinat lokasi tidak valid"));
        }

        let manual = self
            .inner
            .locations
            .get(field)
            .is_some_and(|p| p.source_kind() == SourceKind::ManualPick);
        if manual {
            let message = "Titik ini dipilih manual di peta. Hapus dulu kalau mau pakai GPS.";
            self.inner.lifecycle.notify(ToastLevel::Warning, message);
            return Err(AppError::conflict(message));
        }
        self.ensure_writable()?;

        let address = match address.filter(|a| !a.trim().is_empty()) {
            Some(address) => address,
            None => match self.inner.mapping.geocode(coordinates).await {
                Ok(address) => address,
                Err(e) => {
                    tracing::warn!("⚠️ Geocode GPS gagal, pakai koordinat: {}", e);
                    format!("{:.6}, {:.6}", coordinates.lat, coordinates.lng)
                }
            },
        };

        let point = LocationPoint::new(coordinates.lat, coordinates.lng, SourceKind::Gps, address)?;
        self.write_point(field, point)
    }

    pub fn clear_location(&self, field: Field) -> AppResult<()> {
        match self.inner.locations.clear(field) {
            WriteOutcome::Applied => {
                self.refresh_route();
                Ok(())
            }
            rejected => Err(write_error(rejected)),
        }
    }

    pub fn use_history(&self) -> AppResult<()> {
        let history = self
            .inner
            .storage
            .last_route()
            .ok_or_else(|| AppError::not_found("Belum ada riwayat rute"))?;
        self.ensure_writable()?;

        let pickup = LocationPoint::new(
            history.origin_lat,
            history.origin_lng,
            SourceKind::Autocomplete,
            history.origin_addr.clone(),
        )?;
        let dropoff = LocationPoint::new(
            history.dest_lat,
            history.dest_lng,
            SourceKind::Autocomplete,
            history.dest_addr.clone(),
        )?;

        for (field, point) in [(Field::Pickup, pickup), (Field::Dropoff, dropoff)] {
            let outcome = self.inner.locations.set_point(field, point);
            if !outcome.is_applied() {
                return Err(write_error(outcome));
            }
        }
        self.inner.lifecycle.set_note(history.note);

        tracing::info!("🕘 Rute dari riwayat dipakai");
        self.refresh_route();
        Ok(())
    }

    fn ensure_writable(&self) -> AppResult<()> {
        if !self.inner.locations.inputs_enabled() {
            return Err(AppError::conflict(ORDER_IN_PROGRESS));
        }
        if self.inner.picker.is_locked() {
            return Err(write_error(WriteOutcome::PickerLocked));
        }
        Ok(())
    }

    fn write_point(&self, field: Field, point: LocationPoint) -> AppResult<()> {
        match self.inner.locations.set_point(field, point) {
            WriteOutcome::Applied => {
                self.refresh_route();
                Ok(())
            }
            rejected => Err(write_error(rejected)),
        }
    }

    /// Input berubah: quote lama dibuang, lalu rute dihitung ulang kalau titik lengkap.
    fn refresh_route(&self) {
        let inner = &self.inner;
        inner.pricing.invalidate();
        inner.lifecycle.set_banner(None);

        let locations = inner.locations.locations();
        inner.lifecycle.apply(LifecycleEvent::LocationsChanged {
            complete: locations.is_complete(),
        });

        let Some((origin, destination)) = locations.endpoints() else {
            inner.route.clear();
            return;
        };

        let form = inner.lifecycle.snapshot();
        let query = RouteQuery {
            request: RouteRequest {
                origin,
                destination,
                mode: form.service.travel_mode(),
                avoid_tolls: !(form.service.is_car() && form.car_options.toll),
            },
            service: form.service,
            limit: inner.pricing.distance_limit(form.service),
        };
        inner.route.request_route(query);
    }

    // ===== Picker peta =====

    pub fn picker_open(&self, field: Field) -> AppResult<()> {
        if !self.inner.locations.inputs_enabled() {
            return Err(AppError::conflict(ORDER_IN_PROGRESS));
        }
        let locations = self.inner.locations.locations();
        let center = locations
            .get(field)
            .or(locations.get(other_field(field)))
            .map(|p| p.coordinates());

        self.inner.picker.open(field, center);
        tracing::debug!("🗺️ Picker dibuka untuk {}", field);
        Ok(())
    }

    pub fn picker_move(&self, center: Coordinates) -> AppResult<()> {
        if !center.is_valid() {
            return Err(AppError::validation("Koordinat lokasi tidak valid"));
        }
        if !self.inner.picker.move_center(center) {
            return Err(AppError::conflict("Picker belum dibuka"));
        }
        Ok(())
    }

    /// Geocode titik tengah peta lalu tulis sebagai titik manual.
    pub async fn picker_confirm(&self) -> AppResult<()> {
        let inner = &self.inner;
        let ticket = inner
            .picker
            .begin_confirm()
            .ok_or_else(|| AppError::conflict("Geser peta ke titik yang diinginkan dulu"))?;

        let result = inner.mapping.geocode(ticket.center).await;

        if !inner.picker.is_current(&ticket) {
            tracing::debug!("🗑️ Geocode picker #{} basi, dibuang", ticket.seq);
            return Ok(());
        }

        let address = match result {
            Ok(address) => address,
            Err(e) => {
                tracing::warn!("⚠️ Geocode picker gagal: {}", e);
                inner.picker.fail(&ticket, PICKER_GEOCODE_FAILED);
                return Err(AppError::MappingError(e));
            }
        };

        let point = match LocationPoint::new(
            ticket.center.lat,
            ticket.center.lng,
            SourceKind::ManualPick,
            address,
        ) {
            Ok(point) => point,
            Err(e) => {
                inner.picker.fail(&ticket, PICKER_GEOCODE_FAILED);
                return Err(e);
            }
        };

        let outcome = inner.locations.set_point(ticket.field, point);
        if !outcome.is_applied() {
            return Err(write_error(outcome));
        }

        inner.picker.complete(&ticket);
        self.refresh_route();
        Ok(())
    }

    pub fn picker_cancel(&self) {
        if self.inner.picker.cancel() {
            tracing::debug!("🗺️ Picker ditutup tanpa memilih titik");
        }
    }

    // ===== Order =====

    fn customer_phone(&self) -> AppResult<String> {
        let phone = self
            .inner
            .storage
            .customer_phone()
            .map(|p| normalize_phone(&p))
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::validation(PHONE_MISSING))?;

        if !is_valid_phone(&phone) {
            tracing::warn!("⚠️ Nomor HP tersimpan tidak valid: {}", phone);
            return Err(AppError::validation(PHONE_INVALID));
        }
        Ok(phone)
    }

    /// Kirim order dengan harga yang sudah dikonfirmasi backend.
    pub async fn submit_order(&self) -> AppResult<OrderRecord> {
        let inner = &self.inner;
        let form = inner.lifecycle.snapshot();

        if form.ui.is_tracking() {
            return Err(AppError::conflict("Masih ada order yang sedang berjalan."));
        }

        let locations = inner.locations.locations();
        let (Some(pickup), Some(dropoff)) = (locations.pickup.clone(), locations.dropoff.clone())
        else {
            return Err(AppError::validation("Lengkapi lokasi dulu ya!"));
        };

        let method = form
            .payment_method
            .ok_or_else(|| AppError::validation("Metode pembayaran wajib dipilih."))?;

        if let Some(message) = inner.pricing.snapshot().error {
            return Err(AppError::pricing(message));
        }
        if let Some(failure) = inner.route.snapshot().failure {
            return Err(AppError::route(failure.banner_message()));
        }

        let quote = inner
            .pricing
            .confirmed_quote()
            .filter(|q| {
                q.amount() > 0
                    && q.within_service_limit()
                    && q.matches(form.service, pickup.coordinates(), dropoff.coordinates())
            })
            .ok_or_else(|| AppError::validation("Tunggu estimasi harga..."))?;

        let customer_phone = self.customer_phone()?;

        if inner.lifecycle.apply(LifecycleEvent::SubmitRequested).is_none() {
            return Err(AppError::conflict("Order sedang diproses."));
        }

        // Input sudah terkunci; pastikan tidak ada yang berubah sebelum kunci dipasang
        if inner.locations.locations() != locations || inner.pricing.confirmed_quote().as_ref() != Some(&quote) {
            self.fail_submission();
            return Err(AppError::conflict("Data order berubah, cek lagi sebelum kirim."));
        }

        let request = CreateOrderRequest {
            service: form.service,
            customer_phone,
            pickup_location: pickup.coordinates(),
            dropoff_location: dropoff.coordinates(),
            origin: pickup.display_address().to_string(),
            destination: dropoff.display_address().to_string(),
            payment_method: method,
            note: form.note.clone(),
            price_hint: quote.amount(),
            client_request_id: Uuid::new_v4(),
            source: ORDER_SOURCE,
        };

        tracing::info!(
            "📤 Kirim order {} {} Rp {} ({})",
            request.service,
            method.as_str(),
            quote.amount(),
            request.client_request_id
        );

        let response = match inner
            .backend
            .create_order(request, inner.storage.session_token())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let error = AppError::from(e);
                self.reject_submission(&error);
                return Err(error);
            }
        };

        if let Some(message) = response.error.clone() {
            let error = AppError::order(message);
            self.reject_submission(&error);
            return Err(error);
        }

        let record = match response.into_record(OrderChannel::from(method)) {
            Some(record) if record.awaits_payment() => {
                inner.lifecycle.apply_with_order(
                    LifecycleEvent::SubmissionAccepted(OrderPhase::AwaitingPayment),
                    record.clone(),
                );
                record
            }
            Some(record) if record.status.is_fulfillment() => {
                inner.lifecycle.apply_with_order(
                    LifecycleEvent::SubmissionAccepted(OrderPhase::InFulfillment),
                    record.clone(),
                );
                record
            }
            other => {
                // Status tidak jelas: tanya backend, jangan menebak
                tracing::warn!("⚠️ Jawaban submit tidak dikenali: {:?}", other);
                if let Err(e) = self.restore_active_order().await {
                    tracing::warn!("⚠️ Gagal cek order aktif setelah submit: {}", e);
                }
                match inner.lifecycle.active_order() {
                    Some(record) if inner.lifecycle.ui().is_tracking() => record,
                    _ => {
                        let error = AppError::order("Status order tidak dikenali. Cek riwayat order kamu.");
                        self.reject_submission(&error);
                        return Err(error);
                    }
                }
            }
        };

        self.save_history(&pickup, &dropoff, &form.note);
        inner
            .lifecycle
            .notify(ToastLevel::Success, format!("Order #{} berhasil dibuat", record.short_id()));

        Ok(record)
    }

    fn reject_submission(&self, error: &AppError) {
        tracing::error!("❌ Submit order gagal: {}", error);
        if error.is_session_error() {
            self.on_session_rejected();
        }
        self.fail_submission();
        self.inner.lifecycle.notify(
            ToastLevel::Error,
            format!("Gagal membuat order: {}", error.user_message()),
        );
    }

    fn fail_submission(&self) {
        let inner = &self.inner;
        let form = inner.lifecycle.snapshot();
        let quote_still_valid = inner.pricing.has_confirmed_price()
            && match (inner.locations.locations().endpoints(), inner.pricing.confirmed_quote()) {
                (Some((pickup, dropoff)), Some(quote)) => quote.matches(form.service, pickup, dropoff),
                _ => false,
            };

        inner
            .lifecycle
            .apply(LifecycleEvent::SubmissionFailed { quote_still_valid });

        if !quote_still_valid {
            self.refresh_route();
        }
    }

    fn save_history(&self, pickup: &LocationPoint, dropoff: &LocationPoint, note: &str) {
        let history = RouteHistory {
            origin_addr: pickup.display_address().to_string(),
            origin_lat: pickup.latitude(),
            origin_lng: pickup.longitude(),
            dest_addr: dropoff.display_address().to_string(),
            dest_lat: dropoff.latitude(),
            dest_lng: dropoff.longitude(),
            note: note.to_string(),
        };
        if let Err(e) = self.inner.storage.save_route(history) {
            tracing::warn!("⚠️ Riwayat rute tidak tersimpan: {}", e);
        }
    }

    /// Batalkan order yang sedang dilacak. Aman dipanggil berulang.
    pub async fn cancel_order(&self) -> AppResult<CancelOutcome> {
        let inner = &self.inner;
        let state = inner.lifecycle.snapshot();

        let order = match state.active_order.clone() {
            Some(order) if state.ui.is_tracking() => order,
            _ => {
                if let (Some(OrderStatus::Cancelled), Some(order_id)) =
                    (state.last_outcome, state.last_order_id.clone())
                {
                    tracing::debug!("♻️ Order {} sudah dibatalkan sebelumnya", order_id);
                    return Ok(CancelOutcome {
                        order_id,
                        idempotent: true,
                        status: OrderStatus::Cancelled,
                    });
                }
                return Err(AppError::not_found("Tidak ada order aktif."));
            }
        };

        if !inner.lifecycle.begin_cancel() {
            return Err(AppError::conflict("Pembatalan sedang diproses."));
        }
        let result = self.send_cancel(order).await;
        inner.lifecycle.end_cancel();
        result
    }

    async fn send_cancel(&self, order: OrderRecord) -> AppResult<CancelOutcome> {
        let inner = &self.inner;
        let request = CancelOrderRequest {
            order_id: order.order_id.clone(),
            reason: "user_request".to_string(),
            customer_phone: self.customer_phone()?,
        };

        tracing::info!("🛑 Batalkan order {}", order.order_id);

        let response = match inner
            .backend
            .cancel_order(request, inner.storage.session_token())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let error = AppError::from(e);
                if error.is_session_error() {
                    self.on_session_rejected();
                }
                inner.lifecycle.notify(
                    ToastLevel::Error,
                    format!("Gagal membatalkan order: {}", error.user_message()),
                );
                return Err(error);
            }
        };

        if !response.accepted() {
            let message = response
                .message
                .unwrap_or_else(|| "Order tidak bisa dibatalkan.".to_string());
            inner.lifecycle.notify(ToastLevel::Error, message.clone());
            return Err(AppError::order(message));
        }

        let status = response
            .status
            .filter(|s| s.is_terminal())
            .unwrap_or(OrderStatus::Cancelled);

        let order_id = order.order_id.clone();
        inner.lifecycle.apply_with_order(
            LifecycleEvent::StatusReported(status),
            OrderRecord { status, ..order },
        );
        self.after_order_closed();

        Ok(CancelOutcome {
            order_id,
            idempotent: response.idempotent,
            status,
        })
    }

    /// Tombol "Saya sudah bayar" di modal QRIS.
    pub async fn confirm_payment(&self) -> AppResult<()> {
        let inner = &self.inner;
        let state = inner.lifecycle.snapshot();

        let order = state
            .active_order
            .filter(|_| state.ui == UiState::WaitingPayment)
            .ok_or_else(|| AppError::conflict("Tidak ada pembayaran yang menunggu."))?;

        if inner.countdown.is_expired() {
            return Err(AppError::conflict("Waktu pembayaran sudah habis."));
        }

        if !inner.lifecycle.begin_qris_confirm() {
            tracing::debug!("⏭️ Konfirmasi pembayaran masih berjalan");
            return Err(AppError::conflict("Konfirmasi pembayaran sedang diproses."));
        }

        let result = match self.customer_phone() {
            Ok(customer_phone) => {
                let request = ConfirmPaymentRequest {
                    order_id: order.order_id.clone(),
                    customer_phone,
                };
                inner
                    .backend
                    .confirm_payment(request, inner.storage.session_token())
                    .await
                    .map_err(AppError::from)
            }
            Err(e) => Err(e),
        };
        inner.lifecycle.end_qris_confirm();

        match result {
            Ok(response) if response.success => {
                inner
                    .lifecycle
                    .notify(ToastLevel::Info, "Terima kasih. Kami sedang mengecek pembayaran Anda.");
                inner.poller.fetch_now().await;
                Ok(())
            }
            Ok(response) => {
                let message = response
                    .message
                    .unwrap_or_else(|| "Pembayaran belum terkonfirmasi.".to_string());
                inner.lifecycle.notify(ToastLevel::Warning, message.clone());
                inner.poller.fetch_now().await;
                Err(AppError::order(message))
            }
            Err(error) => {
                if error.is_session_error() {
                    self.on_session_rejected();
                }
                inner.lifecycle.notify(ToastLevel::Error, error.user_message());
                Err(error)
            }
        }
    }

    // Tutup modal QRIS: countdown berhenti, status dicek ke backend
    pub async fn close_qris(&self) {
        self.inner.lifecycle.dismiss_qris();
        self.inner.poller.fetch_now().await;
    }

    pub fn set_visibility(&self, visible: bool) {
        if visible {
            self.inner.poller.resume();
        } else {
            self.inner.poller.pause();
        }
    }

    pub fn dismiss_banner(&self) {
        self.inner.lifecycle.set_banner(None);
    }

    // ===== Session =====

    pub async fn verify_session(&self, token: String) -> AppResult<()> {
        let token = token.trim().to_string();
        if token.is_empty() {
            return Err(AppError::validation("Token login wajib diisi"));
        }

        let grant = self
            .inner
            .backend
            .verify_magic_link(MagicLinkVerifyRequest { token })
            .await?;

        let phone = grant.phone().map(str::to_string);
        self.inner.storage.sign_in(grant.session_token, phone)?;
        tracing::info!("🔐 Login lewat magic link berhasil");
        self.inner.lifecycle.notify(ToastLevel::Success, "Login berhasil");

        if let Err(e) = self.restore_active_order().await {
            tracing::warn!("⚠️ Gagal memulihkan order aktif setelah login: {}", e);
        }
        Ok(())
    }

    /// Tanya backend order yang masih terbuka dan lanjutkan pelacakannya.
    pub async fn restore_active_order(&self) -> AppResult<()> {
        let Some(token) = self.inner.storage.session_token() else {
            return Ok(());
        };

        match self.inner.backend.active_order(token).await {
            Ok(response) => {
                self.on_order_fetched(response.active_order);
                Ok(())
            }
            Err(e) => {
                let error = AppError::from(e);
                if error.is_session_error() {
                    self.on_session_rejected();
                }
                Err(error)
            }
        }
    }

    // ===== Event dari task latar belakang =====

    fn handle(&self, event: EngineEvent) {
        match event {
            EngineEvent::RouteSettled {
                request_id,
                query,
                outcome,
            } => self.on_route_settled(request_id, query, outcome),
            EngineEvent::QuoteSettled(outcome) => self.on_quote_settled(outcome),
            EngineEvent::OrderFetched { epoch, order } => {
                // Poll hanya melanjutkan order yang masih dilacak; pemulihan lewat restore_active_order
                if !self.inner.poller.is_current(epoch) || !self.inner.lifecycle.ui().is_tracking() {
                    tracing::debug!("🗑️ Hasil poll basi (epoch {}) diabaikan", epoch);
                    return;
                }
                self.on_order_fetched(order);
            }
            EngineEvent::CountdownExpired { order_id } => {
                let tracked = self
                    .inner
                    .lifecycle
                    .active_order()
                    .is_some_and(|o| o.order_id == order_id);
                if tracked {
                    let poller = self.inner.poller.clone();
                    tokio::spawn(async move {
                        poller.fetch_now().await;
                    });
                }
            }
            EngineEvent::SessionRejected => self.on_session_rejected(),
        }
    }

    fn on_route_settled(&self, request_id: u64, query: RouteQuery, outcome: RouteOutcome) {
        let inner = &self.inner;
        if !inner.route.is_current(request_id) || inner.lifecycle.ui().inputs_locked() {
            tracing::debug!("🗑️ Hasil rute #{} tidak dipakai", request_id);
            return;
        }

        match outcome {
            RouteOutcome::Committed(estimate) => {
                let form = inner.lifecycle.snapshot();
                let Some((pickup, dropoff)) = inner.locations.locations().endpoints() else {
                    return;
                };
                if query.request.origin != pickup
                    || query.request.destination != dropoff
                    || query.service != form.service
                {
                    tracing::debug!("🗑️ Rute #{} untuk input lama", request_id);
                    return;
                }

                inner.lifecycle.apply(LifecycleEvent::PricingStarted);

                let car_options = form.service.is_car().then_some(form.car_options);
                let engine = self.clone();
                tokio::spawn(async move {
                    let outcome = engine
                        .inner
                        .pricing
                        .fetch_quote(form.service, pickup, dropoff, &estimate, car_options)
                        .await;
                    let _ = engine.inner.events.send(EngineEvent::QuoteSettled(outcome));
                });
            }
            RouteOutcome::Failed(failure) => {
                inner.pricing.invalidate();
                inner.lifecycle.set_banner(Some(failure.banner_message()));
                inner.lifecycle.apply(LifecycleEvent::RouteFailed);
            }
        }
    }

    fn on_quote_settled(&self, outcome: QuoteOutcome) {
        let inner = &self.inner;
        match outcome {
            QuoteOutcome::Confirmed { generation, .. } if inner.pricing.is_current(generation) => {
                inner.lifecycle.apply(LifecycleEvent::QuoteConfirmed);
            }
            QuoteOutcome::Failed { generation, message } if inner.pricing.is_current(generation) => {
                inner.lifecycle.apply(LifecycleEvent::QuoteFailed);
                inner.lifecycle.notify(ToastLevel::Error, message);
            }
            _ => tracing::debug!("🗑️ Hasil quote basi diabaikan"),
        }
    }

    fn on_order_fetched(&self, order: Option<OrderResponse>) {
        let inner = &self.inner;
        let ui = inner.lifecycle.ui();

        let Some(response) = order else {
            if ui.is_tracking() {
                tracing::info!("📭 Backend tidak punya order aktif lagi");
                inner.lifecycle.close_order();
                self.after_order_closed();
            }
            return;
        };

        let channel = inner
            .lifecycle
            .active_order()
            .filter(|o| Some(&o.order_id) == response.order_id.as_ref())
            .map(|o| o.created_via)
            .unwrap_or(OrderChannel::Restored);

        let Some(record) = response.into_record(channel) else {
            tracing::debug!("⏭️ Jawaban order tanpa id/status diabaikan");
            return;
        };

        if record.status == OrderStatus::Unknown {
            tracing::warn!("⚠️ Status order {} tidak dikenali, status lama dipakai", record.order_id);
            return;
        }

        if ui.is_tracking() {
            inner
                .lifecycle
                .apply_with_order(LifecycleEvent::StatusReported(record.status), record);
            self.after_order_closed();
            return;
        }

        let phase = if record.awaits_payment() {
            OrderPhase::AwaitingPayment
        } else if record.status.is_fulfillment() {
            OrderPhase::InFulfillment
        } else {
            return;
        };

        tracing::info!("♻️ Order {} dipulihkan ({})", record.order_id, record.status);
        inner
            .lifecycle
            .apply_with_order(LifecycleEvent::OrderRestored(phase), record);
    }

    // Kembali ke form setelah order tutup: hitung ulang rute untuk titik yang tersisa
    fn after_order_closed(&self) {
        if self.inner.lifecycle.ui() == UiState::Idle && self.inner.locations.locations().is_complete() {
            self.refresh_route();
        }
    }

    fn on_session_rejected(&self) {
        let inner = &self.inner;
        if let Err(e) = inner.storage.sign_out() {
            tracing::warn!("⚠️ Gagal hapus session: {}", e);
        }
        inner.poller.stop();
        inner.lifecycle.notify(ToastLevel::Warning, SESSION_EXPIRED);
    }
}

fn other_field(field: Field) -> Field {
    match field {
        Field::Pickup => Field::Dropoff,
        Field::Dropoff => Field::Pickup,
    }
}

fn write_error(outcome: WriteOutcome) -> AppError {
    match outcome {
        WriteOutcome::PickerLocked => AppError::conflict("Selesaikan pilih titik di peta dulu."),
        _ => AppError::conflict(ORDER_IN_PROGRESS),
    }
}

async fn run_events(engine: Weak<EngineInner>, mut rx: mpsc::UnboundedReceiver<EngineEvent>) {
    while let Some(event) = rx.recv().await {
        let Some(inner) = engine.upgrade() else {
            break;
        };
        OrderingEngine { inner }.handle(event);
    }
    tracing::debug!("🔌 Event loop engine berhenti");
}
