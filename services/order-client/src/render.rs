// Render state engine jadi view model untuk halaman (murni, tanpa efek)
use serde::Serialize;
use shared::utils::format::{format_countdown, format_km, format_rupiah};
use utoipa::ToSchema;

use crate::domain::location::{Coordinates, Field, Locations};
use crate::domain::order::{OrderChannel, OrderStatus, PaymentMethod, RouteHistory};
use crate::domain::pricing::{CarOptions, ServiceType};
use crate::domain::ui_state::UiState;
use crate::engine::lifecycle::Toast;
use crate::engine::pricing_sync::PRICING_UNAVAILABLE_TEXT;
use crate::engine::EngineSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SubmitAction {
    pub enabled: bool,
    pub label: String,
}

impl SubmitAction {
    fn disabled(label: &str) -> Self {
        Self {
            enabled: false,
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PickerView {
    pub open: bool,
    pub field: Option<Field>,
    pub center: Option<Coordinates>,
    pub confirming: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RouteView {
    pub pending: bool,
    pub distance_text: Option<String>,
    pub duration_minutes: Option<u32>,
    pub failure: Option<String>,
}

// Kartu harga, hanya ada kalau backend sudah konfirmasi harga
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PriceCard {
    pub amount: i64,
    pub amount_text: String,
    pub strikethrough_text: String,
    pub distance_text: String,
}

// Perkiraan selama loading, ditampilkan dengan tanda "~"
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EstimateView {
    pub amount_text: String,
    pub distance_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderView {
    pub order_id: String,
    pub short_id: String,
    pub status: OrderStatus,
    pub status_message: String,
    pub channel: OrderChannel,
    pub cancelling: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct QrisView {
    pub visible: bool,
    pub amount: i64,
    pub amount_text: String,
    pub remaining_secs: u64,
    pub countdown_text: String,
    pub expired: bool,
    pub confirming: bool,
    pub confirm_enabled: bool,
}

/// Seluruh tampilan halaman order dalam satu potret.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ClientSnapshot {
    pub ui_state: UiState,
    pub service: ServiceType,
    pub car_options: CarOptions,
    pub payment_method: Option<PaymentMethod>,
    pub note: String,
    pub locations: Locations,
    pub inputs_enabled: bool,
    pub picker: PickerView,
    pub route: RouteView,
    pub estimate: Option<EstimateView>,
    pub price_card: Option<PriceCard>,
    pub pricing_error: Option<String>,
    pub submit: SubmitAction,
    pub banner: Option<String>,
    pub toast: Option<Toast>,
    pub order: Option<OrderView>,
    pub qris: Option<QrisView>,
    pub last_outcome: Option<OrderStatus>,
    pub signed_in: bool,
    pub history: Option<RouteHistory>,
}

pub fn render(snapshot: &EngineSnapshot) -> ClientSnapshot {
    let lifecycle = &snapshot.lifecycle;

    let price_card = snapshot.pricing.quote.as_ref().map(|quote| PriceCard {
        amount: quote.amount(),
        amount_text: format_rupiah(quote.amount()),
        strikethrough_text: format_rupiah(quote.strikethrough_amount()),
        distance_text: format_km(quote.distance_km()),
    });

    let estimate = snapshot
        .pricing
        .estimate
        .as_ref()
        .filter(|_| snapshot.pricing.quote.is_none())
        .map(|e| EstimateView {
            amount_text: format!("~ {}", format_rupiah(e.amount)),
            distance_text: format_km(e.distance_km),
        });

    let route = &snapshot.route;
    let route_view = RouteView {
        pending: route.pending,
        distance_text: route.estimate.as_ref().map(|e| format_km(e.distance_km)),
        duration_minutes: route.estimate.as_ref().map(|e| e.duration_minutes),
        failure: route.failure.as_ref().map(|f| f.banner_message()),
    };

    let picker = &snapshot.picker;
    let picker_view = PickerView {
        open: picker.locked,
        field: picker.active_field,
        center: picker.center,
        confirming: picker.confirming,
        error: picker.error.clone(),
    };

    let tracked = lifecycle.active_order.as_ref().filter(|_| lifecycle.ui.is_tracking());

    let order = tracked.map(|o| OrderView {
        order_id: o.order_id.clone(),
        short_id: o.short_id(),
        status: o.status,
        status_message: o.status.status_message(),
        channel: o.created_via,
        cancelling: lifecycle.cancelling,
    });

    let qris = tracked
        .filter(|o| lifecycle.ui == UiState::WaitingPayment && o.awaits_payment())
        .and_then(|o| o.expected_amount())
        .map(|amount| {
            let countdown = &snapshot.countdown;
            QrisView {
                visible: !lifecycle.qris_dismissed,
                amount,
                amount_text: format_rupiah(amount),
                remaining_secs: countdown.remaining_secs,
                countdown_text: format_countdown(countdown.remaining_secs),
                expired: countdown.expired,
                confirming: lifecycle.qris_confirming,
                confirm_enabled: !countdown.expired && !lifecycle.qris_confirming,
            }
        });

    ClientSnapshot {
        ui_state: lifecycle.ui,
        service: lifecycle.service,
        car_options: lifecycle.car_options,
        payment_method: lifecycle.payment_method,
        note: lifecycle.note.clone(),
        locations: snapshot.locations.locations.clone(),
        inputs_enabled: snapshot.locations.inputs_enabled,
        picker: picker_view,
        route: route_view,
        estimate,
        price_card,
        pricing_error: snapshot.pricing.error.clone(),
        submit: submit_action(snapshot),
        banner: lifecycle.banner.clone(),
        toast: lifecycle.last_toast.clone(),
        order,
        qris,
        last_outcome: lifecycle.last_outcome,
        signed_in: snapshot.signed_in,
        history: snapshot.history.clone(),
    }
}

/// Label dan status tombol order. Urutan cek = urutan prioritas pesan.
pub fn submit_action(snapshot: &EngineSnapshot) -> SubmitAction {
    let lifecycle = &snapshot.lifecycle;
    let locations = &snapshot.locations.locations;
    let pricing = &snapshot.pricing;

    if lifecycle.ui == UiState::Submitting {
        return SubmitAction::disabled("⏳ Memproses...");
    }
    if lifecycle.ui.is_tracking() {
        return SubmitAction::disabled("Order Sedang Berjalan");
    }

    let Some((pickup, dropoff)) = locations.endpoints() else {
        return SubmitAction::disabled("Isi Lokasi Dulu");
    };

    if lifecycle.payment_method.is_none() {
        return SubmitAction::disabled("Pilih Pembayaran");
    }

    if pricing.error.is_some() {
        return SubmitAction::disabled(PRICING_UNAVAILABLE_TEXT);
    }

    if snapshot.route.failure.is_some() {
        return SubmitAction::disabled("Periksa Data");
    }

    let Some(quote) = pricing.quote.as_ref() else {
        return SubmitAction::disabled("Menghitung Harga...");
    };

    let usable = quote.amount() > 0
        && quote.within_service_limit()
        && quote.matches(lifecycle.service, pickup, dropoff)
        && lifecycle.ui == UiState::Priced;

    if !usable {
        return SubmitAction::disabled("Periksa Data");
    }

    SubmitAction {
        enabled: true,
        label: format!("GAS ORDER • {}", format_rupiah(quote.amount())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::location::{LocationPoint, SourceKind};
    use crate::domain::order::{OrderRecord, PaymentInfo};
    use crate::domain::pricing::PriceQuote;
    use crate::domain::route::RouteFailure;
    use crate::engine::countdown::CountdownState;
    use crate::engine::lifecycle::LifecycleState;
    use crate::engine::location_store::LocationState;
    use crate::engine::picker::PickerState;
    use crate::engine::poller::PollerState;
    use crate::engine::pricing_sync::PricingState;
    use crate::engine::route_guard::RouteState;

    fn empty() -> EngineSnapshot {
        EngineSnapshot {
            lifecycle: LifecycleState::default(),
            locations: LocationState::default(),
            picker: PickerState::default(),
            route: RouteState::default(),
            pricing: PricingState::default(),
            countdown: CountdownState::default(),
            poller: PollerState::default(),
            signed_in: true,
            history: None,
        }
    }

    fn priced(amount: i64) -> EngineSnapshot {
        let mut s = empty();
        let pickup = LocationPoint::new(-7.33, 110.50, SourceKind::Gps, "Rumah").unwrap();
        let dropoff = LocationPoint::new(-7.35, 110.52, SourceKind::Autocomplete, "Kantor").unwrap();
        s.pricing.quote = Some(PriceQuote::confirmed(
            amount,
            3.2,
            true,
            ServiceType::Ride,
            pickup.coordinates(),
            dropoff.coordinates(),
        ));
        s.locations.locations.pickup = Some(pickup);
        s.locations.locations.dropoff = Some(dropoff);
        s.lifecycle.payment_method = Some(PaymentMethod::Cash);
        s.lifecycle.ui = UiState::Priced;
        s
    }

    #[test]
    fn test_submit_label_progression() {
        let mut s = empty();
        assert_eq!(submit_action(&s).label, "Isi Lokasi Dulu");

        s = priced(12_000);
        s.lifecycle.payment_method = None;
        assert_eq!(submit_action(&s).label, "Pilih Pembayaran");

        s = priced(12_000);
        s.pricing.quote = None;
        s.lifecycle.ui = UiState::PricingLoading;
        assert_eq!(submit_action(&s).label, "Menghitung Harga...");

        s = priced(12_000);
        let action = submit_action(&s);
        assert!(action.enabled);
        assert_eq!(action.label, "GAS ORDER • Rp 12.000");

        s.lifecycle.ui = UiState::Submitting;
        assert_eq!(submit_action(&s).label, "⏳ Memproses...");
    }

    #[test]
    fn test_submit_disabled_when_pricing_failed() {
        let mut s = priced(12_000);
        s.pricing.quote = None;
        s.pricing.error = Some(PRICING_UNAVAILABLE_TEXT.to_string());
        s.lifecycle.ui = UiState::RouteReady;

        let action = submit_action(&s);
        assert!(!action.enabled);
        assert_eq!(action.label, PRICING_UNAVAILABLE_TEXT);
        assert!(render(&s).price_card.is_none(), "Kartu harga disembunyikan tanpa harga backend");
    }

    #[test]
    fn test_quote_for_other_point_disables_submit() {
        let mut s = priced(12_000);
        s.locations.locations.dropoff =
            Some(LocationPoint::new(-7.40, 110.60, SourceKind::Autocomplete, "Pasar").unwrap());

        let action = submit_action(&s);
        assert!(!action.enabled, "Quote untuk titik lama tidak boleh dipakai");
        assert_eq!(action.label, "Periksa Data");

        let mut s = priced(12_000);
        s.route.failure = Some(RouteFailure::NoRoute);
        assert_eq!(submit_action(&s).label, "Periksa Data");
    }

    #[test]
    fn test_price_card_and_estimate() {
        let s = priced(25_000);
        let view = render(&s);
        let card = view.price_card.unwrap();
        assert_eq!(card.amount_text, "Rp 25.000");
        assert_eq!(card.strikethrough_text, "Rp 27.500");
        assert!(view.estimate.is_none());

        let mut s = priced(25_000);
        s.pricing.quote = None;
        s.pricing.estimate = Some(crate::domain::pricing::DisplayEstimate { amount: 13_000, distance_km: 3.2 });
        let view = render(&s);
        assert!(view.price_card.is_none());
        assert_eq!(view.estimate.unwrap().amount_text, "~ Rp 13.000");
    }

    #[test]
    fn test_qris_view() {
        let mut s = priced(25_000);
        s.lifecycle.ui = UiState::WaitingPayment;
        s.lifecycle.active_order = Some(OrderRecord {
            order_id: "ab12cd34-ffff".into(),
            status: OrderStatus::WaitingPayment,
            payment_info: Some(PaymentInfo { expected_amount: 25_000.0 }),
            created_via: OrderChannel::Qris,
        });
        s.countdown = CountdownState {
            order_id: Some("ab12cd34-ffff".into()),
            remaining_secs: 754,
            active: true,
            expired: false,
        };

        let view = render(&s);
        let qris = view.qris.unwrap();
        assert!(qris.visible);
        assert_eq!(qris.amount_text, "Rp 25.000");
        assert_eq!(qris.countdown_text, "12:34");
        assert!(qris.confirm_enabled);
        assert_eq!(view.order.unwrap().short_id, "AB12CD34");
        assert_eq!(view.submit.label, "Order Sedang Berjalan");

        s.countdown.remaining_secs = 0;
        s.countdown.expired = true;
        let qris = render(&s).qris.unwrap();
        assert!(qris.expired);
        assert!(!qris.confirm_enabled, "Tombol bayar mati setelah waktu habis");
    }

    #[test]
    fn test_no_qris_without_amount() {
        let mut s = priced(25_000);
        s.lifecycle.ui = UiState::WaitingPayment;
        s.lifecycle.active_order = Some(OrderRecord {
            order_id: "ab12cd34".into(),
            status: OrderStatus::WaitingPayment,
            payment_info: None,
            created_via: OrderChannel::Qris,
        });
        assert!(render(&s).qris.is_none());
    }
}
