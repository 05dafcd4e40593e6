use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::order::OrderStatus;

// State UI order, hanya diubah oleh lifecycle controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UiState {
    #[default]
    Idle,
    RouteReady,
    PricingLoading,
    Priced,
    Submitting,
    WaitingPayment,
    Active,
    Completed,
    Cancelled,
    Expired,
}

// Fase order yang sudah dibuka di backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPhase {
    AwaitingPayment,
    InFulfillment,
}

impl OrderPhase {
    fn state(self) -> UiState {
        match self {
            OrderPhase::AwaitingPayment => UiState::WaitingPayment,
            OrderPhase::InFulfillment => UiState::Active,
        }
    }
}

// Fakta yang dilaporkan komponen lain ke controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    LocationsChanged { complete: bool },
    PricingStarted,
    QuoteConfirmed,
    QuoteFailed,
    RouteFailed,
    SubmitRequested,
    SubmissionAccepted(OrderPhase),
    SubmissionFailed { quote_still_valid: bool },
    StatusReported(OrderStatus),
    OrderRestored(OrderPhase),
    OrderClosed,
    Reset,
}

impl UiState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UiState::Idle => "IDLE",
            UiState::RouteReady => "ROUTE_READY",
            UiState::PricingLoading => "PRICING_LOADING",
            UiState::Priced => "PRICED",
            UiState::Submitting => "SUBMITTING",
            UiState::WaitingPayment => "WAITING_PAYMENT",
            UiState::Active => "ACTIVE",
            UiState::Completed => "COMPLETED",
            UiState::Cancelled => "CANCELLED",
            UiState::Expired => "EXPIRED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UiState::Completed | UiState::Cancelled | UiState::Expired)
    }

    // Ada order terbuka yang sedang dilacak
    pub fn is_tracking(&self) -> bool {
        matches!(self, UiState::WaitingPayment | UiState::Active)
    }

    // Form order dikunci selama submit dan selama order terbuka
    pub fn inputs_locked(&self) -> bool {
        matches!(self, UiState::Submitting | UiState::WaitingPayment | UiState::Active)
    }

    // Tahap pengisian form (belum submit)
    fn is_form_stage(&self) -> bool {
        matches!(
            self,
            UiState::Idle | UiState::RouteReady | UiState::PricingLoading | UiState::Priced
        ) || self.is_terminal()
    }

    /// Tabel transisi. `None` berarti event tidak berlaku di state ini dan diabaikan.
    pub fn next(self, event: LifecycleEvent) -> Option<UiState> {
        use LifecycleEvent as E;
        use UiState as S;

        match (self, event) {
            (s, E::LocationsChanged { complete }) if s.is_form_stage() => {
                Some(if complete { S::RouteReady } else { S::Idle })
            }

            (S::RouteReady | S::Priced | S::PricingLoading, E::PricingStarted) => {
                Some(S::PricingLoading)
            }
            (S::PricingLoading, E::QuoteConfirmed) => Some(S::Priced),
            (S::PricingLoading | S::Priced, E::QuoteFailed) => Some(S::RouteReady),
            (S::RouteReady | S::PricingLoading | S::Priced, E::RouteFailed) => Some(S::RouteReady),

            (S::Priced, E::SubmitRequested) => Some(S::Submitting),
            (S::Submitting, E::SubmissionAccepted(phase)) => Some(phase.state()),
            (S::Submitting, E::SubmissionFailed { quote_still_valid }) => {
                Some(if quote_still_valid { S::Priced } else { S::Idle })
            }

            (S::WaitingPayment | S::Active, E::StatusReported(status)) => match status {
                OrderStatus::Completed => Some(S::Completed),
                OrderStatus::Cancelled => Some(S::Cancelled),
                OrderStatus::Expired => Some(S::Expired),
                status if status.is_fulfillment() => Some(S::Active),
                OrderStatus::WaitingPayment if self == S::WaitingPayment => Some(S::WaitingPayment),
                _ => None,
            },

            (s, E::OrderRestored(phase)) if s.is_form_stage() || s == S::Submitting => {
                Some(phase.state())
            }
            (S::WaitingPayment | S::Active, E::OrderClosed) => Some(S::Idle),

            (s, E::Reset) if s.is_terminal() => Some(S::Idle),

            _ => None,
        }
    }
}

impl std::fmt::Display for UiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
