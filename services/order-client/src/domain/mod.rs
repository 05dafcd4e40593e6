pub mod location;
pub mod order;
pub mod pricing;
pub mod route;
pub mod session;
pub mod ui_state;

pub use location::{Coordinates, Field, LocationInput, LocationPoint, Locations, SourceKind};
pub use order::{OrderRecord, OrderStatus, PaymentMethod, RouteHistory};
pub use pricing::{CarOptions, PriceQuote, PricingConfig, ServiceType};
pub use route::{RouteEstimate, RouteFailure, TravelMode};
pub use ui_state::{LifecycleEvent, OrderPhase, UiState};
