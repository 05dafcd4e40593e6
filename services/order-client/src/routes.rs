// Routes binding layer lokal + dokumentasi OpenAPI
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{AppConfig, AppState};
use crate::handlers::{location_handler, order_handler, session_handler};

#[derive(OpenApi)]
#[openapi(
    paths(
        order_handler::health_check,
        order_handler::get_state,
        order_handler::set_service,
        order_handler::set_car_options,
        order_handler::set_payment_method,
        order_handler::set_note,
        order_handler::submit_order,
        order_handler::cancel_order,
        order_handler::confirm_payment,
        order_handler::close_qris,
        order_handler::set_visibility,
        order_handler::dismiss_banner,

        location_handler::set_location,
        location_handler::set_address_text,
        location_handler::use_gps,
        location_handler::clear_location,
        location_handler::picker_open,
        location_handler::picker_move,
        location_handler::picker_confirm,
        location_handler::picker_cancel,
        location_handler::use_history,

        session_handler::verify_session
    ),
    components(
        schemas(
            crate::render::ClientSnapshot,
            crate::render::SubmitAction,
            crate::render::PriceCard,
            crate::render::QrisView,
            crate::render::OrderView,
            crate::error::ErrorResponse,
            crate::domain::location::LocationInput,
            crate::domain::location::Coordinates,
            crate::domain::pricing::CarOptions,
            crate::domain::pricing::ServiceType,
            crate::domain::order::CancelOutcome,
            crate::domain::session::MagicLinkVerifyRequest,
            order_handler::ServiceRequest,
            order_handler::PaymentMethodRequest,
            order_handler::NoteRequest,
            order_handler::VisibilityRequest,
            order_handler::CancelResponse,
            order_handler::HealthStatus,
            location_handler::AddressTextRequest,
            location_handler::GpsFixRequest,
            location_handler::PickerOpenRequest
        )
    ),
    tags(
        (name = "order", description = "Form order, submit, dan pembatalan"),
        (name = "locations", description = "Titik jemput & tujuan"),
        (name = "picker", description = "Pilih titik manual di peta"),
        (name = "payment", description = "Pembayaran QRIS"),
        (name = "session", description = "Login magic link"),
        (name = "system", description = "Health check & visibilitas halaman")
    ),
    info(
        title = "BANTU JEG - Order Client API",
        description = "Binding lokal untuk halaman pemesanan: membaca state engine dan meneruskan aksi user.",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;

pub fn create_router(state: AppState) -> Router {
    if state.config.is_production() {
        tracing::warn!("Running in PRODUCTION mode");
    } else {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(order_handler::health_check))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes())
        .fallback(not_found_handler)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/state", get(order_handler::get_state))
        .route("/service", post(order_handler::set_service))
        .route("/car-options", post(order_handler::set_car_options))
        .route("/payment-method", post(order_handler::set_payment_method))
        .route("/note", post(order_handler::set_note))

        .route(
            "/locations/{field}",
            put(location_handler::set_location).delete(location_handler::clear_location),
        )
        .route("/locations/{field}/address", post(location_handler::set_address_text))
        .route("/locations/{field}/gps", post(location_handler::use_gps))
        .route("/picker/open", post(location_handler::picker_open))
        .route("/picker/move", post(location_handler::picker_move))
        .route("/picker/confirm", post(location_handler::picker_confirm))
        .route("/picker/cancel", post(location_handler::picker_cancel))
        .route("/history/use", post(location_handler::use_history))

        .route("/orders/submit", post(order_handler::submit_order))
        .route("/orders/cancel", post(order_handler::cancel_order))
        .route("/payments/confirm", post(order_handler::confirm_payment))
        .route("/qris/close", post(order_handler::close_qris))
        .route("/visibility", post(order_handler::set_visibility))
        .route("/banner/dismiss", post(order_handler::dismiss_banner))

        .route("/session/verify", post(session_handler::verify_session))
}

// CORS dari FRONTEND_URL; origin yang tidak valid dilewati
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .frontend_urls
        .iter()
        .filter_map(|url| match url.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ Origin CORS tidak valid dilewati: {}", url);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

async fn not_found_handler() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "API endpoint tidak ditemukan")
}
