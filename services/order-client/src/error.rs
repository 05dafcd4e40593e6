use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::HttpClientError;
use thiserror::Error;
use utoipa::ToSchema;

use crate::integrations::mapping::MappingError;

// Struktur response error yang konsisten untuk semua endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// Semua jenis error di order client
#[derive(Debug, Error)]
pub enum AppError {
    // Input user kurang / salah, tidak ada network call
    #[error("Validation error: {0}")]
    ValidationError(String),

    // Aksi ditolak karena state sekarang (form terkunci, picker aktif, dll)
    #[error("Conflict: {0}")]
    ConflictError(String),

    #[error("Not found: {0}")]
    NotFoundError(String),

    // Rute tidak ketemu / melebihi batas jarak layanan
    #[error("Route error: {0}")]
    RouteError(String),

    // Harga tidak bisa dikonfirmasi backend (fail-closed)
    #[error("Pricing error: {0}")]
    PricingError(String),

    #[error("Order error: {0}")]
    OrderError(String),

    #[error("Backend error: {0}")]
    UpstreamError(#[from] HttpClientError),

    #[error("Mapping error: {0}")]
    MappingError(#[from] MappingError),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match &self {
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
                None,
            ),
            AppError::ConflictError(msg) => {
                (StatusCode::CONFLICT, "conflict", msg.clone(), None)
            }
            AppError::NotFoundError(msg) => {
                (StatusCode::NOT_FOUND, "not_found", msg.clone(), None)
            }
            AppError::RouteError(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "route_error",
                msg.clone(),
                None,
            ),
            AppError::PricingError(msg) => {
                tracing::warn!("Pricing error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "pricing_error",
                    msg.clone(),
                    None,
                )
            }
            AppError::OrderError(msg) => {
                tracing::warn!("Order error: {}", msg);
                (StatusCode::BAD_REQUEST, "order_error", msg.clone(), None)
            }
            AppError::UpstreamError(e) => {
                tracing::error!("Backend error: {:?}", e);
                let status = if e.is_session_error() {
                    StatusCode::UNAUTHORIZED
                } else {
                    StatusCode::BAD_GATEWAY
                };
                (
                    status,
                    "backend_error",
                    "Terjadi kesalahan komunikasi dengan server order".to_string(),
                    if cfg!(debug_assertions) {
                        Some(e.to_string())
                    } else {
                        None
                    },
                )
            }
            AppError::MappingError(e) => {
                tracing::error!("Mapping error: {:?}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "mapping_error",
                    "Layanan peta sedang bermasalah".to_string(),
                    if cfg!(debug_assertions) {
                        Some(e.to_string())
                    } else {
                        None
                    },
                )
            }
            AppError::StorageError(msg) => {
                tracing::error!("Storage error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    "Gagal menyimpan data lokal".to_string(),
                    if cfg!(debug_assertions) {
                        Some(msg.clone())
                    } else {
                        None
                    },
                )
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(error_response)).into_response()
    }
}

// Helper functions untuk membuat error dengan mudah
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::ConflictError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFoundError(msg.into())
    }

    pub fn route(msg: impl Into<String>) -> Self {
        AppError::RouteError(msg.into())
    }

    pub fn pricing(msg: impl Into<String>) -> Self {
        AppError::PricingError(msg.into())
    }

    pub fn order(msg: impl Into<String>) -> Self {
        AppError::OrderError(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        AppError::StorageError(msg.into())
    }

    /// Error dari backend yang berarti session sudah tidak berlaku
    pub fn is_session_error(&self) -> bool {
        match self {
            AppError::UpstreamError(e) => e.is_session_error(),
            _ => false,
        }
    }

    /// Pesan yang aman ditampilkan ke user (toast)
    pub fn user_message(&self) -> String {
        match self {
            AppError::ValidationError(msg)
            | AppError::ConflictError(msg)
            | AppError::NotFoundError(msg)
            | AppError::RouteError(msg)
            | AppError::PricingError(msg)
            | AppError::OrderError(msg) => msg.clone(),
            AppError::UpstreamError(HttpClientError::Rejected { message, .. }) => message.clone(),
            AppError::UpstreamError(HttpClientError::Unauthorized { .. }) => {
                "Sesi kamu sudah berakhir. Silakan login ulang.".to_string()
            }
            AppError::UpstreamError(_) => "Koneksi ke server gagal. Coba lagi.".to_string(),
            AppError::MappingError(_) => "Layanan peta sedang bermasalah".to_string(),
            AppError::StorageError(_) => "Terjadi kesalahan. Coba lagi.".to_string(),
        }
    }
}

// Type alias untuk Result dengan AppError sebagai error type
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_detection() {
        let err = AppError::from(HttpClientError::Unauthorized {
            status: 401,
            message: "expired".into(),
        });
        assert!(err.is_session_error());
        assert!(!AppError::validation("x").is_session_error());
    }

    #[test]
    fn test_user_message_uses_backend_rejection_text() {
        let err = AppError::from(HttpClientError::Rejected {
            status: 400,
            message: "Driver tidak tersedia".into(),
        });
        assert_eq!(err.user_message(), "Driver tidak tersedia");

        let err = AppError::from(HttpClientError::RequestFailed("timeout".into()));
        assert_eq!(err.user_message(), "Koneksi ke server gagal. Coba lagi.");
    }

    #[test]
    fn test_status_mapping() {
        let response = AppError::conflict("Form terkunci").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = AppError::route("Jarak terlalu jauh").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = AppError::pricing("Server pricing sibuk").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = AppError::from(HttpClientError::Unauthorized {
            status: 403,
            message: "x".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
