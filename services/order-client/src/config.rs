// Order Client Configuration
use shared::ServiceClient;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::OrderingEngine;
use crate::integrations::{HttpMappingProvider, HttpOrderBackend};
use crate::storage::ClientStorage;

// Parameter engine (timer, batas jarak fallback)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub route_debounce: Duration,
    pub poll_interval: Duration,
    pub qris_countdown_secs: u64,
    pub fallback_max_distance_km: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            route_debounce: Duration::from_millis(600),
            poll_interval: Duration::from_secs(5),
            qris_countdown_secs: 15 * 60,
            fallback_max_distance_km: 25.0,
        }
    }
}

// Konfigurasi aplikasi dari environment variables
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub order_api_url: String,
    pub mapping_api_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub frontend_urls: Vec<String>,
    pub http_timeout: Duration,
    pub storage_path: String,
    pub engine: EngineConfig,
}

impl AppConfig {
    // Load konfigurasi dari environment dengan validasi
    pub fn from_env() -> Result<Self, String> {
        let defaults = EngineConfig::default();

        let order_api_url = env::var("ORDER_API_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let mapping_api_url = env::var("MAPPING_API_URL")
            .unwrap_or_else(|_| "http://localhost:3100".to_string());

        let server_host = env::var("ORDER_CLIENT_HOST")
            .unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = parse_var("ORDER_CLIENT_PORT", 8088u16)?;

        let environment = env::var("RUST_ENV")
            .unwrap_or_else(|_| "development".to_string());

        let frontend_urls = env::var("FRONTEND_URL")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        if environment == "production" && frontend_urls.is_empty() {
            return Err("FRONTEND_URL harus diset untuk production".to_string());
        }

        // Development tanpa FRONTEND_URL: izinkan dev server lokal
        let frontend_urls = if frontend_urls.is_empty() {
            vec![
                "http://localhost:5173".to_string(),
                "http://localhost:8080".to_string(),
            ]
        } else {
            frontend_urls
        };

        let http_timeout = Duration::from_secs(parse_var("HTTP_TIMEOUT_SECS", 30u64)?);

        let storage_path = env::var("CLIENT_STORAGE_PATH")
            .unwrap_or_else(|_| ".order-client/state.json".to_string());

        let engine = EngineConfig {
            route_debounce: Duration::from_millis(parse_var("ROUTE_DEBOUNCE_MS", 600u64)?),
            poll_interval: Duration::from_secs(parse_var("ORDER_POLL_INTERVAL_SECS", 5u64)?),
            qris_countdown_secs: parse_var("QRIS_COUNTDOWN_SECS", defaults.qris_countdown_secs)?,
            fallback_max_distance_km: parse_var(
                "FALLBACK_MAX_DISTANCE_KM",
                defaults.fallback_max_distance_km,
            )?,
        };

        if engine.poll_interval.is_zero() {
            return Err("ORDER_POLL_INTERVAL_SECS harus lebih dari 0".to_string());
        }

        if engine.fallback_max_distance_km <= 0.0 {
            return Err("FALLBACK_MAX_DISTANCE_KM harus lebih dari 0".to_string());
        }

        Ok(AppConfig {
            order_api_url,
            mapping_api_url,
            server_host,
            server_port,
            environment,
            frontend_urls,
            http_timeout,
            storage_path,
            engine,
        })
    }

    // Helper cek production mode
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn host(&self) -> &str {
        &self.server_host
    }

    pub fn port(&self) -> u16 {
        self.server_port
    }
}

// Baca env var numerik, pakai default kalau tidak diset
fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} tidak valid: '{}'", name, raw)),
        _ => Ok(default),
    }
}

// Application state yang di-share ke semua handlers
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub engine: OrderingEngine,
}

impl axum::extract::FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl axum::extract::FromRef<AppState> for OrderingEngine {
    fn from_ref(state: &AppState) -> Self {
        state.engine.clone()
    }
}

impl AppState {
    // Inisialisasi application state: HTTP clients, storage, engine
    pub async fn new(config: AppConfig) -> Result<Self, String> {
        let order_client = ServiceClient::new(&config.order_api_url, config.http_timeout)
            .map_err(|e| format!("Failed to create order API client: {}", e))?;

        let mapping_client = ServiceClient::new(&config.mapping_api_url, config.http_timeout)
            .map_err(|e| format!("Failed to create mapping client: {}", e))?;

        let storage = ClientStorage::open(&config.storage_path)
            .map_err(|e| format!("Failed to open client storage: {}", e))?;

        let engine = OrderingEngine::new(
            config.engine.clone(),
            Arc::new(HttpOrderBackend::new(order_client)),
            Arc::new(HttpMappingProvider::new(mapping_client)),
            Arc::new(storage),
        );

        engine.start().await;

        Ok(AppState { config, engine })
    }

    // Inisialisasi application state dari environment
    pub async fn from_env() -> Result<Self, String> {
        let config = AppConfig::from_env()?;
        Self::new(config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.route_debounce, Duration::from_millis(600));
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.qris_countdown_secs, 900, "Countdown QRIS default 15 menit");
        assert_eq!(cfg.fallback_max_distance_km, 25.0);
    }

    #[test]
    fn test_parse_var_default_when_unset() {
        let value: u64 = parse_var("ORDER_CLIENT_TEST_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }
}
