// Main entry point untuk order-client
// Menjalankan engine pemesanan dan binding HTTP lokal untuk halaman order
use anyhow::Context;
use dotenvy::dotenv;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use order_client::routes::create_router;
use order_client::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables dari .env file
    match dotenv() {
        Ok(path) => println!("✅ Environment loaded dari: {:?}", path),
        Err(e) => println!("⚠️  Tidak bisa load .env: {} (menggunakan system env)", e),
    }

    setup_logging();

    tracing::info!("🚀 Memulai BANTU JEG - Order Client");

    let config = AppConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("Gagal load konfigurasi")?;

    tracing::info!("✅ Konfigurasi berhasil dimuat");
    tracing::info!("📦 Order API: {}", config.order_api_url);
    tracing::info!("🗺️ Mapping API: {}", config.mapping_api_url);
    tracing::info!("🔧 Environment: {}", config.environment);
    tracing::info!(
        "⏱️ Debounce rute {:?}, poll {:?}, countdown QRIS {} detik",
        config.engine.route_debounce,
        config.engine.poll_interval,
        config.engine.qris_countdown_secs
    );

    // Engine start: load pricing config + pulihkan order aktif
    let app_state = AppState::new(config)
        .await
        .map_err(anyhow::Error::msg)
        .context("Gagal inisialisasi app state")?;

    let addr: SocketAddr = format!("{}:{}", app_state.config.host(), app_state.config.port())
        .parse()
        .context("Alamat server tidak valid")?;

    let app = create_router(app_state);

    tracing::info!("🌐 Server listening on http://{}", addr);
    tracing::info!("📚 Swagger UI: http://{}/docs", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Gagal bind server ke {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("✅ Server shutdown gracefully");
    Ok(())
}

fn setup_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "order_client=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// Signal handler untuk graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to setup Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to setup terminate signal handler");
        signal.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("🛑 Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("🛑 Received terminate signal, shutting down gracefully...");
        },
    }
}
