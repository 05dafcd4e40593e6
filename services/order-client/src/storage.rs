use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::domain::order::RouteHistory;
use crate::error::{AppError, AppResult};

// Data yang disimpan di storage client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub last_route: Option<RouteHistory>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Storage lokal client: token session, nomor HP, dan riwayat rute terakhir.
///
/// Disimpan sebagai satu file JSON. Tanpa path, data hanya hidup di memori.
pub struct ClientStorage {
    path: Option<PathBuf>,
    state: Mutex<PersistedState>,
}

impl ClientStorage {
    // Load dari file, file yang belum ada dianggap kosong
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();

        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("⚠️ Storage client rusak ({}), mulai dari kosong", e);
                PersistedState::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PersistedState::default(),
            Err(e) => return Err(AppError::storage(format!("Gagal baca {}: {}", path.display(), e))),
        };

        tracing::debug!("💾 Storage client: {}", path.display());

        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(PersistedState::default()),
        }
    }

    pub fn snapshot(&self) -> PersistedState {
        self.lock().clone()
    }

    pub fn session_token(&self) -> Option<String> {
        self.lock().session_token.clone()
    }

    pub fn customer_phone(&self) -> Option<String> {
        self.lock().customer_phone.clone()
    }

    pub fn last_route(&self) -> Option<RouteHistory> {
        self.lock().last_route.clone()
    }

    pub fn sign_in(&self, token: String, phone: Option<String>) -> AppResult<()> {
        self.update(|s| {
            s.session_token = Some(token);
            if phone.is_some() {
                s.customer_phone = phone;
            }
        })
    }

    // Hapus token saja; nomor HP dan riwayat tetap disimpan
    pub fn sign_out(&self) -> AppResult<()> {
        self.update(|s| s.session_token = None)
    }

    pub fn save_route(&self, history: RouteHistory) -> AppResult<()> {
        self.update(|s| s.last_route = Some(history))
    }

    fn update(&self, f: impl FnOnce(&mut PersistedState)) -> AppResult<()> {
        let mut state = self.lock();
        f(&mut state);
        state.updated_at = Some(Utc::now());

        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::storage(format!("Gagal buat folder storage: {}", e)))?;
        }

        let raw = serde_json::to_string_pretty(&*state)
            .map_err(|e| AppError::storage(e.to_string()))?;

        std::fs::write(path, raw)
            .map_err(|e| AppError::storage(format!("Gagal tulis {}: {}", path.display(), e)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PersistedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> RouteHistory {
        RouteHistory {
            origin_addr: "Jl. Diponegoro".into(),
            origin_lat: -7.33,
            origin_lng: 110.50,
            dest_addr: "Pasar Raya".into(),
            dest_lat: -7.34,
            dest_lng: 110.52,
            note: "depan gerbang".into(),
        }
    }

    #[test]
    fn test_sign_in_and_out() {
        let storage = ClientStorage::in_memory();
        storage.sign_in("tok".into(), Some("6281234567890".into())).unwrap();
        assert_eq!(storage.session_token().as_deref(), Some("tok"));

        storage.sign_out().unwrap();
        assert!(storage.session_token().is_none());
        assert_eq!(storage.customer_phone().as_deref(), Some("6281234567890"), "Nomor HP tidak ikut dihapus");
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = std::env::temp_dir().join(format!("order-client-{}", uuid::Uuid::new_v4()));
        let path = dir.join("state.json");

        let storage = ClientStorage::open(&path).unwrap();
        storage.sign_in("tok-file".into(), None).unwrap();
        storage.save_route(history()).unwrap();

        let reopened = ClientStorage::open(&path).unwrap();
        assert_eq!(reopened.session_token().as_deref(), Some("tok-file"));
        assert_eq!(reopened.last_route(), Some(history()));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = std::env::temp_dir().join(format!("order-client-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.json");
        std::fs::write(&path, "{bukan json").unwrap();

        let storage = ClientStorage::open(&path).unwrap();
        assert_eq!(storage.snapshot(), PersistedState::default());

        let _ = std::fs::remove_dir_all(dir);
    }
}
