use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

use crate::domain::location::{Coordinates, Field, SourceKind};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickerState {
    pub locked: bool,
    pub active_field: Option<Field>,
    pub center: Option<Coordinates>,
    pub confirming: bool,
    pub error: Option<String>,
}

// Satu percobaan confirm (geocode titik tengah peta)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfirmTicket {
    pub seq: u64,
    pub field: Field,
    pub center: Coordinates,
}

/// Lock picker peta.
///
/// Selama picker terbuka hanya titik manual untuk field aktif yang boleh ditulis;
/// autocomplete dan GPS ditolak. Lock hanya dilepas lewat confirm atau cancel.
pub struct PickerCoordinator {
    state: watch::Sender<PickerState>,
    confirm_seq: AtomicU64,
}

impl Default for PickerCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl PickerCoordinator {
    pub fn new() -> Self {
        let (state, _) = watch::channel(PickerState::default());
        Self {
            state,
            confirm_seq: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> PickerState {
        self.state.borrow().clone()
    }

    pub fn is_locked(&self) -> bool {
        self.state.borrow().locked
    }

    // Buka picker; kalau sudah terbuka, pindah ke field baru tanpa close dulu
    pub fn open(&self, field: Field, center: Option<Coordinates>) {
        self.confirm_seq.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| {
            if s.locked && s.active_field != Some(field) {
                tracing::debug!("📍 Picker pindah {:?} -> {}", s.active_field, field);
            }
            *s = PickerState {
                locked: true,
                active_field: Some(field),
                center: center.or(s.center),
                confirming: false,
                error: None,
            };
        });
    }

    pub fn move_center(&self, center: Coordinates) -> bool {
        self.state.send_if_modified(|s| {
            if !s.locked {
                return false;
            }
            s.center = Some(center);
            true
        })
    }

    pub fn begin_confirm(&self) -> Option<ConfirmTicket> {
        let mut ticket = None;
        self.state.send_if_modified(|s| {
            let (true, Some(field), Some(center)) = (s.locked, s.active_field, s.center) else {
                return false;
            };
            let seq = self.confirm_seq.fetch_add(1, Ordering::SeqCst) + 1;
            ticket = Some(ConfirmTicket { seq, field, center });
            s.confirming = true;
            s.error = None;
            true
        });
        ticket
    }

    // Confirm masih milik percobaan terakhir dan picker masih di field yang sama
    pub fn is_current(&self, ticket: &ConfirmTicket) -> bool {
        let s = self.state.borrow();
        self.confirm_seq.load(Ordering::SeqCst) == ticket.seq
            && s.locked
            && s.active_field == Some(ticket.field)
    }

    pub fn complete(&self, ticket: &ConfirmTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.confirm_seq.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(PickerState::default());
        true
    }

    pub fn fail(&self, ticket: &ConfirmTicket, message: &str) {
        if !self.is_current(ticket) {
            return;
        }
        self.state.send_modify(|s| {
            s.confirming = false;
            s.error = Some(message.to_string());
        });
    }

    pub fn cancel(&self) -> bool {
        self.confirm_seq.fetch_add(1, Ordering::SeqCst);
        self.state.send_if_modified(|s| {
            if !s.locked {
                return false;
            }
            *s = PickerState::default();
            true
        })
    }

    /// Boleh tidaknya sumber ini menulis ke field.
    pub fn allows(&self, field: Field, source: SourceKind) -> bool {
        let s = self.state.borrow();
        if s.locked {
            source == SourceKind::ManualPick && s.active_field == Some(field)
        } else {
            source != SourceKind::ManualPick
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_blocks_other_sources() {
        let picker = PickerCoordinator::new();
        assert!(picker.allows(Field::Pickup, SourceKind::Gps));
        assert!(!picker.allows(Field::Pickup, SourceKind::ManualPick), "Titik manual hanya lewat picker");

        picker.open(Field::Dropoff, None);
        assert!(!picker.allows(Field::Dropoff, SourceKind::Autocomplete));
        assert!(!picker.allows(Field::Dropoff, SourceKind::Gps));
        assert!(!picker.allows(Field::Pickup, SourceKind::ManualPick));
        assert!(picker.allows(Field::Dropoff, SourceKind::ManualPick));
    }

    #[test]
    fn test_reentrant_open_switches_field() {
        let picker = PickerCoordinator::new();
        picker.open(Field::Pickup, Some(Coordinates::new(-7.33, 110.50)));
        picker.open(Field::Dropoff, None);

        let state = picker.snapshot();
        assert!(state.locked);
        assert_eq!(state.active_field, Some(Field::Dropoff));
        assert_eq!(state.center, Some(Coordinates::new(-7.33, 110.50)));
    }

    #[test]
    fn test_confirm_requires_center() {
        let picker = PickerCoordinator::new();
        assert!(picker.begin_confirm().is_none());

        picker.open(Field::Pickup, None);
        assert!(picker.begin_confirm().is_none());

        picker.move_center(Coordinates::new(-7.33, 110.50));
        let ticket = picker.begin_confirm().unwrap();
        assert!(picker.is_current(&ticket));
        assert!(picker.complete(&ticket));
        assert!(!picker.is_locked());
    }

    #[test]
    fn test_older_confirm_is_discarded() {
        let picker = PickerCoordinator::new();
        picker.open(Field::Pickup, Some(Coordinates::new(-7.33, 110.50)));
        let first = picker.begin_confirm().unwrap();
        picker.move_center(Coordinates::new(-7.35, 110.51));
        let second = picker.begin_confirm().unwrap();

        assert!(!picker.is_current(&first));
        assert!(!picker.complete(&first));
        assert!(picker.is_locked());
        assert!(picker.complete(&second));
    }

    #[test]
    fn test_failed_confirm_keeps_picker_open() {
        let picker = PickerCoordinator::new();
        picker.open(Field::Pickup, Some(Coordinates::new(-7.33, 110.50)));
        let ticket = picker.begin_confirm().unwrap();
        picker.fail(&ticket, "Gagal mendapatkan alamat. Coba lagi.");

        let state = picker.snapshot();
        assert!(state.locked);
        assert!(!state.confirming);
        assert_eq!(state.error.as_deref(), Some("Gagal mendapatkan alamat. Coba lagi."));
    }

    #[test]
    fn test_cancel_discards_pending_confirm() {
        let picker = PickerCoordinator::new();
        picker.open(Field::Pickup, Some(Coordinates::new(-7.33, 110.50)));
        let ticket = picker.begin_confirm().unwrap();
        assert!(picker.cancel());
        assert!(!picker.is_current(&ticket));
        assert!(!picker.cancel(), "Cancel kedua tidak mengubah apa-apa");
    }
}
