use std::sync::Arc;
use tokio::sync::watch;

use super::picker::PickerCoordinator;
use crate::domain::location::{Field, LocationPoint, Locations};

#[derive(Debug, Clone, PartialEq)]
pub struct LocationState {
    pub locations: Locations,
    pub inputs_enabled: bool,
}

impl Default for LocationState {
    fn default() -> Self {
        Self {
            locations: Locations::default(),
            inputs_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    PickerLocked,
    InputsLocked,
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }
}

/// Pemilik titik pickup & dropoff.
///
/// Setiap tulisan lewat sini dicek ke picker lock dan ke flag input form
/// (dikunci lifecycle controller selama order berjalan).
pub struct LocationStore {
    state: watch::Sender<LocationState>,
    picker: Arc<PickerCoordinator>,
}

impl LocationStore {
    pub fn new(picker: Arc<PickerCoordinator>) -> Self {
        let (state, _) = watch::channel(LocationState::default());
        Self { state, picker }
    }

    pub fn snapshot(&self) -> LocationState {
        self.state.borrow().clone()
    }

    pub fn locations(&self) -> Locations {
        self.state.borrow().locations.clone()
    }

    pub fn get(&self, field: Field) -> Option<LocationPoint> {
        self.state.borrow().locations.get(field).cloned()
    }

    pub fn inputs_enabled(&self) -> bool {
        self.state.borrow().inputs_enabled
    }

    // Ganti satu titik secara utuh
    pub fn set_point(&self, field: Field, point: LocationPoint) -> WriteOutcome {
        let source = point.source_kind();
        let mut outcome = WriteOutcome::Applied;

        self.state.send_if_modified(|s| {
            if !s.inputs_enabled {
                outcome = WriteOutcome::InputsLocked;
                return false;
            }
            if !self.picker.allows(field, source) {
                outcome = WriteOutcome::PickerLocked;
                return false;
            }
            *s.locations.slot_mut(field) = Some(point);
            true
        });

        match outcome {
            WriteOutcome::Applied => tracing::debug!("📍 {} diisi dari {:?}", field, source),
            rejected => tracing::debug!("🚫 Tulisan {} dari {:?} ditolak: {:?}", field, source, rejected),
        }

        outcome
    }

    pub fn clear(&self, field: Field) -> WriteOutcome {
        let mut outcome = WriteOutcome::Applied;

        self.state.send_if_modified(|s| {
            if !s.inputs_enabled {
                outcome = WriteOutcome::InputsLocked;
                return false;
            }
            s.locations.slot_mut(field).take().is_some()
        });

        outcome
    }

    pub(crate) fn set_inputs_enabled(&self, enabled: bool) {
        self.state.send_if_modified(|s| {
            if s.inputs_enabled == enabled {
                return false;
            }
            s.inputs_enabled = enabled;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::location::SourceKind;
    use rand::Rng;

    fn point(lat: f64, source: SourceKind) -> LocationPoint {
        LocationPoint::new(lat, 110.50, source, format!("Titik {}", lat)).unwrap()
    }

    #[test]
    fn test_set_and_clear() {
        let store = LocationStore::new(Arc::new(PickerCoordinator::new()));
        assert!(store.set_point(Field::Pickup, point(-7.33, SourceKind::Autocomplete)).is_applied());
        assert!(store.get(Field::Pickup).is_some());

        assert!(store.clear(Field::Pickup).is_applied());
        assert!(store.get(Field::Pickup).is_none());
    }

    #[test]
    fn test_locked_inputs_reject_writes() {
        let store = LocationStore::new(Arc::new(PickerCoordinator::new()));
        store.set_point(Field::Pickup, point(-7.33, SourceKind::Gps));
        store.set_inputs_enabled(false);

        assert_eq!(
            store.set_point(Field::Pickup, point(-7.40, SourceKind::Autocomplete)),
            WriteOutcome::InputsLocked
        );
        assert_eq!(store.clear(Field::Pickup), WriteOutcome::InputsLocked);
        assert_eq!(store.get(Field::Pickup).unwrap().latitude(), -7.33);
    }

    #[test]
    fn test_picker_lock_leaves_store_unchanged() {
        let picker = Arc::new(PickerCoordinator::new());
        let store = LocationStore::new(picker.clone());
        store.set_point(Field::Pickup, point(-7.33, SourceKind::Autocomplete));
        picker.open(Field::Dropoff, None);

        let before = store.snapshot();
        let mut rng = rand::rng();

        // Tulisan acak dari sumber non-picker, atau manual ke field yang bukan aktif
        for _ in 0..50 {
            let lat = rng.random_range(-8.0..-6.0);
            let (field, source) = match rng.random_range(0..3) {
                0 => (Field::Dropoff, SourceKind::Autocomplete),
                1 => (Field::Pickup, SourceKind::Gps),
                _ => (Field::Pickup, SourceKind::ManualPick),
            };
            assert_eq!(store.set_point(field, point(lat, source)), WriteOutcome::PickerLocked);
        }

        assert_eq!(store.snapshot(), before, "Store tidak boleh berubah selama picker terkunci");

        assert!(store.set_point(Field::Dropoff, point(-7.34, SourceKind::ManualPick)).is_applied());
    }
}
