use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{CONSENT_KEY, CUE_SLOTS, DEFAULT_INTENDED_VOLUME, TRACK_SETTINGS_PREFIX};
use crate::errors::StorageError;
use crate::track_id::TrackId;

/// String-keyed JSON blob storage, as exposed by the host environment.
/// Writes may fail when capacity is exceeded.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store, used by tests and headless embedders. An optional byte
/// quota reproduces the capacity-exceeded failure mode.
#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota_bytes {
            let existing = self.entries.get(key).map(|v| v.len() + key.len()).unwrap_or(0);
            if self.used_bytes() - existing + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded { key: key.to_string() });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Tri-state permission flag gating all preference persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consent {
    Unknown,
    Granted,
    Denied,
}

/// Persisted consent record. `essential` is always true; only `preferences`
/// is a real choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentStatus {
    pub essential: bool,
    pub preferences: bool,
}

/// Per-track persisted settings, keyed by track identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSettings {
    pub cue_points: [Option<f64>; CUE_SLOTS],
    pub loop_in: Option<f64>,
    pub loop_out: Option<f64>,
    pub bpm: Option<f64>,
    pub selected_beat_loop_length: Option<u32>,
    pub intended_volume: u8,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            cue_points: [None; CUE_SLOTS],
            loop_in: None,
            loop_out: None,
            bpm: None,
            selected_beat_loop_length: None,
            intended_volume: DEFAULT_INTENDED_VOLUME,
        }
    }
}

/// Consent-gated view over a [`KeyValueStore`].
///
/// While consent is not granted, preference writes fail with
/// [`StorageError::ConsentDenied`] and preference reads report no data.
/// The consent record itself is essential and always writable.
pub struct PrefStore {
    inner: Box<dyn KeyValueStore>,
    consent: Consent,
}

impl PrefStore {
    /// Wraps `inner`, reading any previously persisted consent decision.
    pub fn new(inner: Box<dyn KeyValueStore>) -> Self {
        let mut store = Self {
            inner,
            consent: Consent::Unknown,
        };
        store.consent = store.read_persisted_consent();
        store
    }

    fn read_persisted_consent(&self) -> Consent {
        match self.inner.get(CONSENT_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<ConsentStatus>(&raw) {
                Ok(status) if status.preferences => Consent::Granted,
                Ok(_) => Consent::Denied,
                Err(e) => {
                    log::warn!("Stored consent record is corrupted, treating as undecided: {e}");
                    Consent::Unknown
                }
            },
            Ok(None) => Consent::Unknown,
            Err(e) => {
                log::warn!("Failed to read consent record: {e}");
                Consent::Unknown
            }
        }
    }

    pub fn consent(&self) -> Consent {
        self.consent
    }

    pub fn has_consent(&self) -> bool {
        self.consent == Consent::Granted
    }

    /// Records the user's preference-storage decision. Always persisted;
    /// consent is the one essential key.
    pub fn set_consent(&mut self, preferences: bool) -> Result<(), StorageError> {
        let status = ConsentStatus {
            essential: true,
            preferences,
        };
        let raw = serde_json::to_string(&status).map_err(|e| StorageError::Serialize {
            key: CONSENT_KEY.to_string(),
            source: e,
        })?;
        self.inner.set(CONSENT_KEY, &raw)?;
        self.consent = if preferences { Consent::Granted } else { Consent::Denied };
        log::info!("Preference-storage consent set to {:?}", self.consent);
        Ok(())
    }

    /// Reads a preference entry. Returns no data unless consent is granted.
    pub fn get_pref(&self, key: &str) -> Result<Option<String>, StorageError> {
        if !self.has_consent() {
            return Ok(None);
        }
        self.inner.get(key)
    }

    /// Writes a preference entry, refusing without consent.
    pub fn set_pref(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if !self.has_consent() {
            return Err(StorageError::ConsentDenied);
        }
        self.inner.set(key, value)
    }

    /// Removes a preference entry, refusing without consent.
    pub fn remove_pref(&mut self, key: &str) -> Result<(), StorageError> {
        if !self.has_consent() {
            return Err(StorageError::ConsentDenied);
        }
        self.inner.remove(key)
    }

    fn track_key(id: &TrackId) -> String {
        format!("{TRACK_SETTINGS_PREFIX}{id}")
    }

    /// Loads the persisted settings for a track, if any.
    pub fn load_track_settings(&self, id: &TrackId) -> Result<Option<TrackSettings>, StorageError> {
        let key = Self::track_key(id);
        match self.get_pref(&key)? {
            Some(raw) => {
                let settings =
                    serde_json::from_str(&raw).map_err(|e| StorageError::Corrupted {
                        key,
                        source: e,
                    })?;
                Ok(Some(settings))
            }
            None => Ok(None),
        }
    }

    /// Persists the settings for a track. Last write wins per identifier.
    pub fn save_track_settings(
        &mut self,
        id: &TrackId,
        settings: &TrackSettings,
    ) -> Result<(), StorageError> {
        let key = Self::track_key(id);
        let raw = serde_json::to_string(settings).map_err(|e| StorageError::Serialize {
            key: key.clone(),
            source: e,
        })?;
        self.set_pref(&key, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track_id::parse_track_id;

    fn granted_store() -> PrefStore {
        let mut store = PrefStore::new(Box::new(MemoryStore::new()));
        store.set_consent(true).unwrap();
        store
    }

    #[test]
    fn consent_defaults_to_unknown() {
        let store = PrefStore::new(Box::new(MemoryStore::new()));
        assert_eq!(store.consent(), Consent::Unknown);
        assert!(!store.has_consent());
    }

    #[test]
    fn consent_survives_reload() {
        let mut inner = MemoryStore::new();
        inner
            .set(CONSENT_KEY, r#"{"essential":true,"preferences":true}"#)
            .unwrap();
        let store = PrefStore::new(Box::new(inner));
        assert_eq!(store.consent(), Consent::Granted);
    }

    #[test]
    fn writes_refused_without_consent() {
        let mut store = PrefStore::new(Box::new(MemoryStore::new()));
        let err = store.set_pref("quadeck.x", "1").unwrap_err();
        assert!(matches!(err, StorageError::ConsentDenied));
        store.set_consent(false).unwrap();
        assert!(matches!(
            store.set_pref("quadeck.x", "1").unwrap_err(),
            StorageError::ConsentDenied
        ));
    }

    #[test]
    fn reads_report_no_data_without_consent() {
        let mut store = granted_store();
        store.set_pref("quadeck.x", "1").unwrap();
        store.set_consent(false).unwrap();
        assert_eq!(store.get_pref("quadeck.x").unwrap(), None);
    }

    #[test]
    fn track_settings_round_trip() {
        let mut store = granted_store();
        let id = parse_track_id("dQw4w9WgXcQ").unwrap();
        let settings = TrackSettings {
            cue_points: [Some(1.5), None, Some(42.0)],
            loop_in: Some(10.0),
            loop_out: Some(14.0),
            bpm: Some(128.0),
            selected_beat_loop_length: Some(8),
            intended_volume: 80,
        };
        store.save_track_settings(&id, &settings).unwrap();
        assert_eq!(store.load_track_settings(&id).unwrap(), Some(settings));
    }

    #[test]
    fn track_settings_json_shape() {
        let settings = TrackSettings::default();
        let raw = serde_json::to_string(&settings).unwrap();
        assert!(raw.contains("\"cuePoints\""), "{raw}");
        assert!(raw.contains("\"loopIn\""), "{raw}");
        assert!(raw.contains("\"selectedBeatLoopLength\""), "{raw}");
        assert!(raw.contains("\"intendedVolume\":100"), "{raw}");
    }

    #[test]
    fn corrupted_track_settings_surface_as_storage_error() {
        let mut store = granted_store();
        let id = parse_track_id("dQw4w9WgXcQ").unwrap();
        store
            .set_pref(&PrefStore::track_key(&id), "not json at all")
            .unwrap();
        assert!(matches!(
            store.load_track_settings(&id),
            Err(StorageError::Corrupted { .. })
        ));
    }

    #[test]
    fn quota_exceeded_is_reported() {
        let mut store = PrefStore::new(Box::new(MemoryStore::with_quota(64)));
        store.set_consent(true).unwrap();
        let big = "x".repeat(256);
        assert!(matches!(
            store.set_pref("quadeck.big", &big).unwrap_err(),
            StorageError::QuotaExceeded { .. }
        ));
    }
}
