use std::collections::BTreeMap;

use serde::Deserialize;

use crate::config::PLAYLISTS_KEY;
use crate::errors::StorageError;
use crate::storage::PrefStore;

/// One saved playlist: an ordered list of track identifiers, one per deck
/// slot active at save time, with `None` marking an empty slot.
pub type PlaylistEntry = Vec<Option<String>>;

/// Name → entry mapping as held in memory and persisted.
pub type Playlists = BTreeMap<String, PlaylistEntry>;

/// Persisted playlist entry shapes. Older builds wrapped the slot list in an
/// object; decoding is a tagged-variant step here at the boundary rather
/// than shape-sniffing in the manager.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Bare(PlaylistEntry),
    Legacy {
        #[serde(rename = "trackIds")]
        track_ids: PlaylistEntry,
    },
}

impl From<StoredEntry> for PlaylistEntry {
    fn from(stored: StoredEntry) -> Self {
        match stored {
            StoredEntry::Bare(list) => list,
            StoredEntry::Legacy { track_ids } => track_ids,
        }
    }
}

/// Loads the playlist mapping. A missing key is an empty mapping; anything
/// that fails to decode is treated as corrupted, never partially recovered.
pub fn load_playlists(store: &PrefStore) -> Result<Playlists, StorageError> {
    let raw = match store.get_pref(PLAYLISTS_KEY)? {
        Some(raw) => raw,
        None => return Ok(Playlists::new()),
    };
    let stored: BTreeMap<String, StoredEntry> =
        serde_json::from_str(&raw).map_err(|e| StorageError::Corrupted {
            key: PLAYLISTS_KEY.to_string(),
            source: e,
        })?;
    Ok(stored.into_iter().map(|(name, entry)| (name, entry.into())).collect())
}

/// Persists the playlist mapping in the current (bare list) shape.
pub fn save_playlists(store: &mut PrefStore, playlists: &Playlists) -> Result<(), StorageError> {
    let raw = serde_json::to_string(playlists).map_err(|e| StorageError::Serialize {
        key: PLAYLISTS_KEY.to_string(),
        source: e,
    })?;
    store.set_pref(PLAYLISTS_KEY, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn granted_store() -> PrefStore {
        let mut store = PrefStore::new(Box::new(MemoryStore::new()));
        store.set_consent(true).unwrap();
        store
    }

    #[test]
    fn missing_key_is_an_empty_mapping() {
        let store = granted_store();
        assert!(load_playlists(&store).unwrap().is_empty());
    }

    #[test]
    fn bare_shape_round_trips() {
        let mut store = granted_store();
        let mut playlists = Playlists::new();
        playlists.insert(
            "warmup".into(),
            vec![Some("dQw4w9WgXcQ".into()), None],
        );
        save_playlists(&mut store, &playlists).unwrap();
        assert_eq!(load_playlists(&store).unwrap(), playlists);
    }

    #[test]
    fn legacy_wrapper_shape_is_accepted() {
        let mut store = granted_store();
        store
            .set_pref(
                PLAYLISTS_KEY,
                r#"{"old set":{"trackIds":["dQw4w9WgXcQ",null,null,null]}}"#,
            )
            .unwrap();
        let playlists = load_playlists(&store).unwrap();
        let entry = &playlists["old set"];
        assert_eq!(entry.len(), 4);
        assert_eq!(entry[0].as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(entry[1], None);
    }

    #[test]
    fn mixed_shapes_in_one_mapping() {
        let mut store = granted_store();
        store
            .set_pref(
                PLAYLISTS_KEY,
                r#"{"a":["x1x1x1x1x1x",null],"b":{"trackIds":[null,"y2y2y2y2y2y"]}}"#,
            )
            .unwrap();
        let playlists = load_playlists(&store).unwrap();
        assert_eq!(playlists["a"][0].as_deref(), Some("x1x1x1x1x1x"));
        assert_eq!(playlists["b"][1].as_deref(), Some("y2y2y2y2y2y"));
    }

    #[test]
    fn unknown_shape_is_corrupted() {
        let mut store = granted_store();
        store
            .set_pref(PLAYLISTS_KEY, r#"{"bad":{"somethingElse":[1,2,3]}}"#)
            .unwrap();
        assert!(matches!(
            load_playlists(&store),
            Err(StorageError::Corrupted { .. })
        ));
        store.set_pref(PLAYLISTS_KEY, r#"[1,2,3]"#).unwrap();
        assert!(matches!(
            load_playlists(&store),
            Err(StorageError::Corrupted { .. })
        ));
    }

    #[test]
    fn reads_are_empty_without_consent() {
        let mut store = granted_store();
        let mut playlists = Playlists::new();
        playlists.insert("set".into(), vec![None, None]);
        save_playlists(&mut store, &playlists).unwrap();
        store.set_consent(false).unwrap();
        assert!(load_playlists(&store).unwrap().is_empty());
    }
}
