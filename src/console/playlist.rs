use crate::errors::ValidationError;
use crate::playlist::{self, PlaylistEntry};
use crate::storage::Consent;

use super::events::{PlaylistsPayload, UiEvent};
use super::state::Console;

impl Console {
    fn emit_playlists(&self) {
        // BTreeMap keeps the names sorted for the UI.
        let names = self.playlists.keys().cloned().collect();
        self.ui
            .emit(UiEvent::Playlists(PlaylistsPayload { names }));
    }

    fn consent_granted_or_warn(&self, action: &str) -> bool {
        if self.store.has_consent() {
            return true;
        }
        self.ui.warn(format!(
            "Cannot {action}: preference storage has not been consented to"
        ));
        false
    }

    /// Snapshots the active slots into a named playlist and persists the
    /// whole collection. A failed write rolls the in-memory map back so it
    /// never drifts from storage.
    pub(crate) fn save_playlist(&mut self, name: String) {
        if !self.consent_granted_or_warn("save playlist") {
            return;
        }
        if name.trim().is_empty() {
            self.ui.warn("Playlist name cannot be empty");
            return;
        }
        let entry: PlaylistEntry = (1..=self.mixer.view.active_slots())
            .map(|slot| {
                self.deck(slot)
                    .current_track
                    .as_ref()
                    .map(|id| id.to_string())
            })
            .collect();

        let previous = self.playlists.insert(name.clone(), entry);
        if let Err(e) = playlist::save_playlists(&mut self.store, &self.playlists) {
            match previous {
                Some(previous) => {
                    self.playlists.insert(name.clone(), previous);
                }
                None => {
                    self.playlists.remove(&name);
                }
            }
            self.ui.error(format!("Failed to save playlist '{name}': {e}"));
            return;
        }
        self.ui.info(format!("Playlist '{name}' saved"));
        self.emit_playlists();
    }

    /// Restores a playlist onto the decks. The stored collection is re-read
    /// first so a second browser tab's edits are picked up. Empty slots reset
    /// the corresponding deck; entries beyond the active topology stay
    /// untouched.
    pub(crate) fn load_playlist(&mut self, name: String) {
        match playlist::load_playlists(&self.store) {
            Ok(playlists) => self.playlists = playlists,
            Err(e) => {
                self.ui.error(format!("Failed to read playlists: {e}"));
                return;
            }
        }
        let entry = match self.playlists.get(&name) {
            Some(entry) => entry.clone(),
            None => {
                self.ui
                    .warn(ValidationError::UnknownPlaylist(name).to_string());
                return;
            }
        };
        log::info!("Loading playlist '{name}'");
        for slot in 1..=self.mixer.view.active_slots() {
            match entry.get((slot - 1) as usize) {
                Some(Some(id)) => {
                    let input = id.clone();
                    self.load_track(slot, &input);
                }
                _ => self.reset_deck_state(slot, true),
            }
        }
        self.emit_playlists();
    }

    pub(crate) fn delete_playlist(&mut self, name: String) {
        if !self.consent_granted_or_warn("delete playlist") {
            return;
        }
        let removed = match self.playlists.remove(&name) {
            Some(entry) => entry,
            None => {
                self.ui
                    .warn(ValidationError::UnknownPlaylist(name).to_string());
                return;
            }
        };
        if let Err(e) = playlist::save_playlists(&mut self.store, &self.playlists) {
            self.playlists.insert(name.clone(), removed);
            self.ui
                .error(format!("Failed to delete playlist '{name}': {e}"));
            return;
        }
        self.ui.info(format!("Playlist '{name}' deleted"));
        self.emit_playlists();
    }

    /// Records the user's consent decision. Granting unlocks reads, so the
    /// playlist collection is refreshed immediately.
    pub(crate) fn set_consent(&mut self, preferences: bool) {
        if let Err(e) = self.store.set_consent(preferences) {
            self.ui.error(format!("Failed to record consent decision: {e}"));
            return;
        }
        if self.store.consent() == Consent::Granted {
            match playlist::load_playlists(&self.store) {
                Ok(playlists) => {
                    self.playlists = playlists;
                    self.emit_playlists();
                }
                Err(e) => self.ui.warn(format!("Failed to read playlists: {e}")),
            }
            self.ui.info("Preference storage enabled");
        } else {
            self.ui.info("Preference storage disabled");
        }
    }
}
