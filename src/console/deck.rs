use std::time::Duration;

use crate::config::{AUTO_FADE_THRESHOLD_SECS, CUE_SLOTS, POLL_INTERVAL_MS};
use crate::engine::PlaybackState;
use crate::errors::{EngineFault, StorageError, ValidationError};
use crate::storage::TrackSettings;
use crate::stutter::{Stutter, StutterMode};
use crate::tempo::snap_to_beat;
use crate::track_id::{parse_track_id, TrackId};

use super::events::{DeckLoadPayload, DeckTickPayload, UiEvent};
use super::state::{Console, LoopRegion};
use super::timers::TimerKind;

impl Console {
    // --- Engine lifecycle ---

    /// The global engine API became available: bind instances for the decks
    /// that are already part of the visible topology.
    pub(crate) fn handle_api_ready(&mut self) {
        if self.api_ready {
            return;
        }
        self.api_ready = true;
        log::info!("Engine API ready");
        for slot in 1..=self.decks.len() as u8 {
            if self.deck(slot).active {
                self.bind_engine(slot);
            }
        }
    }

    /// Creates the deck's engine instance if the API is up and none exists.
    /// Readiness arrives later as an `EngineReady` event.
    pub(crate) fn bind_engine(&mut self, slot: u8) {
        if !self.api_ready || self.deck(slot).engine.is_some() {
            return;
        }
        log::info!("Binding engine instance for deck {slot}");
        let engine = self.engine_factory.create(slot);
        let deck = self.deck_mut(slot);
        deck.engine = Some(engine);
        deck.engine_ready = false;
    }

    pub(crate) fn handle_engine_ready(&mut self, slot: u8) {
        log::info!("Engine for deck {slot} is ready");
        self.deck_mut(slot).engine_ready = true;
        let effective = self
            .mixer
            .effective_volume(slot, self.deck(slot).intended_volume);
        self.deck_mut(slot).effective_volume = effective;
        if let Some(engine) = self.deck_mut(slot).engine.as_mut() {
            engine.set_volume(effective);
        }
        // Consume the one queued load, if any.
        if let Some(id) = self.deck_mut(slot).queued_track.take() {
            log::info!("Deck {slot}: consuming queued track {id}");
            self.start_load(slot, id);
        }
    }

    pub(crate) fn handle_engine_state(&mut self, slot: u8, code: i32) {
        let state = PlaybackState::from_code(code);
        log::debug!("Deck {slot} engine state -> {state:?}");
        self.deck_mut(slot).playback = state;

        if self.deck(slot).loading {
            // First report after a load settles the spinner and metadata.
            self.deck_mut(slot).loading = false;
            self.emit_loading(slot);
            self.emit_deck_load(slot);
        }

        match state {
            PlaybackState::Playing => {
                self.timers
                    .schedule_periodic(TimerKind::Poll(slot), Duration::from_millis(POLL_INTERVAL_MS));
            }
            PlaybackState::Ended => {
                self.timers.cancel(TimerKind::Poll(slot));
                // Track ran out between polls with an active loop: wrap.
                let wrap = {
                    let deck = self.deck(slot);
                    (deck.loop_region.active && !deck.stutter.is_active())
                        .then_some(deck.loop_region.in_time)
                        .flatten()
                };
                if let Some(in_time) = wrap {
                    if let Some(engine) = self.deck_mut(slot).engine.as_mut() {
                        engine.seek_to(in_time, true);
                        engine.play();
                    }
                }
            }
            _ => {
                self.timers.cancel(TimerKind::Poll(slot));
            }
        }
        self.emit_transport(slot);
    }

    pub(crate) fn handle_engine_error(&mut self, slot: u8, code: u32) {
        let fault = EngineFault::from_code(code);
        log::error!("Deck {slot} engine error {code} ({fault:?})");
        self.ui.error(format!("Deck {slot}: {}", fault.message()));
        self.reset_deck_state(slot, true);
    }

    // --- Loading ---

    pub(crate) fn load_track(&mut self, slot: u8, input: &str) {
        let id = match parse_track_id(input) {
            Ok(id) => id,
            Err(e) => {
                self.ui.warn(e.to_string());
                return;
            }
        };
        let ready = {
            let deck = self.deck(slot);
            deck.engine.is_some() && deck.engine_ready
        };
        if ready {
            self.start_load(slot, id);
        } else {
            // A later request overwrites an earlier unconsumed one.
            log::info!("Deck {slot}: engine not ready, queueing track {id}");
            let deck = self.deck_mut(slot);
            deck.queued_track = Some(id);
            deck.loading = true;
            self.emit_loading(slot);
        }
    }

    /// Dispatches the cue call and restores any persisted settings for the
    /// track. The partial reset must run before settings are applied, or it
    /// would clobber the freshly restored values.
    pub(crate) fn start_load(&mut self, slot: u8, id: TrackId) {
        self.reset_deck_state(slot, false);

        let settings = self.store.load_track_settings(&id);
        {
            let deck = self.deck_mut(slot);
            deck.current_track = Some(id.clone());
            deck.loading = true;
            if let Some(engine) = deck.engine.as_mut() {
                engine.cue_track(&id);
            }
        }
        self.emit_loading(slot);

        match settings {
            Ok(stored) => self.apply_settings(slot, stored),
            Err(e) => {
                self.ui
                    .warn(format!("Stored settings for {id} could not be read: {e}"));
                self.apply_settings(slot, None);
            }
        }
    }

    /// Overwrites the deck's cue/loop/bpm/volume fields from storage, or
    /// clears them when nothing is stored.
    fn apply_settings(&mut self, slot: u8, stored: Option<TrackSettings>) {
        let settings = stored.unwrap_or_default();
        {
            let deck = self.deck_mut(slot);
            deck.cue_points = settings.cue_points;
            deck.loop_region = LoopRegion {
                in_time: settings.loop_in,
                out_time: settings.loop_out,
                active: false,
                beat_length: settings.selected_beat_loop_length,
            };
            deck.bpm = settings.bpm;
            deck.intended_volume = settings.intended_volume;
        }
        self.emit_cue_markers(slot);
        self.emit_loop(slot);
        self.emit_bpm(slot);
        self.recompute_volumes();
    }

    /// Writes the deck's current per-track settings. Skipped silently when
    /// consent is denied; other storage failures surface as a warning.
    pub(crate) fn persist_track_settings(&mut self, slot: u8) {
        let (id, settings) = {
            let deck = self.deck(slot);
            let id = match &deck.current_track {
                Some(id) => id.clone(),
                None => return,
            };
            let settings = TrackSettings {
                cue_points: deck.cue_points,
                loop_in: deck.loop_region.in_time,
                loop_out: deck.loop_region.out_time,
                bpm: deck.bpm,
                selected_beat_loop_length: deck.loop_region.beat_length,
                intended_volume: deck.intended_volume,
            };
            (id, settings)
        };
        match self.store.save_track_settings(&id, &settings) {
            Ok(()) => {}
            Err(StorageError::ConsentDenied) => {
                log::debug!("Deck {slot}: settings write skipped, no consent");
            }
            Err(e) => self.ui.warn(format!("Failed to save settings for {id}: {e}")),
        }
    }

    // --- Transport ---

    pub(crate) fn play_pause(&mut self, slot: u8) {
        if !self.require_ready_track(slot) {
            return;
        }
        let playing = self.deck(slot).playback == PlaybackState::Playing;
        if let Some(engine) = self.deck_mut(slot).engine.as_mut() {
            if playing {
                engine.pause();
            } else {
                engine.play();
            }
        }
    }

    pub(crate) fn seek(&mut self, slot: u8, seconds: f64) {
        if !self.require_ready_track(slot) {
            return;
        }
        if seconds.is_nan() {
            self.ui.warn(ValidationError::TimeNotANumber.to_string());
            return;
        }
        let duration = self.deck(slot).duration();
        let target = seconds.clamp(0.0, duration);
        if let Some(engine) = self.deck_mut(slot).engine.as_mut() {
            engine.seek_to(target, true);
        }
        self.ui.emit(UiEvent::DeckTick(DeckTickPayload {
            slot,
            position: target,
            duration,
        }));
    }

    pub(crate) fn set_seek_dragging(&mut self, slot: u8, dragging: bool) {
        self.deck_mut(slot).seek_dragging = dragging;
    }

    // --- Cue points ---

    pub(crate) fn set_cue_point(&mut self, slot: u8, index: usize, at: Option<f64>) {
        if index >= CUE_SLOTS {
            self.ui.warn(ValidationError::CueIndexOutOfRange(index).to_string());
            return;
        }
        if !self.require_ready_track(slot) {
            return;
        }
        let duration = self.deck(slot).duration();
        let time = at.unwrap_or_else(|| self.engine_position(slot));
        if time.is_nan() {
            self.ui.warn(ValidationError::TimeNotANumber.to_string());
            return;
        }
        if time < 0.0 || time > duration {
            self.ui
                .warn(ValidationError::TimeOutOfRange { time, duration }.to_string());
            return;
        }
        let snapped = snap_to_beat(time, self.deck(slot).bpm, duration);
        self.deck_mut(slot).cue_points[index] = Some(snapped);
        self.persist_track_settings(slot);
        self.emit_cue_markers(slot);
    }

    pub(crate) fn jump_to_cue_point(&mut self, slot: u8, index: usize) {
        if index >= CUE_SLOTS {
            self.ui.warn(ValidationError::CueIndexOutOfRange(index).to_string());
            return;
        }
        if !self.require_ready_track(slot) {
            return;
        }
        let target = match self.deck(slot).cue_points[index] {
            Some(t) => t,
            None => {
                self.ui.warn(ValidationError::CueNotSet(index).to_string());
                return;
            }
        };
        let previous = self.deck(slot).playback;
        // No restore: the jump decides what playback does next.
        self.stop_stutter_inner(slot, false);
        if let Some(engine) = self.deck_mut(slot).engine.as_mut() {
            engine.seek_to(target, true);
            if matches!(
                previous,
                PlaybackState::Playing | PlaybackState::Paused | PlaybackState::Cued
            ) {
                engine.play();
            }
        }
        self.deck_mut(slot).loop_region.active = false;
        self.emit_loop(slot);
    }

    // --- Loop region ---

    pub(crate) fn set_loop_in(&mut self, slot: u8, at: Option<f64>) {
        if !self.require_ready_track(slot) {
            return;
        }
        let duration = self.deck(slot).duration();
        let time = at.unwrap_or_else(|| self.engine_position(slot));
        if time.is_nan() {
            self.ui.warn(ValidationError::TimeNotANumber.to_string());
            return;
        }
        if time < 0.0 || time > duration {
            self.ui
                .warn(ValidationError::TimeOutOfRange { time, duration }.to_string());
            return;
        }
        self.deck_mut(slot).loop_region.in_time = Some(time);
        self.persist_track_settings(slot);
        self.emit_loop(slot);
    }

    pub(crate) fn set_loop_out(&mut self, slot: u8, at: Option<f64>) {
        if !self.require_ready_track(slot) {
            return;
        }
        let duration = self.deck(slot).duration();
        let time = at.unwrap_or_else(|| self.engine_position(slot));
        if time.is_nan() {
            self.ui.warn(ValidationError::TimeNotANumber.to_string());
            return;
        }
        if time < 0.0 || time > duration {
            self.ui
                .warn(ValidationError::TimeOutOfRange { time, duration }.to_string());
            self.emit_loop(slot);
            return;
        }
        if let Some(in_time) = self.deck(slot).loop_region.in_time {
            if time <= in_time {
                self.ui.warn(
                    ValidationError::LoopOutNotAfterIn { r#in: in_time, out: time }.to_string(),
                );
                // Re-emit so the UI control reverts to the previous value.
                self.emit_loop(slot);
                return;
            }
        }
        self.deck_mut(slot).loop_region.out_time = Some(time);
        self.persist_track_settings(slot);
        self.emit_loop(slot);
    }

    pub(crate) fn toggle_loop(&mut self, slot: u8) {
        if !self.require_ready_track(slot) {
            return;
        }
        if !self.deck(slot).loop_region.is_valid() {
            // Try deriving the out point from in + beats at the deck's BPM.
            let derived = {
                let deck = self.deck(slot);
                match (deck.loop_region.in_time, deck.loop_region.beat_length, deck.bpm) {
                    (Some(in_time), Some(beats), Some(bpm)) if bpm > 0.0 => {
                        Some(in_time + beats as f64 * 60.0 / bpm)
                    }
                    _ => None,
                }
            };
            match derived {
                Some(out) => {
                    self.deck_mut(slot).loop_region.out_time = Some(out);
                    self.persist_track_settings(slot);
                }
                None => {
                    self.ui.warn(ValidationError::LoopRegionIncomplete.to_string());
                    return;
                }
            }
        }

        let activating = !self.deck(slot).loop_region.active;
        self.deck_mut(slot).loop_region.active = activating;

        if activating {
            let seek_back = {
                let deck = self.deck(slot);
                match (deck.loop_region.in_time, deck.loop_region.out_time) {
                    (Some(in_time), Some(out_time)) if !deck.stutter.is_active() => {
                        (self.engine_position(slot) >= out_time).then_some(in_time)
                    }
                    _ => None,
                }
            };
            if let Some(in_time) = seek_back {
                if let Some(engine) = self.deck_mut(slot).engine.as_mut() {
                    engine.seek_to(in_time, true);
                }
            }
        }
        self.emit_loop(slot);
    }

    pub(crate) fn set_beat_loop(&mut self, slot: u8, beats: u32) {
        if !self.require_ready_track(slot) {
            return;
        }
        let bpm = match self.deck(slot).bpm {
            Some(bpm) if bpm > 0.0 => bpm,
            _ => {
                self.ui.warn(ValidationError::BpmRequired.to_string());
                return;
            }
        };
        let duration = self.deck(slot).duration();
        let in_time = match self.deck(slot).loop_region.in_time {
            Some(t) => t,
            None => {
                let now = self.engine_position(slot);
                self.deck_mut(slot).loop_region.in_time = Some(now);
                now
            }
        };
        let out_time = snap_to_beat(in_time + beats as f64 * 60.0 / bpm, Some(bpm), duration)
            .min(duration);
        {
            let deck = self.deck_mut(slot);
            // The beat-length selection is recorded for UI highlighting even
            // when the computed region is degenerate.
            deck.loop_region.beat_length = Some(beats);
            if out_time <= in_time {
                deck.loop_region.out_time = None;
            } else {
                deck.loop_region.out_time = Some(out_time);
            }
        }
        if out_time <= in_time {
            self.ui.warn(format!(
                "A {beats}-beat loop from {in_time:.2}s does not fit in this track"
            ));
        }
        self.persist_track_settings(slot);
        self.emit_loop(slot);
    }

    // --- Tempo ---

    pub(crate) fn set_bpm(&mut self, slot: u8, bpm: Option<f64>) {
        if let Some(value) = bpm {
            if !value.is_finite() || value <= 0.0 {
                self.ui.warn(ValidationError::BpmRequired.to_string());
                return;
            }
        }
        self.deck_mut(slot).bpm = bpm;
        self.persist_track_settings(slot);
        self.emit_bpm(slot);
    }

    pub(crate) fn tap_tempo(&mut self, slot: u8) {
        self.tap_tempo_at(slot, std::time::Instant::now());
    }

    /// Split out so the suite can feed synthetic tap instants.
    pub(crate) fn tap_tempo_at(&mut self, slot: u8, at: std::time::Instant) {
        if let Some(bpm) = self.deck_mut(slot).tap.register(at) {
            log::info!("Deck {slot}: tap tempo derived {bpm:.1} BPM");
            self.deck_mut(slot).bpm = Some(bpm);
            self.persist_track_settings(slot);
            self.emit_bpm(slot);
        }
    }

    // --- Reset ---

    /// Clears transient transport state. A full reset also wipes cues, BPM,
    /// loop endpoints, and track identity, leaving the deck empty and idle;
    /// a partial reset (issued right before a load) preserves them for the
    /// settings-load step to overwrite.
    pub(crate) fn reset_deck_state(&mut self, slot: u8, full: bool) {
        log::debug!("Deck {slot}: {} reset", if full { "full" } else { "partial" });
        self.timers.cancel_deck(slot);
        {
            let deck = self.deck_mut(slot);
            deck.stutter = Stutter::Idle;
            deck.loop_region.active = false;
            deck.seek_dragging = false;
            deck.loading = false;
            if full {
                deck.cue_points = Default::default();
                deck.bpm = None;
                deck.loop_region.clear();
                deck.current_track = None;
                deck.queued_track = None;
                deck.tap.reset();
                deck.playback = PlaybackState::Unstarted;
                if let Some(engine) = deck.engine.as_mut() {
                    engine.stop();
                }
            }
        }
        self.emit_stutter(slot);
        self.emit_loop(slot);
        self.emit_loading(slot);
        if full {
            self.emit_cue_markers(slot);
            self.emit_bpm(slot);
            self.emit_transport(slot);
            self.emit_deck_load(slot);
        }
    }

    // --- Polling ---

    /// 250ms tick while the deck plays: position reflection, loop wrap, and
    /// auto-crossfade proximity.
    pub(crate) fn poll_tick(&mut self, slot: u8) {
        let (position, duration, suppress_tick, wrap_target) = {
            let deck = self.deck(slot);
            let engine = match deck.engine.as_ref() {
                Some(engine) => engine,
                None => {
                    self.timers.cancel(TimerKind::Poll(slot));
                    return;
                }
            };
            let position = engine.current_time();
            let duration = engine.duration();
            // The Loop-stutter owns the position while it runs; a seek drag
            // owns the displayed value.
            let suppress_tick =
                deck.seek_dragging || deck.stutter.active_mode() == Some(StutterMode::Loop);
            let wrap_target = match (&deck.loop_region, deck.stutter.is_active()) {
                (region, false) if region.active => match (region.in_time, region.out_time) {
                    (Some(in_time), Some(out_time)) if position >= out_time => Some(in_time),
                    _ => None,
                },
                _ => None,
            };
            (position, duration, suppress_tick, wrap_target)
        };

        if !suppress_tick {
            self.ui.emit(UiEvent::DeckTick(DeckTickPayload {
                slot,
                position,
                duration,
            }));
        }

        if let Some(in_time) = wrap_target {
            if let Some(engine) = self.deck_mut(slot).engine.as_mut() {
                engine.seek_to(in_time, true);
            }
        }

        if duration > 0.0 {
            let remaining = duration - position;
            if remaining <= AUTO_FADE_THRESHOLD_SECS {
                self.check_auto_crossfade(slot, remaining);
            }
        }
    }

    // --- Shared guards ---

    /// Current engine position, zero when unbound.
    pub(crate) fn engine_position(&self, slot: u8) -> f64 {
        self.deck(slot)
            .engine
            .as_ref()
            .map(|e| e.current_time())
            .unwrap_or(0.0)
    }

    /// Warn-and-refuse unless the deck has a ready engine and a track.
    pub(crate) fn require_ready_track(&self, slot: u8) -> bool {
        let deck = self.deck(slot);
        if deck.engine.is_none() || !deck.engine_ready {
            self.ui.warn(ValidationError::EngineNotReady(slot).to_string());
            return false;
        }
        if deck.current_track.is_none() {
            self.ui.warn(ValidationError::NoTrackLoaded(slot).to_string());
            return false;
        }
        true
    }

    fn emit_deck_load(&self, slot: u8) {
        let deck = self.deck(slot);
        let (title, duration) = deck
            .engine
            .as_ref()
            .map(|e| (e.video_title(), e.duration()))
            .unwrap_or((None, 0.0));
        self.ui.emit(UiEvent::DeckLoad(DeckLoadPayload {
            slot,
            track_id: deck.current_track.as_ref().map(|id| id.to_string()),
            title,
            duration,
        }));
    }
}
