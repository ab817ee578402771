use std::collections::HashMap;

use crate::config::{CUE_SLOTS, DECK_SLOTS, DEFAULT_INTENDED_VOLUME};
use crate::engine::{EngineFactory, PlaybackState, VideoEngine};
use crate::mixer::{FadeAnim, FaderPair, MixerState};
use crate::playlist::{self, Playlists};
use crate::storage::{KeyValueStore, PrefStore};
use crate::stutter::Stutter;
use crate::tempo::TapTempo;
use crate::track_id::TrackId;

use super::events::{
    BpmPayload, CueMarkersPayload, FaderPayload, LoadingPayload, LoopPayload, StutterPayload,
    TransportPayload, UiEvent, UiSender,
};
use super::timers::TimerTable;

/// Optional loop region on a deck. `out > in` whenever `active` is true.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoopRegion {
    pub in_time: Option<f64>,
    pub out_time: Option<f64>,
    pub active: bool,
    pub beat_length: Option<u32>,
}

impl LoopRegion {
    /// Both endpoints set and correctly ordered.
    pub fn is_valid(&self) -> bool {
        matches!((self.in_time, self.out_time), (Some(i), Some(o)) if i < o)
    }

    pub fn clear(&mut self) {
        *self = LoopRegion::default();
    }
}

/// All state owned by one playback slot.
pub struct DeckState {
    pub slot: u8,
    pub engine: Option<Box<dyn VideoEngine>>,
    pub engine_ready: bool,
    /// Part of the visible topology; inactive decks keep state but are silent.
    pub active: bool,
    pub current_track: Option<TrackId>,
    /// At most one load waiting for the engine instance to become ready.
    pub queued_track: Option<TrackId>,
    pub playback: PlaybackState,
    pub cue_points: [Option<f64>; CUE_SLOTS],
    pub loop_region: LoopRegion,
    pub bpm: Option<f64>,
    pub tap: TapTempo,
    pub stutter: Stutter,
    pub intended_volume: u8,
    /// Mixer-computed; never persisted, never mutated elsewhere.
    pub effective_volume: u8,
    pub seek_dragging: bool,
    pub loading: bool,
}

impl DeckState {
    fn new(slot: u8, active: bool) -> Self {
        Self {
            slot,
            engine: None,
            engine_ready: false,
            active,
            current_track: None,
            queued_track: None,
            playback: PlaybackState::Unstarted,
            cue_points: [None; CUE_SLOTS],
            loop_region: LoopRegion::default(),
            bpm: None,
            tap: TapTempo::new(),
            stutter: Stutter::Idle,
            intended_volume: DEFAULT_INTENDED_VOLUME,
            effective_volume: 0,
            seek_dragging: false,
            loading: false,
        }
    }

    /// Engine duration, zero when unbound.
    pub fn duration(&self) -> f64 {
        self.engine.as_ref().map(|e| e.duration()).unwrap_or(0.0)
    }
}

/// The coordination core: four deck slots, the mixer, the consent-gated
/// store, the timer table, and the UI event sender. Owned by a single task;
/// every handler is a synchronous method.
pub struct Console {
    pub(crate) decks: [DeckState; DECK_SLOTS],
    pub(crate) mixer: MixerState,
    pub(crate) store: PrefStore,
    pub(crate) playlists: Playlists,
    pub(crate) fades: HashMap<FaderPair, FadeAnim>,
    pub(crate) timers: TimerTable,
    pub(crate) ui: UiSender,
    pub(crate) engine_factory: Box<dyn EngineFactory>,
    /// Global "engine API ready" flag; engine instances bind only after it.
    pub(crate) api_ready: bool,
}

impl Console {
    pub fn new(
        engine_factory: Box<dyn EngineFactory>,
        backing: Box<dyn KeyValueStore>,
        ui: UiSender,
    ) -> Self {
        let store = PrefStore::new(backing);
        let playlists = match playlist::load_playlists(&store) {
            Ok(playlists) => playlists,
            Err(e) => {
                log::warn!("Failed to load persisted playlists at startup: {e}");
                Playlists::new()
            }
        };
        Self {
            decks: [
                DeckState::new(1, true),
                DeckState::new(2, true),
                DeckState::new(3, false),
                DeckState::new(4, false),
            ],
            mixer: MixerState::default(),
            store,
            playlists,
            fades: HashMap::new(),
            timers: TimerTable::new(),
            ui,
            engine_factory,
            api_ready: false,
        }
    }

    pub(crate) fn deck(&self, slot: u8) -> &DeckState {
        &self.decks[(slot - 1) as usize]
    }

    pub(crate) fn deck_mut(&mut self, slot: u8) -> &mut DeckState {
        &mut self.decks[(slot - 1) as usize]
    }

    /// Validates a command's slot number. Out-of-range slots are dropped
    /// with a log entry, mirroring unknown-deck handling upstream.
    pub(crate) fn valid_slot(&self, slot: u8) -> bool {
        let ok = (1..=DECK_SLOTS as u8).contains(&slot);
        if !ok {
            log::error!("Command for unknown deck slot {slot}; ignoring");
        }
        ok
    }

    // --- Reflection helpers ---

    pub(crate) fn emit_transport(&self, slot: u8) {
        let deck = self.deck(slot);
        self.ui.emit(UiEvent::Transport(TransportPayload {
            slot,
            state: deck.playback,
            displays_as_paused: deck.playback.displays_as_paused(),
        }));
    }

    pub(crate) fn emit_loading(&self, slot: u8) {
        self.ui.emit(UiEvent::Loading(LoadingPayload {
            slot,
            loading: self.deck(slot).loading,
        }));
    }

    pub(crate) fn emit_cue_markers(&self, slot: u8) {
        self.ui.emit(UiEvent::CueMarkers(CueMarkersPayload {
            slot,
            cue_points: self.deck(slot).cue_points,
        }));
    }

    pub(crate) fn emit_loop(&self, slot: u8) {
        let region = &self.deck(slot).loop_region;
        self.ui.emit(UiEvent::Loop(LoopPayload {
            slot,
            loop_in: region.in_time,
            loop_out: region.out_time,
            active: region.active,
            beat_length: region.beat_length,
        }));
    }

    pub(crate) fn emit_bpm(&self, slot: u8) {
        self.ui.emit(UiEvent::Bpm(BpmPayload {
            slot,
            bpm: self.deck(slot).bpm,
        }));
    }

    pub(crate) fn emit_stutter(&self, slot: u8) {
        let (mode, rate_hz) = match &self.deck(slot).stutter {
            Stutter::Active(fx) => (Some(fx.mode), Some(fx.rate.hz())),
            Stutter::Idle => (None, None),
        };
        self.ui
            .emit(UiEvent::Stutter(StutterPayload { slot, mode, rate_hz }));
    }

    pub(crate) fn emit_fader(&self, pair: FaderPair) {
        let fader = self.mixer.fader(pair);
        self.ui.emit(UiEvent::Fader(FaderPayload {
            pair,
            position: fader.position,
            auto_enabled: fader.auto_enabled,
            beats_for_fade: fader.beats_for_fade,
            is_fading: fader.is_fading,
        }));
    }
}
