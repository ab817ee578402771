use std::time::Duration;

use crate::config::{CROSSFADE_STEPS, FALLBACK_FADE_SECS};
use crate::engine::PlaybackState;
use crate::errors::ValidationError;
use crate::mixer::{FadeAnim, FadeDirection, FaderPair, Side, ViewMode};

use super::events::{MasterVolumePayload, UiEvent, ViewModePayload, VolumePayload};
use super::state::Console;
use super::timers::TimerKind;

impl Console {
    // --- Levels ---

    pub(crate) fn set_deck_volume(&mut self, slot: u8, level: u8) {
        let level = level.min(100);
        self.deck_mut(slot).intended_volume = level;
        self.persist_track_settings(slot);
        self.recompute_volumes();
    }

    pub(crate) fn set_master_volume(&mut self, level: u8) {
        self.mixer.master = level.min(100);
        self.ui.emit(UiEvent::MasterVolume(MasterVolumePayload {
            master: self.mixer.master,
        }));
        self.recompute_volumes();
    }

    /// Re-derives every deck's effective level from the mixer and pushes the
    /// result into the engines. Cheap enough to run after any mixer change.
    pub(crate) fn recompute_volumes(&mut self) {
        for slot in 1..=self.decks.len() as u8 {
            let intended = self.deck(slot).intended_volume;
            let effective = self.mixer.effective_volume(slot, intended);
            let changed = self.deck(slot).effective_volume != effective;
            self.deck_mut(slot).effective_volume = effective;
            if let Some(engine) = self.deck_mut(slot).engine.as_mut() {
                engine.set_volume(effective);
            }
            if changed {
                self.ui.emit(UiEvent::Volume(VolumePayload {
                    slot,
                    intended,
                    effective,
                }));
            }
        }
    }

    // --- Crossfaders ---

    pub(crate) fn set_crossfader(&mut self, pair: FaderPair, position: f64) {
        if self.mixer.fader(pair).is_fading {
            // Manual moves lose to a running animation.
            log::debug!("Crossfader {pair} is animating; manual move ignored");
            return;
        }
        if position.is_nan() {
            self.ui.warn("Crossfader position is not a number".to_string());
            return;
        }
        self.mixer.fader_mut(pair).position = position.clamp(0.0, 100.0);
        self.recompute_volumes();
        self.emit_fader(pair);
    }

    pub(crate) fn set_auto_fade(&mut self, pair: FaderPair, enabled: bool) {
        self.mixer.fader_mut(pair).auto_enabled = enabled;
        self.emit_fader(pair);
    }

    pub(crate) fn set_beats_for_fade(&mut self, pair: FaderPair, beats: u32) {
        self.mixer.fader_mut(pair).beats_for_fade = beats.max(1);
        self.emit_fader(pair);
    }

    /// Starts a timed fade animation across `pair`. Without an explicit
    /// direction the fader moves away from its dominant side; at the exact
    /// midpoint it moves right, handing off from the left deck.
    pub(crate) fn trigger_crossfade(&mut self, pair: FaderPair, direction: Option<FadeDirection>) {
        if !FaderPair::for_mode(self.mixer.view).contains(&pair) {
            self.ui
                .warn(format!("Crossfader {pair} is not part of the current layout"));
            return;
        }
        if self.mixer.fader(pair).is_fading {
            self.ui
                .warn(ValidationError::AlreadyFading(pair.to_string()).to_string());
            return;
        }

        let position = self.mixer.fader(pair).position;
        let target = match direction {
            Some(direction) => direction.target_position(),
            None => match self.mixer.fader(pair).dominant_side() {
                Some(Side::Left) => 100.0,
                Some(Side::Right) => 0.0,
                None => 100.0,
            },
        };
        if (target - position).abs() < f64::EPSILON {
            log::debug!("Crossfader {pair} already at target {target}; nothing to fade");
            return;
        }

        // Fade length follows the tempo of the deck being faded out.
        let fading_out = if target == 100.0 {
            pair.left_slot()
        } else {
            pair.right_slot()
        };
        let fading_in = if target == 100.0 {
            pair.right_slot()
        } else {
            pair.left_slot()
        };
        let beats = self.mixer.fader(pair).beats_for_fade;
        let fade_secs = match self.deck(fading_out).bpm {
            Some(bpm) if bpm > 0.0 => beats as f64 * 60.0 / bpm,
            _ => {
                self.ui.warn(format!(
                    "Deck {fading_out} has no BPM; crossfading {pair} over {FALLBACK_FADE_SECS}s"
                ));
                FALLBACK_FADE_SECS
            }
        };

        // The incoming deck must be audible by the time the fade lands.
        let needs_play = {
            let deck = self.deck(fading_in);
            deck.current_track.is_some()
                && deck.engine_ready
                && deck.playback != PlaybackState::Playing
        };
        if needs_play {
            if let Some(engine) = self.deck_mut(fading_in).engine.as_mut() {
                engine.play();
            }
        }

        log::info!("Crossfading {pair} to {target} over {fade_secs:.2}s");
        self.mixer.fader_mut(pair).is_fading = true;
        self.fades
            .insert(pair, FadeAnim::new(position, target, CROSSFADE_STEPS));
        self.timers.schedule_periodic(
            TimerKind::FadeStep(pair),
            Duration::from_secs_f64(fade_secs / CROSSFADE_STEPS as f64),
        );
        self.emit_fader(pair);
    }

    pub(crate) fn fade_step(&mut self, pair: FaderPair) {
        let (position, done) = match self.fades.get_mut(&pair) {
            Some(anim) => anim.advance(),
            None => {
                self.timers.cancel(TimerKind::FadeStep(pair));
                return;
            }
        };
        self.mixer.fader_mut(pair).position = position;
        if done {
            self.fades.remove(&pair);
            self.mixer.fader_mut(pair).is_fading = false;
            self.timers.cancel(TimerKind::FadeStep(pair));
            log::info!("Crossfade on {pair} finished at {position}");
        }
        self.recompute_volumes();
        self.emit_fader(pair);
    }

    /// Auto-crossfade arming check, run from the poll tick when a deck nears
    /// its end. Fires at most once per arm: the flag clears as the fade
    /// starts and stays off until the user re-enables it.
    pub(crate) fn check_auto_crossfade(&mut self, ending_slot: u8, remaining: f64) {
        let candidates: Vec<(FaderPair, FadeDirection)> =
            FaderPair::for_mode(self.mixer.view)
                .iter()
                .filter_map(|&pair| {
                    let fader = self.mixer.fader(pair);
                    if !fader.auto_enabled || fader.is_fading {
                        return None;
                    }
                    let side = if pair.left_slot() == ending_slot {
                        Side::Left
                    } else if pair.right_slot() == ending_slot {
                        Side::Right
                    } else {
                        return None;
                    };
                    // Only hand off a deck the fader currently favors.
                    if fader.dominant_side() != Some(side) {
                        return None;
                    }
                    let direction = match side {
                        Side::Left => FadeDirection::ToRight,
                        Side::Right => FadeDirection::ToLeft,
                    };
                    Some((pair, direction))
                })
                .collect();

        for (pair, direction) in candidates {
            log::info!(
                "Deck {ending_slot} has {remaining:.1}s left; auto-crossfading {pair} {direction:?}"
            );
            self.mixer.fader_mut(pair).auto_enabled = false;
            self.trigger_crossfade(pair, Some(direction));
        }
    }

    // --- Topology ---

    pub(crate) fn set_view_mode(&mut self, view: ViewMode) {
        if self.mixer.view == view {
            return;
        }
        log::info!("Switching layout to {view:?}");
        match view {
            ViewMode::FourDecks => {
                self.mixer.apply_four_deck_defaults();
                for slot in [3u8, 4] {
                    self.deck_mut(slot).active = true;
                    // New decks enter silent; the defaults keep their faders
                    // pinned away from them as well.
                    self.deck_mut(slot).intended_volume = 0;
                    self.bind_engine(slot);
                }
            }
            ViewMode::TwoDecks => {
                self.mixer.apply_two_deck_defaults();
                for slot in [3u8, 4] {
                    self.deck_mut(slot).active = false;
                }
            }
        }
        self.recompute_volumes();
        self.ui
            .emit(UiEvent::ViewMode(ViewModePayload { view }));
        for &pair in FaderPair::for_mode(ViewMode::FourDecks) {
            self.emit_fader(pair);
        }
    }
}
