use std::time::Duration;

use crate::config::STUTTER_PLAY_WINDOW_MS;
use crate::engine::PlaybackState;
use crate::stutter::{Stutter, StutterFx, StutterMode, StutterPhase, StutterRate};

use super::state::Console;
use super::timers::TimerKind;

impl Console {
    pub(crate) fn start_stutter(&mut self, slot: u8, mode: StutterMode, rate_hz: u32) {
        if !self.require_ready_track(slot) {
            return;
        }
        let rate = match StutterRate::from_hz(rate_hz) {
            Some(rate) => rate,
            None => {
                self.ui.warn(format!("Unsupported stutter rate {rate_hz}Hz"));
                return;
            }
        };
        // Switching mode or rate mid-stutter: tear down the old effect
        // without restoring playback, then start fresh. The original resume
        // state would be the stutter's own paused state, not the user's.
        if self.deck(slot).stutter.is_active() {
            self.stop_stutter_inner(slot, false);
        }

        let resume = self
            .deck(slot)
            .engine
            .as_ref()
            .map(|e| e.player_state())
            .unwrap_or(PlaybackState::Unstarted);
        let anchor = match mode {
            StutterMode::Loop => Some(self.engine_position(slot)),
            StutterMode::Step => None,
        };
        log::info!("Deck {slot}: starting {mode:?} stutter at {rate_hz}Hz");
        self.deck_mut(slot).stutter = Stutter::Active(StutterFx {
            mode,
            rate,
            anchor,
            resume,
            phase: StutterPhase::AwaitingTick,
        });
        self.timers.schedule_periodic(
            TimerKind::StutterTick(slot),
            Duration::from_millis(rate.period_ms()),
        );
        self.emit_stutter(slot);
    }

    pub(crate) fn stop_stutter(&mut self, slot: u8) {
        self.stop_stutter_inner(slot, true);
    }

    /// Tears the effect down. With `restore`, playback returns to what it
    /// was doing when the stutter started.
    pub(crate) fn stop_stutter_inner(&mut self, slot: u8, restore: bool) {
        let resume = match &self.deck(slot).stutter {
            Stutter::Active(fx) => fx.resume,
            Stutter::Idle => return,
        };
        log::info!("Deck {slot}: stopping stutter (restore={restore})");
        self.timers.cancel(TimerKind::StutterTick(slot));
        self.timers.cancel(TimerKind::StutterPause(slot));
        self.deck_mut(slot).stutter = Stutter::Idle;
        if restore {
            if let Some(engine) = self.deck_mut(slot).engine.as_mut() {
                if resume == PlaybackState::Playing {
                    engine.play();
                } else {
                    engine.pause();
                }
            }
        }
        self.emit_stutter(slot);
    }

    /// Rate changes mid-effect reschedule the tick but keep the anchor, so a
    /// Loop stutter stays glued to the same position.
    pub(crate) fn set_stutter_rate(&mut self, slot: u8, rate_hz: u32) {
        let rate = match StutterRate::from_hz(rate_hz) {
            Some(rate) => rate,
            None => {
                self.ui.warn(format!("Unsupported stutter rate {rate_hz}Hz"));
                return;
            }
        };
        let active = match self.deck_mut(slot).stutter.fx_mut() {
            Some(fx) => {
                fx.rate = rate;
                true
            }
            None => false,
        };
        if !active {
            return;
        }
        self.timers.schedule_periodic(
            TimerKind::StutterTick(slot),
            Duration::from_millis(rate.period_ms()),
        );
        self.emit_stutter(slot);
    }

    /// Period boundary: seek, play, start the short play window, and arm its
    /// end. Loop re-anchors to the captured position; Step seeks to the
    /// current time, which is what produces the re-trigger articulation on
    /// the engine.
    pub(crate) fn stutter_tick(&mut self, slot: u8) {
        let (mode, anchor) = match &self.deck(slot).stutter {
            Stutter::Active(fx) => (fx.mode, fx.anchor),
            Stutter::Idle => {
                self.timers.cancel(TimerKind::StutterTick(slot));
                return;
            }
        };
        if let Some(engine) = self.deck_mut(slot).engine.as_mut() {
            let target = match (mode, anchor) {
                (StutterMode::Loop, Some(anchor)) => anchor,
                _ => engine.current_time(),
            };
            engine.seek_to(target, true);
            engine.play();
        }
        if let Some(fx) = self.deck_mut(slot).stutter.fx_mut() {
            fx.phase = StutterPhase::ShortPlayWindow;
        }
        self.timers.schedule_once(
            TimerKind::StutterPause(slot),
            Duration::from_millis(STUTTER_PLAY_WINDOW_MS),
        );
    }

    /// End of the play window: silence until the next period boundary.
    pub(crate) fn stutter_pause_tick(&mut self, slot: u8) {
        if !self.deck(slot).stutter.is_active() {
            return;
        }
        if let Some(engine) = self.deck_mut(slot).engine.as_mut() {
            engine.pause();
        }
        if let Some(fx) = self.deck_mut(slot).stutter.fx_mut() {
            fx.phase = StutterPhase::AwaitingTick;
        }
    }
}
