//! The coordination core. All deck, mixer, and playlist state is owned by a
//! single task that drains a command channel and a software timer table;
//! handlers are synchronous methods on [`Console`], which keeps the state
//! machine deterministic and directly testable.

pub mod commands;
pub mod events;

mod deck;
mod mixer;
mod playlist;
mod state;
mod stutter;
mod timers;


pub use commands::{ConsoleCommand, ConsoleHandle};
pub use events::{Severity, UiEvent, UiSender};
pub use state::{Console, DeckState, LoopRegion};

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::{COMMAND_CHAN_SIZE, DECK_SLOTS};
use crate::engine::EngineFactory;
use crate::storage::KeyValueStore;

use timers::TimerKind;

impl Console {
    /// Applies one command. Slot-scoped commands for out-of-range slots are
    /// dropped with a log entry.
    pub fn handle_command(&mut self, command: ConsoleCommand) {
        log::debug!("Handling command: {command:?}");
        match command {
            ConsoleCommand::ApiReady => self.handle_api_ready(),
            ConsoleCommand::LoadTrack { slot, input } => {
                if self.valid_slot(slot) {
                    self.load_track(slot, &input);
                }
            }
            ConsoleCommand::PlayPause(slot) => {
                if self.valid_slot(slot) {
                    self.play_pause(slot);
                }
            }
            ConsoleCommand::Seek { slot, seconds } => {
                if self.valid_slot(slot) {
                    self.seek(slot, seconds);
                }
            }
            ConsoleCommand::SetSeekDragging { slot, dragging } => {
                if self.valid_slot(slot) {
                    self.set_seek_dragging(slot, dragging);
                }
            }
            ConsoleCommand::SetCuePoint { slot, index, at } => {
                if self.valid_slot(slot) {
                    self.set_cue_point(slot, index, at);
                }
            }
            ConsoleCommand::JumpToCuePoint { slot, index } => {
                if self.valid_slot(slot) {
                    self.jump_to_cue_point(slot, index);
                }
            }
            ConsoleCommand::SetLoopIn { slot, at } => {
                if self.valid_slot(slot) {
                    self.set_loop_in(slot, at);
                }
            }
            ConsoleCommand::SetLoopOut { slot, at } => {
                if self.valid_slot(slot) {
                    self.set_loop_out(slot, at);
                }
            }
            ConsoleCommand::ToggleLoop(slot) => {
                if self.valid_slot(slot) {
                    self.toggle_loop(slot);
                }
            }
            ConsoleCommand::SetBeatLoop { slot, beats } => {
                if self.valid_slot(slot) {
                    self.set_beat_loop(slot, beats);
                }
            }
            ConsoleCommand::SetBpm { slot, bpm } => {
                if self.valid_slot(slot) {
                    self.set_bpm(slot, bpm);
                }
            }
            ConsoleCommand::TapTempo(slot) => {
                if self.valid_slot(slot) {
                    self.tap_tempo(slot);
                }
            }
            ConsoleCommand::StartStutter { slot, mode, rate_hz } => {
                if self.valid_slot(slot) {
                    self.start_stutter(slot, mode, rate_hz);
                }
            }
            ConsoleCommand::StopStutter(slot) => {
                if self.valid_slot(slot) {
                    self.stop_stutter(slot);
                }
            }
            ConsoleCommand::SetStutterRate { slot, rate_hz } => {
                if self.valid_slot(slot) {
                    self.set_stutter_rate(slot, rate_hz);
                }
            }
            ConsoleCommand::SetDeckVolume { slot, level } => {
                if self.valid_slot(slot) {
                    self.set_deck_volume(slot, level);
                }
            }
            ConsoleCommand::SetMasterVolume(level) => self.set_master_volume(level),
            ConsoleCommand::SetCrossfader { pair, position } => {
                self.set_crossfader(pair, position);
            }
            ConsoleCommand::SetAutoFade { pair, enabled } => self.set_auto_fade(pair, enabled),
            ConsoleCommand::SetBeatsForFade { pair, beats } => {
                self.set_beats_for_fade(pair, beats);
            }
            ConsoleCommand::TriggerCrossfade { pair, direction } => {
                self.trigger_crossfade(pair, direction);
            }
            ConsoleCommand::SetViewMode(view) => self.set_view_mode(view),
            ConsoleCommand::SavePlaylist(name) => self.save_playlist(name),
            ConsoleCommand::LoadPlaylist(name) => self.load_playlist(name),
            ConsoleCommand::DeletePlaylist(name) => self.delete_playlist(name),
            ConsoleCommand::SetConsent { preferences } => self.set_consent(preferences),
            ConsoleCommand::ResetDeck { slot, full } => {
                if self.valid_slot(slot) {
                    self.reset_deck_state(slot, full);
                }
            }
            ConsoleCommand::EngineReady(slot) => {
                if self.valid_slot(slot) {
                    self.handle_engine_ready(slot);
                }
            }
            ConsoleCommand::EngineStateChanged { slot, code } => {
                if self.valid_slot(slot) {
                    self.handle_engine_state(slot, code);
                }
            }
            ConsoleCommand::EngineError { slot, code } => {
                if self.valid_slot(slot) {
                    self.handle_engine_error(slot, code);
                }
            }
            ConsoleCommand::Shutdown(_) => {
                // Consumed by the run loop before dispatch.
                log::warn!("Shutdown reached the dispatcher; ignoring");
            }
        }
    }

    /// Routes an expired timer to its handler.
    pub(crate) fn fire_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Poll(slot) => self.poll_tick(slot),
            TimerKind::StutterTick(slot) => self.stutter_tick(slot),
            TimerKind::StutterPause(slot) => self.stutter_pause_tick(slot),
            TimerKind::FadeStep(pair) => self.fade_step(pair),
        }
    }

    /// Fires every timer due at `now`. Exposed to the loop and the suite.
    pub fn run_due_timers(&mut self, now: Instant) {
        for kind in self.timers.pop_due(now) {
            self.fire_timer(kind);
        }
    }

    fn shutdown_cleanup(&mut self) {
        log::info!("Console shutting down");
        for slot in 1..=DECK_SLOTS as u8 {
            self.timers.cancel_deck(slot);
            if let Some(engine) = self.deck_mut(slot).engine.as_mut() {
                engine.stop();
            }
        }
    }
}

/// Drives a [`Console`] until shutdown: commands interleave with due timers,
/// sleeping only until the earliest pending deadline.
pub async fn run_console(mut console: Console, mut rx: mpsc::Receiver<ConsoleCommand>) {
    log::info!("Console task started");
    loop {
        let next = console.timers.next_deadline();
        tokio::select! {
            maybe_command = rx.recv() => match maybe_command {
                Some(ConsoleCommand::Shutdown(ack)) => {
                    console.shutdown_cleanup();
                    if ack.send(()).is_err() {
                        log::warn!("Shutdown requester went away before the ack");
                    }
                    break;
                }
                Some(command) => console.handle_command(command),
                None => {
                    log::info!("Command channel closed; console task exiting");
                    break;
                }
            },
            _ = tokio::time::sleep_until(next.unwrap_or_else(Instant::now)), if next.is_some() => {
                console.run_due_timers(Instant::now());
            }
        }
    }
}

/// Spawns the console on its own thread with a current-thread runtime and
/// returns the command handle, the UI event stream, and the join handle.
pub fn spawn_console(
    engine_factory: Box<dyn EngineFactory>,
    backing: Box<dyn KeyValueStore>,
) -> (
    ConsoleHandle,
    mpsc::UnboundedReceiver<UiEvent>,
    std::thread::JoinHandle<()>,
) {
    let (ui, ui_rx) = UiSender::new();
    let (tx, rx) = mpsc::channel(COMMAND_CHAN_SIZE);
    let console = Console::new(engine_factory, backing, ui);
    let thread = std::thread::spawn(move || run_console_thread(console, rx));
    (ConsoleHandle::new(tx), ui_rx, thread)
}

fn run_console_thread(console: Console, rx: mpsc::Receiver<ConsoleCommand>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to build console runtime: {e}");
            return;
        }
    };
    runtime.block_on(run_console(console, rx));
    log::info!("Console thread finished");
}
