use tokio::sync::{mpsc, oneshot};

use crate::errors::ConsoleClosed;
use crate::mixer::{FadeDirection, FaderPair, ViewMode};
use crate::stutter::StutterMode;

/// Everything the console task can be asked to do. UI actions and engine
/// callbacks alike arrive through this channel, so the loop is the single
/// point of mutation.
#[derive(Debug)]
pub enum ConsoleCommand {
    /// The global engine API became available; active decks may bind.
    ApiReady,
    LoadTrack {
        slot: u8,
        input: String,
    },
    PlayPause(u8),
    Seek {
        slot: u8,
        seconds: f64,
    },
    SetSeekDragging {
        slot: u8,
        dragging: bool,
    },
    SetCuePoint {
        slot: u8,
        index: usize,
        at: Option<f64>,
    },
    JumpToCuePoint {
        slot: u8,
        index: usize,
    },
    SetLoopIn {
        slot: u8,
        at: Option<f64>,
    },
    SetLoopOut {
        slot: u8,
        at: Option<f64>,
    },
    ToggleLoop(u8),
    SetBeatLoop {
        slot: u8,
        beats: u32,
    },
    SetBpm {
        slot: u8,
        bpm: Option<f64>,
    },
    TapTempo(u8),
    StartStutter {
        slot: u8,
        mode: StutterMode,
        rate_hz: u32,
    },
    StopStutter(u8),
    SetStutterRate {
        slot: u8,
        rate_hz: u32,
    },
    SetDeckVolume {
        slot: u8,
        level: u8,
    },
    SetMasterVolume(u8),
    SetCrossfader {
        pair: FaderPair,
        position: f64,
    },
    SetAutoFade {
        pair: FaderPair,
        enabled: bool,
    },
    SetBeatsForFade {
        pair: FaderPair,
        beats: u32,
    },
    TriggerCrossfade {
        pair: FaderPair,
        direction: Option<FadeDirection>,
    },
    SetViewMode(ViewMode),
    SavePlaylist(String),
    LoadPlaylist(String),
    DeletePlaylist(String),
    SetConsent {
        preferences: bool,
    },
    ResetDeck {
        slot: u8,
        full: bool,
    },
    EngineReady(u8),
    EngineStateChanged {
        slot: u8,
        code: i32,
    },
    EngineError {
        slot: u8,
        code: u32,
    },
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable front door to the console task.
#[derive(Clone)]
pub struct ConsoleHandle {
    tx: mpsc::Sender<ConsoleCommand>,
}

impl ConsoleHandle {
    pub fn new(tx: mpsc::Sender<ConsoleCommand>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, command: ConsoleCommand) -> Result<(), ConsoleClosed> {
        self.tx.send(command).await.map_err(|_| ConsoleClosed)
    }

    pub async fn load_track(&self, slot: u8, input: impl Into<String>) -> Result<(), ConsoleClosed> {
        let input = input.into();
        log::info!("CMD: Load track '{input}' on deck {slot}");
        self.send(ConsoleCommand::LoadTrack { slot, input }).await
    }

    pub async fn play_pause(&self, slot: u8) -> Result<(), ConsoleClosed> {
        log::info!("CMD: Play/pause deck {slot}");
        self.send(ConsoleCommand::PlayPause(slot)).await
    }

    pub async fn seek(&self, slot: u8, seconds: f64) -> Result<(), ConsoleClosed> {
        log::debug!("CMD: Seek deck {slot} to {seconds:.2}s");
        self.send(ConsoleCommand::Seek { slot, seconds }).await
    }

    pub async fn set_cue_point(
        &self,
        slot: u8,
        index: usize,
        at: Option<f64>,
    ) -> Result<(), ConsoleClosed> {
        log::info!("CMD: Set cue {index} on deck {slot}");
        self.send(ConsoleCommand::SetCuePoint { slot, index, at }).await
    }

    pub async fn jump_to_cue_point(&self, slot: u8, index: usize) -> Result<(), ConsoleClosed> {
        log::info!("CMD: Jump to cue {index} on deck {slot}");
        self.send(ConsoleCommand::JumpToCuePoint { slot, index }).await
    }

    pub async fn toggle_loop(&self, slot: u8) -> Result<(), ConsoleClosed> {
        log::info!("CMD: Toggle loop on deck {slot}");
        self.send(ConsoleCommand::ToggleLoop(slot)).await
    }

    pub async fn start_stutter(
        &self,
        slot: u8,
        mode: StutterMode,
        rate_hz: u32,
    ) -> Result<(), ConsoleClosed> {
        log::info!("CMD: Start {mode:?} stutter at {rate_hz}Hz on deck {slot}");
        self.send(ConsoleCommand::StartStutter { slot, mode, rate_hz }).await
    }

    pub async fn stop_stutter(&self, slot: u8) -> Result<(), ConsoleClosed> {
        log::info!("CMD: Stop stutter on deck {slot}");
        self.send(ConsoleCommand::StopStutter(slot)).await
    }

    pub async fn set_deck_volume(&self, slot: u8, level: u8) -> Result<(), ConsoleClosed> {
        log::debug!("CMD: Set deck {slot} volume to {level}");
        self.send(ConsoleCommand::SetDeckVolume { slot, level }).await
    }

    pub async fn set_master_volume(&self, level: u8) -> Result<(), ConsoleClosed> {
        log::debug!("CMD: Set master volume to {level}");
        self.send(ConsoleCommand::SetMasterVolume(level)).await
    }

    pub async fn set_crossfader(&self, pair: FaderPair, position: f64) -> Result<(), ConsoleClosed> {
        log::debug!("CMD: Set crossfader {pair} to {position:.1}");
        self.send(ConsoleCommand::SetCrossfader { pair, position }).await
    }

    pub async fn trigger_crossfade(
        &self,
        pair: FaderPair,
        direction: Option<FadeDirection>,
    ) -> Result<(), ConsoleClosed> {
        log::info!("CMD: Trigger crossfade on pair {pair}");
        self.send(ConsoleCommand::TriggerCrossfade { pair, direction }).await
    }

    pub async fn set_view_mode(&self, view: ViewMode) -> Result<(), ConsoleClosed> {
        log::info!("CMD: Set view mode {view:?}");
        self.send(ConsoleCommand::SetViewMode(view)).await
    }

    pub async fn save_playlist(&self, name: impl Into<String>) -> Result<(), ConsoleClosed> {
        let name = name.into();
        log::info!("CMD: Save playlist '{name}'");
        self.send(ConsoleCommand::SavePlaylist(name)).await
    }

    pub async fn load_playlist(&self, name: impl Into<String>) -> Result<(), ConsoleClosed> {
        let name = name.into();
        log::info!("CMD: Load playlist '{name}'");
        self.send(ConsoleCommand::LoadPlaylist(name)).await
    }

    pub async fn set_consent(&self, preferences: bool) -> Result<(), ConsoleClosed> {
        log::info!("CMD: Set preference-storage consent to {preferences}");
        self.send(ConsoleCommand::SetConsent { preferences }).await
    }

    /// Asks the console task to stop, resolving once cleanup has finished.
    pub async fn shutdown(&self) -> Result<(), ConsoleClosed> {
        log::info!("CMD: Shutdown");
        let (tx, rx) = oneshot::channel();
        self.send(ConsoleCommand::Shutdown(tx)).await?;
        rx.await.map_err(|_| ConsoleClosed)
    }
}
