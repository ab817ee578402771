use serde::Serialize;
use tokio::sync::mpsc;

use crate::config::CUE_SLOTS;
use crate::engine::PlaybackState;
use crate::mixer::{FaderPair, ViewMode};
use crate::stutter::StutterMode;

// --- Event Payloads for the UI Layer ---

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoticePayload {
    pub severity: Severity,
    pub message: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeckTickPayload {
    pub slot: u8,
    pub position: f64,
    pub duration: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeckLoadPayload {
    pub slot: u8,
    pub track_id: Option<String>,
    pub title: Option<String>,
    pub duration: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransportPayload {
    pub slot: u8,
    pub state: PlaybackState,
    /// Cued is shown as paused on the transport button.
    pub displays_as_paused: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoadingPayload {
    pub slot: u8,
    pub loading: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CueMarkersPayload {
    pub slot: u8,
    pub cue_points: [Option<f64>; CUE_SLOTS],
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoopPayload {
    pub slot: u8,
    pub loop_in: Option<f64>,
    pub loop_out: Option<f64>,
    pub active: bool,
    pub beat_length: Option<u32>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BpmPayload {
    pub slot: u8,
    pub bpm: Option<f64>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StutterPayload {
    pub slot: u8,
    pub mode: Option<StutterMode>,
    pub rate_hz: Option<u32>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumePayload {
    pub slot: u8,
    pub intended: u8,
    pub effective: u8,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MasterVolumePayload {
    pub master: u8,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FaderPayload {
    pub pair: FaderPair,
    pub position: f64,
    pub auto_enabled: bool,
    pub beats_for_fade: u32,
    pub is_fading: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewModePayload {
    pub view: ViewMode,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistsPayload {
    pub names: Vec<String>,
}

/// Everything the console reflects back to the UI layer.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum UiEvent {
    Notice(NoticePayload),
    DeckTick(DeckTickPayload),
    DeckLoad(DeckLoadPayload),
    Transport(TransportPayload),
    Loading(LoadingPayload),
    CueMarkers(CueMarkersPayload),
    Loop(LoopPayload),
    Bpm(BpmPayload),
    Stutter(StutterPayload),
    Volume(VolumePayload),
    MasterVolume(MasterVolumePayload),
    Fader(FaderPayload),
    ViewMode(ViewModePayload),
    Playlists(PlaylistsPayload),
}

// --- Event Emitter ---

/// Fire-and-forget sender toward the UI layer. A closed channel is logged
/// once per emit and never treated as fatal.
#[derive(Clone)]
pub struct UiSender {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl UiSender {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            log::warn!("UI event channel closed; event dropped");
        }
    }

    pub fn notice(&self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Info => log::info!("Notice: {message}"),
            Severity::Warning => log::warn!("Notice: {message}"),
            Severity::Error => log::error!("Notice: {message}"),
        }
        self.emit(UiEvent::Notice(NoticePayload { severity, message }));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notice(Severity::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.notice(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notice(Severity::Error, message);
    }
}
