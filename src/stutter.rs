use serde::Serialize;

use crate::engine::PlaybackState;

/// Stutter variants. `Step` re-triggers from wherever playback currently is;
/// `Loop` re-triggers from a fixed anchor captured when the effect started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StutterMode {
    Step,
    Loop,
}

/// Allowed stutter cycle rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StutterRate {
    Hz2,
    Hz4,
    Hz8,
    Hz16,
}

impl StutterRate {
    pub fn hz(&self) -> u32 {
        match self {
            StutterRate::Hz2 => 2,
            StutterRate::Hz4 => 4,
            StutterRate::Hz8 => 8,
            StutterRate::Hz16 => 16,
        }
    }

    /// Tick period in milliseconds.
    pub fn period_ms(&self) -> u64 {
        1000 / self.hz() as u64
    }

    pub fn from_hz(hz: u32) -> Option<Self> {
        match hz {
            2 => Some(StutterRate::Hz2),
            4 => Some(StutterRate::Hz4),
            8 => Some(StutterRate::Hz8),
            16 => Some(StutterRate::Hz16),
            _ => None,
        }
    }
}

/// Where the effect is inside its seek/play/pause cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StutterPhase {
    /// Anchored and waiting for the next periodic tick.
    AwaitingTick,
    /// Played after a seek; the short-play window timer is pending.
    ShortPlayWindow,
}

/// One active stutter effect on a deck.
#[derive(Debug, Clone, PartialEq)]
pub struct StutterFx {
    pub mode: StutterMode,
    pub rate: StutterRate,
    /// Fixed re-trigger point; only the `Loop` variant has one.
    pub anchor: Option<f64>,
    /// Engine state at activation, restored when the effect stops.
    pub resume: PlaybackState,
    pub phase: StutterPhase,
}

/// Stutter slot on a deck: at most one active effect.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Stutter {
    #[default]
    Idle,
    Active(StutterFx),
}

impl Stutter {
    pub fn is_active(&self) -> bool {
        matches!(self, Stutter::Active(_))
    }

    pub fn active_mode(&self) -> Option<StutterMode> {
        match self {
            Stutter::Active(fx) => Some(fx.mode),
            Stutter::Idle => None,
        }
    }

    pub fn fx_mut(&mut self) -> Option<&mut StutterFx> {
        match self {
            Stutter::Active(fx) => Some(fx),
            Stutter::Idle => None,
        }
    }
}
