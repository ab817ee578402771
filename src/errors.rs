use thiserror::Error;

/// Rejected user input. Recovered locally: the operation is a no-op and the
/// user sees a warning toast. Never mutates deck state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("'{0}' is not a valid track identifier or recognized URL")]
    InvalidTrackId(String),
    #[error("Cue index {0} is out of range")]
    CueIndexOutOfRange(usize),
    #[error("Cue point {0} is not set")]
    CueNotSet(usize),
    #[error("Time {time:.2}s is outside the valid range [0, {duration:.2}]")]
    TimeOutOfRange { time: f64, duration: f64 },
    #[error("Time value is not a number")]
    TimeNotANumber,
    #[error("Loop out ({out:.2}s) must be after loop in ({r#in:.2}s)")]
    LoopOutNotAfterIn { r#in: f64, out: f64 },
    #[error("Loop in and out points are not both set; set a BPM and beat length to derive them")]
    LoopRegionIncomplete,
    #[error("A BPM is required for beat-length operations")]
    BpmRequired,
    #[error("No track is loaded on deck {0}")]
    NoTrackLoaded(u8),
    #[error("Deck {0} player is not ready")]
    EngineNotReady(u8),
    #[error("Crossfader {0} is already fading")]
    AlreadyFading(String),
    #[error("Playlist '{0}' does not exist")]
    UnknownPlaylist(String),
}

/// Failures at the persistence boundary. Terminal where detected: the
/// operation reports failure, in-memory state is left untouched, and a retry
/// is up to the user.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Preference storage requires consent")]
    ConsentDenied,
    #[error("Storage capacity exceeded while writing '{key}'")]
    QuotaExceeded { key: String },
    #[error("Storage backend failed for '{key}': {reason}")]
    Backend { key: String, reason: String },
    #[error("Stored entry '{key}' is corrupted: {source}")]
    Corrupted {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize entry '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Category derived from a numeric playback-engine error code. Any engine
/// fault forces a full reset of the affected deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFault {
    InvalidTrackId,
    PlaybackForbidden,
    NotFound,
    Other,
}

impl EngineFault {
    pub fn from_code(code: u32) -> Self {
        match code {
            2 => EngineFault::InvalidTrackId,
            100 => EngineFault::NotFound,
            101 | 150 => EngineFault::PlaybackForbidden,
            _ => EngineFault::Other,
        }
    }

    /// User-facing description for the error toast.
    pub fn message(&self) -> &'static str {
        match self {
            EngineFault::InvalidTrackId => "The track identifier was rejected by the player",
            EngineFault::PlaybackForbidden => "The owner of this track does not allow embedded playback",
            EngineFault::NotFound => "Track not found or removed",
            EngineFault::Other => "Playback failed",
        }
    }
}

/// The console task is gone; its command channel is closed.
#[derive(Error, Debug)]
#[error("Console command channel is closed")]
pub struct ConsoleClosed;
