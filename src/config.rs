// --- Deck Constants ---
pub const DECK_SLOTS: usize = 4;
pub const CUE_SLOTS: usize = 3;
pub const DEFAULT_INTENDED_VOLUME: u8 = 100;

// --- Polling Loop Constants ---
// Interval for position updates and loop/auto-fade evaluation, per deck.
pub const POLL_INTERVAL_MS: u64 = 250;

// --- Tap Tempo Constants ---
// A gap longer than this between taps starts a fresh measurement.
pub const TAP_RESET_TIMEOUT_MS: u64 = 2000;
pub const MIN_TAPS_FOR_BPM: usize = 4;
// Oldest tap is dropped beyond this, keeping recent taps influential.
pub const TAP_BUFFER_CAP: usize = 8;

// --- Stutter Effect Constants ---
// How long the engine plays after each stutter seek before being paused again.
pub const STUTTER_PLAY_WINDOW_MS: u64 = 100;

// --- Crossfade Constants ---
pub const CROSSFADE_STEPS: u32 = 50;
// Fade duration used when the fading-out deck has no known BPM.
pub const FALLBACK_FADE_SECS: f64 = 2.0;
// Remaining seconds at which auto-crossfade may fire.
pub const AUTO_FADE_THRESHOLD_SECS: f64 = 8.0;
pub const FADER_MIDPOINT: f64 = 50.0;

// --- Track Identifier Constants ---
pub const TRACK_ID_LEN: usize = 11;

// --- Channel Constants ---
pub const COMMAND_CHAN_SIZE: usize = 32;

// --- Storage Keys ---
pub const CONSENT_KEY: &str = "quadeck.consent";
pub const PLAYLISTS_KEY: &str = "quadeck.playlists";
pub const TRACK_SETTINGS_PREFIX: &str = "quadeck.track.";
