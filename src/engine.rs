use serde::Serialize;

use crate::track_id::TrackId;

/// Transport states reported by the embedded playback engine.
///
/// `Cued` is treated as an alias of `Paused` for transport-button display
/// purposes only; the distinction is preserved everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl PlaybackState {
    /// Maps the engine's numeric state code.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => PlaybackState::Ended,
            1 => PlaybackState::Playing,
            2 => PlaybackState::Paused,
            3 => PlaybackState::Buffering,
            5 => PlaybackState::Cued,
            _ => PlaybackState::Unstarted,
        }
    }

    /// Whether the transport button should show this state as paused.
    pub fn displays_as_paused(&self) -> bool {
        matches!(self, PlaybackState::Paused | PlaybackState::Cued)
    }
}

/// Capability surface of one embedded playback-engine instance.
///
/// All calls are fire-and-forget from the console's point of view: effects
/// are observed through later state-change events or the next poll tick.
pub trait VideoEngine: Send {
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
    fn player_state(&self) -> PlaybackState;
    fn video_title(&self) -> Option<String>;
    fn seek_to(&mut self, seconds: f64, allow_seek_ahead: bool);
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn set_volume(&mut self, level: u8);
    fn cue_track(&mut self, id: &TrackId);
}

/// Constructs playback-engine instances. Decks bind one lazily the first
/// time they become visible; readiness arrives later as an engine event.
pub trait EngineFactory: Send {
    fn create(&mut self, slot: u8) -> Box<dyn VideoEngine>;
}

pub mod mock {
    //! Scriptable engine used by the test suite and by embedders that need
    //! a headless stand-in.

    use std::sync::{Arc, Mutex};

    use super::{EngineFactory, PlaybackState, VideoEngine};
    use crate::track_id::TrackId;

    /// Every call a [`MockEngine`] receives, in order.
    #[derive(Debug, Clone, PartialEq)]
    pub enum EngineCall {
        SeekTo(f64),
        Play,
        Pause,
        Stop,
        SetVolume(u8),
        CueTrack(String),
    }

    #[derive(Debug)]
    pub struct MockEngineState {
        pub current_time: f64,
        pub duration: f64,
        pub state: PlaybackState,
        pub title: Option<String>,
        pub calls: Vec<EngineCall>,
    }

    impl Default for MockEngineState {
        fn default() -> Self {
            Self {
                current_time: 0.0,
                duration: 0.0,
                state: PlaybackState::Unstarted,
                title: None,
                calls: Vec::new(),
            }
        }
    }

    /// Shared handle onto a mock engine's state, for scripting from tests.
    pub type EngineProbe = Arc<Mutex<MockEngineState>>;

    pub struct MockEngine {
        state: EngineProbe,
    }

    impl MockEngine {
        pub fn new() -> (Self, EngineProbe) {
            let state: EngineProbe = Arc::new(Mutex::new(MockEngineState::default()));
            (Self { state: state.clone() }, state)
        }
    }

    impl VideoEngine for MockEngine {
        fn current_time(&self) -> f64 {
            self.state.lock().unwrap().current_time
        }

        fn duration(&self) -> f64 {
            self.state.lock().unwrap().duration
        }

        fn player_state(&self) -> PlaybackState {
            self.state.lock().unwrap().state
        }

        fn video_title(&self) -> Option<String> {
            self.state.lock().unwrap().title.clone()
        }

        fn seek_to(&mut self, seconds: f64, _allow_seek_ahead: bool) {
            let mut s = self.state.lock().unwrap();
            s.current_time = seconds;
            s.calls.push(EngineCall::SeekTo(seconds));
        }

        fn play(&mut self) {
            let mut s = self.state.lock().unwrap();
            s.state = PlaybackState::Playing;
            s.calls.push(EngineCall::Play);
        }

        fn pause(&mut self) {
            let mut s = self.state.lock().unwrap();
            s.state = PlaybackState::Paused;
            s.calls.push(EngineCall::Pause);
        }

        fn stop(&mut self) {
            let mut s = self.state.lock().unwrap();
            s.state = PlaybackState::Unstarted;
            s.calls.push(EngineCall::Stop);
        }

        fn set_volume(&mut self, level: u8) {
            self.state.lock().unwrap().calls.push(EngineCall::SetVolume(level));
        }

        fn cue_track(&mut self, id: &TrackId) {
            let mut s = self.state.lock().unwrap();
            s.state = PlaybackState::Cued;
            s.current_time = 0.0;
            s.calls.push(EngineCall::CueTrack(id.as_str().to_string()));
        }
    }

    /// Factory handing out [`MockEngine`]s and collecting their probes.
    #[derive(Default)]
    pub struct MockEngineFactory {
        pub probes: Arc<Mutex<Vec<(u8, EngineProbe)>>>,
    }

    impl MockEngineFactory {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn probe_handle(&self) -> Arc<Mutex<Vec<(u8, EngineProbe)>>> {
            self.probes.clone()
        }
    }

    impl EngineFactory for MockEngineFactory {
        fn create(&mut self, slot: u8) -> Box<dyn VideoEngine> {
            let (engine, probe) = MockEngine::new();
            self.probes.lock().unwrap().push((slot, probe));
            Box::new(engine)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_code_mapping() {
        assert_eq!(PlaybackState::from_code(-1), PlaybackState::Unstarted);
        assert_eq!(PlaybackState::from_code(0), PlaybackState::Ended);
        assert_eq!(PlaybackState::from_code(1), PlaybackState::Playing);
        assert_eq!(PlaybackState::from_code(2), PlaybackState::Paused);
        assert_eq!(PlaybackState::from_code(3), PlaybackState::Buffering);
        assert_eq!(PlaybackState::from_code(5), PlaybackState::Cued);
    }

    #[test]
    fn cued_displays_as_paused() {
        assert!(PlaybackState::Cued.displays_as_paused());
        assert!(PlaybackState::Paused.displays_as_paused());
        assert!(!PlaybackState::Playing.displays_as_paused());
    }
}
