//! Coordination core for a browser-hosted multi-deck mixing console.
//!
//! The crate owns everything between the UI surface and the embedded
//! playback engines: per-deck transport, cue and loop state, the stutter
//! scheduler, the crossfader ring with timed and automatic fades, the
//! playlist manager, and consent-gated preference persistence. All mutable
//! state lives behind a single command-driven task; embedders talk to it
//! through [`console::ConsoleHandle`] and observe it through the
//! [`console::UiEvent`] stream.
//!
//! ```no_run
//! use quadeck::console::{spawn_console, ConsoleCommand};
//! use quadeck::engine::mock::MockEngineFactory;
//! use quadeck::storage::MemoryStore;
//!
//! # async fn demo() -> Result<(), quadeck::errors::ConsoleClosed> {
//! let (handle, mut events, _thread) = spawn_console(
//!     Box::new(MockEngineFactory::new()),
//!     Box::new(MemoryStore::new()),
//! );
//! handle.send(ConsoleCommand::ApiReady).await?;
//! handle.load_track(1, "https://www.youtube.com/watch?v=dQw4w9WgXcQ").await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod console;
pub mod engine;
pub mod errors;
pub mod mixer;
pub mod playlist;
pub mod storage;
pub mod stutter;
pub mod tempo;
pub mod track_id;

pub use console::{spawn_console, Console, ConsoleCommand, ConsoleHandle, UiEvent};
pub use engine::{EngineFactory, PlaybackState, VideoEngine};
pub use storage::{KeyValueStore, MemoryStore, PrefStore};
pub use track_id::{parse_track_id, TrackId};
