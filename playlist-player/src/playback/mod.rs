//! Playback coordination: coordinator, timer workers and auto-advance

mod auto_advance;
pub mod coordinator;
pub mod events;
pub mod worker;

pub use coordinator::{PlaybackCoordinator, PlaybackStatus};
pub use events::{PlaybackEvent, TrackCompletion};
pub use worker::{PlaybackCommand, PlaybackTiming, WorkerExit, WorkerHandle};
