//! Playback signals and events
//!
//! `TrackCompletion` is the internal worker -> auto-advance signal.
//! `PlaybackEvent` is what the coordinator broadcasts to observers (logs,
//! tests, API clients); nobody is required to listen.

use serde::Serialize;

/// A worker's track ran down to zero naturally
///
/// `generation` identifies which worker sent it, so a completion that
/// arrives after its worker was replaced can be ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackCompletion {
    pub track_id: i64,
    pub generation: u64,
}

/// Externally visible playback state changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum PlaybackEvent {
    /// A worker started for this track
    TrackStarted { track_id: i64 },

    /// The current track was suspended
    TrackPaused { track_id: i64 },

    /// The current track resumed ticking
    TrackResumed { track_id: i64 },

    /// The track reached the end of its duration
    TrackCompleted { track_id: i64 },

    /// Auto-advance ran off the tail of the playlist
    PlaylistFinished { last_track_id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = PlaybackEvent::TrackStarted { track_id: 4 };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "TrackStarted");
        assert_eq!(json["track_id"], 4);
    }
}
