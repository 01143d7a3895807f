//! Playback coordinator
//!
//! Owns the session state (current track, in-progress flag, active worker)
//! and exposes the public playback and playlist operations. Every operation
//! that reads or changes the session holds one exclusive lock from decision
//! to mutation, which also serializes them against the auto-advance loop.
//!
//! Command and completion channels belong to the coordinator instance and
//! are handed to each worker it starts; two coordinators never share them.

use crate::db::OrderedPlaylist;
use crate::error::{Error, Result};
use crate::playback::auto_advance;
use crate::playback::events::{PlaybackEvent, TrackCompletion};
use crate::playback::worker::{PlaybackCommand, PlaybackTiming, WorkerHandle};
use playlist_common::Track;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Completion signals buffered for the auto-advance loop
const COMPLETION_CHANNEL_CAPACITY: usize = 8;

/// Playback events buffered per subscriber
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Snapshot of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackStatus {
    /// Selected track, 0 when none
    pub current_id: i64,
    /// Whether the current track is ticking
    pub in_progress: bool,
    /// Seconds left on the current track
    pub remaining: Option<u64>,
}

#[derive(Default)]
struct Session {
    current_id: i64,
    in_progress: bool,
    worker: Option<WorkerHandle>,
    /// Incremented for every worker started
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Next,
    Prev,
}

/// Single-playlist playback coordinator
pub struct PlaybackCoordinator {
    playlist: OrderedPlaylist,
    timing: PlaybackTiming,
    session: Mutex<Session>,
    completion_tx: mpsc::Sender<TrackCompletion>,
    event_tx: broadcast::Sender<PlaybackEvent>,
    shutdown: CancellationToken,
    auto_advance: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackCoordinator {
    /// Create a coordinator and start its auto-advance loop
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(playlist: OrderedPlaylist, timing: PlaybackTiming) -> Arc<Self> {
        let (completion_tx, completion_rx) = mpsc::channel(COMPLETION_CHANNEL_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shutdown = CancellationToken::new();

        Arc::new_cyclic(|weak| {
            let loop_handle = tokio::spawn(auto_advance::run(
                weak.clone(),
                completion_rx,
                shutdown.clone(),
            ));

            info!(
                "Playback coordinator ready (tick {:?}, command timeout {:?})",
                timing.tick,
                timing.command_timeout()
            );

            Self {
                playlist,
                timing,
                session: Mutex::new(Session::default()),
                completion_tx,
                event_tx,
                shutdown,
                auto_advance: Mutex::new(Some(loop_handle)),
            }
        })
    }

    /// Start or resume playback
    ///
    /// `id == 0` (or the current track's id) resumes the current track; with
    /// no current track, `id == 0` starts from the head. Any other id
    /// switches to that track.
    pub async fn play(&self, id: i64) -> Result<()> {
        let mut session = self.session.lock().await;

        if session.current_id > 0 && (id == 0 || id == session.current_id) {
            if !session.in_progress {
                let worker = session.worker.as_ref().ok_or_else(|| {
                    Error::Internal(format!("no worker for current track {}", session.current_id))
                })?;
                worker
                    .send(PlaybackCommand::Play, self.timing.command_timeout())
                    .await?;
                session.in_progress = true;

                info!("Resumed track {}", session.current_id);
                self.broadcast_event(PlaybackEvent::TrackResumed {
                    track_id: session.current_id,
                });
            }
            return Ok(());
        }

        let track = if id == 0 {
            self.playlist.find_head().await?
        } else {
            self.playlist.find_by_id(id).await?
        };

        self.stop_current(&mut session).await?;
        self.start_track(&mut session, &track);
        Ok(())
    }

    /// Suspend the current track; no-op unless it is ticking
    pub async fn pause(&self) -> Result<()> {
        let mut session = self.session.lock().await;

        if !session.in_progress {
            return Ok(());
        }

        let worker = session.worker.as_ref().ok_or_else(|| {
            Error::Internal(format!("no worker for current track {}", session.current_id))
        })?;
        worker
            .send(PlaybackCommand::Pause, self.timing.command_timeout())
            .await?;
        session.in_progress = false;

        info!("Paused track {}", session.current_id);
        self.broadcast_event(PlaybackEvent::TrackPaused {
            track_id: session.current_id,
        });
        Ok(())
    }

    /// Skip to the track after the current one
    pub async fn next(&self) -> Result<()> {
        self.skip(Direction::Next).await
    }

    /// Skip to the track before the current one
    pub async fn prev(&self) -> Result<()> {
        self.skip(Direction::Prev).await
    }

    async fn skip(&self, direction: Direction) -> Result<()> {
        let mut session = self.session.lock().await;

        if session.current_id == 0 {
            return Err(Error::NotFound("no current track".to_string()));
        }

        let track = match direction {
            Direction::Next => self.playlist.find_successor(session.current_id).await?,
            Direction::Prev => self.playlist.find_predecessor(session.current_id).await?,
        };

        debug!("Skipping {:?} from track {} to {}", direction, session.current_id, track.id);
        self.stop_current(&mut session).await?;
        self.start_track(&mut session, &track);
        Ok(())
    }

    /// Append a track at the end of the playlist
    pub async fn add_song(&self, description: &str, duration: i64) -> Result<Track> {
        if duration < 0 {
            return Err(Error::InvalidArgument(format!(
                "Incorrect duration {}, must be >= 0",
                duration
            )));
        }

        // Held so concurrent appends never read the same tail
        let _session = self.session.lock().await;
        self.playlist.append(description, duration).await
    }

    /// Remove a track from the playlist
    ///
    /// The current track may only be deleted while paused; doing so clears
    /// the session.
    pub async fn delete(&self, id: i64) -> Result<()> {
        if id <= 0 {
            return Err(Error::InvalidArgument(format!(
                "Incorrect track id {}, must be > 0",
                id
            )));
        }

        let mut session = self.session.lock().await;

        if session.current_id == id && session.in_progress {
            return Err(Error::PreconditionFailed(format!(
                "track {} is playing and cannot be removed",
                id
            )));
        }

        self.playlist.remove(id).await?;

        if session.current_id == id {
            // Dropping the handle cancels the suspended worker
            session.worker = None;
            session.current_id = 0;
            session.in_progress = false;
            info!("Deleted paused current track {}, session cleared", id);
        }
        Ok(())
    }

    /// All stored tracks
    ///
    /// Reads straight from the store without the session lock; SQLite
    /// transaction isolation keeps half-applied mutations invisible.
    pub async fn get_playlist(&self) -> Result<Vec<Track>> {
        self.playlist.list_all().await
    }

    /// Current session snapshot
    pub async fn status(&self) -> PlaybackStatus {
        let session = self.session.lock().await;
        PlaybackStatus {
            current_id: session.current_id,
            in_progress: session.in_progress,
            remaining: session.worker.as_ref().map(WorkerHandle::remaining),
        }
    }

    /// Subscribe to playback events
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.event_tx.subscribe()
    }

    fn broadcast_event(&self, event: PlaybackEvent) {
        // No receivers is OK
        let _ = self.event_tx.send(event);
    }

    /// Stop the auto-advance loop and the active worker
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down playback coordinator");
        self.shutdown.cancel();

        if let Some(handle) = self.auto_advance.lock().await.take() {
            if let Err(e) = handle.await {
                return Err(Error::Internal(format!("auto-advance loop failed: {}", e)));
            }
        }

        let mut session = self.session.lock().await;
        self.stop_current(&mut session).await
    }

    /// React to a worker finishing its track naturally
    ///
    /// Called by the auto-advance loop. Completions from workers that were
    /// cancelled or replaced in the meantime are ignored.
    pub(crate) async fn advance_after_completion(&self, completion: TrackCompletion) -> Result<()> {
        let mut session = self.session.lock().await;

        let active_generation = session.worker.as_ref().map(WorkerHandle::generation);
        if session.current_id == 0 || active_generation != Some(completion.generation) {
            debug!(
                "Ignoring stale completion of track {} (worker #{})",
                completion.track_id, completion.generation
            );
            return Ok(());
        }

        let finished_id = session.current_id;
        self.broadcast_event(PlaybackEvent::TrackCompleted {
            track_id: finished_id,
        });
        session.worker = None;

        match self.playlist.find_successor(finished_id).await {
            Ok(track) => {
                self.start_track(&mut session, &track);
                Ok(())
            }
            Err(Error::NotFound(_)) => {
                session.current_id = 0;
                session.in_progress = false;
                info!("Reached end of playlist after track {}", finished_id);
                self.broadcast_event(PlaybackEvent::PlaylistFinished {
                    last_track_id: finished_id,
                });
                Ok(())
            }
            Err(e) => {
                session.current_id = 0;
                session.in_progress = false;
                Err(e)
            }
        }
    }

    /// Cancel the active worker and clear the session
    ///
    /// On timeout the session is left untouched.
    async fn stop_current(&self, session: &mut Session) -> Result<()> {
        if let Some(worker) = session.worker.as_mut() {
            worker.cancel(self.timing.command_timeout()).await?;
        }
        session.worker = None;
        session.current_id = 0;
        session.in_progress = false;
        Ok(())
    }

    fn start_track(&self, session: &mut Session, track: &Track) {
        session.generation += 1;
        session.worker = Some(WorkerHandle::spawn(
            track,
            session.generation,
            self.timing,
            self.completion_tx.clone(),
        ));
        session.current_id = track.id;
        session.in_progress = true;

        info!("Now playing track {} ({:?})", track.id, track.description);
        self.broadcast_event(PlaybackEvent::TrackStarted { track_id: track.id });
    }
}
