//! Playback worker
//!
//! One background task per selected track. The worker counts the track's
//! duration down one tick at a time while active, reacts to play/pause
//! commands, stops immediately when cancelled, and reports natural
//! completion to the auto-advance loop.
//!
//! The coordinator talks to a worker only through its [`WorkerHandle`]:
//! commands travel over a private channel and are acknowledged once applied,
//! cancellation goes through a `CancellationToken`, and the task's
//! `JoinHandle` lets the coordinator wait for the worker to be gone before
//! starting a replacement.

use crate::error::{Error, Result};
use crate::playback::events::TrackCompletion;
use playlist_common::Track;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Control signal for an active worker
///
/// Cancel is not a command: it is delivered through the worker's
/// cancellation token so it can never queue behind anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    Play,
    Pause,
}

/// How a worker task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    Cancelled,
    Finished,
}

/// Clock parameters shared by all workers of a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTiming {
    /// Length of one playback second
    pub tick: Duration,
    /// Bounded wait for a worker to take a control signal, in ticks
    pub command_timeout_ticks: u32,
}

impl PlaybackTiming {
    pub fn new(tick: Duration, command_timeout_ticks: u32) -> Self {
        Self {
            tick,
            command_timeout_ticks,
        }
    }

    /// Maximum time a control signal may take to be acknowledged
    pub fn command_timeout(&self) -> Duration {
        self.tick * self.command_timeout_ticks
    }
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 10)
    }
}

struct CommandRequest {
    command: PlaybackCommand,
    ack: oneshot::Sender<()>,
}

/// Coordinator-side handle to a running worker
///
/// Dropping the handle cancels the worker.
pub struct WorkerHandle {
    track_id: i64,
    generation: u64,
    commands: mpsc::Sender<CommandRequest>,
    cancel: CancellationToken,
    task: Option<JoinHandle<WorkerExit>>,
    remaining: Arc<AtomicU64>,
}

impl WorkerHandle {
    /// Start a worker for `track`
    ///
    /// `completions` is the owning coordinator's completion channel.
    pub fn spawn(
        track: &Track,
        generation: u64,
        timing: PlaybackTiming,
        completions: mpsc::Sender<TrackCompletion>,
    ) -> Self {
        let duration = u64::try_from(track.duration).unwrap_or(0);
        let remaining = Arc::new(AtomicU64::new(duration));
        let (command_tx, command_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let worker = PlaybackWorker {
            track_id: track.id,
            description: track.description.clone(),
            generation,
            remaining: duration,
            active: true,
            tick: timing.tick,
            commands: command_rx,
            completions,
            cancel: cancel.clone(),
            shared_remaining: Arc::clone(&remaining),
        };

        info!(
            "Starting playback worker #{} for track {} ({:?}, {}s)",
            generation, track.id, track.description, duration
        );
        let task = tokio::spawn(worker.run());

        Self {
            track_id: track.id,
            generation,
            commands: command_tx,
            cancel,
            task: Some(task),
            remaining,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Seconds left on the track as last counted by the worker
    pub fn remaining(&self) -> u64 {
        self.remaining.load(Ordering::Relaxed)
    }

    /// Deliver a command and wait for the worker to acknowledge it
    ///
    /// Fails with `Timeout` if the worker does not take the command within
    /// `timeout`, or if it has already exited.
    pub async fn send(&self, command: PlaybackCommand, timeout: Duration) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        let request = CommandRequest {
            command,
            ack: ack_tx,
        };

        let delivery = async {
            self.commands.send(request).await.map_err(|_| ())?;
            ack_rx.await.map_err(|_| ())
        };

        match tokio::time::timeout(timeout, delivery).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(())) => Err(Error::Timeout(format!(
                "playback worker for track {} is no longer listening",
                self.track_id
            ))),
            Err(_) => Err(Error::Timeout(format!(
                "track {} did not acknowledge {:?} within {:?}",
                self.track_id, command, timeout
            ))),
        }
    }

    /// Cancel the worker and wait for its task to end
    ///
    /// Safe to call on a worker that already finished. On timeout the
    /// handle keeps the task so a later call can wait again.
    pub async fn cancel(&mut self, timeout: Duration) -> Result<WorkerExit> {
        self.cancel.cancel();

        let Some(task) = self.task.as_mut() else {
            return Ok(WorkerExit::Cancelled);
        };

        let outcome = tokio::time::timeout(timeout, task).await;
        let exit = match outcome {
            Ok(Ok(exit)) => exit,
            Ok(Err(e)) => {
                self.task = None;
                return Err(Error::Internal(format!(
                    "playback worker for track {} panicked: {}",
                    self.track_id, e
                )));
            }
            Err(_) => {
                return Err(Error::Timeout(format!(
                    "playback worker for track {} did not stop within {:?}",
                    self.track_id, timeout
                )))
            }
        };

        self.task = None;
        debug!("Playback worker #{} for track {} ended: {:?}", self.generation, self.track_id, exit);
        Ok(exit)
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The timer task itself
struct PlaybackWorker {
    track_id: i64,
    description: String,
    generation: u64,
    remaining: u64,
    active: bool,
    tick: Duration,
    commands: mpsc::Receiver<CommandRequest>,
    completions: mpsc::Sender<TrackCompletion>,
    cancel: CancellationToken,
    shared_remaining: Arc<AtomicU64>,
}

impl PlaybackWorker {
    async fn run(mut self) -> WorkerExit {
        if self.remaining == 0 {
            self.complete();
            return WorkerExit::Finished;
        }

        let mut ticker = interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!("Track {} cancelled with {}s left", self.track_id, self.remaining);
                    return WorkerExit::Cancelled;
                }

                request = self.commands.recv() => {
                    let Some(CommandRequest { command, ack }) = request else {
                        return WorkerExit::Cancelled;
                    };
                    match command {
                        PlaybackCommand::Pause => self.active = false,
                        PlaybackCommand::Play => {
                            // A partially elapsed second is not credited on resume
                            if !self.active {
                                ticker.reset();
                            }
                            self.active = true;
                        }
                    }
                    let _ = ack.send(());
                }

                _ = ticker.tick() => {
                    if !self.active {
                        continue;
                    }
                    self.remaining -= 1;
                    self.shared_remaining.store(self.remaining, Ordering::Relaxed);
                    debug!("Playing {:?} ({}s left)", self.description, self.remaining);

                    if self.remaining == 0 {
                        self.complete();
                        return WorkerExit::Finished;
                    }
                }
            }
        }
    }

    /// Best-effort completion signal: never blocks a finishing worker
    fn complete(&self) {
        info!("Track {} finished", self.track_id);
        let completion = TrackCompletion {
            track_id: self.track_id,
            generation: self.generation,
        };
        if let Err(e) = self.completions.try_send(completion) {
            warn!("Dropped completion of track {}: {}", self.track_id, e);
        }
    }
}
