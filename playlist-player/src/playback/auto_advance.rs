//! Auto-advance loop
//!
//! Waits for workers to report that their track ran out and moves the
//! coordinator on to the next track, exactly as if a caller had asked for
//! "next". Holds only a weak reference so it never keeps the coordinator
//! alive on its own.

use crate::playback::coordinator::PlaybackCoordinator;
use crate::playback::events::TrackCompletion;
use std::sync::Weak;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Run until shutdown, until the coordinator is dropped, or until every
/// completion sender is gone
pub(crate) async fn run(
    coordinator: Weak<PlaybackCoordinator>,
    mut completions: mpsc::Receiver<TrackCompletion>,
    shutdown: CancellationToken,
) {
    info!("Auto-advance loop started");

    loop {
        let completion = tokio::select! {
            _ = shutdown.cancelled() => break,
            completion = completions.recv() => match completion {
                Some(completion) => completion,
                None => break,
            },
        };

        let Some(coordinator) = coordinator.upgrade() else {
            break;
        };

        if let Err(e) = coordinator.advance_after_completion(completion).await {
            error!("Auto-advance after track {} failed: {}", completion.track_id, e);
        }
    }

    info!("Auto-advance loop stopped");
}
