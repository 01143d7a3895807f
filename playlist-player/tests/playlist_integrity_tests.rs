//! Playlist link integrity tests
//!
//! Drives long add/delete sequences through the coordinator and checks after
//! every step that the stored rows still form one simple path.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use playlist_common::db::init_memory_database;
use playlist_common::Track;
use playlist_player::db::in_play_order;
use playlist_player::{OrderedPlaylist, PlaybackCoordinator, PlaybackTiming};

async fn setup() -> Arc<PlaybackCoordinator> {
    let pool = init_memory_database().await.unwrap();
    PlaybackCoordinator::new(
        OrderedPlaylist::new(pool),
        PlaybackTiming::new(Duration::from_millis(50), 10),
    )
}

/// Check the path invariants and return ids in play order
fn assert_single_path(tracks: &[Track]) -> Vec<i64> {
    if tracks.is_empty() {
        return Vec::new();
    }

    assert_eq!(tracks.iter().filter(|t| t.prev == 0).count(), 1, "heads in {:?}", tracks);
    assert_eq!(tracks.iter().filter(|t| t.next == 0).count(), 1, "tails in {:?}", tracks);

    let ordered = in_play_order(tracks.to_vec()).expect("rows must form one path");
    assert_eq!(ordered.len(), tracks.len());

    let ids: Vec<i64> = ordered.iter().map(|t| t.id).collect();
    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len(), "track visited twice: {:?}", ids);
    ids
}

/// Small deterministic generator so failures reproduce
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

#[tokio::test]
async fn test_append_extends_tail() {
    let coordinator = setup().await;

    let mut previous_tail = 0;
    for i in 0..10 {
        let track = coordinator.add_song(&format!("song {}", i), i).await.unwrap();
        assert_eq!(track.prev, previous_tail);
        assert_eq!(track.next, 0);

        let tracks = coordinator.get_playlist().await.unwrap();
        if previous_tail != 0 {
            let old_tail = tracks.iter().find(|t| t.id == previous_tail).unwrap();
            assert_eq!(old_tail.next, track.id);
        }
        let ids = assert_single_path(&tracks);
        assert_eq!(ids.last(), Some(&track.id));

        previous_tail = track.id;
    }
}

#[tokio::test]
async fn test_delete_middle_relinks_neighbours() {
    let coordinator = setup().await;
    for name in ["p", "m", "s"] {
        coordinator.add_song(name, 1).await.unwrap();
    }

    coordinator.delete(2).await.unwrap();

    let tracks = coordinator.get_playlist().await.unwrap();
    assert!(tracks.iter().all(|t| t.id != 2));
    let p = tracks.iter().find(|t| t.id == 1).unwrap();
    let s = tracks.iter().find(|t| t.id == 3).unwrap();
    assert_eq!(p.next, s.id);
    assert_eq!(s.prev, p.id);
    assert_eq!(assert_single_path(&tracks), vec![1, 3]);
}

#[tokio::test]
async fn test_delete_head_and_tail() {
    let coordinator = setup().await;
    for name in ["a", "b", "c", "d"] {
        coordinator.add_song(name, 1).await.unwrap();
    }

    coordinator.delete(1).await.unwrap();
    assert_eq!(assert_single_path(&coordinator.get_playlist().await.unwrap()), vec![2, 3, 4]);

    coordinator.delete(4).await.unwrap();
    assert_eq!(assert_single_path(&coordinator.get_playlist().await.unwrap()), vec![2, 3]);

    coordinator.delete(2).await.unwrap();
    coordinator.delete(3).await.unwrap();
    assert!(coordinator.get_playlist().await.unwrap().is_empty());

    // Emptied list accepts a fresh head
    let track = coordinator.add_song("e", 1).await.unwrap();
    assert_eq!((track.prev, track.next), (0, 0));
}

#[tokio::test]
async fn test_random_add_delete_sequence_keeps_single_path() {
    let coordinator = setup().await;
    let mut rng = Lcg(0x5eed);
    let mut expected: Vec<i64> = Vec::new();

    for step in 0..200 {
        if expected.is_empty() || rng.next() % 3 != 0 {
            let track = coordinator
                .add_song(&format!("step {}", step), (rng.next() % 300) as i64)
                .await
                .unwrap();
            expected.push(track.id);
        } else {
            let index = (rng.next() as usize) % expected.len();
            let id = expected.remove(index);
            coordinator.delete(id).await.unwrap();
        }

        let tracks = coordinator.get_playlist().await.unwrap();
        assert_eq!(assert_single_path(&tracks), expected, "after step {}", step);
    }
}

#[tokio::test]
async fn test_concurrent_appends_keep_single_path() {
    let coordinator = setup().await;

    let mut tasks = Vec::new();
    for i in 0..20 {
        let coordinator = Arc::clone(&coordinator);
        tasks.push(tokio::spawn(async move {
            coordinator.add_song(&format!("song {}", i), 1).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let tracks = coordinator.get_playlist().await.unwrap();
    assert_eq!(tracks.len(), 20);
    assert_single_path(&tracks);
}
