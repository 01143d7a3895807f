//! Ordered playlist storage
//!
//! The playlist is a doubly-linked list persisted in the `playlist` table:
//! each row points at its neighbours through `prev`/`next`, with `0` marking
//! the head (`prev = 0`) and the tail (`next = 0`). Mutations run inside a
//! single transaction each; a dropped transaction rolls back, so a failure
//! part way through never leaves half-relinked rows behind.

use crate::error::{Error, Result};
use playlist_common::Track;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info};

const TRACK_COLUMNS: &str = "id, description, duration, prev, next";

/// Persistent, transactional view of the single playlist
#[derive(Debug, Clone)]
pub struct OrderedPlaylist {
    pool: SqlitePool,
}

impl OrderedPlaylist {
    /// Wrap an initialized database pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// First track of the playlist (`prev = 0`)
    pub async fn find_head(&self) -> Result<Track> {
        self.find_one("prev = 0", None)
            .await?
            .ok_or_else(|| Error::NotFound("playlist is empty".to_string()))
    }

    /// Track with the given id
    pub async fn find_by_id(&self, id: i64) -> Result<Track> {
        self.find_one("id = ?", Some(id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("track {}", id)))
    }

    /// Track that follows `id` (`prev = id`)
    pub async fn find_successor(&self, id: i64) -> Result<Track> {
        self.find_one("prev = ?", Some(id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("no track after track {}", id)))
    }

    /// Track that precedes `id` (`next = id`)
    pub async fn find_predecessor(&self, id: i64) -> Result<Track> {
        self.find_one("next = ?", Some(id))
            .await?
            .ok_or_else(|| Error::NotFound(format!("no track before track {}", id)))
    }

    async fn find_one(&self, condition: &str, param: Option<i64>) -> Result<Option<Track>> {
        let sql = format!("SELECT {} FROM playlist WHERE {} LIMIT 1", TRACK_COLUMNS, condition);
        let mut query = sqlx::query_as::<_, Track>(&sql);
        if let Some(value) = param {
            query = query.bind(value);
        }
        Ok(query.fetch_optional(&self.pool).await?)
    }

    /// Append a new track at the tail
    ///
    /// Inserts the row linked back to the current tail and points the old
    /// tail's `next` at it, both in one transaction.
    pub async fn append(&self, description: &str, duration: i64) -> Result<Track> {
        let mut tx = self.pool.begin().await?;

        let tail: Option<i64> = sqlx::query_scalar("SELECT id FROM playlist WHERE next = 0 LIMIT 1")
            .fetch_optional(&mut *tx)
            .await?;
        let prev = tail.unwrap_or(0);

        let id = sqlx::query("INSERT INTO playlist (description, duration, prev, next) VALUES (?, ?, ?, 0)")
            .bind(description)
            .bind(duration)
            .bind(prev)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        if let Some(tail_id) = tail {
            sqlx::query("UPDATE playlist SET next = ? WHERE id = ?")
                .bind(id)
                .bind(tail_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!("Appended track {} ({:?}, {}s) after track {}", id, description, duration, prev);

        Ok(Track {
            id,
            description: description.to_string(),
            duration,
            prev,
            next: 0,
        })
    }

    /// Delete a track and relink its neighbours
    ///
    /// Head, tail and sole-element removals need no special casing: the
    /// relinking updates simply match no rows.
    pub async fn remove(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let (prev, next) = sqlx::query_as::<_, (i64, i64)>("SELECT prev, next FROM playlist WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("track {}", id)))?;

        sqlx::query("UPDATE playlist SET next = ? WHERE next = ?")
            .bind(next)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE playlist SET prev = ? WHERE prev = ?")
            .bind(prev)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM playlist WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("Removed track {} (relinked {} <-> {})", id, prev, next);
        Ok(())
    }

    /// Every stored track, in id order (not play order)
    pub async fn list_all(&self) -> Result<Vec<Track>> {
        let sql = format!("SELECT {} FROM playlist ORDER BY id", TRACK_COLUMNS);
        let tracks = sqlx::query_as::<_, Track>(&sql).fetch_all(&self.pool).await?;
        debug!("Listed {} tracks", tracks.len());
        Ok(tracks)
    }
}

/// Arrange tracks in play order by walking `next` links from the head
///
/// Fails if the rows do not form exactly one simple path: several heads,
/// a dangling link, a cycle, or tracks unreachable from the head.
pub fn in_play_order(tracks: Vec<Track>) -> Result<Vec<Track>> {
    if tracks.is_empty() {
        return Ok(tracks);
    }

    let heads: Vec<i64> = tracks.iter().filter(|t| t.is_head()).map(|t| t.id).collect();
    let head = match heads.as_slice() {
        [head] => *head,
        _ => {
            return Err(Error::Internal(format!(
                "playlist must have exactly one head, found {:?}",
                heads
            )))
        }
    };

    let total = tracks.len();
    let mut by_id: HashMap<i64, Track> = tracks.into_iter().map(|t| (t.id, t)).collect();
    let mut ordered = Vec::with_capacity(total);
    let mut expected_prev = 0;
    let mut cursor = head;

    while cursor != 0 {
        let track = by_id
            .remove(&cursor)
            .ok_or_else(|| Error::Internal(format!("broken or cyclic link to track {}", cursor)))?;
        if track.prev != expected_prev {
            return Err(Error::Internal(format!(
                "track {} has prev {} but follows {}",
                track.id, track.prev, expected_prev
            )));
        }
        expected_prev = track.id;
        cursor = track.next;
        ordered.push(track);
    }

    if !by_id.is_empty() {
        let mut stray: Vec<i64> = by_id.into_keys().collect();
        stray.sort_unstable();
        return Err(Error::Internal(format!("tracks unreachable from head: {:?}", stray)));
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use playlist_common::db::init_memory_database;

    async fn setup() -> OrderedPlaylist {
        OrderedPlaylist::new(init_memory_database().await.unwrap())
    }

    fn track(id: i64, prev: i64, next: i64) -> Track {
        Track {
            id,
            description: format!("track {}", id),
            duration: 1,
            prev,
            next,
        }
    }

    #[tokio::test]
    async fn test_append_to_empty_playlist() {
        let playlist = setup().await;

        let a = playlist.append("A", 10).await.unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(a.prev, 0);
        assert_eq!(a.next, 0);
        assert_eq!(playlist.find_head().await.unwrap(), a);
    }

    #[tokio::test]
    async fn test_append_links_previous_tail() {
        let playlist = setup().await;
        playlist.append("A", 10).await.unwrap();

        let b = playlist.append("B", 5).await.unwrap();

        assert_eq!(b.id, 2);
        assert_eq!(b.prev, 1);
        assert_eq!(b.next, 0);
        assert_eq!(playlist.find_by_id(1).await.unwrap().next, 2);
        assert_eq!(playlist.find_by_id(2).await.unwrap(), b);
    }

    #[tokio::test]
    async fn test_neighbour_lookups() {
        let playlist = setup().await;
        for name in ["A", "B", "C"] {
            playlist.append(name, 1).await.unwrap();
        }

        assert_eq!(playlist.find_successor(1).await.unwrap().id, 2);
        assert_eq!(playlist.find_predecessor(3).await.unwrap().id, 2);
        assert!(matches!(playlist.find_successor(3).await, Err(Error::NotFound(_))));
        assert!(matches!(playlist.find_predecessor(1).await, Err(Error::NotFound(_))));
        assert!(matches!(playlist.find_by_id(42).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_head_on_empty_playlist() {
        let playlist = setup().await;
        assert!(matches!(playlist.find_head().await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_middle_relinks_neighbours() {
        let playlist = setup().await;
        for name in ["A", "B", "C"] {
            playlist.append(name, 1).await.unwrap();
        }

        playlist.remove(2).await.unwrap();

        let a = playlist.find_by_id(1).await.unwrap();
        let c = playlist.find_by_id(3).await.unwrap();
        assert_eq!(a.next, 3);
        assert_eq!(c.prev, 1);
        assert!(matches!(playlist.find_by_id(2).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_head_tail_and_only_element() {
        let playlist = setup().await;
        for name in ["A", "B", "C"] {
            playlist.append(name, 1).await.unwrap();
        }

        playlist.remove(1).await.unwrap();
        assert_eq!(playlist.find_head().await.unwrap().id, 2);

        playlist.remove(3).await.unwrap();
        let only = playlist.find_head().await.unwrap();
        assert_eq!(only.id, 2);
        assert!(only.is_tail());

        playlist.remove(2).await.unwrap();
        assert!(playlist.list_all().await.unwrap().is_empty());

        // A fresh append after emptying starts a new single-element list
        let d = playlist.append("D", 1).await.unwrap();
        assert_eq!((d.prev, d.next), (0, 0));
    }

    #[tokio::test]
    async fn test_remove_missing_track() {
        let playlist = setup().await;
        playlist.append("A", 1).await.unwrap();

        assert!(matches!(playlist.remove(7).await, Err(Error::NotFound(_))));
        assert_eq!(playlist.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_append_rolls_back() {
        let playlist = setup().await;
        playlist.append("A", 1).await.unwrap();

        // Violates CHECK (duration >= 0) after the tail was read
        assert!(playlist.append("bad", -1).await.is_err());

        let tracks = playlist.list_all().await.unwrap();
        assert_eq!(tracks.len(), 1);
        assert!(tracks[0].is_tail());
    }

    #[test]
    fn test_in_play_order_follows_links() {
        let tracks = vec![track(3, 1, 2), track(1, 0, 3), track(2, 3, 0)];

        let ordered = in_play_order(tracks).unwrap();

        let ids: Vec<i64> = ordered.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_in_play_order_rejects_broken_lists() {
        // Two heads
        assert!(in_play_order(vec![track(1, 0, 0), track(2, 0, 0)]).is_err());
        // Dangling next
        assert!(in_play_order(vec![track(1, 0, 9)]).is_err());
        // Cycle behind the head
        assert!(in_play_order(vec![track(1, 0, 2), track(2, 1, 3), track(3, 2, 2)]).is_err());
        // Unreachable track
        assert!(in_play_order(vec![track(1, 0, 0), track(2, 5, 0)]).is_err());
        assert!(in_play_order(Vec::new()).unwrap().is_empty());
    }
}
