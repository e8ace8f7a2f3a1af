//! Disk-backed song library
//!
//! Whole-snapshot persistence: the full id → record map lives in one JSON
//! document rewritten on every mutation. All mutations are funnelled through
//! a single flush lock held across mutate + serialize + write, so concurrent
//! pipelines can never publish a stale snapshot over a newer one. The
//! snapshot is written to a temp file and renamed into place; a crash
//! mid-write leaves the previous snapshot intact.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::{Mutex, RwLock};
use tunesmith_common::{Error, Result};
use uuid::Uuid;

use crate::models::Song;

/// In-memory song map plus its on-disk snapshot
pub struct Library {
    path: PathBuf,
    songs: RwLock<HashMap<Uuid, Song>>,
    // Serializes mutation order with flush order.
    flush_lock: Mutex<()>,
}

impl Library {
    /// Load the library snapshot at `path`.
    ///
    /// A missing snapshot is an empty library; an unreadable or corrupt
    /// snapshot is fatal (the process must not proceed with undefined data).
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let songs = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<HashMap<Uuid, Song>>(&bytes).map_err(|e| {
                Error::Config(format!(
                    "Corrupt song snapshot {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            path = %path.display(),
            songs = songs.len(),
            "Song library loaded"
        );

        Ok(Self {
            path,
            songs: RwLock::new(songs),
            flush_lock: Mutex::new(()),
        })
    }

    /// Fetch one song by id
    pub async fn get(&self, id: Uuid) -> Option<Song> {
        self.songs.read().await.get(&id).cloned()
    }

    /// All songs, newest first (id tiebreak keeps the order stable)
    pub async fn list(&self) -> Vec<Song> {
        let mut all: Vec<Song> = self.songs.read().await.values().cloned().collect();
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        all
    }

    pub async fn len(&self) -> usize {
        self.songs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.songs.read().await.is_empty()
    }

    /// Insert a new record and flush.
    ///
    /// Rejects duplicate ids; song ids are immutable and unique.
    pub async fn insert(&self, song: Song) -> Result<()> {
        let _guard = self.flush_lock.lock().await;
        let id = song.id;
        let snapshot = {
            let mut songs = self.songs.write().await;
            if songs.contains_key(&id) {
                return Err(Error::Conflict(format!("Song already exists: {}", id)));
            }
            songs.insert(id, song);
            Self::serialize(&songs)?
        };

        if let Err(err) = self.write_snapshot(&snapshot).await {
            self.songs.write().await.remove(&id);
            return Err(err);
        }
        Ok(())
    }

    /// Mutate a record and flush, returning the updated record.
    ///
    /// The version counter bumps on every successful mutation. On a flush
    /// failure the in-memory record is rolled back and the error returned,
    /// so a pipeline step can never claim success for state that did not
    /// become durable.
    pub async fn update<F>(&self, id: Uuid, mutate: F) -> Result<Song>
    where
        F: FnOnce(&mut Song),
    {
        self.update_checked(id, |song| {
            mutate(song);
            Ok(())
        })
        .await
    }

    /// Like [`update`](Self::update), but the closure may reject the
    /// mutation (version conflicts, pipeline-in-flight checks). The check
    /// runs under the write lock, so there is no decide-then-race window.
    pub async fn update_checked<F>(&self, id: Uuid, mutate: F) -> Result<Song>
    where
        F: FnOnce(&mut Song) -> Result<()>,
    {
        let _guard = self.flush_lock.lock().await;
        let (snapshot, previous, updated) = {
            let mut songs = self.songs.write().await;
            let entry = songs
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound(format!("Song not found: {}", id)))?;
            let previous = entry.clone();

            let mut candidate = entry.clone();
            mutate(&mut candidate)?;
            candidate.id = previous.id;
            candidate.version = previous.version + 1;
            *entry = candidate.clone();

            (Self::serialize(&songs)?, previous, candidate)
        };

        if let Err(err) = self.write_snapshot(&snapshot).await {
            let mut songs = self.songs.write().await;
            if let Some(entry) = songs.get_mut(&id) {
                *entry = previous;
            }
            return Err(err);
        }
        Ok(updated)
    }

    fn serialize(songs: &HashMap<Uuid, Song>) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(songs)?)
    }

    async fn write_snapshot(&self, bytes: &[u8]) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::trace!(path = %self.path.display(), bytes = bytes.len(), "Snapshot flushed");
        Ok(())
    }
}
