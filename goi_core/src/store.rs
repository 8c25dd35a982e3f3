//! Card store contract and JSON file implementation.
//!
//! The scheduler and session manager only depend on the `CardStore` trait;
//! `JsonCardStore` keeps a whole deck in one JSON file with atomic
//! tempfile-rename writes. Persist is compare-and-swap on the card's
//! `revision`, so two concurrent updates to the same card cannot both
//! apply: mutating operations hold an exclusive lock on a sibling
//! `.lock` file across the whole load-check-save cycle. The lock file is
//! a separate path because the deck file itself is replaced by rename on
//! every save, and a lock on the old inode would not survive the swap.

use crate::{Card, Error, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Storage contract consumed by the session manager and deck operations
///
/// All queries and mutations are scoped by owner. Errors follow the core
/// taxonomy: `NotFound`, `Forbidden`, `DuplicateTerm`, `Conflict`,
/// `Storage`.
pub trait CardStore {
    /// Up to `limit` cards due at `now`, most overdue first
    fn find_due(&self, owner_id: Uuid, now: DateTime<Utc>, limit: usize) -> Result<Vec<Card>>;

    /// All of an owner's cards, ascending by next review date
    fn list(&self, owner_id: Uuid) -> Result<Vec<Card>>;

    /// Look up a card by id, scoped to its owner
    ///
    /// Another owner's card is reported as `NotFound`, never `Forbidden`,
    /// so lookups don't leak existence.
    fn find_by_id(&self, owner_id: Uuid, id: Uuid) -> Result<Card>;

    /// Insert a new card; fails with `DuplicateTerm` if the owner already
    /// holds a card for the same term
    fn create(&self, card: Card) -> Result<Card>;

    /// Write back a mutated card
    ///
    /// The stored revision must match the incoming card's revision;
    /// otherwise the write is rejected with `Conflict` and nothing is
    /// overwritten. Returns the card as stored (revision bumped).
    fn persist(&self, card: &Card) -> Result<Card>;

    /// Delete a card; `Forbidden` when `owner_id` does not own it
    fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<()>;
}

/// Deck persistence in a single JSON file
pub struct JsonCardStore {
    path: PathBuf,
}

impl JsonCardStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole deck with a shared lock
    ///
    /// A missing file is an empty deck. A file that cannot be read or
    /// parsed is a `Storage` error - a vocabulary deck is never silently
    /// replaced with an empty one.
    fn load(&self) -> Result<Vec<Card>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .map_err(|e| Error::Storage(format!("cannot open deck {:?}: {}", self.path, e)))?;

        file.lock_shared()
            .map_err(|e| Error::Storage(format!("cannot lock deck {:?}: {}", self.path, e)))?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        let read_result = reader.read_to_string(&mut contents);
        file.unlock()?;
        read_result.map_err(|e| Error::Storage(format!("cannot read deck {:?}: {}", self.path, e)))?;

        let cards: Vec<Card> = serde_json::from_str(&contents)
            .map_err(|e| Error::Storage(format!("deck {:?} is corrupted: {}", self.path, e)))?;

        tracing::debug!("Loaded {} cards from {:?}", cards.len(), self.path);
        Ok(cards)
    }

    /// Atomically write the whole deck: temp file, fsync, rename
    ///
    /// Callers must already hold the mutation lock; writers are never
    /// concurrent here.
    fn save(&self, cards: &[Card]) -> Result<()> {
        let temp = NamedTempFile::new_in(self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "deck path missing parent")
        })?)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(cards)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;

        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} cards to {:?}", cards.len(), self.path);
        Ok(())
    }

    /// Run a read-modify-write of the deck under the mutation lock
    ///
    /// The exclusive lock on the sibling `.lock` file spans load, the
    /// operation's checks (duplicate term, ownership, revision CAS) and
    /// the rename that publishes the new deck, so interleaved writers
    /// cannot both observe the same revision and both apply. If `op`
    /// fails, nothing is written.
    fn mutate<T>(&self, op: impl FnOnce(&mut Vec<Card>) -> Result<T>) -> Result<T> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let lock_path = self.path.with_extension("json.lock");
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| Error::Storage(format!("cannot open deck lock {:?}: {}", lock_path, e)))?;

        lock.lock_exclusive()
            .map_err(|e| Error::Storage(format!("cannot lock deck {:?}: {}", lock_path, e)))?;

        let result = (|| {
            let mut cards = self.load()?;
            let out = op(&mut cards)?;
            self.save(&cards)?;
            Ok(out)
        })();

        let _ = lock.unlock();
        result
    }
}

impl CardStore for JsonCardStore {
    fn find_due(&self, owner_id: Uuid, now: DateTime<Utc>, limit: usize) -> Result<Vec<Card>> {
        let mut due: Vec<Card> = self
            .load()?
            .into_iter()
            .filter(|c| c.owner_id == owner_id && c.is_due(now))
            .collect();

        due.sort_by_key(|c| c.next_review_date);
        due.truncate(limit);

        tracing::debug!("Found {} due cards for owner {}", due.len(), owner_id);
        Ok(due)
    }

    fn list(&self, owner_id: Uuid) -> Result<Vec<Card>> {
        let mut cards: Vec<Card> = self
            .load()?
            .into_iter()
            .filter(|c| c.owner_id == owner_id)
            .collect();
        cards.sort_by_key(|c| c.next_review_date);
        Ok(cards)
    }

    fn find_by_id(&self, owner_id: Uuid, id: Uuid) -> Result<Card> {
        self.load()?
            .into_iter()
            .find(|c| c.id == id && c.owner_id == owner_id)
            .ok_or(Error::NotFound)
    }

    fn create(&self, card: Card) -> Result<Card> {
        let created = self.mutate(|cards| {
            if cards
                .iter()
                .any(|c| c.owner_id == card.owner_id && c.term == card.term)
            {
                return Err(Error::DuplicateTerm(card.term.clone()));
            }

            cards.push(card.clone());
            Ok(card.clone())
        })?;

        tracing::info!("Created card {} ({:?})", created.id, created.term);
        Ok(created)
    }

    fn persist(&self, card: &Card) -> Result<Card> {
        let updated = self.mutate(|cards| {
            let stored = cards
                .iter_mut()
                .find(|c| c.id == card.id)
                .ok_or(Error::NotFound)?;

            if stored.owner_id != card.owner_id {
                return Err(Error::Forbidden);
            }
            if stored.revision != card.revision {
                return Err(Error::Conflict(format!(
                    "card {} was modified concurrently (stored revision {}, submitted {})",
                    card.id, stored.revision, card.revision
                )));
            }

            let mut updated = card.clone();
            updated.revision += 1;
            *stored = updated.clone();
            Ok(updated)
        })?;

        tracing::debug!("Persisted card {} at revision {}", updated.id, updated.revision);
        Ok(updated)
    }

    fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<()> {
        let removed = self.mutate(|cards| {
            let position = cards
                .iter()
                .position(|c| c.id == id)
                .ok_or(Error::NotFound)?;

            if cards[position].owner_id != owner_id {
                return Err(Error::Forbidden);
            }

            Ok(cards.remove(position))
        })?;

        tracing::info!("Deleted card {} ({:?})", removed.id, removed.term);
        Ok(())
    }
}
