//! Review journal: append-only log of applied ratings.
//!
//! Each successfully persisted rating is appended to a JSONL file with
//! file locking. The journal is the durable trail of a sitting; the CSV
//! archive (see `archive`) rolls it up periodically.

use crate::{Card, Rating, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One applied rating and the schedule it produced
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub id: Uuid,
    pub card_id: Uuid,
    pub owner_id: Uuid,
    pub rating: Rating,
    pub rated_at: DateTime<Utc>,
    pub review_interval: u32,
    pub easiness_factor: f64,
    pub next_review_date: DateTime<Utc>,
}

impl ReviewEvent {
    /// Record the outcome of rating `card` (the card as persisted)
    pub fn from_outcome(card: &Card, rating: Rating, rated_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id: card.id,
            owner_id: card.owner_id,
            rating,
            rated_at,
            review_interval: card.review_interval,
            easiness_factor: card.easiness_factor,
            next_review_date: card.next_review_date,
        }
    }
}

/// Sink trait for recording review events
pub trait ReviewSink {
    fn append(&mut self, event: &ReviewEvent) -> Result<()>;
}

/// JSONL-backed review journal with file locking
pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl ReviewSink for JsonlJournal {
    fn append(&mut self, event: &ReviewEvent) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(event)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        file.unlock()?;

        tracing::debug!("Appended review event {} to journal", event.id);
        Ok(())
    }
}

/// Read all events from a journal file
///
/// Unparseable lines are skipped with a warning rather than failing the
/// whole read.
pub fn read_events(path: &Path) -> Result<Vec<ReviewEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut events = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<ReviewEvent>(&line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!("Failed to parse review event at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} review events from journal", events.len());
    Ok(events)
}
