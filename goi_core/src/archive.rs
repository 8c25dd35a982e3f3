//! CSV archive for review journals.
//!
//! Rolls the JSONL journal into a long-term CSV file and renames the
//! journal to `.processed`. The CSV is fsynced before the journal is
//! renamed, and the journal is renamed rather than deleted so it can be
//! recovered manually if something goes wrong.

use crate::{journal, Result};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    card_id: String,
    owner_id: String,
    rating: &'static str,
    rated_at: String,
    review_interval: u32,
    easiness_factor: f64,
    next_review_date: String,
}

impl From<&journal::ReviewEvent> for CsvRow {
    fn from(event: &journal::ReviewEvent) -> Self {
        CsvRow {
            id: event.id.to_string(),
            card_id: event.card_id.to_string(),
            owner_id: event.owner_id.to_string(),
            rating: event.rating.as_str(),
            rated_at: event.rated_at.to_rfc3339(),
            review_interval: event.review_interval,
            easiness_factor: event.easiness_factor,
            next_review_date: event.next_review_date.to_rfc3339(),
        }
    }
}

/// Roll up journal events into CSV and archive the journal
///
/// Returns the number of events processed. An empty or missing journal is
/// a no-op.
pub fn journal_to_csv_and_archive(journal_path: &Path, csv_path: &Path) -> Result<usize> {
    let events = journal::read_events(journal_path)?;

    if events.is_empty() {
        tracing::info!("No review events in journal to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Headers only when the CSV is brand new
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for event in &events {
        writer.serialize(CsvRow::from(event))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Wrote {} review events to CSV", events.len());

    let processed_path = journal_path.with_extension("jsonl.processed");
    std::fs::rename(journal_path, &processed_path)?;

    tracing::info!("Archived journal to {:?}", processed_path);

    Ok(events.len())
}

/// Remove all `.processed` journal files in the given directory
pub fn cleanup_processed(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Some(extension) = path.extension() {
            if extension == "processed" {
                std::fs::remove_file(&path)?;
                tracing::debug!("Removed processed journal: {:?}", path);
                count += 1;
            }
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed journals", count);
    }

    Ok(count)
}
