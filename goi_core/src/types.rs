//! Core domain types for the Goi vocabulary trainer.
//!
//! This module defines the fundamental types used throughout the system:
//! - Cards (the learning items) and their scheduling fields
//! - Ratings (the learner's self-reported recall quality)

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Hard floor for the easiness factor. No rating sequence may push a card below it.
pub const MIN_EASINESS: f64 = 1.3;

/// Easiness factor assigned to freshly created cards.
pub const DEFAULT_EASINESS: f64 = 2.5;

/// Review interval (days) assigned to freshly created cards.
pub const INITIAL_INTERVAL: u32 = 1;

// ============================================================================
// Rating
// ============================================================================

/// The learner's self-reported recall quality for a presented card
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    /// Failed to recall; the card is shown again later in the same sitting
    Again,
    /// Recalled
    Good,
    /// Recalled effortlessly
    Easy,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }
}

impl FromStr for Rating {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "again" => Ok(Rating::Again),
            "good" => Ok(Rating::Good),
            "easy" => Ok(Rating::Easy),
            other => Err(Error::InvalidRating(other.to_string())),
        }
    }
}

// ============================================================================
// Card
// ============================================================================

/// A single vocabulary item with its spaced-repetition schedule
///
/// `term`, `reading` and `definition` are opaque display text; the scheduler
/// only ever touches `next_review_date`, `review_interval` and
/// `easiness_factor`. `revision` is the optimistic-concurrency token bumped
/// by the store on every successful persist.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub term: String,
    pub reading: String,
    pub definition: String,
    pub next_review_date: DateTime<Utc>,
    pub review_interval: u32,
    pub easiness_factor: f64,
    #[serde(default)]
    pub revision: u64,
}

impl Card {
    /// Create a fresh card, due immediately
    pub fn new(
        owner_id: Uuid,
        term: impl Into<String>,
        reading: impl Into<String>,
        definition: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            term: term.into(),
            reading: reading.into(),
            definition: definition.into(),
            next_review_date: now,
            review_interval: INITIAL_INTERVAL,
            easiness_factor: DEFAULT_EASINESS,
            revision: 0,
        }
    }

    /// A card is due when its next review date is at or before `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }
}
