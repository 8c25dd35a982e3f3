//! Spaced-repetition scheduler.
//!
//! Pure rating-to-update computation, no I/O:
//! - `again`: small easiness penalty, interval and due date untouched
//! - `good`: interval grows by the easiness factor
//! - `easy`: interval grows by the easiness factor plus a bonus
//!
//! The very first successful review is a fixed short probe (1 or 2 days)
//! rather than a multiplication of the degenerate initial interval.

use crate::{Card, Rating, MIN_EASINESS};
use chrono::{DateTime, Duration, Utc};

/// Bonus applied to the easiness factor when computing an `easy` interval
const EASY_BONUS: f64 = 0.2;

/// Easiness penalty applied on a failed recall
const AGAIN_PENALTY: f64 = 0.2;

/// The durable outcome of rating a card
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduleChange {
    pub review_interval: u32,
    pub easiness_factor: f64,
    /// Whether the due date moves to `now + review_interval` days.
    /// False only for `again`, whose immediate re-review is handled by the
    /// session queue, not by date math.
    pub due_advances: bool,
}

/// Compute the new schedule fields for a rating
///
/// Interval growth rounds half away from zero (`f64::round`).
pub fn apply_rating(review_interval: u32, easiness_factor: f64, rating: Rating) -> ScheduleChange {
    match rating {
        Rating::Again => ScheduleChange {
            review_interval,
            easiness_factor: (easiness_factor - AGAIN_PENALTY).max(MIN_EASINESS),
            due_advances: false,
        },
        Rating::Good => {
            let interval = if review_interval == 1 {
                1
            } else {
                (review_interval as f64 * easiness_factor).round() as u32
            };
            ScheduleChange {
                review_interval: interval.max(1),
                easiness_factor,
                due_advances: true,
            }
        }
        Rating::Easy => {
            let interval = if review_interval == 1 {
                2
            } else {
                (review_interval as f64 * (easiness_factor + EASY_BONUS)).round() as u32
            };
            ScheduleChange {
                review_interval: interval.max(1),
                easiness_factor,
                due_advances: true,
            }
        }
    }
}

/// Apply a rating to a card, producing the card to persist
///
/// The due date only ever moves forward: `again` leaves it where it was.
pub fn reschedule(card: &Card, rating: Rating, now: DateTime<Utc>) -> Card {
    let change = apply_rating(card.review_interval, card.easiness_factor, rating);

    let mut updated = card.clone();
    updated.review_interval = change.review_interval;
    updated.easiness_factor = change.easiness_factor;
    if change.due_advances {
        updated.next_review_date = now + Duration::days(change.review_interval as i64);
    }

    tracing::debug!(
        "Rescheduled card {}: rating={}, interval={}d, easiness={:.2}",
        card.id,
        rating.as_str(),
        updated.review_interval,
        updated.easiness_factor
    );

    updated
}
