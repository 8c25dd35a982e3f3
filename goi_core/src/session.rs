//! Review session state machine.
//!
//! A session is one bounded sitting over a snapshot of due cards:
//! `Loading -> Active -> Complete`. The card at the cursor is presented
//! face-down until revealed; rating it always persists the scheduler's
//! output, and a failed recall (`again`) pushes the card to the back of
//! the working queue so it comes around again in the same sitting.
//!
//! Sessions are ephemeral value objects. They are never persisted and
//! never shared across owners; `&mut self` on `rate` keeps one rating in
//! flight at a time.

use crate::{scheduler, Card, CardStore, Error, Rating, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Lifecycle phase of a review session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// Due-set fetch not yet completed; no card is presented
    Loading,
    /// Cards remain in the working queue
    Active,
    /// Cursor has advanced past the end of the working queue
    Complete,
}

/// One review sitting over a snapshot of due cards
#[derive(Clone, Debug)]
pub struct ReviewSession {
    owner_id: Uuid,
    queue: Vec<Card>,
    cursor: usize,
    revealed: bool,
    phase: SessionPhase,
}

impl ReviewSession {
    /// Create an empty session awaiting its due-set
    pub fn new(owner_id: Uuid) -> Self {
        Self {
            owner_id,
            queue: Vec::new(),
            cursor: 0,
            revealed: false,
            phase: SessionPhase::Loading,
        }
    }

    /// Fetch the due-set and begin the session
    ///
    /// A fetch failure propagates and no session is produced; a session
    /// never becomes active with partial data. An empty due-set still
    /// activates, as an immediately complete session.
    pub fn start(
        store: &dyn CardStore,
        owner_id: Uuid,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Self> {
        let mut session = Self::new(owner_id);
        let due = store.find_due(owner_id, now, limit)?;
        session.begin(due)?;
        Ok(session)
    }

    /// Seed the working queue from an arrived due-set (`Loading -> Active`)
    pub fn begin(&mut self, due_cards: Vec<Card>) -> Result<()> {
        if self.phase != SessionPhase::Loading {
            return Err(Error::Validation(
                "session has already been seeded".to_string(),
            ));
        }

        tracing::info!(
            "Starting review session for owner {} with {} due cards",
            self.owner_id,
            due_cards.len()
        );

        self.queue = due_cards;
        self.phase = SessionPhase::Active;
        self.settle_phase();
        Ok(())
    }

    fn settle_phase(&mut self) {
        if self.phase == SessionPhase::Active && self.cursor >= self.queue.len() {
            self.phase = SessionPhase::Complete;
            tracing::info!("Review session complete for owner {}", self.owner_id);
        }
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Complete
    }

    /// The card currently presented, if any
    pub fn current_card(&self) -> Option<&Card> {
        match self.phase {
            SessionPhase::Active => self.queue.get(self.cursor),
            _ => None,
        }
    }

    /// Whether the presented card is face-up
    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Position within the sitting, 1-based, for "card X of Y" displays
    ///
    /// The total counts requeued copies, so it can grow mid-session. Once
    /// the sitting is over the position stays clamped to the total.
    pub fn progress(&self) -> (usize, usize) {
        let total = self.queue.len();
        ((self.cursor + 1).min(total), total)
    }

    /// Flip the presented card face-up; idempotent, mutates no Card
    pub fn reveal_current(&mut self) -> Result<&Card> {
        match self.phase {
            SessionPhase::Loading => Err(Error::Validation(
                "session is still loading".to_string(),
            )),
            SessionPhase::Complete => Err(Error::SessionComplete),
            SessionPhase::Active => {
                self.revealed = true;
                // Active phase guarantees a card at the cursor
                self.queue.get(self.cursor).ok_or(Error::SessionComplete)
            }
        }
    }

    /// Rate the presented card
    ///
    /// `card_id` must name the card at the cursor; anything else is a stale
    /// submission and is rejected with `Conflict`, with no persistence, no
    /// queue mutation and no cursor advance. The scheduler output is
    /// persisted before the session mutates, so a failed persist also
    /// leaves the session exactly where it was.
    ///
    /// Every rating is persisted, `again` included: its durable effect is
    /// the easiness penalty. `again` additionally requeues the persisted
    /// card at the back of the queue, so consecutive failures compound the
    /// penalty within one sitting.
    pub fn rate(
        &mut self,
        store: &dyn CardStore,
        card_id: Uuid,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> Result<Card> {
        let current = match self.phase {
            SessionPhase::Loading => {
                return Err(Error::Validation("session is still loading".to_string()))
            }
            SessionPhase::Complete => return Err(Error::SessionComplete),
            SessionPhase::Active => self
                .queue
                .get(self.cursor)
                .ok_or(Error::SessionComplete)?,
        };

        if current.id != card_id {
            return Err(Error::Conflict(format!(
                "card {} is not the presented card; resynchronize the session",
                card_id
            )));
        }

        let updated = scheduler::reschedule(current, rating, now);
        let persisted = store.persist(&updated)?;

        if rating == Rating::Again {
            tracing::debug!("Requeueing card {} to the back of the sitting", persisted.id);
            self.queue.push(persisted.clone());
        }

        self.cursor += 1;
        self.revealed = false;
        self.settle_phase();

        Ok(persisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// In-memory store with injectable failures
    struct MemStore {
        cards: RefCell<Vec<Card>>,
        fail_find_due: Cell<bool>,
        fail_persist: Cell<bool>,
    }

    impl MemStore {
        fn new(cards: Vec<Card>) -> Self {
            Self {
                cards: RefCell::new(cards),
                fail_find_due: Cell::new(false),
                fail_persist: Cell::new(false),
            }
        }

        fn get(&self, id: Uuid) -> Card {
            self.cards
                .borrow()
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .unwrap()
        }
    }

    impl CardStore for MemStore {
        fn find_due(&self, owner_id: Uuid, now: DateTime<Utc>, limit: usize) -> Result<Vec<Card>> {
            if self.fail_find_due.get() {
                return Err(Error::Storage("store offline".into()));
            }
            let mut due: Vec<Card> = self
                .cards
                .borrow()
                .iter()
                .filter(|c| c.owner_id == owner_id && c.is_due(now))
                .cloned()
                .collect();
            due.sort_by_key(|c| c.next_review_date);
            due.truncate(limit);
            Ok(due)
        }

        fn list(&self, owner_id: Uuid) -> Result<Vec<Card>> {
            Ok(self
                .cards
                .borrow()
                .iter()
                .filter(|c| c.owner_id == owner_id)
                .cloned()
                .collect())
        }

        fn find_by_id(&self, owner_id: Uuid, id: Uuid) -> Result<Card> {
            self.cards
                .borrow()
                .iter()
                .find(|c| c.id == id && c.owner_id == owner_id)
                .cloned()
                .ok_or(Error::NotFound)
        }

        fn create(&self, card: Card) -> Result<Card> {
            self.cards.borrow_mut().push(card.clone());
            Ok(card)
        }

        fn persist(&self, card: &Card) -> Result<Card> {
            if self.fail_persist.get() {
                return Err(Error::Storage("store offline".into()));
            }
            let mut cards = self.cards.borrow_mut();
            let stored = cards
                .iter_mut()
                .find(|c| c.id == card.id)
                .ok_or(Error::NotFound)?;
            if stored.revision != card.revision {
                return Err(Error::Conflict("revision mismatch".into()));
            }
            let mut updated = card.clone();
            updated.revision += 1;
            *stored = updated.clone();
            Ok(updated)
        }

        fn delete(&self, _owner_id: Uuid, _id: Uuid) -> Result<()> {
            unimplemented!("not needed for session tests")
        }
    }

    fn setup(terms: &[&str]) -> (MemStore, Uuid, DateTime<Utc>) {
        let owner = Uuid::new_v4();
        let now = Utc::now();
        let cards = terms
            .iter()
            .map(|t| Card::new(owner, *t, "", format!("def of {}", t), now))
            .collect();
        (MemStore::new(cards), owner, now)
    }

    #[test]
    fn test_empty_due_set_is_immediately_complete() {
        let (store, owner, now) = setup(&[]);
        let session = ReviewSession::start(&store, owner, now, 20).unwrap();

        assert!(session.is_complete());
        assert!(session.current_card().is_none());
    }

    #[test]
    fn test_fetch_failure_produces_no_session() {
        let (store, owner, now) = setup(&["a"]);
        store.fail_find_due.set(true);

        let err = ReviewSession::start(&store, owner, now, 20).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_loading_session_rejects_interaction() {
        let (store, owner, now) = setup(&["a"]);
        let mut session = ReviewSession::new(owner);

        assert_eq!(session.phase(), SessionPhase::Loading);
        assert!(session.current_card().is_none());
        assert!(matches!(
            session.reveal_current(),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            session.rate(&store, Uuid::new_v4(), Rating::Good, now),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_reveal_is_idempotent() {
        let (store, owner, now) = setup(&["a"]);
        let mut session = ReviewSession::start(&store, owner, now, 20).unwrap();

        assert!(!session.is_revealed());
        session.reveal_current().unwrap();
        assert!(session.is_revealed());
        session.reveal_current().unwrap();
        assert!(session.is_revealed());
        assert_eq!(session.progress(), (1, 1));
    }

    #[test]
    fn test_good_rating_advances_and_completes() {
        let (store, owner, now) = setup(&["a", "b"]);
        let mut session = ReviewSession::start(&store, owner, now, 20).unwrap();

        let first = session.current_card().unwrap().id;
        session.reveal_current().unwrap();
        session.rate(&store, first, Rating::Good, now).unwrap();

        assert!(!session.is_revealed());
        assert!(!session.is_complete());

        let second = session.current_card().unwrap().id;
        assert_ne!(first, second);
        session.rate(&store, second, Rating::Easy, now).unwrap();

        assert!(session.is_complete());
        assert!(matches!(
            session.rate(&store, second, Rating::Good, now),
            Err(Error::SessionComplete)
        ));
    }

    #[test]
    fn test_rating_persists_scheduler_output() {
        let (store, owner, now) = setup(&["a"]);
        let mut session = ReviewSession::start(&store, owner, now, 20).unwrap();

        let id = session.current_card().unwrap().id;
        let persisted = session.rate(&store, id, Rating::Easy, now).unwrap();

        assert_eq!(persisted.review_interval, 2);
        let stored = store.get(id);
        assert_eq!(stored.review_interval, 2);
        assert_eq!(stored.revision, 1);
    }

    #[test]
    fn test_again_requeues_sole_card_until_passed() {
        let (store, owner, now) = setup(&["a"]);
        let mut session = ReviewSession::start(&store, owner, now, 20).unwrap();

        let id = session.current_card().unwrap().id;
        session.rate(&store, id, Rating::Again, now).unwrap();

        // Requeued copy keeps the session open
        assert!(!session.is_complete());
        assert_eq!(session.current_card().unwrap().id, id);
        assert_eq!(session.progress(), (2, 2));

        // Durable effect of `again` is the easiness penalty only
        let stored = store.get(id);
        assert!((stored.easiness_factor - 2.3).abs() < 1e-9);
        assert_eq!(stored.review_interval, 1);
        assert_eq!(stored.next_review_date, now);

        session.rate(&store, id, Rating::Good, now).unwrap();
        assert!(session.is_complete());
    }

    #[test]
    fn test_again_requeues_to_the_back() {
        let (store, owner, now) = setup(&["a", "b"]);
        let mut session = ReviewSession::start(&store, owner, now, 20).unwrap();

        let first = session.current_card().unwrap().id;
        session.rate(&store, first, Rating::Again, now).unwrap();

        // The other card comes next, not the failed one
        let second = session.current_card().unwrap().id;
        assert_ne!(second, first);
        session.rate(&store, second, Rating::Good, now).unwrap();

        // Now the failed card comes around again
        assert_eq!(session.current_card().unwrap().id, first);
    }

    #[test]
    fn test_consecutive_agains_compound_to_the_floor() {
        let (store, owner, now) = setup(&["a"]);
        let mut session = ReviewSession::start(&store, owner, now, 20).unwrap();
        let id = session.current_card().unwrap().id;

        for _ in 0..10 {
            session.rate(&store, id, Rating::Again, now).unwrap();
            assert!(store.get(id).easiness_factor >= crate::MIN_EASINESS);
        }
        assert!((store.get(id).easiness_factor - crate::MIN_EASINESS).abs() < 1e-9);
        assert!(!session.is_complete());
    }

    #[test]
    fn test_progress_never_exceeds_queue_length() {
        let (store, owner, now) = setup(&["a", "b"]);
        let mut session = ReviewSession::start(&store, owner, now, 20).unwrap();
        assert_eq!(session.progress(), (1, 2));

        let first = session.current_card().unwrap().id;
        session.rate(&store, first, Rating::Good, now).unwrap();
        assert_eq!(session.progress(), (2, 2));

        let second = session.current_card().unwrap().id;
        session.rate(&store, second, Rating::Good, now).unwrap();
        assert!(session.is_complete());
        assert_eq!(session.progress(), (2, 2));

        // An empty sitting reports no position at all
        let empty = ReviewSession::start(&store, Uuid::new_v4(), now, 20).unwrap();
        assert_eq!(empty.progress(), (0, 0));
    }

    #[test]
    fn test_stale_rating_is_rejected_without_side_effects() {
        let (store, owner, now) = setup(&["a", "b"]);
        let mut session = ReviewSession::start(&store, owner, now, 20).unwrap();

        let current = session.current_card().unwrap().id;
        let err = session
            .rate(&store, Uuid::new_v4(), Rating::Good, now)
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Nothing moved, nothing persisted
        assert_eq!(session.current_card().unwrap().id, current);
        assert_eq!(store.get(current).revision, 0);
        assert_eq!(session.progress(), (1, 2));
    }

    #[test]
    fn test_failed_persist_leaves_session_in_place() {
        let (store, owner, now) = setup(&["a"]);
        let mut session = ReviewSession::start(&store, owner, now, 20).unwrap();
        let id = session.current_card().unwrap().id;

        store.fail_persist.set(true);
        let err = session.rate(&store, id, Rating::Good, now).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));

        // Still active, same card presented; retry succeeds
        assert!(!session.is_complete());
        assert_eq!(session.current_card().unwrap().id, id);

        store.fail_persist.set(false);
        session.rate(&store, id, Rating::Good, now).unwrap();
        assert!(session.is_complete());
    }

    #[test]
    fn test_store_conflict_surfaces_without_advancing() {
        let (store, owner, now) = setup(&["a"]);
        let mut session = ReviewSession::start(&store, owner, now, 20).unwrap();
        let id = session.current_card().unwrap().id;

        // Another writer bumps the revision behind the session's back
        let mut sneaky = store.get(id);
        sneaky.easiness_factor = 2.4;
        store.persist(&sneaky).unwrap();

        let err = session.rate(&store, id, Rating::Good, now).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert!(!session.is_complete());
    }
}
