//! Deck management: adding, listing and removing cards.
//!
//! Thin operations over the card store. Input text is trimmed; term and
//! definition must be non-empty. Uniqueness of `(owner, term)` and
//! ownership checks live in the store.

use crate::{Card, CardStore, Error, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Add a new card to the owner's deck, due immediately
pub fn add_card(
    store: &dyn CardStore,
    owner_id: Uuid,
    term: &str,
    reading: &str,
    definition: &str,
    now: DateTime<Utc>,
) -> Result<Card> {
    let term = term.trim();
    let definition = definition.trim();

    if term.is_empty() {
        return Err(Error::Validation("term must not be empty".to_string()));
    }
    if definition.is_empty() {
        return Err(Error::Validation("definition must not be empty".to_string()));
    }

    let card = Card::new(owner_id, term, reading.trim(), definition, now);
    store.create(card)
}

/// All of the owner's cards, soonest review first
pub fn list_cards(store: &dyn CardStore, owner_id: Uuid) -> Result<Vec<Card>> {
    store.list(owner_id)
}

/// Remove a card from the owner's deck
///
/// Fails with `Forbidden` if the card belongs to someone else.
pub fn remove_card(store: &dyn CardStore, owner_id: Uuid, id: Uuid) -> Result<()> {
    store.delete(owner_id, id)?;
    tracing::info!("Removed card {} for owner {}", id, owner_id);
    Ok(())
}
