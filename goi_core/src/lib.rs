#![forbid(unsafe_code)]

//! Core domain model and business logic for the Goi vocabulary trainer.
//!
//! This crate provides:
//! - Domain types (cards, ratings, review events)
//! - Spaced-repetition scheduler
//! - Review session state machine
//! - Card store contract + JSON file store
//! - Deck management
//! - Review journal and CSV archive

pub mod types;
pub mod error;
pub mod scheduler;
pub mod store;
pub mod session;
pub mod deck;
pub mod journal;
pub mod archive;
pub mod config;
pub mod logging;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use scheduler::{apply_rating, reschedule, ScheduleChange};
pub use store::{CardStore, JsonCardStore};
pub use session::{ReviewSession, SessionPhase};
pub use config::Config;
pub use journal::{JsonlJournal, ReviewEvent, ReviewSink};
