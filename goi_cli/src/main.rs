use chrono::Utc;
use clap::{Parser, Subcommand};
use goi_core::*;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "goi")]
#[command(about = "Spaced-repetition vocabulary trainer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a review session over the cards due now (default)
    Review {
        /// Scripted ratings for non-interactive runs, one letter per card:
        /// a (again), g (good), e (easy)
        #[arg(long)]
        ratings: Option<String>,
    },

    /// Add a word to the deck
    Add {
        /// The term to learn
        term: String,

        /// Its meaning
        definition: String,

        /// Pronunciation or reading, if any
        #[arg(long, default_value = "")]
        reading: String,
    },

    /// List all cards in the deck
    List,

    /// Remove a word from the deck
    Remove {
        /// The term to remove
        term: String,
    },

    /// Roll up the review journal to CSV
    Rollup {
        /// Clean up processed journal files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

fn main() {
    // Initialize logging
    goi_core::logging::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Determine data directory
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Some(Commands::Review { ratings }) => cmd_review(data_dir, ratings, &config),
        Some(Commands::Add {
            term,
            definition,
            reading,
        }) => cmd_add(data_dir, &term, &reading, &definition),
        Some(Commands::List) => cmd_list(data_dir),
        Some(Commands::Remove { term }) => cmd_remove(data_dir, &term),
        Some(Commands::Rollup { cleanup }) => cmd_rollup(data_dir, cleanup),
        None => cmd_review(data_dir, None, &config),
    }
}

/// Single-user identity for the CLI, minted on first run
#[derive(Serialize, Deserialize)]
struct OwnerFile {
    owner_id: Uuid,
}

fn load_or_create_owner(data_dir: &Path) -> Result<Uuid> {
    let path = data_dir.join("owner.json");

    if path.exists() {
        let contents = std::fs::read_to_string(&path)?;
        let owner: OwnerFile = serde_json::from_str(&contents)?;
        return Ok(owner.owner_id);
    }

    std::fs::create_dir_all(data_dir)?;
    let owner = OwnerFile {
        owner_id: Uuid::new_v4(),
    };
    std::fs::write(&path, serde_json::to_string(&owner)?)?;
    tracing::info!("Created owner identity {}", owner.owner_id);
    Ok(owner.owner_id)
}

fn deck_path(data_dir: &Path) -> PathBuf {
    data_dir.join("deck.json")
}

fn journal_path(data_dir: &Path) -> PathBuf {
    data_dir.join("journal").join("reviews.jsonl")
}

fn csv_path(data_dir: &Path) -> PathBuf {
    data_dir.join("reviews.csv")
}

fn cmd_review(data_dir: PathBuf, ratings: Option<String>, config: &Config) -> Result<()> {
    let owner = load_or_create_owner(&data_dir)?;
    let store = JsonCardStore::new(deck_path(&data_dir));
    let mut journal = JsonlJournal::new(journal_path(&data_dir));

    let mut session = ReviewSession::start(&store, owner, Utc::now(), config.review.due_limit)?;

    if session.is_complete() {
        println!("No cards are due for review. Great job!");
        return Ok(());
    }

    // Scripted ratings drive the session without prompting
    let mut script = match ratings {
        Some(s) => Some(
            s.chars()
                .map(parse_rating_letter)
                .collect::<Result<Vec<Rating>>>()?
                .into_iter(),
        ),
        None => None,
    };

    while let Some(card) = session.current_card().cloned() {
        let (position, total) = session.progress();
        println!();
        println!("Card {} of {}", position, total);
        println!("  {}", card.term);

        let rating = match script.as_mut() {
            Some(iter) => match iter.next() {
                Some(rating) => {
                    session.reveal_current()?;
                    rating
                }
                None => {
                    let remaining = total - position + 1;
                    println!("\nRatings exhausted with {} cards remaining.", remaining);
                    return Ok(());
                }
            },
            None => {
                prompt_reveal()?;
                let revealed = session.reveal_current()?;
                if !revealed.reading.is_empty() {
                    println!("  {}", revealed.reading);
                }
                println!("  {}", revealed.definition);
                prompt_rating()?
            }
        };

        let now = Utc::now();
        let persisted = session.rate(&store, card.id, rating, now)?;
        journal.append(&ReviewEvent::from_outcome(&persisted, rating, now))?;
    }

    println!("\nSession complete! You've reviewed all your cards for now.");
    Ok(())
}

fn cmd_add(data_dir: PathBuf, term: &str, reading: &str, definition: &str) -> Result<()> {
    let owner = load_or_create_owner(&data_dir)?;
    let store = JsonCardStore::new(deck_path(&data_dir));

    let card = deck::add_card(&store, owner, term, reading, definition, Utc::now())?;

    println!("✓ Added {:?} to the deck", card.term);
    Ok(())
}

fn cmd_list(data_dir: PathBuf) -> Result<()> {
    let owner = load_or_create_owner(&data_dir)?;
    let store = JsonCardStore::new(deck_path(&data_dir));

    let cards = deck::list_cards(&store, owner)?;
    if cards.is_empty() {
        println!("The deck is empty.");
        return Ok(());
    }

    let now = Utc::now();
    println!("{} cards:", cards.len());
    for card in &cards {
        let due = if card.is_due(now) {
            "due now".to_string()
        } else {
            format!("due {}", card.next_review_date.format("%Y-%m-%d"))
        };
        if card.reading.is_empty() {
            println!("  {} — {} ({})", card.term, card.definition, due);
        } else {
            println!("  {} [{}] — {} ({})", card.term, card.reading, card.definition, due);
        }
    }
    Ok(())
}

fn cmd_remove(data_dir: PathBuf, term: &str) -> Result<()> {
    let owner = load_or_create_owner(&data_dir)?;
    let store = JsonCardStore::new(deck_path(&data_dir));

    let card = deck::list_cards(&store, owner)?
        .into_iter()
        .find(|c| c.term == term)
        .ok_or(Error::NotFound)?;

    deck::remove_card(&store, owner, card.id)?;

    println!("✓ Removed {:?} from the deck", term);
    Ok(())
}

fn cmd_rollup(data_dir: PathBuf, cleanup: bool) -> Result<()> {
    let journal = journal_path(&data_dir);

    if !journal.exists() {
        println!("No review journal found - nothing to roll up.");
        return Ok(());
    }

    let count = archive::journal_to_csv_and_archive(&journal, &csv_path(&data_dir))?;

    println!("✓ Rolled up {} review events to CSV", count);
    println!("  CSV: {}", csv_path(&data_dir).display());

    if cleanup {
        let journal_dir = data_dir.join("journal");
        let cleaned = archive::cleanup_processed(&journal_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed journal files", cleaned);
        }
    }

    Ok(())
}

fn parse_rating_letter(c: char) -> Result<Rating> {
    match c {
        'a' => Ok(Rating::Again),
        'g' => Ok(Rating::Good),
        'e' => Ok(Rating::Easy),
        other => Err(Error::InvalidRating(other.to_string())),
    }
}

fn prompt_reveal() -> Result<()> {
    println!("─────────────────────────────────────────");
    println!("Press Enter to show the answer");
    print!("> ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(())
}

fn prompt_rating() -> Result<Rating> {
    loop {
        println!("─────────────────────────────────────────");
        println!("How did you do?");
        println!("  'a' + Enter: again (show it later this sitting)");
        println!("  'g' + Enter: good");
        println!("  'e' + Enter: easy");
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        match input.trim().to_lowercase().as_str() {
            "a" | "again" => return Ok(Rating::Again),
            "g" | "good" => return Ok(Rating::Good),
            "e" | "easy" => return Ok(Rating::Easy),
            other => println!("Unrecognized rating {:?}, try again.", other),
        }
    }
}
