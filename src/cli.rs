use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::gateway::{Gateway, GatewayError};
use crate::models::CardFormData;
use crate::storage::StorageError;
use crate::store::CardStore;
use crate::tui::app::{EMPTY_TOPIC_MESSAGE, GENERATION_FAILED_MESSAGE, NO_CARDS_MESSAGE};

#[derive(Parser)]
#[command(name = "flashdeck")]
#[command(about = "Flashcards in the terminal, with AI-generated decks")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/storage)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch interactive TUI (default if no subcommand)
    Tui,
    /// Add a card
    Add {
        /// Front side
        question: String,
        /// Back side
        answer: String,
    },
    /// Print every card, newest first
    List,
    /// Generate cards about a topic and add them to the deck
    Generate {
        /// Topic or subject
        topic: String,
        /// Number of cards to request (3, 5 or 10)
        #[arg(long, value_parser = parse_count)]
        count: Option<usize>,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
    #[error("{0}")]
    InvalidCard(String),
    #[error("{0}")]
    Generation(String),
}

fn parse_count(value: &str) -> Result<usize, String> {
    let count: usize = value.parse().map_err(|_| format!("'{}' is not a number", value))?;
    if crate::config::GENERATION_COUNTS.contains(&count) {
        Ok(count)
    } else {
        Err(format!("count must be one of {:?}", crate::config::GENERATION_COUNTS))
    }
}

/// Handle the add command
pub fn handle_add(question: String, answer: String, store: &mut CardStore) -> Result<(), CliError> {
    let data = CardFormData::new(question, answer);
    data.validate().map_err(CliError::InvalidCard)?;
    let card = store.add(data)?;
    println!("Card created successfully (ID: {})", card.id);
    Ok(())
}

/// Handle the list command
pub fn handle_list(store: &CardStore) {
    if store.is_empty() {
        println!("No cards.");
        return;
    }
    for (i, card) in store.cards().iter().enumerate() {
        println!("{}. {}\n   {}", i + 1, card.question, card.answer);
    }
}

/// Handle the generate command; reports the same messages as the generator view
pub fn handle_generate(
    topic: String,
    count: usize,
    gateway: &Gateway,
    store: &mut CardStore,
) -> Result<(), CliError> {
    if topic.trim().is_empty() {
        return Err(CliError::Generation(EMPTY_TOPIC_MESSAGE.to_string()));
    }
    let cards = gateway.generate(&topic, count).map_err(|e: GatewayError| {
        tracing::error!("generation failed: {}", e);
        CliError::Generation(GENERATION_FAILED_MESSAGE.to_string())
    })?;
    if cards.is_empty() {
        return Err(CliError::Generation(NO_CARDS_MESSAGE.to_string()));
    }
    let added = store.bulk_add(cards)?;
    println!("Added {} cards about \"{}\"", added, topic.trim());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GenerationRequest, GenerationService};
    use crate::storage::MemoryRepository;

    struct Reply(&'static str);

    impl GenerationService for Reply {
        fn complete(&self, _request: &GenerationRequest) -> Result<String, GatewayError> {
            Ok(self.0.to_string())
        }
    }

    fn store() -> CardStore {
        CardStore::open(Box::new(MemoryRepository::new())).unwrap()
    }

    #[test]
    fn test_parse_count_accepts_offered_counts() {
        assert_eq!(parse_count("10"), Ok(10));
        assert!(parse_count("4").is_err());
        assert!(parse_count("ten").is_err());
    }

    #[test]
    fn test_add_rejects_blank_answer() {
        let mut store = store();
        let err = handle_add("Q".to_string(), "  ".to_string(), &mut store).unwrap_err();
        assert_eq!(err.to_string(), "Answer is required");
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_generate_adds_cards() {
        let mut store = store();
        let gateway = Gateway::new(Box::new(Reply(r#"[{"question":"Q1","answer":"A1"}]"#)));
        handle_generate("Rust".to_string(), 3, &gateway, &mut store).unwrap();
        assert_eq!(store.cards()[0].question, "Q1");
    }

    #[test]
    fn test_generate_with_no_cards_reports_message() {
        let mut store = store();
        let gateway = Gateway::new(Box::new(Reply("not json")));
        let err = handle_generate("Rust".to_string(), 3, &gateway, &mut store).unwrap_err();
        assert_eq!(err.to_string(), NO_CARDS_MESSAGE);
        assert_eq!(store.len(), 3);
    }
}
