pub mod cli;
pub mod config;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod storage;
pub mod store;
pub mod tui;
pub mod utils;

pub use config::Config;
pub use gateway::{Gateway, GeminiService};
pub use models::{CardFormData, Flashcard, GeneratedCard};
pub use storage::{CardRepository, SqliteRepository};
pub use store::CardStore;
pub use utils::Profile;
