use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: i64, // milliseconds since the Unix epoch
}

/// The only shape the card editor can submit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFormData {
    pub question: String,
    pub answer: String,
}

/// A card as returned by the generation service, before it gets an id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCard {
    pub question: Option<String>,
    pub answer: Option<String>,
}

impl Flashcard {
    pub fn new(question: String, answer: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            question,
            answer,
            tags: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn from_form(data: CardFormData) -> Self {
        Self::new(data.question, data.answer)
    }

    /// Missing fields become empty strings
    pub fn from_generated(card: GeneratedCard) -> Self {
        Self::new(
            card.question.unwrap_or_default(),
            card.answer.unwrap_or_default(),
        )
    }
}

impl CardFormData {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Both sides must contain something other than whitespace
    pub fn validate(&self) -> Result<(), String> {
        if self.question.trim().is_empty() {
            return Err("Question is required".to_string());
        }
        if self.answer.trim().is_empty() {
            return Err("Answer is required".to_string());
        }
        Ok(())
    }
}

/// Cards shown when nothing has been stored yet
pub fn seed_cards() -> Vec<Flashcard> {
    let now = chrono::Utc::now().timestamp_millis();
    let seed = |id: &str, question: &str, answer: &str| Flashcard {
        id: id.to_string(),
        question: question.to_string(),
        answer: answer.to_string(),
        tags: None,
        created_at: now,
    };
    vec![
        seed("1", "What is the capital of France?", "Paris"),
        seed(
            "2",
            "What is React?",
            "A JavaScript library for building user interfaces.",
        ),
        seed(
            "3",
            "Define \"Closure\" in JavaScript.",
            "A function that remembers its outer variables even after the outer function has finished executing.",
        ),
    ]
}
