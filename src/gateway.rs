use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AiConfig;
use crate::models::GeneratedCard;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_API_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("unexpected response envelope: {0}")]
    Envelope(#[from] serde_json::Error),
}

/// What to ask the text-generation service for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub count: usize,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, count: usize) -> Self {
        Self {
            topic: topic.into(),
            count,
        }
    }

    pub fn prompt(&self) -> String {
        format!(
            "Generate {} flashcards about the following topic: {}. Focus on key concepts, definitions, and important facts.",
            self.count, self.topic
        )
    }
}

/// A text-generation backend. Returns the raw response text, which is
/// expected to be a JSON array of `{question, answer}` objects.
pub trait GenerationService {
    fn complete(&self, request: &GenerationRequest) -> Result<String, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, empty if there are none
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Gemini `generateContent` over blocking HTTP
pub struct GeminiService {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    api_endpoint: String,
}

impl GeminiService {
    pub fn from_config(config: &AiConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());

        Self {
            client,
            // A missing key is sent as-is and rejected by the service
            api_key: config.resolve_api_key().unwrap_or_default(),
            model: config.model.clone(),
            api_endpoint: config.api_endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_endpoint, self.model)
    }

    /// Request body constraining the output to an array of question/answer objects
    pub fn request_body(request: &GenerationRequest) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt() }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "question": {
                                "type": "STRING",
                                "description": "A clear, concise question or term for the front of the flashcard."
                            },
                            "answer": {
                                "type": "STRING",
                                "description": "The corresponding answer or definition for the back of the flashcard."
                            }
                        },
                        "required": ["question", "answer"]
                    }
                }
            }
        })
    }
}

impl GenerationService for GeminiService {
    fn complete(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        let url = self.url();
        info!(model = %self.model, count = request.count, "requesting flashcard generation");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(request))
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            tracing::error!(?status, "generation request rejected");
            return Err(GatewayError::HttpStatus { status, body });
        }

        let bytes = resp.bytes()?;
        let envelope: GenerateContentResponse = serde_json::from_slice(&bytes)?;
        Ok(envelope.text())
    }
}

/// Parse the service's text into partial cards.
///
/// Never fails: anything other than a JSON array yields an empty list, so
/// malformed output is indistinguishable from "no cards".
pub fn parse_generated_cards(text: &str) -> Vec<GeneratedCard> {
    let value: serde_json::Value = match serde_json::from_str(text.trim()) {
        Ok(value) => value,
        Err(e) => {
            warn!("failed to parse generation response: {}", e);
            return Vec::new();
        }
    };

    let Some(items) = value.as_array() else {
        warn!("generation response is not a JSON array");
        return Vec::new();
    };

    items
        .iter()
        .map(|item| GeneratedCard {
            question: item.get("question").and_then(|v| v.as_str()).map(str::to_string),
            answer: item.get("answer").and_then(|v| v.as_str()).map(str::to_string),
        })
        .collect()
}

/// Stateless front door for card generation: one request per call, no
/// retry, no caching.
pub struct Gateway {
    service: Box<dyn GenerationService>,
}

impl Gateway {
    pub fn new(service: Box<dyn GenerationService>) -> Self {
        Self { service }
    }

    pub fn generate(&self, topic: &str, count: usize) -> Result<Vec<GeneratedCard>, GatewayError> {
        let request = GenerationRequest::new(topic, count);
        let text = self.service.complete(&request)?;
        let cards = parse_generated_cards(&text);
        info!(requested = count, received = cards.len(), "generation finished");
        Ok(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct ScriptedService {
        reply: Result<String, u16>,
        calls: Cell<usize>,
        last_request: RefCell<Option<GenerationRequest>>,
    }

    impl ScriptedService {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                calls: Cell::new(0),
                last_request: RefCell::new(None),
            }
        }
    }

    impl GenerationService for Rc<ScriptedService> {
        fn complete(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
            self.calls.set(self.calls.get() + 1);
            *self.last_request.borrow_mut() = Some(request.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(code) => Err(GatewayError::HttpStatus {
                    status: reqwest::StatusCode::from_u16(*code).unwrap(),
                    body: String::new(),
                }),
            }
        }
    }

    #[test]
    fn test_parse_valid_array() {
        let cards = parse_generated_cards(
            r#"  [{"question":"Q1","answer":"A1"},{"question":"Q2","answer":"A2"}]
            "#,
        );
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[1].question.as_deref(), Some("Q2"));
        assert_eq!(cards[1].answer.as_deref(), Some("A2"));
    }

    #[test]
    fn test_parse_invalid_json_is_empty() {
        assert!(parse_generated_cards("[{\"question\": ").is_empty());
        assert!(parse_generated_cards("").is_empty());
    }

    #[test]
    fn test_parse_non_array_is_empty() {
        assert!(parse_generated_cards(r#"{"question":"Q","answer":"A"}"#).is_empty());
    }

    #[test]
    fn test_parse_keeps_elements_with_missing_fields() {
        let cards = parse_generated_cards(r#"[{"question":"Q"}, 7]"#);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].answer, None);
        assert_eq!(cards[1], GeneratedCard::default());
    }

    #[test]
    fn test_generate_sends_topic_and_count_every_time() {
        let service = Rc::new(ScriptedService::replying(r#"[{"question":"Q","answer":"A"}]"#));
        let gateway = Gateway::new(Box::new(service.clone()));

        assert_eq!(gateway.generate("Algebra", 3).unwrap().len(), 1);
        assert_eq!(gateway.generate("Algebra", 3).unwrap().len(), 1);
        assert_eq!(service.calls.get(), 2);
        assert_eq!(
            service.last_request.borrow().clone(),
            Some(GenerationRequest::new("Algebra", 3))
        );
    }

    #[test]
    fn test_generate_propagates_service_failure() {
        let service = Rc::new(ScriptedService {
            reply: Err(401),
            calls: Cell::new(0),
            last_request: RefCell::new(None),
        });
        let gateway = Gateway::new(Box::new(service.clone()));
        assert!(matches!(
            gateway.generate("Algebra", 3),
            Err(GatewayError::HttpStatus { .. })
        ));
        assert_eq!(service.calls.get(), 1);
    }

    #[test]
    fn test_prompt_embeds_topic_and_count() {
        let prompt = GenerationRequest::new("Photosynthesis", 5).prompt();
        assert!(prompt.starts_with("Generate 5 flashcards"));
        assert!(prompt.contains("Photosynthesis"));
    }

    #[test]
    fn test_request_body_constrains_output_schema() {
        let body = GeminiService::request_body(&GenerationRequest::new("Rust", 10));
        let config = &body["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"]["type"], "ARRAY");
        assert_eq!(
            config["responseSchema"]["items"]["required"],
            serde_json::json!(["question", "answer"])
        );
    }

    #[test]
    fn test_envelope_text_concatenates_first_candidate_parts() {
        let envelope: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"[{\"question\":"},{"text":"\"Q\",\"answer\":\"A\"}]"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parse_generated_cards(&envelope.text()).len(), 1);

        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.text(), "");
    }
}
