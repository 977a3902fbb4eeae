use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use screensage_core::{AnswerGenerator, GeneratedAnswer, SageError};

const CHAT_ENDPOINT: &str = "https://api.deepseek.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "deepseek-chat";

/// Answer returned without calling the API when recognition found no text.
const NO_TEXT_ANSWER: &str = "No text was recognized in this screenshot.";

const SYSTEM_PROMPT: &str = "You are ScreenSage, an assistant that answers the question shown \
in a screen capture transcript. Reply with a single JSON object of the form \
{\"answer\": \"...\", \"title\": \"...\"} where answer addresses the transcript and title is a \
short label (a few words) for the capture. Reply with the JSON object only.";

/// DeepSeek chat-completions client implementing the answer-generation
/// capability. The answer/title contract is owned here: the model is asked
/// for a JSON object and the reply is parsed back into structured fields,
/// so no response-formatting convention leaks into the pipeline.
pub struct DeepSeekProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl DeepSeekProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: CHAT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct AnswerPayload {
    answer: String,
    #[serde(default)]
    title: Option<String>,
}

/// Parse the model reply, tolerating fenced JSON; a reply that is not the
/// requested object is kept verbatim as the answer with no title.
fn parse_answer(content: &str) -> GeneratedAnswer {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    match serde_json::from_str::<AnswerPayload>(trimmed) {
        Ok(payload) => GeneratedAnswer {
            answer: payload.answer,
            title: payload.title.filter(|t| !t.trim().is_empty()),
        },
        Err(_) => GeneratedAnswer {
            answer: content.trim().to_string(),
            title: None,
        },
    }
}

#[async_trait]
impl AnswerGenerator for DeepSeekProvider {
    fn name(&self) -> &str {
        "deepseek"
    }

    async fn generate(&self, text: &str) -> Result<GeneratedAnswer, SageError> {
        if text.trim().is_empty() {
            return Ok(GeneratedAnswer {
                answer: NO_TEXT_ANSWER.to_string(),
                title: None,
            });
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": text }
            ],
            "temperature": 0.3
        });

        debug!(model = %self.model, "sending transcript to DeepSeek");
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SageError::Generation(format!("DeepSeek request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SageError::Generation(format!(
                "DeepSeek returned {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| SageError::Generation(format!("malformed DeepSeek response: {}", e)))?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();
        Ok(parse_answer(&content))
    }
}
