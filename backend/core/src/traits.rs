use async_trait::async_trait;

use crate::error::SageError;

/// Capability: turn a base64-encoded image into a text transcript.
///
/// Implementations must be safe for concurrent invocation by multiple
/// pipeline runs. An empty or whitespace-only transcript is a valid result
/// meaning "no text found", not a failure.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Provider name (e.g., "baidu").
    fn name(&self) -> &str;

    async fn recognize(&self, image_base64: &str) -> Result<String, SageError>;
}

/// Outcome of an answer generation call. The title is returned as its own
/// field; no formatting conventions of the model response leak past the
/// generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub title: Option<String>,
}

/// Capability: turn a recognized transcript into a generated answer.
///
/// Implementations must be safe for concurrent invocation by multiple
/// pipeline runs.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Provider name (e.g., "deepseek").
    fn name(&self) -> &str;

    async fn generate(&self, text: &str) -> Result<GeneratedAnswer, SageError>;
}

/// A freshly exchanged bearer token and its vendor-reported lifetime.
#[derive(Debug, Clone)]
pub struct ExchangedToken {
    pub secret: String,
    pub expires_in_secs: u64,
}

/// Capability: exchange long-lived credentials for a short-lived bearer
/// token. Injected into the token cache so the exchange wire format stays
/// out of the caching logic.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self) -> Result<ExchangedToken, SageError>;
}
