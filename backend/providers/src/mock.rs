use std::time::Duration;

use async_trait::async_trait;

use screensage_core::{AnswerGenerator, GeneratedAnswer, SageError, TextRecognizer};

/// A mock recognizer that returns a canned transcript or a canned failure.
/// Used by tests and as the fallback capability when no vendor credentials
/// are configured.
pub struct MockRecognizer {
    outcome: Result<String, String>,
    delay: Option<Duration>,
}

impl MockRecognizer {
    pub fn returning(text: impl Into<String>) -> Self {
        Self {
            outcome: Ok(text.into()),
            delay: None,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            delay: None,
        }
    }

    /// Delay each call, for tests that need to interleave with a run.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl TextRecognizer for MockRecognizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn recognize(&self, _image_base64: &str) -> Result<String, SageError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.outcome {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(SageError::Recognition(message.clone())),
        }
    }
}

/// A mock generator with a canned answer, optional title, or canned failure.
pub struct MockGenerator {
    outcome: Result<GeneratedAnswer, String>,
    delay: Option<Duration>,
}

impl MockGenerator {
    pub fn returning(answer: impl Into<String>) -> Self {
        Self {
            outcome: Ok(GeneratedAnswer {
                answer: answer.into(),
                title: None,
            }),
            delay: None,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            delay: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        if let Ok(generated) = &mut self.outcome {
            generated.title = Some(title.into());
        }
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl AnswerGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, _text: &str) -> Result<GeneratedAnswer, SageError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.outcome {
            Ok(generated) => Ok(generated.clone()),
            Err(message) => Err(SageError::Generation(message.clone())),
        }
    }
}
