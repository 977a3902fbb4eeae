use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use screensage_core::{ExchangedToken, SageError, TextRecognizer, TokenExchanger};

use crate::token::TokenCache;

const OCR_ENDPOINT: &str = "https://aip.baidubce.com/rest/2.0/ocr/v1/general_basic";
const TOKEN_ENDPOINT: &str = "https://aip.baidubce.com/oauth/2.0/token";

/// Exchanges a Baidu API key pair for a short-lived access token via the
/// OAuth `client_credentials` grant.
pub struct BaiduTokenExchanger {
    client: Client,
    api_key: String,
    secret_key: String,
    token_url: String,
}

impl BaiduTokenExchanger {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            token_url: TOKEN_ENDPOINT.to_string(),
        }
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
    error_description: Option<String>,
}

#[async_trait]
impl TokenExchanger for BaiduTokenExchanger {
    async fn exchange(&self) -> Result<ExchangedToken, SageError> {
        let url = format!(
            "{}?grant_type=client_credentials&client_id={}&client_secret={}",
            self.token_url, self.api_key, self.secret_key
        );
        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SageError::Credential(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SageError::Credential(format!("malformed token response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(SageError::Credential(format!(
                "{}: {}",
                error,
                body.error_description.unwrap_or_default()
            )));
        }
        let secret = body.access_token.ok_or_else(|| {
            SageError::Credential(format!("token response missing access_token ({})", status))
        })?;
        Ok(ExchangedToken {
            secret,
            expires_in_secs: body.expires_in.unwrap_or(0),
        })
    }
}

/// Baidu general-purpose OCR client.
pub struct BaiduOcrProvider {
    client: Client,
    tokens: TokenCache,
    endpoint: String,
}

impl BaiduOcrProvider {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        let exchanger = BaiduTokenExchanger::new(api_key, secret_key);
        Self::with_exchanger(Arc::new(exchanger))
    }

    /// Build against a custom token exchanger (tests, alternate endpoints).
    pub fn with_exchanger(exchanger: Arc<dyn TokenExchanger>) -> Self {
        Self {
            client: Client::new(),
            tokens: TokenCache::new(exchanger),
            endpoint: OCR_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }
}

#[derive(Deserialize)]
struct OcrResponse {
    #[serde(default)]
    words_result: Vec<WordsResult>,
    error_code: Option<i64>,
    error_msg: Option<String>,
}

#[derive(Deserialize)]
struct WordsResult {
    words: String,
}

fn joined_transcript(response: &OcrResponse) -> String {
    response
        .words_result
        .iter()
        .map(|line| line.words.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl TextRecognizer for BaiduOcrProvider {
    fn name(&self) -> &str {
        "baidu"
    }

    async fn recognize(&self, image_base64: &str) -> Result<String, SageError> {
        let token = self.tokens.get_token().await?;
        let url = format!("{}?access_token={}", self.endpoint, token);

        let response = self
            .client
            .post(&url)
            .form(&[("image", image_base64), ("language_type", "CHN_ENG")])
            .send()
            .await
            .map_err(|e| SageError::Recognition(format!("OCR request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SageError::Recognition(format!(
                "OCR endpoint returned {}: {}",
                status, body
            )));
        }

        let body: OcrResponse = response
            .json()
            .await
            .map_err(|e| SageError::Recognition(format!("malformed OCR response: {}", e)))?;

        if let Some(code) = body.error_code {
            return Err(SageError::Recognition(format!(
                "{} (error {})",
                body.error_msg.unwrap_or_default(),
                code
            )));
        }

        let transcript = joined_transcript(&body);
        debug!(lines = body.words_result.len(), "OCR transcript assembled");
        Ok(transcript)
    }
}
