use serde::{Deserialize, Serialize};

use crate::error::OfpptError;
use crate::llm::traits::*;

const API_VERSION: &str = "2023-06-01";

pub struct ClaudeClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl ClaudeClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: "claude-sonnet-4-5-20250929".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 2048,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<MessageBody<'a>>,
}

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClaudeApiResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

impl ClaudeApiResponse {
    fn into_text(self) -> String {
        self.content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("")
    }
}

#[async_trait::async_trait]
impl CompletionClient for ClaudeClient {
    async fn complete(&self, prompt: &str) -> Result<String, OfpptError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![MessageBody {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!(
            model = %self.model,
            max_tokens = self.max_tokens,
            "Sending Anthropic request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(status_error("Claude", status, &response_text));
        }

        let api_response: ClaudeApiResponse = serde_json::from_str(&response_text)
            .map_err(|e| OfpptError::Llm(format!("Failed to parse response: {e}")))?;
        Ok(api_response.into_text())
    }

    fn model(&self) -> &str {
        &self.model
    }
}
