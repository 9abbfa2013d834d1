use serde::{Deserialize, Serialize};

use crate::error::OfpptError;
use crate::llm::traits::*;

/// Client for OpenAI and any OpenAI-compatible chat completions endpoint.
pub struct OpenAIClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com".to_string(),
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
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIRequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct OpenAIRequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[async_trait::async_trait]
impl CompletionClient for OpenAIClient {
    async fn complete(&self, prompt: &str) -> Result<String, OfpptError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request_body = OpenAIRequest {
            model: &self.model,
            messages: vec![OpenAIRequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!(model = %self.model, "Sending OpenAI request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(status_error("OpenAI", status, &response_text));
        }

        let api_response: OpenAIResponse = serde_json::from_str(&response_text)
            .map_err(|e| OfpptError::Llm(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OfpptError::Llm("No response from API".into()))?;

        Ok(choice.message.content.unwrap_or_default())
    }

    fn model(&self) -> &str {
        &self.model
    }
}
