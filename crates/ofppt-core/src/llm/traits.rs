use crate::error::OfpptError;

/// A stateless text-completion service: the whole conversational context
/// travels in `prompt` on every call.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send a prompt and get the generated text back.
    async fn complete(&self, prompt: &str) -> Result<String, OfpptError>;

    /// Model identifier used for requests.
    fn model(&self) -> &str;
}

/// Map a non-success HTTP status to the matching error.
pub(crate) fn status_error(provider: &str, status: reqwest::StatusCode, body: &str) -> OfpptError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        OfpptError::RateLimited
    } else {
        OfpptError::Llm(format!("{} API error ({}): {}", provider, status, body))
    }
}
