mod traits;
mod gemini;
mod claude;
mod openai;

pub use traits::*;
pub use gemini::GeminiClient;
pub use claude::ClaudeClient;
pub use openai::OpenAIClient;
