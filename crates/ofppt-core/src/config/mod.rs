use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::chat::{ConversationStore, CHAT_HISTORY_KEY, MAX_TURNS};
use crate::error::OfpptError;
use crate::llm::{ClaudeClient, CompletionClient, GeminiClient, OpenAIClient};
use crate::storage::{FileDocumentStore, FileStore, KeyValueStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub llm: LlmSettings,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Gemini,
    Claude,
    OpenAI,
}

impl LlmProvider {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "claude" | "anthropic" => Some(Self::Claude),
            "openai" => Some(Self::OpenAI),
            _ => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-pro",
            Self::Claude => "claude-sonnet-4-5-20250929",
            Self::OpenAI => "gpt-4o-mini",
        }
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::Claude => "ANTHROPIC_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    pub max_turns: usize,
    pub history_key: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            max_turns: MAX_TURNS,
            history_key: CHAT_HISTORY_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageSettings {
    /// Overrides the platform data directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let provider = LlmProvider::Gemini;
        Self {
            llm: LlmSettings {
                provider,
                model: provider.default_model().to_string(),
                api_key_env: provider.default_api_key_env().to_string(),
                base_url: None,
                max_tokens: 2048,
            },
            chat: ChatSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ofppt")
            .join("config.toml")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Read settings from `path`, falling back to defaults when the file is
    /// missing or invalid.
    pub fn load_from(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Invalid config, using defaults"
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<(), OfpptError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), OfpptError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| OfpptError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Switch provider, resetting model and key variable to that provider's defaults.
    pub fn set_provider(&mut self, provider: LlmProvider) {
        if self.llm.provider != provider {
            self.llm.provider = provider;
            self.llm.model = provider.default_model().to_string();
            self.llm.api_key_env = provider.default_api_key_env().to_string();
        }
    }

    /// Get the API key from the environment variable specified in settings.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
    }

    pub fn data_dir(&self) -> Result<PathBuf, OfpptError> {
        if let Some(ref dir) = self.storage.data_dir {
            return Ok(dir.clone());
        }
        dirs::data_dir()
            .map(|d| d.join("ofppt"))
            .ok_or_else(|| OfpptError::Config("Could not determine data directory".to_string()))
    }

    /// Build a completion client from the current settings.
    pub fn build_completion_client(&self) -> Result<Box<dyn CompletionClient>, OfpptError> {
        let api_key = self.api_key().ok_or_else(|| {
            OfpptError::Config(format!(
                "API key not set: export {}",
                self.llm.api_key_env
            ))
        })?;

        let client: Box<dyn CompletionClient> = match self.llm.provider {
            LlmProvider::Gemini => {
                let mut c = GeminiClient::new(api_key).with_model(&self.llm.model);
                if let Some(ref url) = self.llm.base_url {
                    c = c.with_base_url(url);
                }
                Box::new(c)
            }
            LlmProvider::Claude => {
                let mut c = ClaudeClient::new(api_key)
                    .with_model(&self.llm.model)
                    .with_max_tokens(self.llm.max_tokens);
                if let Some(ref url) = self.llm.base_url {
                    c = c.with_base_url(url);
                }
                Box::new(c)
            }
            LlmProvider::OpenAI => {
                let mut c = OpenAIClient::new(api_key).with_model(&self.llm.model);
                if let Some(ref url) = self.llm.base_url {
                    c = c.with_base_url(url);
                }
                Box::new(c)
            }
        };
        Ok(client)
    }

    pub fn build_key_value_store(&self) -> Result<FileStore, OfpptError> {
        FileStore::with_dir(self.data_dir()?.join("storage"))
    }

    pub fn build_document_store(&self) -> Result<FileDocumentStore, OfpptError> {
        FileDocumentStore::with_dir(self.data_dir()?.join("documents"))
    }

    /// Wire a conversation store over the given storage and completion client.
    pub fn build_conversation_store(
        &self,
        storage: Arc<dyn KeyValueStore>,
        llm: Arc<dyn CompletionClient>,
    ) -> ConversationStore {
        ConversationStore::new(storage, llm)
            .with_history_key(&self.chat.history_key)
            .with_max_turns(self.chat.max_turns)
    }
}
