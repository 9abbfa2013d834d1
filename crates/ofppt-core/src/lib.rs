pub mod error;
pub mod llm;
pub mod storage;
pub mod chat;
pub mod config;
pub mod profile;
pub mod news;

// Re-export key types
pub use error::{OfpptError, Result};
pub use chat::{ChatTurn, ConversationStore, Role};
pub use llm::CompletionClient;
pub use storage::{DocumentStore, FileStore, KeyValueStore, MemoryStore};
pub use profile::{NewUser, ProfileService, User};
pub use news::{NewsFeed, NewsFilter, NewsItem, NewsType};
pub use config::Settings;
