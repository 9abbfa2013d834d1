use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell, RwLock};

use super::turn::{build_prompt, seed_conversation, ChatTurn};
use crate::error::{OfpptError, Result};
use crate::llm::CompletionClient;
use crate::storage::KeyValueStore;

/// Local storage key holding the serialized transcript.
pub const CHAT_HISTORY_KEY: &str = "ofppt_chat_history";

/// Transcript length kept after each generated reply.
pub const MAX_TURNS: usize = 20;

/// Owner of the AI chat transcript.
///
/// Every read and write of chat history goes through this type. The transcript
/// is hydrated from local storage on first use and written back after every
/// mutation. Mutating operations are serialized, so overlapping
/// [`generate_response`](Self::generate_response) calls run one after the other.
///
/// Storage faults are logged and never returned: the in-memory transcript is
/// authoritative once hydrated, even if the stored copy falls behind.
pub struct ConversationStore {
    storage: Arc<dyn KeyValueStore>,
    llm: Arc<dyn CompletionClient>,
    history_key: String,
    max_turns: usize,
    turns: RwLock<Vec<ChatTurn>>,
    ready: OnceCell<()>,
    ops: Mutex<()>,
}

impl ConversationStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, llm: Arc<dyn CompletionClient>) -> Self {
        Self {
            storage,
            llm,
            history_key: CHAT_HISTORY_KEY.to_string(),
            max_turns: MAX_TURNS,
            turns: RwLock::new(Vec::new()),
            ready: OnceCell::new(),
            ops: Mutex::new(()),
        }
    }

    pub fn with_history_key(mut self, key: impl Into<String>) -> Self {
        self.history_key = key.into();
        self
    }

    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max.max(1);
        self
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Whether hydration has completed.
    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    /// Snapshot of the transcript, oldest turn first.
    pub async fn history(&self) -> Vec<ChatTurn> {
        self.ensure_ready().await;
        self.turns.read().await.clone()
    }

    /// Append `user_text`, ask the completion service for a reply, append the
    /// reply and return it.
    ///
    /// On failure the user turn stays in the transcript without an answer and
    /// [`OfpptError::Generation`] is returned, wrapping the completion error.
    /// The transcript is trimmed to the cap only after a successful reply, so
    /// repeated failures can grow it past the cap until the next success.
    pub async fn generate_response(&self, user_text: impl Into<String>) -> Result<String> {
        self.ensure_ready().await;
        let _op = self.ops.lock().await;

        let snapshot = {
            let mut turns = self.turns.write().await;
            let timestamp = next_timestamp(&turns);
            turns.push(ChatTurn::user(user_text, timestamp));
            turns.clone()
        };
        self.persist(&snapshot).await;

        let prompt = build_prompt(&snapshot);
        let reply = match self.llm.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    model = self.llm.model(),
                    "Error generating AI response"
                );
                return Err(OfpptError::Generation(Box::new(e)));
            }
        };

        let snapshot = {
            let mut turns = self.turns.write().await;
            let timestamp = next_timestamp(&turns);
            turns.push(ChatTurn::assistant(reply.clone(), timestamp));
            keep_last(&mut turns, self.max_turns);
            turns.clone()
        };
        self.persist(&snapshot).await;

        Ok(reply)
    }

    /// Remove the turn(s) with `timestamp`. Unknown timestamps are a no-op.
    pub async fn delete_turn(&self, timestamp: i64) {
        self.ensure_ready().await;
        let _op = self.ops.lock().await;

        let snapshot = {
            let mut turns = self.turns.write().await;
            let before = turns.len();
            turns.retain(|t| t.timestamp != timestamp);
            let removed = before - turns.len();
            tracing::debug!(timestamp, removed, "Deleted chat turn");
            turns.clone()
        };
        self.persist(&snapshot).await;
    }

    /// Replace the transcript with a single fresh greeting.
    pub async fn reset_to_greeting(&self) {
        self.ensure_ready().await;
        let _op = self.ops.lock().await;

        let snapshot = {
            let mut turns = self.turns.write().await;
            *turns = vec![ChatTurn::greeting(now_millis())];
            turns.clone()
        };
        self.persist(&snapshot).await;
    }

    async fn ensure_ready(&self) {
        self.ready.get_or_init(|| self.hydrate()).await;
    }

    async fn hydrate(&self) {
        let turns = match self.storage.get(&self.history_key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<ChatTurn>>(&raw) {
                Ok(turns) => {
                    tracing::info!(turns = turns.len(), "Loaded chat history");
                    turns
                }
                Err(e) => {
                    // Corrupt transcripts are replaced by the seed conversation.
                    tracing::warn!(error = %e, "Chat history is malformed, reseeding");
                    let seed = seed_conversation(now_millis());
                    self.persist(&seed).await;
                    seed
                }
            },
            Ok(None) => {
                tracing::info!("No chat history found, seeding example conversation");
                let seed = seed_conversation(now_millis());
                self.persist(&seed).await;
                seed
            }
            Err(e) => {
                // Keep whatever is stored; the next mutation writes through.
                tracing::warn!(error = %e, "Error loading chat history");
                seed_conversation(now_millis())
            }
        };

        *self.turns.write().await = turns;
    }

    /// Write the transcript through to storage. Failures are logged and dropped.
    async fn persist(&self, turns: &[ChatTurn]) {
        let raw = match serde_json::to_string(turns) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Error serializing chat history");
                return;
            }
        };
        if let Err(e) = self.storage.set(&self.history_key, &raw).await {
            tracing::warn!(error = %e, "Error saving chat history");
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Current time, bumped past the newest turn so timestamps stay unique and increasing.
fn next_timestamp(turns: &[ChatTurn]) -> i64 {
    let now = now_millis();
    match turns.iter().map(|t| t.timestamp).max() {
        Some(last) if last >= now => last + 1,
        _ => now,
    }
}

fn keep_last(turns: &mut Vec<ChatTurn>, max: usize) {
    if turns.len() > max {
        let excess = turns.len() - max;
        turns.drain(..excess);
    }
}
