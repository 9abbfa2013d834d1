mod turn;
mod store;

pub use turn::{build_prompt, seed_conversation, ChatTurn, Role, GREETING};
pub use store::{ConversationStore, CHAT_HISTORY_KEY, MAX_TURNS};
