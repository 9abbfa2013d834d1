use serde::{Deserialize, Serialize};

/// Fixed assistant greeting: first seed turn and the sole turn after a reset.
pub const GREETING: &str = "Bonjour! Je suis votre Assistant AI OFPPT. \
    Je suis là pour vous aider avec vos études, \
    répondre à vos questions sur les programmes OFPPT et vous guider. \
    Comment puis-je vous aider aujourd'hui?";

const PROMPT_PREAMBLE: &str = "You are an AI assistant for OFPPT \
    (Office de la Formation Professionnelle et de la Promotion du Travail) students.";
const PROMPT_INSTRUCTION: &str =
    "Please provide a helpful and professional response to the user's last message.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Speaker label used when rendering a transcript into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One message of the transcript. `timestamp` (ms since epoch) doubles as its id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: i64,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp,
        }
    }

    pub fn assistant(content: impl Into<String>, timestamp: i64) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp,
        }
    }

    pub fn greeting(timestamp: i64) -> Self {
        Self::assistant(GREETING, timestamp)
    }
}

/// The example conversation written on first run, anchored a few seconds before `now`.
pub fn seed_conversation(now: i64) -> Vec<ChatTurn> {
    vec![
        ChatTurn::greeting(now - 5000),
        ChatTurn::user(
            "Quels sont les programmes disponibles en développement informatique?",
            now - 4000,
        ),
        ChatTurn::assistant(
            "L'OFPPT propose plusieurs formations en développement informatique :\n\n\
             1. Technicien Spécialisé en Développement Digital (Bac+2)\n\
             2. Développeur Full Stack (Bac+2)\n\
             3. Développeur Mobile (Formation qualifiante)\n\
             4. Développeur .NET (Formation qualifiante)\n\n\
             Chaque programme a ses propres prérequis et durée. \
             Souhaitez-vous des informations détaillées sur l'un de ces programmes?",
            now - 3000,
        ),
        ChatTurn::user(
            "Je suis intéressé par le programme Full Stack. Quels sont les prérequis?",
            now - 2000,
        ),
    ]
}

/// Render the whole transcript into a single completion prompt.
pub fn build_prompt(turns: &[ChatTurn]) -> String {
    let context = turns
        .iter()
        .map(|t| format!("{}: {}", t.role.label(), t.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\nPrevious conversation:\n{}\n\n{}",
        PROMPT_PREAMBLE, context, PROMPT_INSTRUCTION
    )
}
