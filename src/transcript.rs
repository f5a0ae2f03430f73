use chrono::Local;
use serde::{Deserialize, Serialize};

/// Greeting seeded into every fresh conversation.
pub const WELCOME_TEXT: &str = "**Welcome to LoanNetwork AI**, your mortgage assistant.\n\nI can help you:\n- Analyze mortgage rates across 50+ lenders\n- Calculate personalized eligibility instantly\n- Compare loan products with current data\n- Optimize your mortgage strategy\n\nAsk me anything about home loans.";

/// Shown in place of a reply when the assistant request fails.
pub const FAILURE_NOTICE: &str = "Sorry, something went wrong.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversational turn. The timestamp is display-only, captured at
/// creation and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Some(clock_time()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Some(clock_time()),
        }
    }

    pub fn welcome() -> Self {
        Self::assistant(WELCOME_TEXT)
    }
}

fn clock_time() -> String {
    Local::now().format("%H:%M").to_string()
}

/// Ordered message history. Insertion order is conversation order; messages
/// are never reordered or removed short of a full reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    /// A fresh conversation: exactly the welcome message.
    pub fn welcome() -> Self {
        Self(vec![Message::welcome()])
    }

    pub fn push(&mut self, message: Message) {
        self.0.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True while the conversation holds nothing but the greeting.
    pub fn is_welcome_only(&self) -> bool {
        self.0.len() == 1 && self.0[0].role == Role::Assistant
    }
}
