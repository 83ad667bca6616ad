//! crates/labsync_core/src/controllers/assistant.rs
//!
//! The chat page. Failures never leave the page: they become an assistant
//! message in the transcript.

use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use super::lock;
use crate::domain::ChatRequest;
use crate::ports::AssistantApi;

pub const GREETING: &str =
    "Hello! I'm your lab assistant. Ask me about experiments, equipment, or lab procedures.";
pub const EMPTY_REPLY: &str = "I couldn't process that.";
pub const ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub content: String,
}

impl ChatMessage {
    fn assistant(content: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug)]
struct Conversation {
    messages: Vec<ChatMessage>,
    sending: bool,
}

pub struct AssistantController {
    api: Arc<dyn AssistantApi>,
    conversation: Mutex<Conversation>,
}

impl AssistantController {
    pub fn new(api: Arc<dyn AssistantApi>) -> Self {
        Self {
            api,
            conversation: Mutex::new(Conversation {
                messages: vec![ChatMessage::assistant(GREETING)],
                sending: false,
            }),
        }
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        lock(&self.conversation).messages.clone()
    }

    pub fn is_sending(&self) -> bool {
        lock(&self.conversation).sending
    }

    /// Sends one question and appends the answer. Returns the appended reply,
    /// or `None` when the input was blank or a reply is still pending.
    pub async fn send(&self, input: &str) -> Option<ChatMessage> {
        let query = input.trim();
        {
            let mut conversation = lock(&self.conversation);
            if query.is_empty() || conversation.sending {
                debug!("Ignoring chat input while blank or busy");
                return None;
            }
            conversation.sending = true;
            conversation.messages.push(ChatMessage {
                speaker: Speaker::User,
                content: query.to_string(),
            });
        }

        let request = ChatRequest {
            query: query.to_string(),
            context: String::new(),
        };
        let reply = match self.api.chat(&request).await {
            Ok(reply) => ChatMessage::assistant(reply.text().unwrap_or(EMPTY_REPLY)),
            Err(err) => {
                error!("Chat request failed: {}", err);
                ChatMessage::assistant(ERROR_REPLY)
            }
        };

        let mut conversation = lock(&self.conversation);
        conversation.messages.push(reply.clone());
        conversation.sending = false;
        Some(reply)
    }
}
