use uuid::Uuid;

use super::context::{LOADING_TEXT, conversation_context};
use crate::ai::ChatTurn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    /// Speaker label used in transcripts.
    pub fn speaker(self) -> &'static str {
        match self {
            Sender::User => "Du",
            Sender::Assistant => "Begleiter",
        }
    }
}

/// Role of a message inside a conversation. Only `Plain` messages are real
/// conversational turns; everything else is scaffolding shown in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKind {
    Intro,
    History,
    CarryOver,
    Loading,
    Error,
    #[default]
    Plain,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub content: String,
    pub kind: MessageKind,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content, MessageKind::Plain)
    }

    pub fn assistant(content: impl Into<String>, kind: MessageKind) -> Self {
        Self::new(Sender::Assistant, content, kind)
    }

    fn new(sender: Sender, content: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            content: content.into(),
            kind,
        }
    }

    pub fn is_plain(&self) -> bool {
        self.kind == MessageKind::Plain
    }

    pub fn to_turn(&self) -> ChatTurn {
        let content = self.content.trim();
        match self.sender {
            Sender::User => ChatTurn::user(content),
            Sender::Assistant => ChatTurn::assistant(content),
        }
    }
}

/// One in-memory assistant thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatConversation {
    pub fn new(title: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            messages,
        }
    }

    pub fn plain_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|message| message.is_plain())
    }

    pub fn history_turns(&self) -> Vec<ChatTurn> {
        self.plain_messages().map(ChatMessage::to_turn).collect()
    }

    pub fn carry_over(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|message| message.kind == MessageKind::CarryOver)
            .map(|message| message.content.as_str())
    }

    pub fn push_user(&mut self, text: &str) {
        self.messages.push(ChatMessage::user(text));
    }

    /// Drops every History message and appends one freshly built context block.
    pub fn refresh_history_context(&mut self, profile_summary: &str) {
        self.messages.retain(|message| message.kind != MessageKind::History);
        let plain: Vec<&ChatMessage> = self.plain_messages().collect();
        let context = conversation_context(profile_summary, plain);
        self.messages
            .push(ChatMessage::assistant(context, MessageKind::History));
    }

    /// Appends the "thinking" placeholder and returns its id.
    pub fn push_loading(&mut self) -> String {
        let placeholder = ChatMessage::assistant(LOADING_TEXT, MessageKind::Loading);
        let id = placeholder.id.clone();
        self.messages.push(placeholder);
        id
    }

    pub fn is_pending(&self) -> bool {
        self.messages
            .iter()
            .any(|message| message.kind == MessageKind::Loading)
    }

    /// Puts `reply` where the placeholder `loading_id` was, or at the end if it is gone.
    pub fn resolve_pending(&mut self, loading_id: &str, mut reply: ChatMessage) {
        reply.id = loading_id.to_string();
        match self.messages.iter_mut().find(|message| message.id == loading_id) {
            Some(slot) => *slot = reply,
            None => self.messages.push(reply),
        }
    }
}
