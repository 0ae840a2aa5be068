use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, warn};

use super::context::{carry_over_summary, error_text, intro_text, profile_summary};
use super::conversation::{ChatConversation, ChatMessage, MessageKind};
use super::fallback::FallbackCoach;
use crate::ai::ChatAssistant;
use crate::types::{MealEntry, UserProfile};

/// Where replies come from.
#[derive(Clone)]
pub enum ReplyMode {
    Remote(Arc<dyn ChatAssistant>),
    RuleBased(FallbackCoach),
}

/// Data the context is built from at the moment of a call.
#[derive(Clone, Copy)]
pub struct ChatInputs<'a> {
    pub profile: &'a UserProfile,
    pub meals: &'a [MealEntry],
    pub now: OffsetDateTime,
}

impl<'a> ChatInputs<'a> {
    pub fn new(profile: &'a UserProfile, meals: &'a [MealEntry]) -> Self {
        Self {
            profile,
            meals,
            now: OffsetDateTime::now_utc(),
        }
    }

    pub fn at(mut self, now: OffsetDateTime) -> Self {
        self.now = now;
        self
    }
}

#[derive(Default)]
struct CenterState {
    // newest first
    conversations: Vec<ChatConversation>,
    created: u32,
    active: Option<String>,
}

/// In-memory set of conversations plus the send pipeline.
pub struct ChatCenter {
    mode: ReplyMode,
    offset: UtcOffset,
    state: Mutex<CenterState>,
}

impl ChatCenter {
    pub fn new(mode: ReplyMode, offset: UtcOffset) -> Self {
        Self {
            mode,
            offset,
            state: Mutex::new(CenterState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, CenterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn summary(&self, inputs: &ChatInputs<'_>) -> String {
        profile_summary(inputs.profile, inputs.meals, inputs.now, self.offset)
    }

    /// Starts a conversation with an intro and, when earlier chats had turns,
    /// a carry-over of their last messages. The new one becomes active.
    pub fn create_conversation(&self, inputs: &ChatInputs<'_>) -> ChatConversation {
        let summary = self.summary(inputs);
        let mut state = self.state();

        let mut messages = vec![ChatMessage::assistant(intro_text(&summary), MessageKind::Intro)];
        if let Some(carry_over) = carry_over_summary(state.conversations.iter().rev()) {
            messages.push(ChatMessage::assistant(carry_over, MessageKind::CarryOver));
        }

        state.created += 1;
        let conversation = ChatConversation::new(format!("Chat {}", state.created), messages);
        state.active = Some(conversation.id.clone());
        state.conversations.insert(0, conversation.clone());
        debug!(conversation = %conversation.id, title = %conversation.title, "conversation created");
        conversation
    }

    /// Returns the active conversation id, creating the first conversation if none exists.
    pub fn open(&self, inputs: &ChatInputs<'_>) -> String {
        {
            let mut state = self.state();
            if let Some(first) = state.conversations.first().map(|c| c.id.clone()) {
                return state.active.get_or_insert(first).clone();
            }
        }
        self.create_conversation(inputs).id
    }

    pub fn conversations(&self) -> Vec<ChatConversation> {
        self.state().conversations.clone()
    }

    pub fn conversation(&self, id: &str) -> Option<ChatConversation> {
        self.state().conversations.iter().find(|c| c.id == id).cloned()
    }

    pub fn active_id(&self) -> Option<String> {
        self.state().active.clone()
    }

    pub fn set_active(&self, id: &str) -> bool {
        let mut state = self.state();
        let known = state.conversations.iter().any(|c| c.id == id);
        if known {
            state.active = Some(id.to_string());
        }
        known
    }

    /// Rebuilds the History context block of `id` without adding a turn.
    pub fn refresh_context(&self, id: &str, inputs: &ChatInputs<'_>) -> bool {
        let summary = self.summary(inputs);
        let mut state = self.state();
        match state.conversations.iter_mut().find(|c| c.id == id) {
            Some(conversation) => {
                conversation.refresh_history_context(&summary);
                true
            }
            None => false,
        }
    }

    /// Appends the user's turn, asks for a reply and puts it where the loading
    /// placeholder was. Failures end up as an Error message, never as `Err`.
    ///
    /// Returns the resolved reply, or `None` for blank text or an unknown id.
    pub async fn send_message(
        &self,
        id: &str,
        text: &str,
        inputs: &ChatInputs<'_>,
    ) -> Option<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let summary = self.summary(inputs);

        let (loading_id, turns, carry_over) = {
            let mut state = self.state();
            let conversation = state.conversations.iter_mut().find(|c| c.id == id)?;
            conversation.push_user(text);
            conversation.refresh_history_context(&summary);
            let loading_id = conversation.push_loading();
            (
                loading_id,
                conversation.history_turns(),
                conversation.carry_over().map(str::to_owned),
            )
        };
        debug!(conversation = %id, turns = turns.len(), "sending chat message");

        let reply = match &self.mode {
            ReplyMode::Remote(assistant) => {
                match assistant
                    .generate_reply(&summary, &turns, carry_over.as_deref())
                    .await
                {
                    Ok(reply) => ChatMessage::assistant(reply.trim(), MessageKind::Plain),
                    Err(err) => {
                        warn!(conversation = %id, error = %err, "assistant reply failed");
                        ChatMessage::assistant(error_text(&err.user_message()), MessageKind::Error)
                    }
                }
            }
            ReplyMode::RuleBased(coach) => {
                let today = inputs.now.to_offset(self.offset).date();
                ChatMessage::assistant(coach.reply(text, inputs.meals, today), MessageKind::Plain)
            }
        };

        let mut state = self.state();
        let conversation = state.conversations.iter_mut().find(|c| c.id == id)?;
        conversation.resolve_pending(&loading_id, reply);
        conversation
            .messages
            .iter()
            .find(|message| message.id == loading_id)
            .cloned()
    }
}
