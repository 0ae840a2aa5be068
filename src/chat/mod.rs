//! Assistant conversations: tagged messages, the layered context handed to the
//! model, and a rule-based coach for when no remote assistant is used.
//!
//! Conversations live in memory only and are gone after a restart.

mod center;
mod context;
mod conversation;
mod fallback;

pub use center::{ChatCenter, ChatInputs, ReplyMode};
pub use context::{
    CARRY_OVER_LIMIT, COACH_GUIDELINE, LOADING_TEXT, carry_over_summary, conversation_context,
    error_text, format_timestamp, intro_text, profile_summary,
};
pub use conversation::{ChatConversation, ChatMessage, MessageKind, Sender};
pub use fallback::FallbackCoach;
