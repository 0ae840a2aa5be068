//! Clients for the external language-model provider.
//!
//! Two contracts sit at this seam:
//!
//! - [`MealAnalyzer`] turns a meal photo into a macro-nutrient estimate
//! - [`ChatAssistant`] turns a conversation into a free-text reply
//!
//! The OpenAI-compatible implementations share one [`OpenAiTransport`] and one
//! request-plan driver ([`OpenAiTransport::run_plans`]) that tries an ordered
//! list of requests and reports the first failure when all of them fail.

mod analyzer;
mod assistant;
mod envelope;
mod transport;

pub use analyzer::{OpenAiMealAnalyzer, is_schema_rejection};
pub use assistant::OpenAiChatAssistant;
pub use envelope::extract_reply_text;
pub use transport::{FallbackWhen, OpenAiTransport, RequestPlan};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppResult;
use crate::types::MealAnalysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role-tagged turn of the literal conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait MealAnalyzer: Send + Sync {
    /// `photo` is base64 JPEG data or a complete `data:` URL.
    async fn analyze(&self, photo: &str) -> AppResult<MealAnalysis>;

    async fn analyze_bytes(&self, jpeg: &[u8]) -> AppResult<MealAnalysis> {
        use base64::Engine as _;
        let encoded = base64::engine::general_purpose::STANDARD.encode(jpeg);
        self.analyze(&encoded).await
    }
}

#[async_trait]
pub trait ChatAssistant: Send + Sync {
    async fn generate_reply(
        &self,
        profile_summary: &str,
        history: &[ChatTurn],
        carry_over: Option<&str>,
    ) -> AppResult<String>;
}
