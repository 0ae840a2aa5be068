use async_trait::async_trait;
use serde_json::{Value, json};

use super::envelope::extract_reply_text;
use super::transport::{FallbackWhen, OpenAiTransport, RequestPlan};
use super::{ChatAssistant, ChatTurn};
use crate::config::{AppConfig, ModelPair};
use crate::error::{AppError, AppResult};

pub(crate) const ASSISTANT_SYSTEM_PROMPT: &str = "Du bist ein empathischer Ernährungscoach für Familien. Antworte stets auf Deutsch, beziehe die vorhandenen Mahlzeiten- und Profildaten ein und formuliere konkrete, umsetzbare Tipps. Wenn du Nährwerte nennst, liefere sie für die komplette Mahlzeit statt pro 100 g und teile trotz Unsicherheit deine beste Schätzung. Halte den Ton warm, klar und ermutigend.";

const TEMPERATURE: f64 = 0.5;
const MAX_TOKENS: u32 = 600;

/// Chat completion against a primary model with one retry on the secondary.
#[derive(Clone)]
pub struct OpenAiChatAssistant {
    transport: OpenAiTransport,
    models: ModelPair,
}

impl OpenAiChatAssistant {
    pub fn new(transport: OpenAiTransport, models: ModelPair) -> Self {
        Self { transport, models }
    }

    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Ok(Self::new(
            OpenAiTransport::from_config(config)?,
            config.chat_models.clone(),
        ))
    }

    fn plans(&self, messages: &Value) -> Vec<RequestPlan> {
        [&self.models.primary, &self.models.fallback]
            .into_iter()
            .map(|model| {
                RequestPlan::new(
                    model,
                    json!({
                        "model": model,
                        "messages": messages,
                        "temperature": TEMPERATURE,
                        "max_tokens": MAX_TOKENS,
                    }),
                )
            })
            .collect()
    }
}

#[async_trait]
impl ChatAssistant for OpenAiChatAssistant {
    async fn generate_reply(
        &self,
        profile_summary: &str,
        history: &[ChatTurn],
        carry_over: Option<&str>,
    ) -> AppResult<String> {
        let messages = build_messages(profile_summary, history, carry_over);
        let response = self
            .transport
            .run_plans(&self.plans(&messages), FallbackWhen::AnyFailure)
            .await?;
        let reply = extract_reply_text(&response)?.trim().to_string();
        if reply.is_empty() {
            return Err(AppError::parse("Assistant response was empty"));
        }
        Ok(reply)
    }
}

fn build_messages(profile_summary: &str, history: &[ChatTurn], carry_over: Option<&str>) -> Value {
    let mut context = format!("Profilübersicht:\n{profile_summary}");
    if let Some(carry_over) = carry_over.map(str::trim).filter(|c| !c.is_empty()) {
        context.push_str("\n\nWichtige Punkte aus früheren Gesprächen:\n");
        context.push_str(carry_over);
    }

    let mut messages = vec![
        json!({"role": "system", "content": ASSISTANT_SYSTEM_PROMPT}),
        json!({"role": "system", "content": context}),
    ];
    messages.extend(history.iter().map(|turn| json!(turn)));
    Value::Array(messages)
}
