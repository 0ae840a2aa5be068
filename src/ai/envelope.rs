use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Pulls the assistant text out of either response envelope:
///
/// - structured output list: `output[0].content[0].text`
/// - choice list: `choices[0].message.content`, a string or a list of parts
pub fn extract_reply_text(response: &Value) -> AppResult<String> {
    if let Some(output) = response.get("output") {
        return output
            .get(0)
            .and_then(|item| item.get("content"))
            .and_then(|content| content.get(0))
            .map(|part| text_of(part.get("text")))
            .ok_or_else(|| AppError::parse("missing assistant message content"));
    }

    if let Some(choices) = response.get("choices") {
        let message = choices
            .get(0)
            .and_then(|choice| choice.get("message"))
            .ok_or_else(|| AppError::parse("missing assistant message"))?;
        return Ok(match message.get("content") {
            Some(Value::Array(parts)) if !parts.is_empty() => text_of(parts[0].get("text")),
            other => text_of(other),
        });
    }

    Err(AppError::parse("Unexpected OpenAI response structure"))
}

fn text_of(value: Option<&Value>) -> String {
    value.and_then(Value::as_str).unwrap_or_default().to_string()
}
