use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::envelope::extract_reply_text;
use super::transport::{FallbackWhen, OpenAiTransport, RequestPlan};
use super::MealAnalyzer;
use crate::config::{AppConfig, ModelPair};
use crate::error::{AppError, AppResult};
use crate::storage::number_field;
use crate::types::MealAnalysis;

const STRUCTURED_SYSTEM_PROMPT: &str = "You are a pediatric nutrition assistant. Return concise kid-friendly meal descriptions and macro nutrients in grams.";
const LEGACY_SYSTEM_PROMPT: &str = "You are a pediatric nutrition assistant. Respond with minified JSON containing a description string and macros object with fatGrams, carbGrams, and proteinGrams in grams.";
const ANALYSIS_PROMPT: &str = "Analyze the provided meal photo and estimate macro nutrients in grams.";

const SCHEMA_REJECTION_PHRASES: [&str; 6] = [
    "response_format",
    "response format",
    "json_schema",
    "unknown parameter",
    "unsupported",
    "text.format",
];

/// True when a 400 response rejects the structured-output parameter.
pub fn is_schema_rejection(status: u16, body: &str) -> bool {
    if status != 400 {
        return false;
    }
    let body = body.to_lowercase();
    SCHEMA_REJECTION_PHRASES
        .iter()
        .any(|phrase| body.contains(phrase))
}

/// Photo analysis via schema-constrained JSON, with one legacy retry when the
/// provider refuses the schema.
#[derive(Clone)]
pub struct OpenAiMealAnalyzer {
    transport: OpenAiTransport,
    models: ModelPair,
}

impl OpenAiMealAnalyzer {
    pub fn new(transport: OpenAiTransport, models: ModelPair) -> Self {
        Self { transport, models }
    }

    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Ok(Self::new(
            OpenAiTransport::from_config(config)?,
            config.analysis_models.clone(),
        ))
    }

    fn plans(&self, photo: &str) -> Vec<RequestPlan> {
        let image_url = data_url(photo);
        vec![
            RequestPlan::new(
                &self.models.primary,
                json!({
                    "model": self.models.primary,
                    "messages": messages(STRUCTURED_SYSTEM_PROMPT, &image_url),
                    "response_format": {
                        "type": "json_schema",
                        "json_schema": {
                            "name": "meal_analysis",
                            "schema": analysis_schema(),
                        },
                    },
                }),
            ),
            RequestPlan::new(
                &self.models.fallback,
                json!({
                    "model": self.models.fallback,
                    "messages": messages(LEGACY_SYSTEM_PROMPT, &image_url),
                }),
            ),
        ]
    }
}

#[async_trait]
impl MealAnalyzer for OpenAiMealAnalyzer {
    async fn analyze(&self, photo: &str) -> AppResult<MealAnalysis> {
        let response = self
            .transport
            .run_plans(&self.plans(photo), FallbackWhen::SchemaRejected)
            .await?;
        let text = extract_reply_text(&response)?;
        let analysis = parse_analysis(&text)?;
        debug!(description = %analysis.description, "meal photo analysed");
        Ok(analysis)
    }
}

fn data_url(photo: &str) -> String {
    let photo = photo.trim();
    if photo.starts_with("data:") {
        photo.to_string()
    } else {
        format!("data:image/jpeg;base64,{photo}")
    }
}

fn messages(system_prompt: &str, image_url: &str) -> Value {
    json!([
        {"role": "system", "content": system_prompt},
        {
            "role": "user",
            "content": [
                {"type": "input_text", "text": ANALYSIS_PROMPT},
                {"type": "input_image", "image_url": {"url": image_url}},
            ],
        },
    ])
}

fn analysis_schema() -> Value {
    let grams = |description: &str| json!({"type": "number", "description": description});
    json!({
        "type": "object",
        "properties": {
            "description": {"type": "string"},
            "macros": {
                "type": "object",
                "properties": {
                    "fatGrams": grams("Total fat in grams"),
                    "carbGrams": grams("Total carbohydrates in grams"),
                    "proteinGrams": grams("Total protein in grams"),
                },
                "required": ["fatGrams", "carbGrams", "proteinGrams"],
            },
        },
        "required": ["description", "macros"],
    })
}

/// Parses the model's JSON payload. Gram fields may be numbers or numeric
/// strings; anything else reads as 0.
pub(crate) fn parse_analysis(text: &str) -> AppResult<MealAnalysis> {
    let payload = strip_code_fence(text);
    if payload.is_empty() {
        return Err(AppError::parse("analysis response was empty"));
    }
    let value: Value = serde_json::from_str(payload)
        .map_err(|err| AppError::parse(format!("analysis is not valid JSON: {err}")))?;
    if !value.is_object() {
        return Err(AppError::parse("analysis is not a JSON object"));
    }

    let macros = value.get("macros");
    let grams = |key: &str| macros.map(|m| number_field(m, key)).unwrap_or(0.0);
    Ok(MealAnalysis {
        description: value
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        fat_grams: grams("fatGrams"),
        carb_grams: grams("carbGrams"),
        protein_grams: grams("proteinGrams"),
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string (e.g. "json") on the opening line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
