use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::analyzer::is_schema_rejection;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

const COMPLETIONS_PATH: &str = "/chat/completions";

/// One fully built request body, tried as a unit by [`OpenAiTransport::run_plans`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPlan {
    pub model: String,
    pub body: Value,
}

impl RequestPlan {
    pub fn new(model: impl Into<String>, body: Value) -> Self {
        Self {
            model: model.into(),
            body,
        }
    }
}

/// Which failures allow the driver to move on to the next plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackWhen {
    /// Any non-success HTTP status.
    AnyFailure,
    /// Only a 400 that rejects the structured-output parameter.
    SchemaRejected,
}

impl FallbackWhen {
    fn allows(self, err: &AppError) -> bool {
        match (self, err) {
            (FallbackWhen::AnyFailure, AppError::Network { .. }) => true,
            (FallbackWhen::SchemaRejected, AppError::Network { status, body }) => {
                is_schema_rejection(*status, body)
            }
            _ => false,
        }
    }
}

/// Bearer-authenticated JSON client for an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiTransport {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiTransport {
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(
            client,
            config.base_url.clone(),
            config.api_key.clone(),
        ))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        Self {
            client,
            base_url,
            api_key,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, COMPLETIONS_PATH)
    }

    fn credential(&self) -> AppResult<&str> {
        self.api_key.as_deref().ok_or_else(AppError::missing_api_key)
    }

    async fn post(&self, api_key: &str, body: &Value) -> AppResult<Value> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(AppError::Network {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text)
            .map_err(|err| AppError::parse(format!("response body is not JSON: {err}")))
    }

    /// Tries each plan in order and returns the first successful response body.
    ///
    /// The credential is checked before anything is sent. A failure moves on to
    /// the next plan only when `policy` allows it; otherwise, or once the plans
    /// run out, the error of the first attempt is returned.
    pub async fn run_plans(&self, plans: &[RequestPlan], policy: FallbackWhen) -> AppResult<Value> {
        let api_key = self.credential()?;
        let mut first_error: Option<AppError> = None;

        for (attempt, plan) in plans.iter().enumerate() {
            debug!(model = %plan.model, attempt, "sending OpenAI request");
            match self.post(api_key, &plan.body).await {
                Ok(body) => {
                    if attempt > 0 {
                        info!(model = %plan.model, attempt, "fallback request succeeded");
                    }
                    return Ok(body);
                }
                Err(err) => {
                    let fall_back = policy.allows(&err) && attempt + 1 < plans.len();
                    warn!(model = %plan.model, attempt, error = %err, fall_back, "OpenAI request failed");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                    if !fall_back {
                        break;
                    }
                }
            }
        }

        Err(first_error.unwrap_or_else(|| AppError::parse("no request was attempted")))
    }
}
