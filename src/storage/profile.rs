use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use time::Date;
use time::format_description::FormatItem;
use time::macros::format_description;
use tracing::{debug, warn};

use super::{ProfileRepository, read_document, string_field, write_atomic};
use crate::error::{AppError, AppResult};
use crate::types::{Gender, UserProfile};

const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// User profile stored as one flat JSON object.
#[derive(Clone, Debug)]
pub struct JsonProfileStore {
    path: PathBuf,
}

#[derive(Serialize)]
struct ProfileDocument<'a> {
    name: &'a str,
    birthday: Option<String>,
    gender: &'static str,
    diagnosis: &'a str,
}

impl JsonProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ProfileRepository for JsonProfileStore {
    async fn read(&self) -> AppResult<Option<UserProfile>> {
        let Some(document) = read_document(&self.path).await? else {
            return Ok(None);
        };
        if !document.is_object() {
            warn!(path = %self.path.display(), "profile document is not an object");
            return Ok(None);
        }
        Ok(Some(profile_from_value(&document)))
    }

    async fn write(&self, profile: &UserProfile) -> AppResult<()> {
        let birthday = profile
            .birthday
            .map(|date| date.format(ISO_DATE))
            .transpose()
            .map_err(|err| AppError::storage(&self.path, std::io::Error::other(err)))?;
        let document = ProfileDocument {
            name: &profile.name,
            birthday,
            gender: profile.gender.name(),
            diagnosis: &profile.diagnosis,
        };
        let payload = serde_json::to_vec(&document)
            .map_err(|err| AppError::storage(&self.path, std::io::Error::other(err)))?;
        write_atomic(&self.path, &payload).await?;
        debug!(path = %self.path.display(), "saved user profile");
        Ok(())
    }
}

fn profile_from_value(document: &Value) -> UserProfile {
    let birthday = document
        .get("birthday")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| match Date::parse(raw, ISO_DATE) {
            Ok(date) => Some(date),
            Err(err) => {
                warn!(raw, error = %err, "ignoring unparseable birthday");
                None
            }
        });

    let gender = document
        .get("gender")
        .and_then(Value::as_str)
        .map(Gender::from_name)
        .unwrap_or_default();

    UserProfile {
        name: string_field(document, "name"),
        birthday,
        gender,
        diagnosis: string_field(document, "diagnosis"),
    }
}
