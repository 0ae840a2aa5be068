//! Flat-file JSON persistence for meals and the user profile.
//!
//! Each store owns exactly one document inside the app data directory. Reads are
//! tolerant (missing, blank or corrupt documents read as empty) while writes are
//! all-or-nothing: the payload goes to a sibling temp file that is renamed over
//! the target.

mod meals;
mod profile;

pub use meals::JsonMealStore;
pub use profile::JsonProfileStore;

use async_trait::async_trait;
use serde_json::Value;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::types::{MealEntry, UserProfile};

pub const MEALS_FILE: &str = "meals.json";
pub const PROFILE_FILE: &str = "user_configuration.json";

/// Durable home of the meal collection.
#[async_trait]
pub trait MealRepository: Send + Sync {
    async fn read_all(&self) -> AppResult<Vec<MealEntry>>;

    /// Replaces the whole collection.
    async fn write_all(&self, meals: &[MealEntry]) -> AppResult<()>;
}

/// Durable home of the single user profile.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn read(&self) -> AppResult<Option<UserProfile>>;

    async fn write(&self, profile: &UserProfile) -> AppResult<()>;
}

/// Reads and parses a JSON document. `None` for a missing, blank or unparseable file.
pub(crate) async fn read_document(path: &Path) -> AppResult<Option<Value>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
            warn!(path = %path.display(), error = %err, "ignoring document that is not valid UTF-8");
            return Ok(None);
        }
        Err(err) => return Err(AppError::storage(path, err)),
    };

    if content.trim().is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Value>(&content) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unreadable document");
            Ok(None)
        }
    }
}

/// Writes `payload` to `path` through a temp file + rename.
pub(crate) async fn write_atomic(path: &Path, payload: &[u8]) -> AppResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .await
            .map_err(|err| AppError::storage(parent, err))?;
    }

    let tmp = temp_path(path);
    if let Err(err) = fs::write(&tmp, payload).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(AppError::storage(&tmp, err));
    }
    if let Err(err) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(AppError::storage(path, err));
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from("document"));
    name.push(".tmp");
    path.with_file_name(name)
}

pub(crate) fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Numbers or numeric strings; anything else reads as 0.
pub(crate) fn number_field(value: &Value, key: &str) -> f64 {
    match value.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
