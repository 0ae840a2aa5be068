use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{MealRepository, number_field, read_document, string_field, write_atomic};
use crate::error::{AppError, AppResult};
use crate::types::MealEntry;

/// Meal collection stored as `{"meals": [...]}` in a single JSON file.
#[derive(Clone, Debug)]
pub struct JsonMealStore {
    path: PathBuf,
}

#[derive(Serialize)]
struct MealDocument<'a> {
    meals: &'a [MealEntry],
}

impl JsonMealStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MealRepository for JsonMealStore {
    async fn read_all(&self) -> AppResult<Vec<MealEntry>> {
        let Some(document) = read_document(&self.path).await? else {
            return Ok(Vec::new());
        };
        let now = OffsetDateTime::now_utc();
        let meals: Vec<MealEntry> = document
            .get("meals")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|item| meal_from_value(item, now)).collect())
            .unwrap_or_default();
        debug!(path = %self.path.display(), count = meals.len(), "loaded meals");
        Ok(meals)
    }

    async fn write_all(&self, meals: &[MealEntry]) -> AppResult<()> {
        let payload = serde_json::to_vec(&MealDocument { meals })
            .map_err(|err| AppError::storage(&self.path, std::io::Error::other(err)))?;
        write_atomic(&self.path, &payload).await?;
        debug!(path = %self.path.display(), count = meals.len(), "saved meals");
        Ok(())
    }
}

/// Lenient element decoding: absent fields take defaults, non-objects are skipped.
fn meal_from_value(item: &Value, now: OffsetDateTime) -> Option<MealEntry> {
    if !item.is_object() {
        return None;
    }

    let id = item
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let recorded_at = item
        .get("recordedAt")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| match OffsetDateTime::parse(raw, &Rfc3339) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!(%id, raw, error = %err, "unparseable recordedAt, using now");
                None
            }
        })
        .unwrap_or(now);

    Some(MealEntry {
        id,
        recorded_at,
        description: string_field(item, "description"),
        fat_grams: number_field(item, "fatGrams"),
        carb_grams: number_field(item, "carbGrams"),
        protein_grams: number_field(item, "proteinGrams"),
    })
}
