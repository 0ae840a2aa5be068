use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::time::Duration;

use crate::nutrition::{GoalRange, NutrientGoals};

/// Bundled config for mobile builds (iOS/Android)
const BUNDLED_CONFIG: &str = include_str!("../assets/config.env");

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ANALYSIS_MODEL: &str = "gpt-4.1";
pub const DEFAULT_ANALYSIS_FALLBACK_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4.1";
pub const DEFAULT_CHAT_FALLBACK_MODEL: &str = "gpt-4o";

/// Upper bound for duplicate-window overrides (one day).
const MAX_WINDOW_SECS: f64 = 86_400.0;

static DEFAULT_DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join("eatelligent");
    }
    PathBuf::from("cache").join("eatelligent")
});

/// Loads `.env` when present (desktop dev), otherwise the bundled config.
///
/// Mutates the process environment, so it must run on the main thread before
/// the async runtime or any other thread is started.
pub fn load_environment() {
    if dotenvy::dotenv().is_ok() {
        return;
    }
    load_bundled_config();
}

fn load_bundled_config() {
    for (key, value) in parse_env_lines(BUNDLED_CONFIG) {
        // Only set if not already set (allow env override)
        if std::env::var(key).is_err() {
            // SAFETY: `load_environment` runs before any other thread exists
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }
}

fn parse_env_lines(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .collect()
}

/// Model names for a primary request and its single fallback.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelPair {
    pub primary: String,
    pub fallback: String,
}

/// Time windows used to recognise duplicate meal submissions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DuplicateWindows {
    /// Same fingerprint as the last accepted submission within this window is dropped.
    pub recent: time::Duration,
    /// Same fingerprint as a stored meal recorded within this window is dropped.
    pub stored: time::Duration,
}

impl Default for DuplicateWindows {
    fn default() -> Self {
        Self {
            recent: time::Duration::seconds(5),
            stored: time::Duration::seconds(30),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub analysis_models: ModelPair,
    pub chat_models: ModelPair,
    pub data_dir: PathBuf,
    pub duplicate_windows: DuplicateWindows,
    pub goals: NutrientGoals,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            analysis_models: ModelPair {
                primary: DEFAULT_ANALYSIS_MODEL.to_string(),
                fallback: DEFAULT_ANALYSIS_FALLBACK_MODEL.to_string(),
            },
            chat_models: ModelPair {
                primary: DEFAULT_CHAT_MODEL.to_string(),
                fallback: DEFAULT_CHAT_FALLBACK_MODEL.to_string(),
            },
            data_dir: DEFAULT_DATA_DIR.clone(),
            duplicate_windows: DuplicateWindows::default(),
            goals: NutrientGoals::default(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let number = |key: &str| -> Result<Option<f64>> {
            get(key)
                .map(|raw| -> Result<f64> {
                    let value = raw
                        .parse::<f64>()
                        .with_context(|| format!("{key} must be a number, got {raw:?}"))?;
                    if !value.is_finite() || value < 0.0 {
                        bail!("{key} must be a non-negative number, got {raw:?}");
                    }
                    Ok(value)
                })
                .transpose()
        };

        let defaults = Self::default();
        let mut goals = defaults.goals;
        goals.carbs = GoalRange::new(
            number("EATELLIGENT_GOAL_CARBS_MIN")?.unwrap_or(goals.carbs.min),
            number("EATELLIGENT_GOAL_CARBS_MAX")?.unwrap_or(goals.carbs.max),
        );
        goals.protein = GoalRange::new(
            number("EATELLIGENT_GOAL_PROTEIN_MIN")?.unwrap_or(goals.protein.min),
            number("EATELLIGENT_GOAL_PROTEIN_MAX")?.unwrap_or(goals.protein.max),
        );
        if let Some(fat) = number("EATELLIGENT_GOAL_FAT")? {
            goals.fat = GoalRange::exact(fat);
        }
        if let Some(calories) = number("EATELLIGENT_GOAL_CALORIES")? {
            goals.calories = calories;
        }

        let window = |key: &str| -> Result<Option<time::Duration>> {
            let Some(secs) = number(key)? else {
                return Ok(None);
            };
            if secs > MAX_WINDOW_SECS {
                bail!("{key} must be at most {MAX_WINDOW_SECS} seconds, got {secs}");
            }
            Ok(Some(time::Duration::seconds_f64(secs)))
        };

        let mut windows = defaults.duplicate_windows;
        if let Some(recent) = window("EATELLIGENT_DUPLICATE_WINDOW_SECS")? {
            windows.recent = recent;
        }
        if let Some(stored) = window("EATELLIGENT_STORED_DUPLICATE_WINDOW_SECS")? {
            windows.stored = stored;
        }

        Ok(Self {
            api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.base_url),
            analysis_models: ModelPair {
                primary: get("EATELLIGENT_ANALYSIS_MODEL").unwrap_or(defaults.analysis_models.primary),
                fallback: get("EATELLIGENT_ANALYSIS_FALLBACK_MODEL")
                    .unwrap_or(defaults.analysis_models.fallback),
            },
            chat_models: ModelPair {
                primary: get("EATELLIGENT_CHAT_MODEL").unwrap_or(defaults.chat_models.primary),
                fallback: get("EATELLIGENT_CHAT_FALLBACK_MODEL")
                    .unwrap_or(defaults.chat_models.fallback),
            },
            data_dir: get("EATELLIGENT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            duplicate_windows: windows,
            goals,
            connect_timeout: defaults.connect_timeout,
            request_timeout: defaults.request_timeout,
        })
    }

    pub fn meals_path(&self) -> PathBuf {
        self.data_dir.join(crate::storage::MEALS_FILE)
    }

    pub fn profile_path(&self) -> PathBuf {
        self.data_dir.join(crate::storage::PROFILE_FILE)
    }
}
