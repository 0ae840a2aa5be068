use serde::Serialize;
use std::ops::{Add, AddAssign};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// kcal per gram of fat, carbohydrate and protein.
pub const FAT_KCAL_PER_GRAM: f64 = 9.0;
pub const CARB_KCAL_PER_GRAM: f64 = 4.0;
pub const PROTEIN_KCAL_PER_GRAM: f64 = 4.0;

pub fn atwater_calories(fat_grams: f64, carb_grams: f64, protein_grams: f64) -> f64 {
    fat_grams * FAT_KCAL_PER_GRAM + carb_grams * CARB_KCAL_PER_GRAM + protein_grams * PROTEIN_KCAL_PER_GRAM
}

/// A single logged meal as persisted in the meal document.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealEntry {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
    pub description: String,
    pub fat_grams: f64,
    pub carb_grams: f64,
    pub protein_grams: f64,
}

impl MealEntry {
    /// Builds a fresh entry with a new id, recorded at `now`.
    pub fn from_draft(draft: MealDraft, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recorded_at: now,
            description: draft.description,
            fat_grams: draft.fat_grams,
            carb_grams: draft.carb_grams,
            protein_grams: draft.protein_grams,
        }
    }

    pub fn calories(&self) -> f64 {
        atwater_calories(self.fat_grams, self.carb_grams, self.protein_grams)
    }

    /// Replaces description and macros; `id` and `recorded_at` stay untouched.
    pub fn apply_edit(&mut self, edit: MealDraft) {
        self.description = edit.description;
        self.fat_grams = edit.fat_grams;
        self.carb_grams = edit.carb_grams;
        self.protein_grams = edit.protein_grams;
    }
}

/// Description and macros of a meal that has not been accepted yet.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MealDraft {
    pub description: String,
    pub fat_grams: f64,
    pub carb_grams: f64,
    pub protein_grams: f64,
}

impl MealDraft {
    pub fn new(description: impl Into<String>, fat_grams: f64, carb_grams: f64, protein_grams: f64) -> Self {
        Self {
            description: description.into(),
            fat_grams,
            carb_grams,
            protein_grams,
        }
    }

    /// Trims the description and rejects blank labels or impossible gram values.
    pub fn validated(self) -> AppResult<Self> {
        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(AppError::invalid("Bitte gib eine Beschreibung ein."));
        }
        for (label, value) in [
            ("fatGrams", self.fat_grams),
            ("carbGrams", self.carb_grams),
            ("proteinGrams", self.protein_grams),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::invalid(format!(
                    "{label} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(Self {
            description,
            ..self
        })
    }
}

/// Structured estimate returned by the photo analysis client.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MealAnalysis {
    pub description: String,
    pub fat_grams: f64,
    pub carb_grams: f64,
    pub protein_grams: f64,
}

impl From<MealAnalysis> for MealDraft {
    fn from(analysis: MealAnalysis) -> Self {
        fn clamp(value: f64) -> f64 {
            if value.is_finite() && value > 0.0 { value } else { 0.0 }
        }
        Self {
            description: analysis.description,
            fat_grams: clamp(analysis.fat_grams),
            carb_grams: clamp(analysis.carb_grams),
            protein_grams: clamp(analysis.protein_grams),
        }
    }
}

/// Additive accumulator of macro nutrients.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NutrientTotals {
    pub fat_grams: f64,
    pub carb_grams: f64,
    pub protein_grams: f64,
}

impl NutrientTotals {
    pub fn calories(&self) -> f64 {
        atwater_calories(self.fat_grams, self.carb_grams, self.protein_grams)
    }

    pub fn of(meal: &MealEntry) -> Self {
        Self {
            fat_grams: meal.fat_grams,
            carb_grams: meal.carb_grams,
            protein_grams: meal.protein_grams,
        }
    }
}

impl Add for NutrientTotals {
    type Output = NutrientTotals;

    fn add(self, rhs: NutrientTotals) -> NutrientTotals {
        NutrientTotals {
            fat_grams: self.fat_grams + rhs.fat_grams,
            carb_grams: self.carb_grams + rhs.carb_grams,
            protein_grams: self.protein_grams + rhs.protein_grams,
        }
    }
}

impl Add<&MealEntry> for NutrientTotals {
    type Output = NutrientTotals;

    fn add(self, meal: &MealEntry) -> NutrientTotals {
        self + NutrientTotals::of(meal)
    }
}

impl AddAssign<&MealEntry> for NutrientTotals {
    fn add_assign(&mut self, meal: &MealEntry) {
        *self = *self + meal;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Gender {
    #[default]
    Girl,
    Boy,
}

impl Gender {
    pub fn name(self) -> &'static str {
        match self {
            Gender::Girl => "Girl",
            Gender::Boy => "Boy",
        }
    }

    /// Unknown names fall back to the default.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Boy" => Gender::Boy,
            _ => Gender::Girl,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gender::Girl => "Mädchen",
            Gender::Boy => "Junge",
        }
    }
}

/// The single local user profile, replaced wholesale on save.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserProfile {
    pub name: String,
    pub birthday: Option<Date>,
    pub gender: Gender,
    pub diagnosis: String,
}

impl UserProfile {
    /// Completed years on `today`; `None` without a birthday or for a future one.
    pub fn age_on(&self, today: Date) -> Option<i32> {
        let birthday = self.birthday?;
        if birthday > today {
            return None;
        }
        let mut years = today.year() - birthday.year();
        if (u8::from(today.month()), today.day()) < (u8::from(birthday.month()), birthday.day()) {
            years -= 1;
        }
        Some(years)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn meal(fat: f64, carb: f64, protein: f64) -> MealEntry {
        MealEntry::from_draft(
            MealDraft::new("Testessen", fat, carb, protein),
            datetime!(2024-05-01 12:00 UTC),
        )
    }

    #[test]
    fn test_calories_use_atwater_factors() {
        let entry = meal(10.0, 20.0, 5.0);
        assert_eq!(entry.calories(), 9.0 * 10.0 + 4.0 * 20.0 + 4.0 * 5.0);
    }

    #[test]
    fn test_totals_accumulate() {
        let mut totals = NutrientTotals::default();
        totals += &meal(1.0, 2.0, 3.0);
        totals += &meal(0.5, 0.5, 0.5);
        assert_eq!(
            totals,
            NutrientTotals {
                fat_grams: 1.5,
                carb_grams: 2.5,
                protein_grams: 3.5
            }
        );
        assert_eq!(totals.calories(), 1.5 * 9.0 + 2.5 * 4.0 + 3.5 * 4.0);
    }

    #[test]
    fn test_draft_validation() {
        let ok = MealDraft::new("  Nudeln  ", 1.0, 2.0, 3.0).validated().unwrap();
        assert_eq!(ok.description, "Nudeln");
        assert!(MealDraft::new("   ", 1.0, 2.0, 3.0).validated().is_err());
        assert!(MealDraft::new("Apfel", -1.0, 2.0, 3.0).validated().is_err());
        assert!(MealDraft::new("Apfel", 1.0, f64::NAN, 3.0).validated().is_err());
    }

    #[test]
    fn test_analysis_clamps_negative_estimates() {
        let draft: MealDraft = MealAnalysis {
            description: "Suppe".into(),
            fat_grams: -2.0,
            carb_grams: f64::INFINITY,
            protein_grams: 4.0,
        }
        .into();
        assert_eq!(draft.fat_grams, 0.0);
        assert_eq!(draft.carb_grams, 0.0);
        assert_eq!(draft.protein_grams, 4.0);
    }

    #[test]
    fn test_gender_fallback() {
        assert_eq!(Gender::from_name("Boy"), Gender::Boy);
        assert_eq!(Gender::from_name("Dragon"), Gender::Girl);
        assert_eq!(Gender::from_name(""), Gender::Girl);
    }

    #[test]
    fn test_age_counts_completed_years() {
        let profile = UserProfile {
            birthday: Some(date!(2015 - 06 - 15)),
            ..Default::default()
        };
        assert_eq!(profile.age_on(date!(2024 - 06 - 14)), Some(8));
        assert_eq!(profile.age_on(date!(2024 - 06 - 15)), Some(9));
        assert_eq!(profile.age_on(date!(2014 - 01 - 01)), None);
        assert_eq!(UserProfile::default().age_on(date!(2024 - 01 - 01)), None);
    }
}
