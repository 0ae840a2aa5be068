//! Nutrient aggregation over logged meals.
//!
//! Everything here is pure: the same meals, date and offset always produce the
//! same totals. Calendar days are resolved in the caller-provided UTC offset,
//! normally the device's local one (see [`local_offset`]).

use std::collections::BTreeMap;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

use crate::types::{MealEntry, NutrientTotals};

/// Device offset, falling back to UTC where the platform cannot report it.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn local_date(at: OffsetDateTime, offset: UtcOffset) -> Date {
    at.to_offset(offset).date()
}

pub fn meals_on<'a>(
    meals: &'a [MealEntry],
    day: Date,
    offset: UtcOffset,
) -> impl Iterator<Item = &'a MealEntry> + 'a {
    meals
        .iter()
        .filter(move |meal| local_date(meal.recorded_at, offset) == day)
}

/// Sum of all meals recorded on `day`.
pub fn totals_on(meals: &[MealEntry], day: Date, offset: UtcOffset) -> NutrientTotals {
    meals_on(meals, day, offset).fold(NutrientTotals::default(), |acc, meal| acc + meal)
}

/// Per-day totals for every day that has at least one meal, oldest first.
pub fn daily_totals(meals: &[MealEntry], offset: UtcOffset) -> BTreeMap<Date, NutrientTotals> {
    let mut days: BTreeMap<Date, NutrientTotals> = BTreeMap::new();
    for meal in meals {
        *days.entry(local_date(meal.recorded_at, offset)).or_default() += meal;
    }
    days
}

/// The `count` calendar days ending at `today`, oldest first, empty days included.
pub fn recent_days(
    meals: &[MealEntry],
    today: Date,
    count: u16,
    offset: UtcOffset,
) -> Vec<(Date, NutrientTotals)> {
    let totals = daily_totals(meals, offset);
    (0..i64::from(count))
        .rev()
        .filter_map(|back| today.checked_sub(Duration::days(back)))
        .map(|day| (day, totals.get(&day).copied().unwrap_or_default()))
        .collect()
}

pub fn latest_meal(meals: &[MealEntry]) -> Option<&MealEntry> {
    meals.iter().max_by_key(|meal| meal.recorded_at)
}

// ============================================
// Daily goals
// ============================================

/// Target band in grams; `min == max` for a single target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GoalRange {
    pub min: f64,
    pub max: f64,
}

impl GoalRange {
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn exact(target: f64) -> Self {
        Self {
            min: target,
            max: target,
        }
    }

    pub fn label(&self) -> String {
        if (self.max - self.min).abs() < f64::EPSILON {
            format!("{:.0} g", self.min)
        } else {
            format!("{:.0}–{:.0} g", self.min, self.max)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NutrientGoals {
    pub carbs: GoalRange,
    pub protein: GoalRange,
    pub fat: GoalRange,
    pub calories: f64,
}

impl Default for NutrientGoals {
    fn default() -> Self {
        Self {
            carbs: GoalRange::new(200.0, 250.0),
            protein: GoalRange::new(55.0, 60.0),
            fat: GoalRange::exact(70.0),
            calories: 2000.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Macro {
    Carbs,
    Protein,
    Fat,
}

impl Macro {
    pub const ALL: [Macro; 3] = [Macro::Carbs, Macro::Protein, Macro::Fat];

    pub fn label(self) -> &'static str {
        match self {
            Macro::Carbs => "Kohlenhydrate",
            Macro::Protein => "Protein",
            Macro::Fat => "Fett",
        }
    }

    pub fn grams(self, totals: &NutrientTotals) -> f64 {
        match self {
            Macro::Carbs => totals.carb_grams,
            Macro::Protein => totals.protein_grams,
            Macro::Fat => totals.fat_grams,
        }
    }

    pub fn goal(self, goals: &NutrientGoals) -> GoalRange {
        match self {
            Macro::Carbs => goals.carbs,
            Macro::Protein => goals.protein,
            Macro::Fat => goals.fat,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MacroProgress {
    pub nutrient: Macro,
    pub consumed: f64,
    pub goal: GoalRange,
}

impl MacroProgress {
    /// Grams still missing to reach the lower end of the goal.
    pub fn remaining(&self) -> f64 {
        (self.goal.min - self.consumed).max(0.0)
    }

    /// Share of the lower goal reached, clamped to `0.0..=1.0`.
    pub fn ratio(&self) -> f64 {
        if self.goal.min <= 0.0 {
            return 1.0;
        }
        (self.consumed / self.goal.min).clamp(0.0, 1.0)
    }

    pub fn is_over(&self) -> bool {
        self.consumed > self.goal.max
    }
}

pub fn goal_progress(totals: &NutrientTotals, goals: &NutrientGoals) -> Vec<MacroProgress> {
    Macro::ALL
        .iter()
        .map(|&nutrient| MacroProgress {
            nutrient,
            consumed: nutrient.grams(totals),
            goal: nutrient.goal(goals),
        })
        .collect()
}
