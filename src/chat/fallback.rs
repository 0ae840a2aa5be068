use time::{Date, UtcOffset};

use super::context::format_timestamp;
use crate::nutrition::{Macro, MacroProgress, NutrientGoals, goal_progress, latest_meal, recent_days, totals_on};
use crate::types::MealEntry;

const TREND_DAYS: u16 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    LastMeal,
    Suggestion,
    Trend,
    Nutrient(Macro),
    Progress,
}

// first match wins
const LAST_MEAL_WORDS: &[&str] = &["letzte", "zuletzt", "last"];
const SUGGESTION_WORDS: &[&str] = &["vorschlag", "idee", "tipp", "empfehl", "suggest", "hunger"];
const TREND_WORDS: &[&str] = &["zusammenfassung", "überblick", "woche", "trend", "summary"];
const CARB_WORDS: &[&str] = &["kohlenhydrat", "carb"];
const PROTEIN_WORDS: &[&str] = &["protein", "eiweiß", "eiweiss"];
const FAT_WORDS: &[&str] = &["fett", "fat"];

fn classify(message: &str) -> Intent {
    let text = message.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|word| text.contains(word));

    if mentions(LAST_MEAL_WORDS) {
        Intent::LastMeal
    } else if mentions(SUGGESTION_WORDS) {
        Intent::Suggestion
    } else if mentions(TREND_WORDS) {
        Intent::Trend
    } else if mentions(CARB_WORDS) {
        Intent::Nutrient(Macro::Carbs)
    } else if mentions(PROTEIN_WORDS) {
        Intent::Nutrient(Macro::Protein)
    } else if mentions(FAT_WORDS) {
        Intent::Nutrient(Macro::Fat)
    } else {
        Intent::Progress
    }
}

fn foods_for(nutrient: Macro) -> &'static str {
    match nutrient {
        Macro::Carbs => "Vollkornbrot, Haferflocken mit Obst oder eine Banane",
        Macro::Protein => "Naturjoghurt, ein gekochtes Ei oder Linsen",
        Macro::Fat => "eine Handvoll Nüsse, Avocado oder ein Stück Käse",
    }
}

/// Deterministic offline coach answering from the logged meals alone.
#[derive(Debug, Clone, Copy)]
pub struct FallbackCoach {
    goals: NutrientGoals,
    offset: UtcOffset,
}

impl FallbackCoach {
    pub fn new(goals: NutrientGoals, offset: UtcOffset) -> Self {
        Self { goals, offset }
    }

    pub fn reply(&self, message: &str, meals: &[MealEntry], today: Date) -> String {
        match classify(message) {
            Intent::LastMeal => self.last_meal(meals),
            Intent::Suggestion => self.suggestion(meals, today),
            Intent::Trend => self.trend(meals, today),
            Intent::Nutrient(nutrient) => self.nutrient(nutrient, meals, today),
            Intent::Progress => self.progress(meals, today),
        }
    }

    fn today_progress(&self, meals: &[MealEntry], today: Date) -> Vec<MacroProgress> {
        goal_progress(&totals_on(meals, today, self.offset), &self.goals)
    }

    fn last_meal(&self, meals: &[MealEntry]) -> String {
        let Some(meal) = latest_meal(meals) else {
            return "Du hast noch keine Mahlzeit eingetragen. Mach doch ein Foto von deinem nächsten Essen!"
                .to_string();
        };
        format!(
            "Deine letzte Mahlzeit war {} am {}: {:.1} g Fett, {:.1} g Kohlenhydrate und {:.1} g Protein, zusammen etwa {:.0} kcal.",
            meal.description,
            format_timestamp(meal.recorded_at, self.offset),
            meal.fat_grams,
            meal.carb_grams,
            meal.protein_grams,
            meal.calories()
        )
    }

    fn suggestion(&self, meals: &[MealEntry], today: Date) -> String {
        let progress = self.today_progress(meals, today);
        let biggest_gap = progress
            .iter()
            .filter(|p| p.remaining() > 0.0)
            .min_by(|a, b| a.ratio().total_cmp(&b.ratio()));

        match biggest_gap {
            Some(gap) => format!(
                "Dir fehlen heute noch etwa {:.0} g {}. Wie wäre es mit {}?",
                gap.remaining(),
                gap.nutrient.label(),
                foods_for(gap.nutrient)
            ),
            None => "Du hast heute alle Ziele erreicht, super! Wenn du noch Hunger hast, sind Obst oder Gemüse eine gute Wahl."
                .to_string(),
        }
    }

    fn trend(&self, meals: &[MealEntry], today: Date) -> String {
        let days = recent_days(meals, today, TREND_DAYS, self.offset);
        let logged: Vec<f64> = days
            .iter()
            .filter(|(_, totals)| totals.calories() > 0.0)
            .map(|(_, totals)| totals.calories())
            .collect();

        if logged.is_empty() {
            return format!(
                "In den letzten {TREND_DAYS} Tagen wurden noch keine Mahlzeiten eingetragen."
            );
        }
        let average = logged.iter().sum::<f64>() / logged.len() as f64;
        format!(
            "In den letzten {TREND_DAYS} Tagen hast du an {} Tagen Mahlzeiten eingetragen. Im Schnitt waren es {:.0} kcal pro Tag, dein Ziel liegt bei {:.0} kcal.",
            logged.len(),
            average,
            self.goals.calories
        )
    }

    fn nutrient(&self, nutrient: Macro, meals: &[MealEntry], today: Date) -> String {
        let progress = self
            .today_progress(meals, today)
            .into_iter()
            .find(|p| p.nutrient == nutrient);
        let Some(progress) = progress else {
            return self.progress(meals, today);
        };

        let status = if progress.is_over() {
            "Das ist etwas mehr als geplant, morgen klappt es bestimmt ausgewogener.".to_string()
        } else if progress.remaining() > 0.0 {
            format!("Es fehlen noch etwa {:.0} g.", progress.remaining())
        } else {
            "Super, dein Ziel ist erreicht!".to_string()
        };
        format!(
            "Bei {} stehst du heute bei {:.1} g. Dein Ziel liegt bei {}. {status}",
            nutrient.label(),
            progress.consumed,
            progress.goal.label()
        )
    }

    fn progress(&self, meals: &[MealEntry], today: Date) -> String {
        let totals = totals_on(meals, today, self.offset);
        let mut reply = format!(
            "Heute hast du etwa {:.0} kcal gegessen, dein Ziel liegt bei {:.0} kcal.",
            totals.calories(),
            self.goals.calories
        );
        for p in goal_progress(&totals, &self.goals) {
            let note = if p.remaining() > 0.0 {
                format!("noch {:.0} g", p.remaining())
            } else {
                "Ziel erreicht".to_string()
            };
            reply.push_str(&format!(
                "\n• {}: {:.1} g von {} ({note})",
                p.nutrient.label(),
                p.consumed,
                p.goal.label()
            ));
        }
        reply
    }
}
