use crate::types::MealEntry;

/// Duplicate-detection key: trimmed description plus the macros at two decimals,
/// e.g. `"grilled cheese|12.00|30.00|18.00"`.
pub fn fingerprint(meal: &MealEntry) -> String {
    format!(
        "{}|{:.2}|{:.2}|{:.2}",
        meal.description.trim(),
        meal.fat_grams,
        meal.carb_grams,
        meal.protein_grams
    )
}

/// Parses a gram value typed by the user. Blank input means 0 and a decimal
/// comma is accepted; negative or non-numeric input is rejected.
pub fn parse_grams(input: &str) -> Option<f64> {
    let input = input.trim();
    if input.is_empty() {
        return Some(0.0);
    }
    let value: f64 = input.replace(',', ".").parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}
