//! Text blocks that tell the assistant what it conceptually knows: the profile
//! summary, the per-turn context payload and the carry-over from earlier chats.

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use super::conversation::{ChatConversation, ChatMessage};
use crate::nutrition::{latest_meal, meals_on, totals_on};
use crate::types::{MealEntry, UserProfile};

pub const COACH_GUIDELINE: &str = "Du bist ein empathischer Ernährungscoach. Antworte auf Deutsch, liefere klare und hilfreiche Antworten und gehe – wo passend – auf konkrete Mahlzeiten ein. Nenne Makronährstoffe immer für die gesamte Mahlzeit und gib deine beste Einschätzung, selbst wenn Unsicherheiten bestehen.";

pub const LOADING_TEXT: &str = "Ich denke kurz nach …";

/// Plain messages carried into a new conversation.
pub const CARRY_OVER_LIMIT: usize = 8;

const NOT_GIVEN: &str = "Nicht angegeben";

pub fn intro_text(profile_summary: &str) -> String {
    format!("Hier ist eine aktuelle Zusammenfassung deiner Daten:\n\n{profile_summary}")
}

pub fn error_text(reason: &str) -> String {
    format!("Leider gab es ein Problem beim Abrufen der Antwort.\n{reason}")
}

pub fn format_timestamp(at: OffsetDateTime, offset: UtcOffset) -> String {
    at.to_offset(offset)
        .format(format_description!("[day].[month].[year] [hour]:[minute]"))
        .unwrap_or_default()
}

/// Renders the profile and today's intake, one fact per line.
pub fn profile_summary(
    profile: &UserProfile,
    meals: &[MealEntry],
    now: OffsetDateTime,
    offset: UtcOffset,
) -> String {
    let today = now.to_offset(offset).date();
    let name = non_blank(&profile.name).unwrap_or(NOT_GIVEN);
    let age = profile
        .age_on(today)
        .map(|years| format!("{years} Jahre"))
        .unwrap_or_else(|| NOT_GIVEN.to_string());
    let diagnosis = non_blank(&profile.diagnosis).unwrap_or(NOT_GIVEN);

    let mut lines = vec![
        format!("Name: {name}"),
        format!("Geschlecht: {}", profile.gender.label()),
        format!("Alter: {age}"),
        format!("Diagnose: {diagnosis}"),
        format!("Gespeicherte Mahlzeiten: {}", meals.len()),
    ];

    if meals_on(meals, today, offset).next().is_some() {
        let totals = totals_on(meals, today, offset);
        lines.push(format!(
            "Heutige Makros – Fett: {:.1} g, Kohlenhydrate: {:.1} g, Protein: {:.1} g",
            totals.fat_grams, totals.carb_grams, totals.protein_grams
        ));
    } else {
        lines.push("Heute wurden noch keine Mahlzeiten erfasst.".to_string());
    }

    if let Some(meal) = latest_meal(meals) {
        lines.push(format!(
            "Letzte Mahlzeit: {} am {}",
            meal.description,
            format_timestamp(meal.recorded_at, offset)
        ));
    }

    lines.join("\n")
}

/// Coaching instruction, profile summary and the plain transcript so far.
pub fn conversation_context<'a>(
    profile_summary: &str,
    messages: impl IntoIterator<Item = &'a ChatMessage>,
) -> String {
    let history = messages
        .into_iter()
        .filter(|message| message.is_plain())
        .map(|message| format!("{}: {}", message.sender.speaker(), message.content))
        .collect::<Vec<_>>()
        .join("\n\n");
    let history = if history.trim().is_empty() {
        "Bisher gibt es noch keinen Gesprächsverlauf.".to_string()
    } else {
        history
    };

    format!(
        "Coach-Richtlinie:\n{COACH_GUIDELINE}\n\nProfil-Überblick:\n{profile_summary}\n\nBisheriger Chat-Verlauf:\n{history}"
    )
    .trim_end()
    .to_string()
}

/// Last [`CARRY_OVER_LIMIT`] plain messages across `conversations`, which must be
/// given oldest first. `None` when there is nothing to carry over.
pub fn carry_over_summary<'a>(
    conversations: impl IntoIterator<Item = &'a ChatConversation>,
) -> Option<String> {
    let plain: Vec<&ChatMessage> = conversations
        .into_iter()
        .flat_map(|conversation| conversation.plain_messages())
        .collect();
    if plain.is_empty() {
        return None;
    }

    let mut summary = String::from("Ich habe die wichtigsten Punkte aus früheren Chats übernommen:");
    for message in &plain[plain.len().saturating_sub(CARRY_OVER_LIMIT)..] {
        summary.push_str(&format!("\n• {}: {}", message.sender.speaker(), message.content));
    }
    Some(summary)
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::conversation::MessageKind;
    use crate::types::{Gender, MealDraft};
    use time::macros::{date, datetime};

    fn profile() -> UserProfile {
        UserProfile {
            name: "Lina".into(),
            birthday: Some(date!(2016 - 03 - 10)),
            gender: Gender::Girl,
            diagnosis: String::new(),
        }
    }

    #[test]
    fn test_profile_summary_with_meals() {
        let now = datetime!(2024-05-01 18:00 UTC);
        let meals = vec![
            MealEntry::from_draft(MealDraft::new("Müsli", 5.0, 40.0, 8.0), datetime!(2024-05-01 07:30 UTC)),
            MealEntry::from_draft(MealDraft::new("Pizza", 20.0, 60.0, 15.0), datetime!(2024-04-30 19:00 UTC)),
        ];

        let summary = profile_summary(&profile(), &meals, now, UtcOffset::UTC);
        assert_eq!(
            summary,
            "Name: Lina\n\
             Geschlecht: Mädchen\n\
             Alter: 8 Jahre\n\
             Diagnose: Nicht angegeben\n\
             Gespeicherte Mahlzeiten: 2\n\
             Heutige Makros – Fett: 5.0 g, Kohlenhydrate: 40.0 g, Protein: 8.0 g\n\
             Letzte Mahlzeit: Müsli am 01.05.2024 07:30"
        );
    }

    #[test]
    fn test_profile_summary_without_meals() {
        let summary = profile_summary(
            &UserProfile::default(),
            &[],
            datetime!(2024-05-01 18:00 UTC),
            UtcOffset::UTC,
        );
        assert!(summary.starts_with("Name: Nicht angegeben\nGeschlecht: Mädchen\nAlter: Nicht angegeben"));
        assert!(summary.ends_with("Heute wurden noch keine Mahlzeiten erfasst."));
        assert!(!summary.contains("Letzte Mahlzeit"));
    }

    #[test]
    fn test_conversation_context_layout() {
        let messages = vec![
            ChatMessage::assistant("Intro", MessageKind::Intro),
            ChatMessage::user("Hallo"),
            ChatMessage::assistant("Hi!", MessageKind::Plain),
        ];
        let context = conversation_context("Name: Lina", &messages);
        assert!(context.starts_with("Coach-Richtlinie:\nDu bist ein empathischer Ernährungscoach."));
        assert!(context.contains("\n\nProfil-Überblick:\nName: Lina\n\n"));
        assert!(context.ends_with("Bisheriger Chat-Verlauf:\nDu: Hallo\n\nBegleiter: Hi!"));
        assert!(!context.contains("Intro"));

        let empty = conversation_context("Name: Lina", &[]);
        assert!(empty.ends_with("Bisher gibt es noch keinen Gesprächsverlauf."));
    }

    #[test]
    fn test_carry_over_takes_last_plain_messages() {
        let mut older = ChatConversation::new("Chat 1", vec![]);
        for i in 0..6 {
            older.push_user(&format!("alt {i}"));
        }
        let mut newer = ChatConversation::new("Chat 2", vec![ChatMessage::assistant("x", MessageKind::Intro)]);
        newer.push_user("neu 0");
        newer.messages.push(ChatMessage::assistant("neu 1", MessageKind::Plain));
        newer.push_user("neu 2");

        let summary = carry_over_summary([&older, &newer]).unwrap();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "Ich habe die wichtigsten Punkte aus früheren Chats übernommen:");
        assert_eq!(lines.len(), 1 + CARRY_OVER_LIMIT);
        assert_eq!(lines[1], "• Du: alt 1");
        assert_eq!(lines[7], "• Begleiter: neu 1");
        assert_eq!(lines[8], "• Du: neu 2");
    }

    #[test]
    fn test_carry_over_absent_without_plain_messages() {
        let chat = ChatConversation::new("Chat 1", vec![ChatMessage::assistant("x", MessageKind::Intro)]);
        assert_eq!(carry_over_summary([&chat]), None);
    }
}
