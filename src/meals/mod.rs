//! Meal reconciliation: every accepted, edited or deleted meal goes through
//! [`MealBook`], which suppresses duplicate submissions and keeps the in-memory
//! list identical to what the store last wrote successfully.

mod fingerprint;

pub use fingerprint::{fingerprint, parse_grams};

use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info};

use crate::config::DuplicateWindows;
use crate::error::AppResult;
use crate::storage::MealRepository;
use crate::types::{MealDraft, MealEntry};

/// What [`MealBook::submit`] did with a candidate. Every variant carries the
/// entry that is now the latest result.
#[derive(Clone, Debug, PartialEq)]
pub enum Submission {
    Committed(MealEntry),
    /// Same meal as the submission accepted moments ago.
    SuppressedRecent(MealEntry),
    /// Same meal as a stored entry recorded close to now.
    SuppressedStored(MealEntry),
}

impl Submission {
    pub fn entry(&self) -> &MealEntry {
        match self {
            Submission::Committed(entry)
            | Submission::SuppressedRecent(entry)
            | Submission::SuppressedStored(entry) => entry,
        }
    }

    pub fn into_entry(self) -> MealEntry {
        match self {
            Submission::Committed(entry)
            | Submission::SuppressedRecent(entry)
            | Submission::SuppressedStored(entry) => entry,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Submission::Committed(_))
    }
}

/// Observable view of the meal book.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MealSnapshot {
    pub meals: Vec<MealEntry>,
    pub latest: Option<MealEntry>,
}

struct AcceptedMarker {
    fingerprint: String,
    at: OffsetDateTime,
    entry_id: String,
}

#[derive(Default)]
struct BookState {
    meals: Vec<MealEntry>,
    latest_id: Option<String>,
    last_accepted: Option<AcceptedMarker>,
}

impl BookState {
    fn find(&self, id: &str) -> Option<&MealEntry> {
        self.meals.iter().find(|meal| meal.id == id)
    }

    fn snapshot(&self) -> MealSnapshot {
        MealSnapshot {
            meals: self.meals.clone(),
            latest: self
                .latest_id
                .as_deref()
                .and_then(|id| self.find(id))
                .cloned(),
        }
    }
}

pub struct MealBook {
    repository: Arc<dyn MealRepository>,
    windows: DuplicateWindows,
    // held across store writes: one writer per process
    state: Mutex<BookState>,
    published: watch::Sender<MealSnapshot>,
}

impl MealBook {
    pub fn new(repository: Arc<dyn MealRepository>, windows: DuplicateWindows) -> Self {
        let (published, _) = watch::channel(MealSnapshot::default());
        Self {
            repository,
            windows,
            state: Mutex::new(BookState::default()),
            published,
        }
    }

    /// Replaces the in-memory list with the stored collection.
    pub async fn load(&self) -> AppResult<MealSnapshot> {
        let mut state = self.state.lock().await;
        state.meals = self.repository.read_all().await?;
        if let Some(id) = state.latest_id.clone()
            && state.find(&id).is_none()
        {
            state.latest_id = None;
        }
        info!(count = state.meals.len(), "meal book loaded");
        Ok(self.publish(&state))
    }

    pub async fn submit(&self, draft: MealDraft) -> AppResult<Submission> {
        self.submit_at(draft, OffsetDateTime::now_utc()).await
    }

    /// Accepts a candidate recorded at `now` unless it duplicates a recent submission.
    pub async fn submit_at(&self, draft: MealDraft, now: OffsetDateTime) -> AppResult<Submission> {
        let candidate = MealEntry::from_draft(draft.validated()?, now);
        let key = fingerprint(&candidate);
        let mut state = self.state.lock().await;

        if let Some(marker) = &state.last_accepted
            && marker.fingerprint == key
            && now - marker.at < self.windows.recent
            && let Some(previous) = state.find(&marker.entry_id).cloned()
        {
            debug!(fingerprint = %key, reason = "recent", "duplicate submission suppressed");
            state.latest_id = Some(previous.id.clone());
            self.publish(&state);
            return Ok(Submission::SuppressedRecent(previous));
        }

        if let Some(existing) = state
            .meals
            .iter()
            .find(|meal| {
                fingerprint(meal) == key && (meal.recorded_at - now).abs() <= self.windows.stored
            })
            .cloned()
        {
            debug!(fingerprint = %key, reason = "stored", "duplicate submission suppressed");
            state.latest_id = Some(existing.id.clone());
            self.publish(&state);
            return Ok(Submission::SuppressedStored(existing));
        }

        let mut meals = state.meals.clone();
        meals.push(candidate.clone());
        self.repository.write_all(&meals).await?;

        state.meals = meals;
        state.latest_id = Some(candidate.id.clone());
        state.last_accepted = Some(AcceptedMarker {
            fingerprint: key,
            at: now,
            entry_id: candidate.id.clone(),
        });
        info!(id = %candidate.id, description = %candidate.description, "meal committed");
        self.publish(&state);
        Ok(Submission::Committed(candidate))
    }

    /// Replaces description and macros of `id`. `None` when no such meal exists.
    pub async fn update(&self, id: &str, edit: MealDraft) -> AppResult<Option<MealEntry>> {
        let edit = edit.validated()?;
        let mut state = self.state.lock().await;
        let Some(index) = state.meals.iter().position(|meal| meal.id == id) else {
            return Ok(None);
        };

        let mut meals = state.meals.clone();
        meals[index].apply_edit(edit);
        self.repository.write_all(&meals).await?;

        let updated = meals[index].clone();
        state.meals = meals;
        state.latest_id = Some(updated.id.clone());
        debug!(id, "meal updated");
        self.publish(&state);
        Ok(Some(updated))
    }

    /// Removes `id`. `None` when no such meal exists.
    pub async fn delete(&self, id: &str) -> AppResult<Option<MealEntry>> {
        let mut state = self.state.lock().await;
        let Some(index) = state.meals.iter().position(|meal| meal.id == id) else {
            return Ok(None);
        };

        let mut meals = state.meals.clone();
        let removed = meals.remove(index);
        self.repository.write_all(&meals).await?;

        state.meals = meals;
        if state.latest_id.as_deref() == Some(id) {
            state.latest_id = None;
        }
        debug!(id, "meal deleted");
        self.publish(&state);
        Ok(Some(removed))
    }

    pub async fn snapshot(&self) -> MealSnapshot {
        self.state.lock().await.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<MealSnapshot> {
        self.published.subscribe()
    }

    fn publish(&self, state: &BookState) -> MealSnapshot {
        let snapshot = state.snapshot();
        self.published.send_replace(snapshot.clone());
        snapshot
    }
}
