//! Application controller: owns the meal book, the profile store, the photo
//! analyzer and the chat center, and publishes one [`AppState`] the UI layer
//! observes through [`AppController::subscribe`].

use std::sync::Arc;
use time::UtcOffset;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::ai::{MealAnalyzer, OpenAiChatAssistant, OpenAiMealAnalyzer};
use crate::chat::{ChatCenter, ChatConversation, ChatInputs, ChatMessage, FallbackCoach, ReplyMode};
use crate::config::{AppConfig, DuplicateWindows};
use crate::error::{AppError, AppResult};
use crate::meals::{MealBook, MealSnapshot, Submission};
use crate::nutrition::local_offset;
use crate::storage::{JsonMealStore, JsonProfileStore, MealRepository, ProfileRepository};
use crate::types::{MealAnalysis, MealDraft, MealEntry, UserProfile};

#[derive(Clone, Debug, PartialEq)]
pub struct AppState {
    pub meals: Vec<MealEntry>,
    pub latest_result: Option<MealEntry>,
    pub is_analyzing: bool,
    /// User-facing text of the last failure.
    pub error: Option<String>,
    pub profile: Option<UserProfile>,
    pub is_loading_profile: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            meals: Vec::new(),
            latest_result: None,
            is_analyzing: false,
            error: None,
            profile: None,
            is_loading_profile: true,
        }
    }
}

pub struct AppController {
    meals: MealBook,
    profiles: Arc<dyn ProfileRepository>,
    analyzer: Arc<dyn MealAnalyzer>,
    chat: ChatCenter,
    state: watch::Sender<AppState>,
}

impl AppController {
    pub fn new(
        meals: Arc<dyn MealRepository>,
        profiles: Arc<dyn ProfileRepository>,
        analyzer: Arc<dyn MealAnalyzer>,
        replies: ReplyMode,
        windows: DuplicateWindows,
        offset: UtcOffset,
    ) -> Self {
        let (state, _) = watch::channel(AppState::default());
        Self {
            meals: MealBook::new(meals, windows),
            profiles,
            analyzer,
            chat: ChatCenter::new(replies, offset),
            state,
        }
    }

    /// JSON stores in the data dir and OpenAI clients. Without a credential the
    /// chat answers with the rule-based coach.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let offset = local_offset();
        let replies = if config.api_key.is_some() {
            ReplyMode::Remote(Arc::new(OpenAiChatAssistant::from_config(config)?))
        } else {
            info!("no OpenAI API key configured, using the rule-based coach");
            ReplyMode::RuleBased(FallbackCoach::new(config.goals, offset))
        };
        Ok(Self::new(
            Arc::new(JsonMealStore::new(config.meals_path())),
            Arc::new(JsonProfileStore::new(config.profile_path())),
            Arc::new(OpenAiMealAnalyzer::from_config(config)?),
            replies,
            config.duplicate_windows,
            offset,
        ))
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AppState {
        self.state.borrow().clone()
    }

    /// Reads meals and profile from disk.
    pub async fn load(&self) {
        match self.meals.load().await {
            Ok(snapshot) => self.apply_meals(snapshot),
            Err(err) => self.report(err),
        }

        let profile = self.profiles.read().await;
        self.state.send_modify(|state| {
            match profile {
                Ok(profile) => state.profile = profile,
                Err(err) => {
                    warn!(error = %err, "profile could not be loaded");
                    state.error = Some(err.user_message());
                }
            }
            state.is_loading_profile = false;
        });
    }

    /// Publishes `profile` right away, then persists it.
    pub async fn save_profile(&self, profile: UserProfile) {
        self.state
            .send_modify(|state| state.profile = Some(profile.clone()));
        if let Err(err) = self.profiles.write(&profile).await {
            self.report(err);
        }
    }

    /// Analyses a photo and commits the estimate. Ignored while another
    /// analysis is running.
    pub async fn analyze_photo(&self, photo: &str) -> Option<Submission> {
        if !self.begin_analysis() {
            return None;
        }
        let result = self.analyzer.analyze(photo).await;
        self.finish_analysis(result).await
    }

    pub async fn analyze_photo_bytes(&self, jpeg: &[u8]) -> Option<Submission> {
        if !self.begin_analysis() {
            return None;
        }
        let result = self.analyzer.analyze_bytes(jpeg).await;
        self.finish_analysis(result).await
    }

    fn begin_analysis(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_analyzing {
                return false;
            }
            state.is_analyzing = true;
            state.error = None;
            true
        })
    }

    async fn finish_analysis(&self, result: AppResult<MealAnalysis>) -> Option<Submission> {
        let submission = match result {
            Ok(analysis) => self.commit(analysis.into()).await,
            Err(err) => {
                self.report(err);
                None
            }
        };
        self.state.send_modify(|state| state.is_analyzing = false);
        submission
    }

    /// Manual entry. A blank description is ignored.
    pub async fn add_manual_meal(
        &self,
        description: &str,
        fat_grams: f64,
        carb_grams: f64,
        protein_grams: f64,
    ) -> Option<Submission> {
        if description.trim().is_empty() {
            return None;
        }
        self.commit(MealDraft::new(description, fat_grams, carb_grams, protein_grams))
            .await
    }

    async fn commit(&self, draft: MealDraft) -> Option<Submission> {
        match self.meals.submit(draft).await {
            Ok(submission) => {
                self.apply_meals(self.meals.snapshot().await);
                Some(submission)
            }
            Err(err) => {
                self.report(err);
                None
            }
        }
    }

    pub async fn update_meal(&self, id: &str, edit: MealDraft) -> Option<MealEntry> {
        match self.meals.update(id, edit).await {
            Ok(updated) => {
                self.apply_meals(self.meals.snapshot().await);
                updated
            }
            Err(err) => {
                self.report(err);
                None
            }
        }
    }

    pub async fn delete_meal(&self, id: &str) -> Option<MealEntry> {
        match self.meals.delete(id).await {
            Ok(removed) => {
                self.apply_meals(self.meals.snapshot().await);
                removed
            }
            Err(err) => {
                self.report(err);
                None
            }
        }
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    /// Active conversation id; the first conversation is created on demand.
    pub fn open_chat_center(&self) -> String {
        let state = self.state();
        let profile = state.profile.clone().unwrap_or_default();
        self.chat.open(&ChatInputs::new(&profile, &state.meals))
    }

    pub fn new_conversation(&self) -> ChatConversation {
        let state = self.state();
        let profile = state.profile.clone().unwrap_or_default();
        self.chat
            .create_conversation(&ChatInputs::new(&profile, &state.meals))
    }

    pub async fn send_chat_message(&self, conversation_id: &str, text: &str) -> Option<ChatMessage> {
        let state = self.state();
        let profile = state.profile.clone().unwrap_or_default();
        self.chat
            .send_message(conversation_id, text, &ChatInputs::new(&profile, &state.meals))
            .await
    }

    pub fn conversations(&self) -> Vec<ChatConversation> {
        self.chat.conversations()
    }

    pub fn chat_center(&self) -> &ChatCenter {
        &self.chat
    }

    fn apply_meals(&self, snapshot: MealSnapshot) {
        self.state.send_modify(|state| {
            state.meals = snapshot.meals;
            state.latest_result = snapshot.latest;
        });
    }

    fn report(&self, err: AppError) {
        warn!(kind = ?err.kind(), error = %err, "operation failed");
        let message = err.user_message();
        self.state.send_modify(|state| state.error = Some(message));
    }
}
