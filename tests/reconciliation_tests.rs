//! Duplicate suppression, edits and deletes of the meal book

use async_trait::async_trait;
use eatelligent::config::DuplicateWindows;
use eatelligent::meals::{MealBook, Submission};
use eatelligent::storage::{JsonMealStore, MealRepository};
use eatelligent::types::{MealDraft, MealEntry};
use eatelligent::{AppError, AppResult, ErrorKind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

/// In-memory repository that counts writes and can be told to fail them.
#[derive(Default)]
struct FlakyRepo {
    meals: Mutex<Vec<MealEntry>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

#[async_trait]
impl MealRepository for FlakyRepo {
    async fn read_all(&self) -> AppResult<Vec<MealEntry>> {
        Ok(self.meals.lock().unwrap().clone())
    }

    async fn write_all(&self, meals: &[MealEntry]) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::storage(
                "meals.json",
                std::io::Error::other("disk full"),
            ));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.meals.lock().unwrap() = meals.to_vec();
        Ok(())
    }
}

fn setup() -> (Arc<FlakyRepo>, MealBook) {
    let repo = Arc::new(FlakyRepo::default());
    let book = MealBook::new(repo.clone(), DuplicateWindows::default());
    (repo, book)
}

fn cheese() -> MealDraft {
    MealDraft::new("grilled cheese", 12.0, 30.0, 18.0)
}

const T0: OffsetDateTime = datetime!(2024-05-01 12:00:00 UTC);

mod duplicate_tests {
    use super::*;

    #[tokio::test]
    async fn test_double_tap_persists_one_entry() {
        let (repo, book) = setup();

        let first = book.submit_at(cheese(), T0).await.unwrap();
        let second = book
            .submit_at(cheese(), T0 + Duration::milliseconds(800))
            .await
            .unwrap();

        assert!(first.is_committed());
        assert!(matches!(second, Submission::SuppressedRecent(_)));
        assert_eq!(second.entry().id, first.entry().id);
        assert_eq!(repo.meals.lock().unwrap().len(), 1);
        assert_eq!(repo.writes.load(Ordering::SeqCst), 1);
        assert_eq!(book.snapshot().await.latest.unwrap().id, first.entry().id);
    }

    #[tokio::test]
    async fn test_stored_duplicate_within_window_is_suppressed() {
        let (_repo, book) = setup();

        let first = book.submit_at(cheese(), T0).await.unwrap();
        // outside the fast path, inside the stored window
        let later = book
            .submit_at(cheese(), T0 + Duration::seconds(20))
            .await
            .unwrap();

        assert_eq!(later, Submission::SuppressedStored(first.entry().clone()));
        assert_eq!(book.snapshot().await.meals.len(), 1);
    }

    #[tokio::test]
    async fn test_stored_duplicate_survives_restart() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let path = dir.path().join("meals.json");

        let first = {
            let book = MealBook::new(Arc::new(JsonMealStore::new(&path)), DuplicateWindows::default());
            book.submit_at(cheese(), T0).await.unwrap()
        };

        let book = MealBook::new(Arc::new(JsonMealStore::new(&path)), DuplicateWindows::default());
        book.load().await.unwrap();
        let again = book
            .submit_at(cheese(), T0 + Duration::seconds(2))
            .await
            .unwrap();

        assert_eq!(again, Submission::SuppressedStored(first.into_entry()));
    }

    #[tokio::test]
    async fn test_same_meal_outside_windows_commits_again() {
        let (repo, book) = setup();

        book.submit_at(cheese(), T0).await.unwrap();
        let later = book
            .submit_at(cheese(), T0 + Duration::seconds(31))
            .await
            .unwrap();

        assert!(later.is_committed());
        assert_eq!(repo.meals.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_different_macros_are_not_duplicates() {
        let (_repo, book) = setup();

        book.submit_at(cheese(), T0).await.unwrap();
        let other = book
            .submit_at(MealDraft::new("grilled cheese", 12.0, 30.0, 18.01), T0)
            .await
            .unwrap();

        assert!(other.is_committed());
    }

    #[tokio::test]
    async fn test_windows_are_configurable() {
        let repo = Arc::new(FlakyRepo::default());
        let book = MealBook::new(
            repo.clone(),
            DuplicateWindows {
                recent: Duration::seconds(1),
                stored: Duration::seconds(1),
            },
        );

        book.submit_at(cheese(), T0).await.unwrap();
        let later = book.submit_at(cheese(), T0 + Duration::seconds(3)).await.unwrap();
        assert!(later.is_committed());
    }
}

mod commit_tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_write_leaves_state_unchanged() {
        let (repo, book) = setup();
        book.submit_at(cheese(), T0).await.unwrap();
        let before = book.snapshot().await;

        repo.fail_writes.store(true, Ordering::SeqCst);
        let err = book
            .submit_at(MealDraft::new("Apfel", 0.3, 14.0, 0.3), T0 + Duration::minutes(5))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(book.snapshot().await, before);
        assert_eq!(repo.meals.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_arm_fast_path() {
        let (repo, book) = setup();
        repo.fail_writes.store(true, Ordering::SeqCst);
        assert!(book.submit_at(cheese(), T0).await.is_err());

        repo.fail_writes.store(false, Ordering::SeqCst);
        let retry = book.submit_at(cheese(), T0 + Duration::seconds(1)).await.unwrap();
        assert!(retry.is_committed());
    }

    #[tokio::test]
    async fn test_concurrent_submissions_lose_no_update() {
        let (repo, book) = setup();
        let book = Arc::new(book);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let book = book.clone();
                tokio::spawn(async move {
                    book.submit_at(MealDraft::new(format!("Snack {i}"), 1.0, 1.0, 1.0), T0)
                        .await
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_committed());
        }

        assert_eq!(repo.meals.lock().unwrap().len(), 8);
        assert_eq!(book.snapshot().await.meals.len(), 8);
    }
}

mod edit_delete_tests {
    use super::*;

    #[tokio::test]
    async fn test_edit_preserves_id_and_timestamp() {
        let (repo, book) = setup();
        let original = book.submit_at(cheese(), T0).await.unwrap().into_entry();

        let edited = book
            .update(&original.id, MealDraft::new("Käsetoast", 10.0, 28.0, 16.0))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(edited.id, original.id);
        assert_eq!(edited.recorded_at, original.recorded_at);
        assert_eq!(edited.description, "Käsetoast");
        assert_eq!(repo.meals.lock().unwrap()[0], edited);
        assert_eq!(book.snapshot().await.latest, Some(edited));
    }

    #[tokio::test]
    async fn test_delete_removes_one_and_clears_latest() {
        let (repo, book) = setup();
        let keep = book.submit_at(cheese(), T0).await.unwrap().into_entry();
        let gone = book
            .submit_at(MealDraft::new("Banane", 0.4, 27.0, 1.3), T0 + Duration::minutes(1))
            .await
            .unwrap()
            .into_entry();

        let removed = book.delete(&gone.id).await.unwrap();

        assert_eq!(removed, Some(gone));
        let snapshot = book.snapshot().await;
        assert_eq!(snapshot.meals, vec![keep]);
        assert_eq!(snapshot.latest, None);
        assert_eq!(repo.meals.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_of_other_entry_keeps_latest() {
        let (_repo, book) = setup();
        let older = book.submit_at(cheese(), T0).await.unwrap().into_entry();
        let newer = book
            .submit_at(MealDraft::new("Banane", 0.4, 27.0, 1.3), T0 + Duration::minutes(1))
            .await
            .unwrap()
            .into_entry();

        book.delete(&older.id).await.unwrap();
        assert_eq!(book.snapshot().await.latest, Some(newer));
    }

    #[tokio::test]
    async fn test_unknown_id_is_a_no_op() {
        let (repo, book) = setup();
        book.submit_at(cheese(), T0).await.unwrap();

        assert_eq!(book.update("missing", cheese()).await.unwrap(), None);
        assert_eq!(book.delete("missing").await.unwrap(), None);
        assert_eq!(repo.writes.load(Ordering::SeqCst), 1);
    }
}
