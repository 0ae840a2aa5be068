//! JSON file stores for meals and the user profile

use eatelligent::storage::{JsonMealStore, JsonProfileStore, MealRepository, ProfileRepository};
use eatelligent::types::{Gender, MealDraft, MealEntry, UserProfile};
use eatelligent::ErrorKind;
use time::macros::{date, datetime};

fn sample_meals() -> Vec<MealEntry> {
    vec![
        MealEntry::from_draft(
            MealDraft::new("Haferbrei mit Beeren", 6.5, 48.0, 11.25),
            datetime!(2024-05-01 07:30 UTC),
        ),
        MealEntry::from_draft(
            MealDraft::new("Käsebrot", 12.0, 30.0, 14.0),
            datetime!(2024-05-01 12:05:30 +02:00),
        ),
    ]
}

mod meal_store_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_store_reads_empty() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let store = JsonMealStore::new(dir.path().join("meals.json"));

        let meals = store.read_all().await.expect("missing file is not an error");
        assert!(meals.is_empty());
    }

    #[tokio::test]
    async fn test_write_then_read_returns_same_meals() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let store = JsonMealStore::new(dir.path().join("meals.json"));
        let meals = sample_meals();

        store.write_all(&meals).await.unwrap();
        let loaded = store.read_all().await.unwrap();

        assert_eq!(loaded, meals);
    }

    #[tokio::test]
    async fn test_rewriting_what_was_read_keeps_document_bytes() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let path = dir.path().join("meals.json");
        let store = JsonMealStore::new(&path);
        store.write_all(&sample_meals()).await.unwrap();
        let before = std::fs::read(&path).unwrap();

        let loaded = store.read_all().await.unwrap();
        store.write_all(&loaded).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_document_layout() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let path = dir.path().join("meals.json");
        let store = JsonMealStore::new(&path);
        store.write_all(&sample_meals()[..1]).await.unwrap();

        let document: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let meal = &document["meals"][0];
        assert_eq!(meal["recordedAt"], "2024-05-01T07:30:00Z");
        assert_eq!(meal["description"], "Haferbrei mit Beeren");
        assert_eq!(meal["proteinGrams"], 11.25);
        assert!(meal.get("calories").is_none());
    }

    #[tokio::test]
    async fn test_corrupt_document_reads_empty() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let path = dir.path().join("meals.json");
        std::fs::write(&path, "{\"meals\": [").unwrap();

        let store = JsonMealStore::new(&path);
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_location_is_storage_error() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let store = JsonMealStore::new(blocker.join("meals.json"));
        let err = store.write_all(&sample_meals()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}

mod profile_store_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_profile_is_absent() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let store = JsonProfileStore::new(dir.path().join("user_configuration.json"));
        assert_eq!(store.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_profile_round_trip() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let store = JsonProfileStore::new(dir.path().join("user_configuration.json"));
        let profile = UserProfile {
            name: "Emil".into(),
            birthday: Some(date!(2017 - 09 - 02)),
            gender: Gender::Boy,
            diagnosis: "Zöliakie".into(),
        };

        store.write(&profile).await.unwrap();
        assert_eq!(store.read().await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_profile_replaced_wholesale() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let path = dir.path().join("user_configuration.json");
        let store = JsonProfileStore::new(&path);

        store
            .write(&UserProfile {
                name: "Emil".into(),
                diagnosis: "Zöliakie".into(),
                birthday: Some(date!(2017 - 09 - 02)),
                ..Default::default()
            })
            .await
            .unwrap();
        store.write(&UserProfile::default()).await.unwrap();

        let document: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(
            document,
            serde_json::json!({"name": "", "birthday": null, "gender": "Girl", "diagnosis": ""})
        );
    }

    #[tokio::test]
    async fn test_unknown_gender_falls_back() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let path = dir.path().join("user_configuration.json");
        std::fs::write(
            &path,
            r#"{"name":"Ida","birthday":"2018-01-31","gender":"Unicorn","diagnosis":""}"#,
        )
        .unwrap();

        let profile = JsonProfileStore::new(&path).read().await.unwrap().unwrap();
        assert_eq!(profile.gender, Gender::Girl);
        assert_eq!(profile.birthday, Some(date!(2018 - 01 - 31)));
    }
}
