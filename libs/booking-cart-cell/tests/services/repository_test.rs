use std::sync::Arc;

use booking_cart_cell::*;
use shared_utils::test_utils::unique_subject_id;

use crate::common::{appointment, at, date, diagnostic, draft_appointment};

fn repository_with(store: Arc<InMemoryStore>) -> ItemRepository {
    ItemRepository::new(store)
}

#[tokio::test]
async fn test_save_then_load_preserves_order() {
    let repository = ItemRepository::in_memory();
    let subject = unique_subject_id();
    let items = vec![diagnostic(2, 20), appointment(1, 10), draft_appointment(10)];

    repository.save(&subject, &items).await;
    let loaded = repository.load(&subject).await;

    assert_eq!(loaded, items);
}

#[tokio::test]
async fn test_missing_cart_loads_empty() {
    let repository = ItemRepository::in_memory();
    assert!(repository.load("nobody").await.is_empty());
}

#[tokio::test]
async fn test_corrupt_cart_loads_empty() {
    let store = Arc::new(InMemoryStore::new());
    store.set("cart_subject-1", "{not json").await.unwrap();
    let repository = repository_with(store);

    assert!(repository.load("subject-1").await.is_empty());
}

#[tokio::test]
async fn test_carts_are_scoped_by_subject() {
    let store = Arc::new(InMemoryStore::new());
    let repository = repository_with(store.clone());

    repository.save("parent", &[appointment(1, 10)]).await;
    repository.save("child", &[diagnostic(2, 20)]).await;

    let mut keys = store.keys().await;
    keys.sort();
    assert_eq!(keys, vec!["cart_child".to_string(), "cart_parent".to_string()]);
    assert_eq!(repository.load("parent").await[0].id, "appointment-1");
    assert_eq!(repository.load("child").await[0].id, "diagnostic_test-2");
}

#[tokio::test]
async fn test_persisted_record_uses_canonical_schedule() {
    let store = Arc::new(InMemoryStore::new());
    let repository = repository_with(store.clone());
    let mut item = appointment(1, 10);
    item.scheduled_at = Some(ScheduledAt::new(at(date(2025, 5, 2), 14, 30)));

    repository.save("subject-1", &[item]).await;

    let raw = store.get("cart_subject-1").await.unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json[0]["scheduled_at"], "2025-05-02 14:30:00");
    assert_eq!(json[0]["remote_id"], 1);
}

#[tokio::test]
async fn test_load_accepts_camel_case_records() {
    let store = Arc::new(InMemoryStore::new());
    store
        .set(
            "cart_subject-1",
            r#"[{"id":"appointment-9","kind":"appointment","remoteId":9,"subjectName":"Ana","targetId":3,"scheduledAt":"2025-05-02T09:00:00"}]"#,
        )
        .await
        .unwrap();
    let repository = repository_with(store);

    let loaded = repository.load("subject-1").await;

    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].remote_id, Some(9));
    assert_eq!(loaded[0].scheduled_at.unwrap().to_string(), "2025-05-02 09:00:00");
}

#[tokio::test]
async fn test_load_collapses_duplicate_ids() {
    let store = Arc::new(InMemoryStore::new());
    let repository = repository_with(store.clone());
    let raw = serde_json::to_string(&vec![appointment(1, 10), appointment(1, 11)]).unwrap();
    store.set("cart_subject-1", &raw).await.unwrap();

    let loaded = repository.load("subject-1").await;

    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].target_id, 11);
}

#[tokio::test]
async fn test_remove_and_clear() {
    let repository = ItemRepository::in_memory();
    repository.save("subject-1", &[appointment(1, 10), diagnostic(2, 20)]).await;

    repository.remove("subject-1", "appointment-1").await;
    let remaining = repository.load("subject-1").await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "diagnostic_test-2");

    repository.remove("subject-1", "unknown").await;
    assert_eq!(repository.load("subject-1").await.len(), 1);

    repository.clear("subject-1").await;
    assert!(repository.load("subject-1").await.is_empty());
}

#[tokio::test]
async fn test_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path().join("carts")).unwrap());
    let repository = ItemRepository::new(store.clone());

    repository.save("subject/1", &[appointment(1, 10)]).await;

    let reopened = ItemRepository::new(Arc::new(FileStore::new(store.dir()).unwrap()));
    let loaded = reopened.load("subject/1").await;
    assert_eq!(loaded.len(), 1);
    assert!(store.dir().join("cart_5Fsubject_2F1.json").exists());

    reopened.clear("subject/1").await;
    assert!(reopened.load("subject/1").await.is_empty());
    // Clearing twice is fine.
    reopened.clear("subject/1").await;
}

#[tokio::test]
async fn test_file_store_keeps_look_alike_subjects_apart() {
    let dir = tempfile::tempdir().unwrap();
    let repository = ItemRepository::new(Arc::new(FileStore::new(dir.path()).unwrap()));

    repository.save("patient.1", &[appointment(1, 10)]).await;
    repository.save("patient/1", &[diagnostic(2, 20)]).await;

    assert!(repository.load("patient_1").await.is_empty());
    assert_eq!(repository.load("patient.1").await[0].id, "appointment-1");
    assert_eq!(repository.load("patient/1").await[0].id, "diagnostic_test-2");

    repository.save("patient_1", &[diagnostic(3, 30)]).await;
    repository.clear("patient_1").await;
    assert_eq!(repository.load("patient.1").await.len(), 1);
}

#[test]
fn test_file_name_encoding() {
    assert_eq!(encode_file_name("cart_patient-1"), "cart_5Fpatient-1");
    assert_eq!(encode_file_name("cart_patient.1"), "cart_5Fpatient_2E1");
    assert_eq!(encode_file_name("cart_patient_1"), "cart_5Fpatient_5F1");
    assert_eq!(encode_file_name("ñ"), "_C3_B1");
}

#[tokio::test]
async fn test_file_store_missing_key() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path()).unwrap();

    assert_eq!(store.get("cart_nobody").await.unwrap(), None);
    store.delete("cart_nobody").await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running redis at REDIS_TEST_URL"]
async fn test_redis_store_round_trip() {
    let url = std::env::var("REDIS_TEST_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let store = Arc::new(RedisStore::new(&url).await.expect("redis should be reachable"));
    let repository = ItemRepository::new(store);
    let subject = unique_subject_id();

    repository.save(&subject, &[appointment(1, 10)]).await;
    assert_eq!(repository.load(&subject).await.len(), 1);

    repository.clear(&subject).await;
    assert!(repository.load(&subject).await.is_empty());
}

#[tokio::test]
async fn test_redis_store_rejects_unreachable_host() {
    let result = RedisStore::new("redis://127.0.0.1:1").await;
    assert!(result.is_err());
}
