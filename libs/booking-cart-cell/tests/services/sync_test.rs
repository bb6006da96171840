use std::sync::Arc;

use assert_matches::assert_matches;

use booking_cart_cell::*;

use crate::common::{at, date, test_cart_config, ApiCall, FakeSchedulingApi};

fn update_op(remote_id: i64) -> SyncOperation {
    SyncOperation::UpdateSchedule {
        kind: BookingKind::DiagnosticTest,
        remote_id,
        scheduled_at: ScheduledAt::new(at(date(2025, 5, 1), 7, 0)),
    }
}

#[tokio::test]
async fn test_dispatch_succeeds_first_time() {
    let api = Arc::new(FakeSchedulingApi::new());
    let dispatcher = SyncDispatcher::new(api.clone(), &test_cart_config());

    let outcome = dispatcher.dispatch("subject-1", "item-1", update_op(3)).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Synced { attempts: 1 });
    assert_eq!(api.update_calls().len(), 1);
    assert!(dispatcher.failed_jobs().await.is_empty());
}

#[tokio::test]
async fn test_dispatch_retries_until_success() {
    let api = Arc::new(FakeSchedulingApi::new());
    api.fail_next_updates(2);
    let dispatcher = SyncDispatcher::new(api.clone(), &test_cart_config());

    let outcome = dispatcher.dispatch("subject-1", "item-1", update_op(3)).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Synced { attempts: 3 });
    assert_eq!(api.update_calls().len(), 3);
    assert!(dispatcher.failed_jobs().await.is_empty());
}

#[tokio::test]
async fn test_exhausted_job_lands_in_failure_ledger() {
    let api = Arc::new(FakeSchedulingApi::new());
    api.fail_next_updates(u32::MAX);
    let dispatcher = SyncDispatcher::new(api.clone(), &test_cart_config());

    let outcome = dispatcher.dispatch("subject-1", "item-1", update_op(3)).await.unwrap();

    assert_matches!(outcome, SyncOutcome::Failed { attempts: 3, ref error } if error.contains("update rejected"));

    let failed = dispatcher.take_failed_jobs().await;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].item_id, "item-1");
    assert_eq!(failed[0].retry_count, 2);
    assert!(failed[0].last_error.is_some());
    assert!(dispatcher.failed_jobs().await.is_empty());
}

#[tokio::test]
async fn test_zero_retries_fails_after_one_attempt() {
    let api = Arc::new(FakeSchedulingApi::new());
    api.fail_next_updates(1);
    let dispatcher = SyncDispatcher::new(api.clone(), &CartConfig { sync_max_retries: 0, ..test_cart_config() });

    let outcome = dispatcher.dispatch("subject-1", "item-9", update_op(9)).await;

    let outcome = tokio_test::assert_ok!(outcome);
    assert_matches!(outcome, SyncOutcome::Failed { attempts: 1, .. });
    assert_eq!(
        api.calls(),
        vec![ApiCall::Update {
            kind: BookingKind::DiagnosticTest,
            remote_id: 9,
            scheduled_at: ScheduledAt::new(at(date(2025, 5, 1), 7, 0)),
        }]
    );
    assert!(api.delete_calls().is_empty());
    assert_eq!(dispatcher.failed_jobs().await.len(), 1);
}

#[test]
fn test_sync_job_serializes_operation_tag() {
    let job = SyncJob::new("subject-1", "item-1", update_op(3), 2);
    let json = serde_json::to_value(&job).unwrap();

    assert_eq!(json["operation"]["op"], "update_schedule");
    assert_eq!(json["operation"]["scheduled_at"], "2025-05-01 07:00:00");
    assert!(job.can_retry());
}
