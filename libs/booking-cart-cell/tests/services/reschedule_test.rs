use assert_matches::assert_matches;
use serde_json::json;

use booking_cart_cell::*;

use crate::common::{appointment, at, date, draft_appointment, ApiCall, FakeSchedulingApi, TestCart};

fn item_x() -> BookingItem {
    BookingItem {
        id: "x".to_string(),
        ..appointment(8, 42)
    }
}

fn day_payload() -> serde_json::Value {
    json!({"slots": [
        {"id": "s-morning", "time": "09:00"},
        {"id": "s-noon", "time": "11:00 AM"},
        {"id": "s1", "time": "02:30 PM"},
        {"id": "s-evening", "time": "19:00"}
    ]})
}

async fn engine_with(api: FakeSchedulingApi, items: Vec<BookingItem>) -> (TestCart, CartEngine) {
    let cart = TestCart::new(api);
    let mut engine = cart.engine("subject-1").await;
    engine.add_items(items).await;
    (cart, engine)
}

#[tokio::test]
async fn test_confirm_applies_locally_even_when_remote_update_fails() {
    let api = FakeSchedulingApi::with_availability(day_payload());
    api.fail_next_updates(10);
    let (cart, mut engine) = engine_with(api, vec![item_x()]).await;

    engine.open_reschedule("x", date(2025, 5, 1), None).await.unwrap();
    assert_eq!(engine.coordinator().state(), RescheduleState::SlotsReady);
    let slot = engine.select_slot("s1").unwrap();
    assert_eq!(slot.start_label, "02:30 PM");

    let outcome = engine.confirm_reschedule().await.unwrap();

    assert_eq!(outcome.item.scheduled_at.unwrap().to_string(), "2025-05-01 14:30:00");
    assert_eq!(outcome.commit.sync_ref, Some(8));
    assert_eq!(engine.coordinator().state(), RescheduleState::Applied);

    let sync = outcome.sync.expect("remote item should be synced").await.unwrap();
    assert_matches!(sync, SyncOutcome::Failed { attempts: 3, .. });

    // Never rolled back.
    let stored = cart.persisted("subject-1").await;
    assert_eq!(stored[0].scheduled_at.unwrap().to_string(), "2025-05-01 14:30:00");
    assert_eq!(engine.item("x").unwrap().scheduled_time_label().unwrap(), "2:30 PM");
    assert_eq!(cart.context.sync.failed_jobs().await.len(), 1);
}

#[tokio::test]
async fn test_confirm_sends_canonical_schedule_to_remote() {
    let (cart, mut engine) = engine_with(FakeSchedulingApi::with_availability(day_payload()), vec![item_x()]).await;

    engine.open_reschedule("x", date(2025, 5, 3), None).await.unwrap();
    engine.select_slot("s-evening").unwrap();
    let outcome = engine.confirm_reschedule().await.unwrap();

    assert_eq!(outcome.sync.unwrap().await.unwrap(), SyncOutcome::Synced { attempts: 1 });
    assert_eq!(
        cart.api.update_calls(),
        vec![ApiCall::Update {
            kind: BookingKind::Appointment,
            remote_id: 8,
            scheduled_at: ScheduledAt::new(at(date(2025, 5, 3), 19, 0)),
        }]
    );
}

#[tokio::test]
async fn test_draft_reschedule_stays_local() {
    let draft = draft_appointment(42);
    let draft_id = draft.id.clone();
    let (cart, mut engine) = engine_with(FakeSchedulingApi::with_availability(day_payload()), vec![draft]).await;

    engine.open_reschedule(&draft_id, date(2025, 5, 1), None).await.unwrap();
    engine.select_slot("s1").unwrap();
    let outcome = engine.confirm_reschedule().await.unwrap();

    assert!(outcome.sync.is_none());
    assert!(cart.api.update_calls().is_empty());
    assert_eq!(engine.item(&draft_id).unwrap().scheduled_at.unwrap().to_string(), "2025-05-01 14:30:00");
}

#[tokio::test]
async fn test_stale_slot_results_are_discarded() {
    let (_cart, mut engine) = engine_with(FakeSchedulingApi::new(), vec![item_x()]).await;
    let first = engine.begin_reschedule("x", date(2025, 5, 1), None).unwrap();
    let second = engine.change_reschedule_date(date(2025, 5, 2)).unwrap();
    assert!(second.generation > first.generation);

    let stale = normalize_slots(BookingKind::Appointment, 42, first.date, &day_payload());
    assert!(!engine.finish_slot_load(first.generation, stale));
    assert_eq!(engine.coordinator().state(), RescheduleState::SlotsLoading);

    let fresh = normalize_slots(BookingKind::Appointment, 42, second.date, &day_payload());
    assert!(engine.finish_slot_load(second.generation, fresh));
    assert_eq!(engine.coordinator().state(), RescheduleState::SlotsReady);
    assert!(engine.coordinator().slots().iter().all(|slot| slot.date == date(2025, 5, 2)));
}

#[tokio::test]
async fn test_close_turns_in_flight_fetch_into_no_op() {
    let (_cart, mut engine) = engine_with(FakeSchedulingApi::new(), vec![item_x()]).await;
    let request = engine.begin_reschedule("x", date(2025, 5, 1), None).unwrap();

    engine.close_reschedule();

    let slots = normalize_slots(BookingKind::Appointment, 42, request.date, &day_payload());
    assert!(!engine.finish_slot_load(request.generation, slots));
    assert_eq!(engine.coordinator().state(), RescheduleState::Idle);
    assert!(engine.coordinator().slots().is_empty());
}

#[tokio::test]
async fn test_failed_fetch_leaves_dialog_ready_and_empty() {
    let api = FakeSchedulingApi::with_availability(day_payload());
    api.fail_availability();
    let (_cart, mut engine) = engine_with(api, vec![item_x()]).await;

    engine.open_reschedule("x", date(2025, 5, 1), None).await.unwrap();

    assert_eq!(engine.coordinator().state(), RescheduleState::SlotsReady);
    assert!(engine.visible_slots().is_empty());
    assert_matches!(engine.confirm_reschedule().await, Err(CartError::NoSlotSelected));
}

#[tokio::test]
async fn test_period_filter_is_a_view() {
    let (cart, mut engine) = engine_with(FakeSchedulingApi::with_availability(day_payload()), vec![item_x()]).await;

    engine.open_reschedule("x", date(2025, 5, 2), Some(PeriodTag::Morning)).await.unwrap();
    let morning: Vec<String> = engine.visible_slots().iter().map(|s| s.id.clone()).collect();
    assert_eq!(morning, vec!["s-morning", "s-noon"]);

    engine.set_reschedule_period(Some(PeriodTag::Evening));
    let evening: Vec<String> = engine.visible_slots().iter().map(|s| s.id.clone()).collect();
    assert_eq!(evening, vec!["s-evening"]);

    engine.set_reschedule_period(None);
    assert_eq!(engine.visible_slots().len(), 4);

    // Filtering never refetches.
    assert_eq!(cart.api.calls().len(), 1);
}

#[tokio::test]
async fn test_slot_selection_rules() {
    let (_cart, mut engine) = engine_with(FakeSchedulingApi::with_availability(day_payload()), vec![item_x()]).await;

    assert_matches!(engine.select_slot("s1"), Err(CartError::InvalidStateTransition { .. }));

    // Clock is 2025-05-01 10:30.
    engine.open_reschedule("x", date(2025, 5, 1), None).await.unwrap();
    assert_matches!(engine.select_slot("s-morning"), Err(CartError::SlotExpired(_)));
    assert_matches!(engine.select_slot("missing"), Err(CartError::SlotNotFound(_)));
    assert!(engine.coordinator().selected().is_none());

    engine.select_slot("s-noon").unwrap();
    engine.select_slot("s1").unwrap();
    assert_eq!(engine.coordinator().selected().unwrap().id, "s1");
}

#[tokio::test]
async fn test_unconvertible_label_rejects_confirm_and_keeps_item() {
    let api = FakeSchedulingApi::with_availability(json!(["whenever"]));
    let mut item = item_x();
    item.scheduled_at = Some(ScheduledAt::new(at(date(2025, 4, 30), 9, 0)));
    let (cart, mut engine) = engine_with(api, vec![item]).await;

    engine.open_reschedule("x", date(2025, 5, 1), None).await.unwrap();
    let slot_id = engine.visible_slots()[0].id.clone();
    engine.select_slot(&slot_id).unwrap();

    assert_matches!(engine.confirm_reschedule().await, Err(CartError::InvalidDateTime(_)));
    assert_eq!(engine.item("x").unwrap().scheduled_at.unwrap().to_string(), "2025-04-30 09:00:00");
    assert_eq!(engine.coordinator().state(), RescheduleState::SlotsReady);
    assert!(cart.api.update_calls().is_empty());
}

#[tokio::test]
async fn test_invalid_transitions() {
    let (_cart, mut engine) = engine_with(FakeSchedulingApi::with_availability(day_payload()), vec![item_x()]).await;

    assert_matches!(engine.change_reschedule_date(date(2025, 5, 2)), Err(CartError::InvalidStateTransition { .. }));
    assert_matches!(engine.confirm_reschedule().await, Err(CartError::InvalidStateTransition { .. }));
    assert_matches!(engine.begin_reschedule("nope", date(2025, 5, 2), None), Err(CartError::ItemNotFound(_)));

    engine.open_reschedule("x", date(2025, 5, 2), None).await.unwrap();
    engine.select_slot("s1").unwrap();
    engine.confirm_reschedule().await.unwrap();

    // Applied is terminal until the dialog is reopened.
    assert_matches!(engine.confirm_reschedule().await, Err(CartError::InvalidStateTransition { .. }));
    assert_matches!(engine.change_reschedule_date(date(2025, 5, 3)), Err(CartError::InvalidStateTransition { .. }));

    engine.open_reschedule("x", date(2025, 5, 3), None).await.unwrap();
    assert_eq!(engine.coordinator().state(), RescheduleState::SlotsReady);
}

#[tokio::test]
async fn test_removing_item_closes_its_dialog() {
    let (_cart, mut engine) = engine_with(FakeSchedulingApi::with_availability(day_payload()), vec![item_x()]).await;
    engine.open_reschedule("x", date(2025, 5, 2), None).await.unwrap();

    engine.remove("x").await.unwrap();

    assert_eq!(engine.coordinator().state(), RescheduleState::Idle);
    assert_eq!(engine.coordinator().item_id(), None);
}

#[test]
fn test_state_transition_table() {
    use RescheduleState::*;

    assert!(Idle.can_transition_to(&SlotsLoading));
    assert!(SlotsLoading.can_transition_to(&SlotsReady));
    assert!(SlotsReady.can_transition_to(&Confirming));
    assert!(Confirming.can_transition_to(&Applied));
    assert!(Applied.can_transition_to(&Idle));
    assert!(!Idle.can_transition_to(&Confirming));
    assert!(!SlotsReady.can_transition_to(&Applied));
}
