use booking_cart_cell::*;

use crate::common::{appointment, diagnostic, draft_appointment};

#[test]
fn test_merge_appends_new_items_in_order() {
    let existing = vec![appointment(1, 10)];
    let incoming = vec![diagnostic(2, 20), appointment(3, 10)];

    let merged = merge(&existing, &incoming);

    let ids: Vec<&str> = merged.iter().map(|item| item.id.as_str()).collect();
    assert_eq!(ids, vec!["appointment-1", "diagnostic_test-2", "appointment-3"]);
}

#[test]
fn test_merge_replaces_in_place_on_id_collision() {
    let existing = vec![appointment(1, 10), diagnostic(2, 20)];
    let mut updated = appointment(1, 10);
    updated.price = 55.0;

    let outcome = merge_with_stats(&existing, &[updated]);

    assert_eq!(outcome.added, 0);
    assert_eq!(outcome.replaced, 1);
    assert_eq!(outcome.items.len(), 2);
    assert_eq!(outcome.items[0].id, "appointment-1");
    assert_eq!(outcome.items[0].price, 55.0);
    assert_eq!(outcome.items[1].id, "diagnostic_test-2");
}

#[test]
fn test_merge_is_idempotent() {
    let existing = vec![appointment(1, 10), draft_appointment(10)];
    let incoming = vec![diagnostic(2, 20), appointment(1, 10)];

    let once = merge(&existing, &incoming);
    let twice = merge(&once, &incoming);

    assert_eq!(once, twice);
}

#[test]
fn test_duplicate_incoming_ids_collapse_to_last() {
    let mut first = appointment(7, 10);
    first.price = 10.0;
    let mut second = appointment(7, 10);
    second.price = 20.0;

    let outcome = merge_with_stats(&[], &[first, second]);

    assert_eq!(outcome.items.len(), 1);
    assert_eq!(outcome.items[0].price, 20.0);
    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.replaced, 1);
}

#[test]
fn test_merge_into_empty_cart() {
    let merged = merge(&[], &[]);
    assert!(merged.is_empty());
}
