use std::collections::HashMap;

use crate::BookingItem;

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub items: Vec<BookingItem>,
    pub added: usize,
    pub replaced: usize,
}

/// Folds `incoming` into `existing`: an item whose id is already present replaces it in
/// place, anything else is appended. Merging the same input twice is a no-op.
pub fn merge(existing: &[BookingItem], incoming: &[BookingItem]) -> Vec<BookingItem> {
    merge_with_stats(existing, incoming).items
}

pub fn merge_with_stats(existing: &[BookingItem], incoming: &[BookingItem]) -> MergeOutcome {
    let mut items: Vec<BookingItem> = Vec::with_capacity(existing.len() + incoming.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for item in existing {
        match positions.get(&item.id) {
            Some(&pos) => items[pos] = item.clone(),
            None => {
                positions.insert(item.id.clone(), items.len());
                items.push(item.clone());
            }
        }
    }

    let mut added = 0;
    let mut replaced = 0;

    for item in incoming {
        match positions.get(&item.id) {
            Some(&pos) => {
                items[pos] = item.clone();
                replaced += 1;
            }
            None => {
                positions.insert(item.id.clone(), items.len());
                items.push(item.clone());
                added += 1;
            }
        }
    }

    MergeOutcome { items, added, replaced }
}
