use std::collections::BTreeSet;

use crate::BookingItem;

/// Ids of the cart items currently chosen for checkout.
///
/// The owner keeps this a subset of the cart: every mutation that drops items
/// from the cart must call [`SelectionSet::retain_known`] or [`SelectionSet::remove`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when `id` is not one of `items`.
    pub fn select(&mut self, items: &[BookingItem], id: &str) -> bool {
        if !items.iter().any(|item| item.id == id) {
            return false;
        }
        self.ids.insert(id.to_string());
        true
    }

    pub fn deselect(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }

    /// Flips membership; returns whether the id ended up selected.
    pub fn toggle(&mut self, items: &[BookingItem], id: &str) -> bool {
        if self.ids.remove(id) {
            return false;
        }
        self.select(items, id)
    }

    pub fn select_all(&mut self, items: &[BookingItem]) {
        self.ids = items.iter().map(|item| item.id.clone()).collect();
    }

    pub fn select_none(&mut self) {
        self.ids.clear();
    }

    pub fn remove(&mut self, id: &str) {
        self.ids.remove(id);
    }

    pub fn retain_known(&mut self, items: &[BookingItem]) {
        self.ids.retain(|id| items.iter().any(|item| &item.id == id));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn is_all_selected(&self, items: &[BookingItem]) -> bool {
        !items.is_empty() && items.iter().all(|item| self.ids.contains(&item.id))
    }

    pub fn ids(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn selected_items<'a>(&self, items: &'a [BookingItem]) -> Vec<&'a BookingItem> {
        items.iter().filter(|item| self.ids.contains(&item.id)).collect()
    }
}
