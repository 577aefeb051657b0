//! Selection Tracker
//!
//! Selected task ids plus the anchor used for shift-range selection.

use std::collections::HashSet;

use crate::models::{Item, ItemId};
use crate::ordering;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    selected: HashSet<ItemId>,
    /// Last explicitly clicked task
    anchor: Option<ItemId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.selected.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn anchor(&self) -> Option<&ItemId> {
        self.anchor.as_ref()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.selected.iter()
    }

    /// Add or remove `id`; the anchor always moves to `id`
    pub fn toggle(&mut self, id: &ItemId) {
        if !self.selected.remove(id) {
            self.selected.insert(id.clone());
        }
        self.anchor = Some(id.clone());
    }

    /// Shift-click. Unions the contiguous run between the anchor and `id`
    /// into the selection when both sit in the same column; otherwise
    /// behaves like `toggle`.
    pub fn range_select(&mut self, items: &[Item], id: &ItemId) {
        let Some((column, target_index)) = ordering::position_of(items, id) else {
            return;
        };

        let anchor_position = self
            .anchor
            .as_ref()
            .and_then(|anchor| ordering::position_of(items, anchor));

        let anchor_index = match anchor_position {
            Some((anchor_column, index)) if anchor_column == column => index,
            // No anchor, a stale anchor or a different column
            _ => {
                self.toggle(id);
                return;
            }
        };

        let (start, end) = if anchor_index <= target_index {
            (anchor_index, target_index)
        } else {
            (target_index, anchor_index)
        };

        for item in &ordering::items_in_column(items, column)[start..=end] {
            self.selected.insert(item.id.clone());
        }
    }

    /// Collapse the selection to a single task
    pub fn select_only(&mut self, id: &ItemId) {
        self.selected.clear();
        self.selected.insert(id.clone());
        self.anchor = Some(id.clone());
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }

    /// Drop ids that no longer exist. The anchor is kept so a later
    /// range-select can detect it as stale.
    pub fn retain_existing(&mut self, items: &[Item]) {
        let existing: HashSet<&ItemId> = items.iter().map(|item| &item.id).collect();
        self.selected.retain(|id| existing.contains(id));
    }

    /// Follow a temporary id being replaced by the store's id
    pub fn remap(&mut self, from: &ItemId, to: &ItemId) {
        if self.selected.remove(from) {
            self.selected.insert(to.clone());
        }
        if self.anchor.as_ref() == Some(from) {
            self.anchor = Some(to.clone());
        }
    }

    /// Selected ids that exist, sorted by column then order
    pub fn sorted_by_order(&self, items: &[Item]) -> Vec<ItemId> {
        let mut chosen: Vec<&Item> = items
            .iter()
            .filter(|item| self.selected.contains(&item.id))
            .collect();
        chosen.sort_by_key(|item| (item.status, item.order));
        chosen.into_iter().map(|item| item.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use crate::ordering::tests::make_item;

    fn board() -> Vec<Item> {
        vec![
            make_item("a0", Status::Todo, 0),
            make_item("a1", Status::Todo, 1),
            make_item("a2", Status::Todo, 2),
            make_item("a3", Status::Todo, 3),
            make_item("b0", Status::Done, 0),
        ]
    }

    fn id(s: &str) -> ItemId {
        ItemId::from(s)
    }

    fn sorted(selection: &Selection, items: &[Item]) -> Vec<String> {
        selection
            .sorted_by_order(items)
            .into_iter()
            .map(|id| id.to_string())
            .collect()
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut selection = Selection::new();
        selection.toggle(&id("a1"));
        assert!(selection.contains(&id("a1")));
        assert_eq!(selection.anchor(), Some(&id("a1")));

        selection.toggle(&id("a1"));
        assert!(selection.is_empty());
        assert_eq!(selection.anchor(), Some(&id("a1")));
    }

    #[test]
    fn test_range_select_same_column_is_additive() {
        let items = board();
        let mut selection = Selection::new();
        selection.toggle(&id("b0"));
        selection.toggle(&id("a3"));
        selection.range_select(&items, &id("a1"));

        assert_eq!(sorted(&selection, &items), vec!["a1", "a2", "a3", "b0"]);
        assert_eq!(selection.anchor(), Some(&id("a3")));
    }

    #[test]
    fn test_range_select_across_columns_toggles() {
        let items = board();
        let mut selection = Selection::new();
        selection.toggle(&id("a0"));
        selection.range_select(&items, &id("b0"));

        assert_eq!(sorted(&selection, &items), vec!["a0", "b0"]);
        assert_eq!(selection.anchor(), Some(&id("b0")));
    }

    #[test]
    fn test_range_select_with_stale_anchor_toggles() {
        let mut items = board();
        let mut selection = Selection::new();
        selection.toggle(&id("a0"));

        items.retain(|item| item.id != id("a0"));
        selection.retain_existing(&items);
        selection.range_select(&items, &id("a2"));

        assert_eq!(sorted(&selection, &items), vec!["a2"]);
    }

    #[test]
    fn test_range_select_without_anchor_toggles() {
        let items = board();
        let mut selection = Selection::new();
        selection.range_select(&items, &id("a2"));
        assert_eq!(sorted(&selection, &items), vec!["a2"]);
    }

    #[test]
    fn test_remap_follows_new_id() {
        let mut selection = Selection::new();
        selection.toggle(&id("temp-1"));
        selection.remap(&id("temp-1"), &id("real-9"));
        assert!(selection.contains(&id("real-9")));
        assert!(!selection.contains(&id("temp-1")));
        assert_eq!(selection.anchor(), Some(&id("real-9")));
    }

    #[test]
    fn test_select_only_collapses() {
        let mut selection = Selection::new();
        selection.toggle(&id("a0"));
        selection.toggle(&id("a1"));
        selection.select_only(&id("a2"));
        assert_eq!(selection.len(), 1);
        assert!(selection.contains(&id("a2")));
    }
}
