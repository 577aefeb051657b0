//! Ordering Model
//!
//! Pure operations on the flat task collection. Within a column the
//! `order` values must stay a permutation of `0..count`; every structural
//! change has to end with a `renumber` of each column it touched.

use std::collections::HashMap;

use crate::entity;
use crate::models::{Item, ItemId, Status};

/// Items of a column sorted by order
pub fn items_in_column(items: &[Item], column: Status) -> Vec<&Item> {
    let mut in_column: Vec<&Item> = items.iter().filter(|item| item.status == column).collect();
    in_column.sort_by_key(|item| item.order);
    in_column
}

/// Ids of a column sorted by order
pub fn column_ids(items: &[Item], column: Status) -> Vec<ItemId> {
    items_in_column(items, column)
        .into_iter()
        .map(|item| item.id.clone())
        .collect()
}

/// Index of an item within its column, with the column
pub fn position_of(items: &[Item], id: &ItemId) -> Option<(Status, usize)> {
    let column = entity::find_by_id(items, id)?.status;
    let index = items_in_column(items, column)
        .iter()
        .position(|item| &item.id == id)?;
    Some((column, index))
}

/// Order a task appended to `column` should receive
pub fn next_order(items: &[Item], column: Status) -> i32 {
    items.iter().filter(|item| item.status == column).count() as i32
}

/// Assign `0..ordered.len()` to the given ids in sequence, tagging each
/// with `column`. Ids not present in the collection are skipped.
pub fn renumber(items: &mut [Item], column: Status, ordered: &[ItemId]) {
    let slots: HashMap<&ItemId, i32> = ordered
        .iter()
        .enumerate()
        .map(|(index, id)| (id, index as i32))
        .collect();

    for item in items.iter_mut() {
        if let Some(&order) = slots.get(&item.id) {
            item.status = column;
            item.order = order;
        }
    }
}

/// Close gaps in a column, keeping the current relative order
pub fn compact(items: &mut [Item], column: Status) {
    let ordered = column_ids(items, column);
    renumber(items, column, &ordered);
}

/// True when the column's orders are exactly `0..count`
pub fn is_dense(items: &[Item], column: Status) -> bool {
    let mut orders: Vec<i32> = items
        .iter()
        .filter(|item| item.status == column)
        .map(|item| item.order)
        .collect();
    orders.sort_unstable();
    orders.iter().enumerate().all(|(index, &order)| order == index as i32)
}

/// Debug-build check of the dense order invariant on every column
pub fn assert_dense(items: &[Item]) {
    for column in Status::ALL {
        debug_assert!(
            is_dense(items, column),
            "order in column {} is not dense: {:?}",
            column.as_str(),
            items_in_column(items, column)
                .iter()
                .map(|item| (item.id.as_str(), item.order))
                .collect::<Vec<_>>()
        );
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_item(id: &str, status: Status, order: i32) -> Item {
        Item::new(id, format!("Task {}", id), status, order)
    }

    pub(crate) fn ids(items: &[Item], column: Status) -> Vec<String> {
        items_in_column(items, column)
            .iter()
            .map(|item| item.id.to_string())
            .collect()
    }

    #[test]
    fn test_items_in_column_sorted() {
        let items = vec![
            make_item("b", Status::Todo, 1),
            make_item("x", Status::Done, 0),
            make_item("a", Status::Todo, 0),
        ];
        assert_eq!(ids(&items, Status::Todo), vec!["a", "b"]);
        assert_eq!(ids(&items, Status::InProgress), Vec::<String>::new());
    }

    #[test]
    fn test_renumber_assigns_sequence_and_column() {
        let mut items = vec![
            make_item("a", Status::Todo, 0),
            make_item("b", Status::Todo, 1),
            make_item("c", Status::Done, 0),
        ];
        renumber(&mut items, Status::Done, &[ItemId::from("a"), ItemId::from("c")]);

        assert_eq!(ids(&items, Status::Done), vec!["a", "c"]);
        assert_eq!(items[0].status, Status::Done);
        assert_eq!(items[0].order, 0);
        assert_eq!(items[2].order, 1);
        // "b" was not listed and is left alone
        assert_eq!(items[1].order, 1);
    }

    #[test]
    fn test_compact_closes_gaps() {
        let mut items = vec![
            make_item("a", Status::Todo, 3),
            make_item("b", Status::Todo, 7),
            make_item("c", Status::Todo, 0),
        ];
        assert!(!is_dense(&items, Status::Todo));
        compact(&mut items, Status::Todo);
        assert!(is_dense(&items, Status::Todo));
        assert_eq!(ids(&items, Status::Todo), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_position_and_next_order() {
        let items = vec![
            make_item("a", Status::Todo, 0),
            make_item("b", Status::Todo, 1),
        ];
        assert_eq!(position_of(&items, &ItemId::from("b")), Some((Status::Todo, 1)));
        assert_eq!(position_of(&items, &ItemId::from("zz")), None);
        assert_eq!(next_order(&items, Status::Todo), 2);
        assert_eq!(next_order(&items, Status::Done), 0);
    }

    #[test]
    fn test_duplicate_orders_are_not_dense() {
        let items = vec![
            make_item("a", Status::Todo, 0),
            make_item("b", Status::Todo, 0),
        ];
        assert!(!is_dense(&items, Status::Todo));
        assert!(is_dense(&items, Status::Done));
    }
}
