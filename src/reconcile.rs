//! Reconciliation Engine
//!
//! Applies a drag projection to the task collection on release. This is
//! the only place a drag touches order values.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::models::{Item, ItemId, Status};
use crate::ordering;
use crate::projection::DragProjection;

/// Move the projected tasks and renumber every affected column.
///
/// Same-column drops splice the moving block into the stationary tasks.
/// Cross-column drops first close the gap in each source column, then
/// splice into the target column, retagging the moved tasks.
///
/// Returns the ids whose column or order changed.
pub fn apply(items: &mut [Item], projection: &DragProjection) -> Vec<ItemId> {
    let before: HashMap<ItemId, (Status, i32)> = items
        .iter()
        .map(|item| (item.id.clone(), (item.status, item.order)))
        .collect();

    let moving: Vec<ItemId> = projection
        .moving_ids
        .iter()
        .filter(|id| before.contains_key(*id))
        .cloned()
        .collect();
    if moving.is_empty() {
        return Vec::new();
    }
    let moving_set: HashSet<&ItemId> = moving.iter().collect();

    let target = projection.target_column;
    let sources: BTreeSet<Status> = moving
        .iter()
        .filter_map(|id| before.get(id).map(|(status, _)| *status))
        .collect();

    for &source in sources.iter().filter(|&&source| source != target) {
        let remaining: Vec<ItemId> = ordering::column_ids(items, source)
            .into_iter()
            .filter(|id| !moving_set.contains(id))
            .collect();
        ordering::renumber(items, source, &remaining);
    }

    let stationary: Vec<ItemId> = ordering::column_ids(items, target)
        .into_iter()
        .filter(|id| !moving_set.contains(id))
        .collect();
    let at = projection.insertion_index.min(stationary.len());

    let mut column = Vec::with_capacity(stationary.len() + moving.len());
    column.extend_from_slice(&stationary[..at]);
    column.extend(moving.iter().cloned());
    column.extend_from_slice(&stationary[at..]);
    ordering::renumber(items, target, &column);

    log::debug!(
        "reconciled {} task(s) into {} at {}",
        moving.len(),
        target.as_str(),
        at
    );

    items
        .iter()
        .filter(|item| before.get(&item.id) != Some(&(item.status, item.order)))
        .map(|item| item.id.clone())
        .collect()
}
