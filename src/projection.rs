//! Drag Projection Calculator
//!
//! Read-only: turns the current hover state into a prospective target
//! column and insertion index, for the insertion-line indicator.

use std::collections::HashSet;

use drag_gesture::{DropTarget, Hover, HoverRect};

use crate::models::{Item, ItemId, Status};
use crate::ordering;
use crate::selection::Selection;

/// Hover target on the board: a task, or empty space in a column
pub type BoardTarget = DropTarget<ItemId, Status>;

/// Hover target with the hovered element's box
pub type BoardHover = Hover<ItemId, Status>;

/// Where the moving tasks would land if released now
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragProjection {
    /// Tasks moving together, in their current relative order
    pub moving_ids: Vec<ItemId>,
    pub target_column: Status,
    /// Index among the target column's tasks that are not moving
    pub insertion_index: usize,
}

/// Tasks that move when `dragged` is picked up: the whole selection if
/// it contains `dragged`, else just `dragged`.
pub fn moving_ids(items: &[Item], selection: &Selection, dragged: &ItemId) -> Vec<ItemId> {
    if selection.contains(dragged) {
        selection.sorted_by_order(items)
    } else {
        vec![dragged.clone()]
    }
}

/// Compute the projection for one pointer-move tick.
///
/// Returns `None` when the hovered task no longer exists.
pub fn project(
    items: &[Item],
    moving_ids: &[ItemId],
    target: &BoardTarget,
    pointer_y: f64,
    rect: Option<HoverRect>,
) -> Option<DragProjection> {
    let moving: HashSet<&ItemId> = moving_ids.iter().collect();

    let target_column = match target {
        DropTarget::Item(id) => items.iter().find(|item| &item.id == id)?.status,
        DropTarget::Column(column) => *column,
    };

    let column = ordering::items_in_column(items, target_column);
    let base_len = column.iter().filter(|item| !moving.contains(&item.id)).count();

    let insertion_index = match target {
        DropTarget::Item(hovered) if !moving.contains(hovered) => {
            let index = column
                .iter()
                .filter(|item| !moving.contains(&item.id))
                .position(|item| &item.id == hovered)
                .unwrap_or(base_len);
            let below = rect.map(|r| r.is_below_midpoint(pointer_y)).unwrap_or(false);
            if below {
                index + 1
            } else {
                index
            }
        }
        // Hovering one of the moving tasks: the slot the block occupies now
        DropTarget::Item(hovered) => column
            .iter()
            .take_while(|item| &item.id != hovered)
            .filter(|item| !moving.contains(&item.id))
            .count(),
        DropTarget::Column(_) => base_len,
    };

    Some(DragProjection {
        moving_ids: moving_ids.to_vec(),
        target_column,
        insertion_index,
    })
}
