//! Taskboard
//!
//! Ordered task board engine for a kanban CRM:
//! - models / entity: tasks, patches and domain errors
//! - ordering, selection, projection, reconcile: pure board logic
//! - history: bounded undo snapshots
//! - sync: remote store contract and the optimistic mutation queue
//! - board: the single authority tying them together

pub mod config;
pub mod entity;
pub mod history;
pub mod models;
pub mod ordering;
pub mod projection;
pub mod reconcile;
pub mod selection;
pub mod sync;

mod board;

pub use board::{Board, PointerRelease};
pub use config::{BoardConfig, RemoteConfig};
pub use entity::{DomainError, DomainResult, Entity};
pub use models::{
    ConfirmedRecord, Item, ItemId, NewEvent, NewTask, Status, SyncState, TaskEvent, TaskPatch,
};
pub use projection::{BoardHover, BoardTarget, DragProjection};
pub use selection::Selection;
pub use sync::{InMemoryRemote, RemoteStore, RestRemote, SyncEvent};

pub use drag_gesture::{DropTarget, Hover, HoverRect};
