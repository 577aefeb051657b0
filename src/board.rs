//! Task Board
//!
//! The single authority over the task collection. Every mutation path
//! (reorder, field edits, creates, deletes, undo, sync confirmations)
//! goes through `Board`, which keeps the selection, undo history and
//! mutation queue consistent with the items.

use std::collections::HashMap;
use std::sync::Arc;

use drag_gesture::{DragGesture, GestureEvent};
use tokio::runtime::Handle;

use crate::config::BoardConfig;
use crate::entity::{self, DomainError, DomainResult};
use crate::history::History;
use crate::models::{Item, ItemId, NewEvent, NewTask, Status, SyncState, TaskEvent, TaskPatch};
use crate::ordering;
use crate::projection::{self, BoardHover, DragProjection};
use crate::reconcile;
use crate::selection::Selection;
use crate::sync::{MutationQueue, RemoteStore, SyncEvent, SyncMessage};

/// An active drag
#[derive(Debug, Clone)]
struct DragSession {
    dragged: ItemId,
    moving_ids: Vec<ItemId>,
    projection: Option<DragProjection>,
}

/// How a pointer gesture ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerRelease {
    /// Released without crossing the drag threshold
    Click(ItemId),
    /// Drag released; holds the ids whose position changed
    Drop(Vec<ItemId>),
}

pub struct Board {
    items: Vec<Item>,
    selection: Selection,
    history: History<Vec<Item>>,
    drag: Option<DragSession>,
    gesture: DragGesture<ItemId, Status>,
    queue: MutationQueue,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn not_found(id: &ItemId) -> DomainError {
    DomainError::NotFound(format!("task {}", id))
}

impl Board {
    /// Create an empty board. Must be called inside a tokio runtime;
    /// background requests are spawned onto it.
    pub fn new(config: BoardConfig, remote: Arc<dyn RemoteStore>) -> DomainResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| DomainError::Internal(format!("no async runtime: {}", e)))?;
        Self::with_runtime(config, remote, runtime)
    }

    pub fn with_runtime(
        config: BoardConfig,
        remote: Arc<dyn RemoteStore>,
        runtime: Handle,
    ) -> DomainResult<Self> {
        config.validate()?;
        Ok(Self {
            items: Vec::new(),
            selection: Selection::new(),
            history: History::new(config.history_capacity),
            drag: None,
            gesture: DragGesture::new(),
            queue: MutationQueue::new(remote, runtime, &config),
        })
    }

    /// Replace the collection with tasks fetched from the store. Column
    /// orders are compacted; history and selection start empty.
    pub fn load(&mut self, items: Vec<Item>) {
        self.items = items;
        for column in Status::ALL {
            ordering::compact(&mut self.items, column);
        }
        self.history.clear();
        self.selection.clear();
        self.cancel_drag();
        log::debug!("loaded {} task(s)", self.items.len());
    }

    // ========================
    // Queries
    // ========================

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        entity::find_by_id(&self.items, id)
    }

    pub fn items_in_column(&self, column: Status) -> Vec<&Item> {
        ordering::items_in_column(&self.items, column)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Current drop projection, for the insertion-line indicator
    pub fn projection(&self) -> Option<&DragProjection> {
        self.drag.as_ref().and_then(|session| session.projection.as_ref())
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Tasks moving with the active drag
    pub fn dragged_ids(&self) -> &[ItemId] {
        self.drag
            .as_ref()
            .map(|session| session.moving_ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn sync_state(&self, id: &ItemId) -> Option<SyncState> {
        self.get(id).map(|item| item.sync_state)
    }

    /// Local tasks whose create has not been confirmed
    pub fn pending_creates(&self) -> Vec<ItemId> {
        self.queue
            .pending_creates()
            .into_iter()
            .filter(|id| self.get(id).is_some())
            .collect()
    }

    /// Buffered update waiting for its debounce window
    pub fn pending_update(&self, id: &ItemId) -> Option<TaskPatch> {
        self.queue.buffered_patch(id)
    }

    fn index_of(&self, id: &ItemId) -> DomainResult<usize> {
        entity::position_by_id(&self.items, id).ok_or_else(|| not_found(id))
    }

    // ========================
    // Selection
    // ========================

    pub fn toggle_select(&mut self, id: &ItemId) {
        if self.get(id).is_some() {
            self.selection.toggle(id);
        }
    }

    pub fn range_select(&mut self, id: &ItemId) {
        self.selection.range_select(&self.items, id);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ========================
    // Drag and Drop
    // ========================

    /// Pick up `id`. Dragging an unselected task collapses the selection
    /// to it; dragging a selected task moves the whole selection.
    pub fn start_drag(&mut self, id: &ItemId) -> DomainResult<()> {
        self.index_of(id)?;
        if !self.selection.contains(id) {
            self.selection.select_only(id);
        }

        let moving_ids = projection::moving_ids(&self.items, &self.selection, id);
        log::debug!("drag started on {} with {} task(s)", id, moving_ids.len());
        self.drag = Some(DragSession {
            dragged: id.clone(),
            moving_ids,
            projection: None,
        });
        Ok(())
    }

    /// Recompute the projection for the current hover. `None` means the
    /// pointer is outside every column, which makes a release a no-op.
    pub fn update_drag_projection(
        &mut self,
        hover: Option<&BoardHover>,
        pointer_y: f64,
    ) -> Option<&DragProjection> {
        let session = self.drag.as_mut()?;
        let items = &self.items;
        session.projection = hover.and_then(|hover| {
            let moving = &session.moving_ids;
            projection::project(items, moving, &hover.target, pointer_y, hover.rect)
        });
        session.projection.as_ref()
    }

    /// Release the drag. Applies the last projection, persists every
    /// changed position and clears the selection. Returns the changed ids.
    pub fn end_drag(&mut self) -> Vec<ItemId> {
        let Some(session) = self.drag.take() else {
            return Vec::new();
        };
        self.selection.clear();

        let Some(projection) = session.projection else {
            log::debug!("drag of {} released outside any column", session.dragged);
            return Vec::new();
        };

        self.history.push(&self.items);
        let changed = reconcile::apply(&mut self.items, &projection);
        ordering::assert_dense(&self.items);
        self.persist_positions(&changed);
        changed
    }

    pub fn cancel_drag(&mut self) {
        self.drag = None;
        self.gesture.cancel();
    }

    fn persist_positions(&mut self, ids: &[ItemId]) {
        for id in ids {
            if let Some(item) = entity::find_by_id(&self.items, id) {
                let patch = TaskPatch::position(item.status, item.order);
                self.queue.schedule_update(id.clone(), patch);
            }
        }
    }

    // ========================
    // Pointer Input
    // ========================

    /// Primary button pressed on a task
    pub fn pointer_down(&mut self, id: &ItemId, x: f64, y: f64) {
        if self.get(id).is_some() {
            self.gesture.press(id.clone(), x, y);
        }
    }

    /// Pointer moved over `hover` (or over nothing)
    pub fn pointer_move(&mut self, x: f64, y: f64, hover: Option<BoardHover>) {
        match self.gesture.motion(x, y, hover) {
            Some(GestureEvent::DragStarted(id)) => {
                if self.start_drag(&id).is_err() {
                    self.cancel_drag();
                    return;
                }
                let hover = self.gesture.hover().cloned();
                self.update_drag_projection(hover.as_ref(), y);
            }
            Some(GestureEvent::DragMoved { pointer_y, hover }) => {
                self.update_drag_projection(hover.as_ref(), pointer_y);
            }
            _ => {}
        }
    }

    /// Pointer left the board
    pub fn pointer_leave(&mut self) {
        self.gesture.leave();
        self.update_drag_projection(None, 0.0);
    }

    pub fn pointer_up(&mut self) -> Option<PointerRelease> {
        match self.gesture.release()? {
            GestureEvent::Clicked(id) => Some(PointerRelease::Click(id)),
            GestureEvent::Dropped { .. } => Some(PointerRelease::Drop(self.end_drag())),
            _ => None,
        }
    }

    // ========================
    // Undo
    // ========================

    /// Restore the state before the last undoable mutation. Local only:
    /// nothing is sent to the store. Returns false when there is nothing
    /// to undo.
    pub fn undo(&mut self) -> bool {
        let Some(mut restored) = self.history.undo() else {
            return false;
        };

        let events: HashMap<ItemId, Vec<TaskEvent>> = self
            .items
            .iter()
            .map(|item| (item.id.clone(), item.events.clone()))
            .collect();
        for item in restored.iter_mut() {
            if let Some(current) = events.get(&item.id) {
                item.events = current.clone();
            }
            if let Some(state) = self.queue.create_state(&item.id) {
                item.sync_state = state;
                self.queue.revive(&item.id);
            } else if item.sync_state == SyncState::Error {
                // Failed create that was deleted and forgotten
                let event_ids = item.events.iter().map(|event| event.id.clone());
                self.queue
                    .track_failed_create(item.id.clone(), NewTask::from_item(item), event_ids);
            }
        }

        self.items = restored;
        for id in self.queue.failed_creates() {
            if self.get(&id).is_none() {
                self.queue.forget_create(&id);
            }
        }
        self.selection.retain_existing(&self.items);
        self.cancel_drag();
        ordering::assert_dense(&self.items);
        log::debug!("undo restored {} task(s)", self.items.len());
        true
    }

    // ========================
    // Create / Update / Delete
    // ========================

    /// Insert a task immediately under a temporary id and send the create
    /// in the background. The task is appended to its column.
    pub fn create(&mut self, mut task: NewTask) -> DomainResult<ItemId> {
        if task.title.trim().is_empty() {
            return Err(DomainError::InvalidInput("title must not be empty".to_string()));
        }

        self.history.push(&self.items);
        let id = self.queue.mint_task_id();
        task.order = ordering::next_order(&self.items, task.status);
        self.items.push(Item::from_new(id.clone(), &task));
        self.queue.submit_create(id.clone(), task);
        Ok(id)
    }

    /// Resend a create that failed
    pub fn retry_create(&mut self, id: &ItemId) -> DomainResult<()> {
        let index = self.index_of(id)?;
        self.queue.retry_create(id)?;
        self.items[index].sync_state = SyncState::Pending;
        Ok(())
    }

    /// Apply a partial edit locally and schedule it for the store. A
    /// status change moves the task to the end of the target column.
    pub fn update(&mut self, id: &ItemId, patch: TaskPatch) -> DomainResult<()> {
        self.index_of(id)?;
        self.history.push(&self.items);
        self.apply_update(id, patch);
        Ok(())
    }

    /// Apply the same edit to several tasks as one undoable step
    pub fn bulk_update(&mut self, ids: &[ItemId], patch: TaskPatch) -> DomainResult<()> {
        for id in ids {
            self.index_of(id)?;
        }
        if ids.is_empty() {
            return Ok(());
        }

        self.history.push(&self.items);
        for id in ids {
            self.apply_update(id, patch.clone());
        }
        Ok(())
    }

    fn apply_update(&mut self, id: &ItemId, mut patch: TaskPatch) {
        // Position is owned by reconciliation
        let target_column = patch.status.take();
        patch.order = None;

        let Some(item) = self.items.iter_mut().find(|item| &item.id == id) else {
            return;
        };
        patch.apply_to(item);
        item.updated_at = Some(now_millis());
        let current_column = item.status;

        let moved = match target_column {
            Some(column) if column != current_column => reconcile::apply(
                &mut self.items,
                &DragProjection {
                    moving_ids: vec![id.clone()],
                    target_column: column,
                    insertion_index: usize::MAX,
                },
            ),
            _ => Vec::new(),
        };
        ordering::assert_dense(&self.items);

        self.queue.schedule_update(id.clone(), patch);
        self.persist_positions(&moved);
    }

    /// Remove a task locally and delete it remotely without waiting
    pub fn delete(&mut self, id: &ItemId) -> DomainResult<()> {
        self.index_of(id)?;
        self.history.push(&self.items);
        self.remove_item(id);
        Ok(())
    }

    /// Delete every selected task as one undoable step
    pub fn delete_selected(&mut self) -> Vec<ItemId> {
        let ids = self.selection.sorted_by_order(&self.items);
        if ids.is_empty() {
            return ids;
        }

        self.history.push(&self.items);
        for id in &ids {
            self.remove_item(id);
        }
        self.selection.clear();
        ids
    }

    fn remove_item(&mut self, id: &ItemId) {
        let Some(index) = entity::position_by_id(&self.items, id) else {
            return;
        };
        let removed = self.items.remove(index);
        let column = removed.status;

        let before: HashMap<ItemId, i32> = self
            .items
            .iter()
            .filter(|item| item.status == column)
            .map(|item| (item.id.clone(), item.order))
            .collect();
        ordering::compact(&mut self.items, column);
        let shifted: Vec<ItemId> = self
            .items
            .iter()
            .filter(|item| item.status == column && before.get(&item.id) != Some(&item.order))
            .map(|item| item.id.clone())
            .collect();

        self.queue.delete(id);
        self.persist_positions(&shifted);
        self.selection.retain_existing(&self.items);
        if self.drag.as_ref().is_some_and(|session| session.moving_ids.contains(id)) {
            self.cancel_drag();
        }
    }

    // ========================
    // Activity Events
    // ========================

    /// Append an activity entry. It is sent right away when the task has
    /// a real id, otherwise once the task's create confirms.
    pub fn add_event(&mut self, task_id: &ItemId, text: impl Into<String>) -> DomainResult<ItemId> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(DomainError::InvalidInput("event text must not be empty".to_string()));
        }
        let index = self.index_of(task_id)?;

        let event_id = self.queue.mint_event_id(task_id);
        let created_at = now_millis();
        self.items[index].events.push(TaskEvent {
            id: event_id.clone(),
            text: text.clone(),
            created_at,
        });

        if !self.queue.is_temporary(task_id) {
            self.queue
                .submit_event(task_id.clone(), event_id.clone(), NewEvent { text, created_at });
        }
        Ok(event_id)
    }

    // ========================
    // Sync Results
    // ========================

    /// Wait for the next background result and apply it. Pends while no
    /// create or event request is in flight.
    pub async fn next_sync_event(&mut self) -> Option<SyncEvent> {
        let message = self.queue.next().await?;
        Some(self.apply_sync(message))
    }

    /// Apply every background result that has already arrived
    pub fn drain_sync_events(&mut self) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        while let Some(message) = self.queue.try_next() {
            events.push(self.apply_sync(message));
        }
        events
    }

    fn apply_sync(&mut self, message: SyncMessage) -> SyncEvent {
        match message {
            SyncMessage::Created { temp_id, result } => match result {
                Ok(record) => self.confirm_create(temp_id, record.id, record.created_at),
                Err(error) => {
                    log::warn!("create of {} failed: {}", temp_id, error);
                    self.queue.mark_create_failed(&temp_id);
                    if let Some(item) = self.items.iter_mut().find(|item| item.id == temp_id) {
                        item.sync_state = SyncState::Error;
                    }
                    SyncEvent::CreateFailed { temp_id, error }
                }
            },
            SyncMessage::EventCreated {
                task_id,
                temp_event_id,
                result,
            } => {
                self.queue.confirm_event(&temp_event_id);
                match result {
                    Ok(record) => {
                        let event = self
                            .items
                            .iter_mut()
                            .filter(|item| item.id == task_id)
                            .flat_map(|item| item.events.iter_mut())
                            .find(|event| event.id == temp_event_id);
                        if let Some(event) = event {
                            event.id = record.id.clone();
                        }
                        SyncEvent::EventConfirmed {
                            task_id,
                            temp_event_id,
                            id: record.id,
                        }
                    }
                    Err(error) => {
                        log::warn!(
                            "event {} on task {} was not saved: {}",
                            temp_event_id,
                            task_id,
                            error
                        );
                        SyncEvent::EventFailed {
                            task_id,
                            temp_event_id,
                            error,
                        }
                    }
                }
            }
        }
    }

    fn confirm_create(
        &mut self,
        temp_id: ItemId,
        id: ItemId,
        created_at: Option<i64>,
    ) -> SyncEvent {
        let pending = self.queue.confirm_create(&temp_id, &id);
        self.remap(&temp_id, &id, created_at);

        let Some(item) = entity::find_by_id(&self.items, &id) else {
            self.queue.drop_events(&id);
            if pending.is_some_and(|pending| pending.deleted) {
                log::info!("task {} was deleted before its create confirmed", id);
                self.queue.spawn_delete(id.clone());
            } else {
                log::info!("create of {} confirmed after the task was removed locally", id);
            }
            return SyncEvent::Discarded { temp_id, id };
        };

        let catch_up = pending
            .filter(|pending| pending.dirty)
            .map(|_| TaskPatch::from_item(item));
        let deferred: Vec<(ItemId, NewEvent)> = item
            .events
            .iter()
            .filter(|event| self.queue.is_temporary_event(&event.id))
            .map(|event| {
                (
                    event.id.clone(),
                    NewEvent {
                        text: event.text.clone(),
                        created_at: event.created_at,
                    },
                )
            })
            .collect();

        if let Some(patch) = catch_up {
            self.queue.schedule_update(id.clone(), patch);
        }
        for (event_id, event) in deferred {
            self.queue.submit_event(id.clone(), event_id, event);
        }

        log::info!("task {} confirmed as {}", temp_id, id);
        SyncEvent::Confirmed { temp_id, id }
    }

    /// Swap a temporary id for the store's id everywhere it is held
    fn remap(&mut self, from: &ItemId, to: &ItemId, created_at: Option<i64>) {
        let swap = |item: &mut Item| {
            if &item.id == from {
                item.id = to.clone();
                item.sync_state = SyncState::Synced;
                if created_at.is_some() {
                    item.created_at = created_at;
                }
            }
        };

        self.items.iter_mut().for_each(swap);
        self.history.for_each_mut(|snapshot| snapshot.iter_mut().for_each(swap));
        self.selection.remap(from, to);

        if let Some(session) = self.drag.as_mut() {
            if &session.dragged == from {
                session.dragged = to.clone();
            }
            let projected = session
                .projection
                .as_mut()
                .map(|projection| &mut projection.moving_ids);
            for ids in std::iter::once(&mut session.moving_ids).chain(projected) {
                for id in ids.iter_mut().filter(|id| **id == *from) {
                    *id = to.clone();
                }
            }
        }
    }
}
