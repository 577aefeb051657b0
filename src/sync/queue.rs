//! Optimistic Mutation Queue
//!
//! Sends creates, debounced updates and deletes to the remote store in the
//! background. Local state never waits on the network: results that affect
//! it come back as `SyncMessage`s which the board applies on its own task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::remote::RemoteStore;
use crate::config::BoardConfig;
use crate::entity::{DomainError, DomainResult};
use crate::models::{ConfirmedRecord, ItemId, NewEvent, NewTask, SyncState, TaskPatch};

/// Background results that must be applied to local state
#[derive(Debug)]
pub(crate) enum SyncMessage {
    Created {
        temp_id: ItemId,
        result: DomainResult<ConfirmedRecord>,
    },
    EventCreated {
        task_id: ItemId,
        temp_event_id: ItemId,
        result: DomainResult<ConfirmedRecord>,
    },
}

/// A create the store has not confirmed yet
#[derive(Debug, Clone)]
struct PendingCreate {
    /// Original payload, resent on retry
    payload: NewTask,
    state: SyncState,
    /// Edited locally while unconfirmed
    dirty: bool,
    /// Deleted locally while unconfirmed
    deleted: bool,
}

/// Local bookkeeping handed back when a create confirms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConfirmedCreate {
    pub dirty: bool,
    pub deleted: bool,
}

#[derive(Debug)]
struct PendingUpdate {
    patch: TaskPatch,
    /// Bumped on every merge; a timer only flushes its own generation
    generation: u64,
}

type UpdateBuffer = Arc<Mutex<HashMap<ItemId, PendingUpdate>>>;

pub struct MutationQueue {
    remote: Arc<dyn RemoteStore>,
    runtime: Handle,
    debounce: Duration,
    temp_prefix: String,
    next_temp: u64,
    next_generation: u64,
    creates: HashMap<ItemId, PendingCreate>,
    /// Unconfirmed activity entries, keyed by event id, with their task
    temp_events: HashMap<ItemId, ItemId>,
    updates: UpdateBuffer,
    tx: mpsc::UnboundedSender<SyncMessage>,
    rx: mpsc::UnboundedReceiver<SyncMessage>,
}

impl MutationQueue {
    pub fn new(remote: Arc<dyn RemoteStore>, runtime: Handle, config: &BoardConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            remote,
            runtime,
            debounce: config.debounce(),
            temp_prefix: config.temp_id_prefix.clone(),
            next_temp: 1,
            next_generation: 0,
            creates: HashMap::new(),
            temp_events: HashMap::new(),
            updates: Arc::new(Mutex::new(HashMap::new())),
            tx,
            rx,
        }
    }

    // ========================
    // Temporary Ids
    // ========================

    fn mint(&mut self) -> ItemId {
        let id = ItemId::new(format!("{}{}", self.temp_prefix, self.next_temp));
        self.next_temp += 1;
        id
    }

    pub fn mint_task_id(&mut self) -> ItemId {
        self.mint()
    }

    pub fn mint_event_id(&mut self, task_id: &ItemId) -> ItemId {
        let id = self.mint();
        self.temp_events.insert(id.clone(), task_id.clone());
        id
    }

    /// True while the task's create is unconfirmed (pending or failed)
    pub fn is_temporary(&self, id: &ItemId) -> bool {
        self.creates.contains_key(id)
    }

    pub fn is_temporary_event(&self, id: &ItemId) -> bool {
        self.temp_events.contains_key(id)
    }

    pub fn create_state(&self, id: &ItemId) -> Option<SyncState> {
        self.creates.get(id).map(|pending| pending.state)
    }

    pub fn pending_creates(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self
            .creates
            .iter()
            .filter(|(_, pending)| !pending.deleted)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    // ========================
    // Create
    // ========================

    pub fn submit_create(&mut self, temp_id: ItemId, payload: NewTask) {
        self.creates.insert(
            temp_id.clone(),
            PendingCreate {
                payload: payload.clone(),
                state: SyncState::Pending,
                dirty: false,
                deleted: false,
            },
        );
        self.spawn_create(temp_id, payload);
    }

    /// Resend a failed create with its original payload
    pub fn retry_create(&mut self, temp_id: &ItemId) -> DomainResult<()> {
        let pending = self
            .creates
            .get_mut(temp_id)
            .ok_or_else(|| DomainError::NotFound(format!("no pending create for {}", temp_id)))?;
        if pending.state != SyncState::Error {
            return Err(DomainError::Conflict(format!("create for {} is still in flight", temp_id)));
        }

        pending.state = SyncState::Pending;
        let payload = pending.payload.clone();
        self.spawn_create(temp_id.clone(), payload);
        Ok(())
    }

    /// Re-register a failed create that undo brought back after it was
    /// forgotten, together with its unsent activity entries
    pub(crate) fn track_failed_create(
        &mut self,
        temp_id: ItemId,
        payload: NewTask,
        event_ids: impl IntoIterator<Item = ItemId>,
    ) {
        for event_id in event_ids {
            self.temp_events.insert(event_id, temp_id.clone());
        }
        self.creates.insert(
            temp_id,
            PendingCreate {
                payload,
                state: SyncState::Error,
                dirty: false,
                deleted: false,
            },
        );
    }

    /// Failed creates waiting for a retry
    pub(crate) fn failed_creates(&self) -> Vec<ItemId> {
        self.creates
            .iter()
            .filter(|(_, pending)| pending.state == SyncState::Error)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Drop a create that will never be sent again, with its entries
    pub(crate) fn forget_create(&mut self, temp_id: &ItemId) {
        self.creates.remove(temp_id);
        self.drop_events(temp_id);
    }

    /// Drop the unsent activity entries of a task that no longer exists
    pub(crate) fn drop_events(&mut self, task_id: &ItemId) {
        self.temp_events.retain(|_, owner| owner != task_id);
    }

    /// Undo brought a deleted, unconfirmed task back
    pub(crate) fn revive(&mut self, temp_id: &ItemId) {
        if let Some(pending) = self.creates.get_mut(temp_id) {
            pending.deleted = false;
        }
    }

    pub(crate) fn mark_create_failed(&mut self, temp_id: &ItemId) {
        if let Some(pending) = self.creates.get_mut(temp_id) {
            pending.state = SyncState::Error;
        }
    }

    /// Forget the pending create once the store has assigned `id`. Unsent
    /// activity entries move over to the new id.
    pub(crate) fn confirm_create(
        &mut self,
        temp_id: &ItemId,
        id: &ItemId,
    ) -> Option<ConfirmedCreate> {
        for owner in self.temp_events.values_mut().filter(|owner| **owner == *temp_id) {
            *owner = id.clone();
        }
        self.creates.remove(temp_id).map(|pending| ConfirmedCreate {
            dirty: pending.dirty,
            deleted: pending.deleted,
        })
    }

    fn spawn_create(&self, temp_id: ItemId, payload: NewTask) {
        let remote = Arc::clone(&self.remote);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = remote.create(&payload).await;
            // Receiver gone means the board was dropped
            let _ = tx.send(SyncMessage::Created { temp_id, result });
        });
    }

    // ========================
    // Update
    // ========================

    /// Merge `patch` into the task's buffer and restart its debounce timer.
    /// Unconfirmed tasks are only marked dirty; their local state is sent
    /// once the create confirms.
    pub fn schedule_update(&mut self, id: ItemId, patch: TaskPatch) {
        if patch.is_empty() {
            return;
        }
        if let Some(pending) = self.creates.get_mut(&id) {
            pending.dirty = true;
            return;
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        {
            let mut buffer = self.updates.lock();
            let entry = buffer.entry(id.clone()).or_insert_with(|| PendingUpdate {
                patch: TaskPatch::default(),
                generation,
            });
            entry.patch.merge(patch);
            entry.generation = generation;
        }

        let updates = Arc::clone(&self.updates);
        let remote = Arc::clone(&self.remote);
        let delay = self.debounce;
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            let patch = {
                let mut buffer = updates.lock();
                match buffer.get(&id) {
                    Some(entry) if entry.generation == generation => {
                        buffer.remove(&id).map(|entry| entry.patch)
                    }
                    // Superseded by a later update
                    _ => None,
                }
            };
            let Some(patch) = patch else {
                return;
            };

            if let Err(e) = remote.update(&id, &patch).await {
                log::warn!("update of task {} dropped: {}", id, e);
            }
        });
    }

    /// Merged patch still waiting for its timer
    pub fn buffered_patch(&self, id: &ItemId) -> Option<TaskPatch> {
        self.updates.lock().get(id).map(|entry| entry.patch.clone())
    }

    // ========================
    // Delete
    // ========================

    /// Fire-and-forget delete. Unconfirmed tasks are deleted remotely once
    /// their create confirms; failed creates are dropped.
    pub fn delete(&mut self, id: &ItemId) {
        self.updates.lock().remove(id);

        if let Some(pending) = self.creates.get_mut(id) {
            if pending.state == SyncState::Error {
                self.forget_create(id);
            } else {
                pending.deleted = true;
            }
            return;
        }
        self.spawn_delete(id.clone());
    }

    pub(crate) fn spawn_delete(&self, id: ItemId) {
        let remote = Arc::clone(&self.remote);
        self.runtime.spawn(async move {
            if let Err(e) = remote.delete(&id).await {
                log::warn!("delete of task {} dropped: {}", id, e);
            }
        });
    }

    // ========================
    // Events
    // ========================

    pub fn submit_event(&mut self, task_id: ItemId, temp_event_id: ItemId, event: NewEvent) {
        let remote = Arc::clone(&self.remote);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = remote.create_event(&task_id, &event).await;
            let _ = tx.send(SyncMessage::EventCreated {
                task_id,
                temp_event_id,
                result,
            });
        });
    }

    pub(crate) fn confirm_event(&mut self, temp_event_id: &ItemId) {
        self.temp_events.remove(temp_event_id);
    }

    // ========================
    // Results
    // ========================

    pub(crate) fn try_next(&mut self) -> Option<SyncMessage> {
        self.rx.try_recv().ok()
    }

    pub(crate) async fn next(&mut self) -> Option<SyncMessage> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use crate::sync::memory::{InMemoryRemote, RemoteCall};

    fn queue(remote: &Arc<InMemoryRemote>) -> MutationQueue {
        let remote: Arc<dyn RemoteStore> = remote.clone();
        MutationQueue::new(remote, Handle::current(), &BoardConfig::default())
    }

    async fn seeded(remote: &Arc<InMemoryRemote>, title: &str) -> ItemId {
        remote.create(&NewTask::new(title, Status::Todo)).await.unwrap().id
    }

    #[tokio::test(start_paused = true)]
    async fn test_updates_coalesce_within_window() {
        let remote = Arc::new(InMemoryRemote::new());
        let id = seeded(&remote, "Task").await;
        let mut queue = queue(&remote);

        let first = TaskPatch::title("first").with_description(Some("d".into()));
        queue.schedule_update(id.clone(), first);
        tokio::time::sleep(Duration::from_millis(200)).await;
        queue.schedule_update(id.clone(), TaskPatch::title("second"));
        assert!(queue.buffered_patch(&id).is_some());

        tokio::time::sleep(Duration::from_millis(600)).await;

        let updates = remote.update_calls();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.title.as_deref(), Some("second"));
        assert_eq!(updates[0].1.description, Some(Some("d".to_string())));
        assert!(queue.buffered_patch(&id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_update_restarts_timer() {
        let remote = Arc::new(InMemoryRemote::new());
        let id = seeded(&remote, "Task").await;
        let mut queue = queue(&remote);

        queue.schedule_update(id.clone(), TaskPatch::title("a"));
        tokio::time::sleep(Duration::from_millis(400)).await;
        queue.schedule_update(id.clone(), TaskPatch::title("b"));

        // First window would have closed at 500ms
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(remote.update_calls().is_empty());
        assert_eq!(queue.buffered_patch(&id).unwrap().title.as_deref(), Some("b"));

        tokio::time::sleep(Duration::from_millis(400)).await;
        let updates = remote.update_calls();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.title.as_deref(), Some("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_send_separately() {
        let remote = Arc::new(InMemoryRemote::new());
        let id = seeded(&remote, "Task").await;
        let mut queue = queue(&remote);

        queue.schedule_update(id.clone(), TaskPatch::title("one"));
        tokio::time::sleep(Duration::from_millis(600)).await;
        queue.schedule_update(id.clone(), TaskPatch::title("two"));
        tokio::time::sleep(Duration::from_millis(600)).await;

        let titles: Vec<String> = remote
            .update_calls()
            .into_iter()
            .filter_map(|(_, patch)| patch.title)
            .collect();
        assert_eq!(titles, vec!["one", "two"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_update_is_dropped() {
        let remote = Arc::new(InMemoryRemote::new());
        let id = seeded(&remote, "Task").await;
        remote.fail_updates(true);
        let mut queue = queue(&remote);

        queue.schedule_update(id.clone(), TaskPatch::title("lost"));
        tokio::time::sleep(Duration::from_millis(600)).await;
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(remote.update_calls().len(), 1);
        assert!(queue.buffered_patch(&id).is_none());
    }

    #[tokio::test]
    async fn test_temporary_task_update_only_marks_dirty() {
        let remote = Arc::new(InMemoryRemote::new());
        let mut queue = queue(&remote);

        let temp = queue.mint_task_id();
        assert_eq!(temp, ItemId::from("temp-1"));
        queue.submit_create(temp.clone(), NewTask::new("Draft", Status::Todo));
        queue.schedule_update(temp.clone(), TaskPatch::title("Edited"));
        assert!(queue.buffered_patch(&temp).is_none());

        match queue.next().await {
            Some(SyncMessage::Created { temp_id, result }) => {
                assert_eq!(temp_id, temp);
                assert!(result.is_ok());
            }
            other => panic!("unexpected {:?}", other),
        }
        let confirmed = queue.confirm_create(&temp, &ItemId::from("real-1")).unwrap();
        assert!(confirmed.dirty);
        assert!(!queue.is_temporary(&temp));
    }

    #[tokio::test]
    async fn test_retry_requires_failed_create() {
        let remote = Arc::new(InMemoryRemote::new());
        remote.fail_next_creates(1);
        let mut queue = queue(&remote);

        let temp = queue.mint_task_id();
        queue.submit_create(temp.clone(), NewTask::new("Flaky", Status::Todo));
        assert!(matches!(queue.retry_create(&temp), Err(DomainError::Conflict(_))));

        match queue.next().await {
            Some(SyncMessage::Created { result: Err(_), .. }) => queue.mark_create_failed(&temp),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(queue.create_state(&temp), Some(SyncState::Error));

        queue.retry_create(&temp).unwrap();
        assert_eq!(queue.create_state(&temp), Some(SyncState::Pending));
        match queue.next().await {
            Some(SyncMessage::Created { result: Ok(record), .. }) => {
                assert_eq!(record.id, ItemId::from("real-1"))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            remote.calls(),
            vec![
                RemoteCall::Create(NewTask::new("Flaky", Status::Todo)),
                RemoteCall::Create(NewTask::new("Flaky", Status::Todo)),
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_of_unconfirmed_task_is_deferred() {
        let remote = Arc::new(InMemoryRemote::new());
        let mut queue = queue(&remote);

        let temp = queue.mint_task_id();
        queue.submit_create(temp.clone(), NewTask::new("Gone", Status::Todo));
        queue.delete(&temp);
        assert!(queue.pending_creates().is_empty());

        queue.next().await;
        let confirmed = queue.confirm_create(&temp, &ItemId::from("real-1")).unwrap();
        assert!(confirmed.deleted);
        assert!(!remote.calls().iter().any(|call| matches!(call, RemoteCall::Delete(_))));
    }

    #[tokio::test]
    async fn test_deleting_failed_create_forgets_it() {
        let remote = Arc::new(InMemoryRemote::new());
        remote.fail_next_creates(1);
        let mut queue = queue(&remote);

        let temp = queue.mint_task_id();
        let event = queue.mint_event_id(&temp);
        queue.submit_create(temp.clone(), NewTask::new("Doomed", Status::Todo));
        queue.next().await;
        queue.mark_create_failed(&temp);
        assert_eq!(queue.failed_creates(), vec![temp.clone()]);

        queue.delete(&temp);
        assert!(!queue.is_temporary(&temp));
        assert!(!queue.is_temporary_event(&event));
        assert!(queue.failed_creates().is_empty());
        assert!(matches!(queue.retry_create(&temp), Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unsent_events_follow_confirmed_id() {
        let remote = Arc::new(InMemoryRemote::new());
        let mut queue = queue(&remote);

        let temp = queue.mint_task_id();
        let event = queue.mint_event_id(&temp);
        queue.submit_create(temp.clone(), NewTask::new("Meeting", Status::Todo));
        queue.next().await;

        let real = ItemId::from("real-1");
        queue.confirm_create(&temp, &real).unwrap();
        queue.drop_events(&temp);
        assert!(queue.is_temporary_event(&event));

        queue.drop_events(&real);
        assert!(!queue.is_temporary_event(&event));
    }
}
