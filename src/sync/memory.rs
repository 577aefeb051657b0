//! In-Memory Remote Store
//!
//! Keeps tasks as JSON documents and records every call. Failures can be
//! injected per operation kind.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::remote::RemoteStore;
use crate::entity::{DomainError, DomainResult};
use crate::models::{ConfirmedRecord, ItemId, NewEvent, NewTask, TaskPatch};

/// A call received by the in-memory store
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Create(NewTask),
    Update(ItemId, TaskPatch),
    Delete(ItemId),
    CreateEvent(ItemId, NewEvent),
}

#[derive(Debug)]
struct MemoryState {
    next_id: u64,
    tasks: BTreeMap<ItemId, Value>,
    calls: Vec<RemoteCall>,
    fail_creates: usize,
    fail_updates: bool,
    fail_deletes: bool,
}

#[derive(Debug)]
pub struct InMemoryRemote {
    state: Mutex<MemoryState>,
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::with_next_id(1)
    }
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start assigning ids at `real-<next_id>`
    pub fn with_next_id(next_id: u64) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_id,
                tasks: BTreeMap::new(),
                calls: Vec::new(),
                fail_creates: 0,
                fail_updates: false,
                fail_deletes: false,
            }),
        }
    }

    /// Seed a stored task, e.g. one loaded at startup
    pub fn insert(&self, id: impl Into<ItemId>, task: Value) {
        self.state.lock().tasks.insert(id.into(), task);
    }

    /// Fail the next `n` creates with a network error
    pub fn fail_next_creates(&self, n: usize) {
        self.state.lock().fail_creates = n;
    }

    pub fn fail_updates(&self, fail: bool) {
        self.state.lock().fail_updates = fail;
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.state.lock().fail_deletes = fail;
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().calls.clone()
    }

    pub fn update_calls(&self) -> Vec<(ItemId, TaskPatch)> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RemoteCall::Update(id, patch) => Some((id.clone(), patch.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn task(&self, id: &ItemId) -> Option<Value> {
        self.state.lock().tasks.get(id).cloned()
    }

    pub fn task_count(&self) -> usize {
        self.state.lock().tasks.len()
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> DomainResult<Value> {
    serde_json::to_value(value).map_err(|e| DomainError::Internal(e.to_string()))
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn create(&self, task: &NewTask) -> DomainResult<ConfirmedRecord> {
        let mut state = self.state.lock();
        state.calls.push(RemoteCall::Create(task.clone()));

        if state.fail_creates > 0 {
            state.fail_creates -= 1;
            return Err(DomainError::Network("injected create failure".to_string()));
        }

        let id = ItemId::new(format!("real-{}", state.next_id));
        state.next_id += 1;

        let mut document = to_json(task)?;
        if let Value::Object(fields) = &mut document {
            fields.insert("id".to_string(), Value::String(id.to_string()));
            fields.insert("events".to_string(), Value::Array(Vec::new()));
        }
        state.tasks.insert(id.clone(), document);

        Ok(ConfirmedRecord {
            id,
            created_at: Some(chrono::Utc::now().timestamp_millis()),
        })
    }

    async fn update(&self, id: &ItemId, patch: &TaskPatch) -> DomainResult<()> {
        let mut state = self.state.lock();
        state.calls.push(RemoteCall::Update(id.clone(), patch.clone()));

        if state.fail_updates {
            return Err(DomainError::Network("injected update failure".to_string()));
        }

        let changes = to_json(patch)?;
        let document = state
            .tasks
            .get_mut(id)
            .ok_or_else(|| DomainError::NotFound(format!("task {}", id)))?;

        if let (Value::Object(fields), Value::Object(changes)) = (document, changes) {
            fields.extend(changes);
        }
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> DomainResult<()> {
        let mut state = self.state.lock();
        state.calls.push(RemoteCall::Delete(id.clone()));

        if state.fail_deletes {
            return Err(DomainError::Network("injected delete failure".to_string()));
        }

        state
            .tasks
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DomainError::NotFound(format!("task {}", id)))
    }

    async fn create_event(
        &self,
        task_id: &ItemId,
        event: &NewEvent,
    ) -> DomainResult<ConfirmedRecord> {
        let mut state = self.state.lock();
        state.calls.push(RemoteCall::CreateEvent(task_id.clone(), event.clone()));

        let id = ItemId::new(format!("event-{}", state.next_id));
        state.next_id += 1;

        let mut entry = to_json(event)?;
        if let Value::Object(fields) = &mut entry {
            fields.insert("id".to_string(), Value::String(id.to_string()));
        }

        let document = state
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| DomainError::NotFound(format!("task {}", task_id)))?;
        if let Some(Value::Array(events)) = document.get_mut("events") {
            events.push(entry);
        }

        Ok(ConfirmedRecord {
            id,
            created_at: Some(event.created_at),
        })
    }
}
