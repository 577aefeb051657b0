//! Board Models
//!
//! Tasks, columns and the payloads exchanged with the remote store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entity::{DomainError, Entity};

// ========================
// Identifiers and Columns
// ========================

/// Opaque task identifier. Locally created tasks carry a temporary id
/// until the remote store assigns the real one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Board column (task status lane)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in_progress",
            Status::Done => "done",
        }
    }
}

impl std::str::FromStr for Status {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Status::Todo),
            "in_progress" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            other => Err(DomainError::InvalidInput(format!("unknown status '{}'", other))),
        }
    }
}

/// Sync tag shown next to optimistic tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    #[default]
    Synced,
    /// Create sent, not yet confirmed
    Pending,
    /// Create failed; retry is possible
    Error,
}

// ========================
// Task
// ========================

/// Activity entry attached to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub id: ItemId,
    pub text: String,
    pub created_at: i64,
}

/// A task on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub status: Status,
    /// Position within the column, dense from 0
    #[serde(default)]
    pub order: i32,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<i64>,
    #[serde(default)]
    pub events: Vec<TaskEvent>,
    #[serde(default)]
    pub sync_state: SyncState,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
    /// Fields this engine does not interpret, copied through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn new(
        id: impl Into<ItemId>,
        title: impl Into<String>,
        status: Status,
        order: i32,
    ) -> Self {
        Self {
            id: id.into(),
            status,
            order,
            title: title.into(),
            description: None,
            assignees: Vec::new(),
            client_id: None,
            due_date: None,
            events: Vec::new(),
            sync_state: SyncState::Synced,
            created_at: None,
            updated_at: None,
            extra: Map::new(),
        }
    }

    /// Build the local copy of a task that is about to be created
    pub fn from_new(id: ItemId, task: &NewTask) -> Self {
        Self {
            id,
            status: task.status,
            order: task.order,
            title: task.title.clone(),
            description: task.description.clone(),
            assignees: task.assignees.clone(),
            client_id: task.client_id.clone(),
            due_date: task.due_date,
            events: Vec::new(),
            sync_state: SyncState::Pending,
            created_at: Some(chrono::Utc::now().timestamp_millis()),
            updated_at: None,
            extra: task.extra.clone(),
        }
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

// ========================
// Remote Payloads
// ========================

/// Creation payload, kept for retry until the store confirms
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub status: Status,
    /// Provisional position; the board appends to the column
    #[serde(default)]
    pub order: i32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub assignees: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub due_date: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, status: Status) -> Self {
        Self {
            title: title.into(),
            status,
            ..Default::default()
        }
    }

    /// Payload that recreates `item` as it is now
    pub fn from_item(item: &Item) -> Self {
        Self {
            title: item.title.clone(),
            status: item.status,
            order: item.order,
            description: item.description.clone(),
            assignees: item.assignees.clone(),
            client_id: item.client_id.clone(),
            due_date: item.due_date,
            extra: item.extra.clone(),
        }
    }
}

/// Creation payload for an activity entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub text: String,
    pub created_at: i64,
}

/// What the store returns after a successful create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedRecord {
    pub id: ItemId,
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Partial update. Only the fields that are set are sent.
///
/// Nullable fields use `Option<Option<_>>`: `Some(None)` clears the value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<i64>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Column and order after a reorder
    pub fn position(status: Status, order: i32) -> Self {
        Self {
            status: Some(status),
            order: Some(order),
            ..Default::default()
        }
    }

    /// Every persisted field of `item`
    pub fn from_item(item: &Item) -> Self {
        Self {
            status: Some(item.status),
            order: Some(item.order),
            title: Some(item.title.clone()),
            description: Some(item.description.clone()),
            assignees: Some(item.assignees.clone()),
            client_id: Some(item.client_id.clone()),
            due_date: Some(item.due_date),
            extra: item.extra.clone(),
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_assignees(mut self, assignees: Vec<String>) -> Self {
        self.assignees = Some(assignees);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.order.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.assignees.is_none()
            && self.client_id.is_none()
            && self.due_date.is_none()
            && self.extra.is_empty()
    }

    /// Fold a later patch into this one; the later value wins per field
    pub fn merge(&mut self, later: TaskPatch) {
        if later.status.is_some() {
            self.status = later.status;
        }
        if later.order.is_some() {
            self.order = later.order;
        }
        if later.title.is_some() {
            self.title = later.title;
        }
        if later.description.is_some() {
            self.description = later.description;
        }
        if later.assignees.is_some() {
            self.assignees = later.assignees;
        }
        if later.client_id.is_some() {
            self.client_id = later.client_id;
        }
        if later.due_date.is_some() {
            self.due_date = later.due_date;
        }
        self.extra.extend(later.extra);
    }

    /// Write the set fields onto a local item
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(order) = self.order {
            item.order = order;
        }
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(assignees) = &self.assignees {
            item.assignees = assignees.clone();
        }
        if let Some(client_id) = &self.client_id {
            item.client_id = client_id.clone();
        }
        if let Some(due_date) = self.due_date {
            item.due_date = due_date;
        }
        for (key, value) in &self.extra {
            item.extra.insert(key.clone(), value.clone());
        }
    }
}
