//! Remote Store Contract
//!
//! The persistence backend the board syncs against. Implementations can
//! be HTTP, in-memory, etc. The store assigns real ids on create.

use async_trait::async_trait;

use crate::entity::DomainResult;
use crate::models::{ConfirmedRecord, ItemId, NewEvent, NewTask, TaskPatch};

/// CRUD operations the mutation queue relies on
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Persist a new task and return its store-assigned id
    async fn create(&self, task: &NewTask) -> DomainResult<ConfirmedRecord>;

    /// Apply a partial update
    async fn update(&self, id: &ItemId, patch: &TaskPatch) -> DomainResult<()>;

    /// Delete a task
    async fn delete(&self, id: &ItemId) -> DomainResult<()>;

    /// Attach an activity entry to an existing task
    async fn create_event(
        &self,
        task_id: &ItemId,
        event: &NewEvent,
    ) -> DomainResult<ConfirmedRecord>;
}
