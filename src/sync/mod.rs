//! Remote Synchronization
//!
//! The remote store contract, its implementations, and the optimistic
//! mutation queue that feeds it.

mod memory;
mod queue;
mod remote;
mod rest;

pub use memory::{InMemoryRemote, RemoteCall};
pub use queue::MutationQueue;
pub use remote::RemoteStore;
pub use rest::{status_error, RestRemote};

pub(crate) use queue::SyncMessage;

use crate::entity::DomainError;
use crate::models::ItemId;

/// Outcome of a background request, once applied to local state
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The store assigned `id`; `temp_id` no longer exists locally
    Confirmed { temp_id: ItemId, id: ItemId },
    /// The task is now tagged `Error` and can be retried
    CreateFailed { temp_id: ItemId, error: DomainError },
    /// The create confirmed after the local task was deleted or undone
    Discarded { temp_id: ItemId, id: ItemId },
    EventConfirmed {
        task_id: ItemId,
        temp_event_id: ItemId,
        id: ItemId,
    },
    /// The activity entry stays local only
    EventFailed {
        task_id: ItemId,
        temp_event_id: ItemId,
        error: DomainError,
    },
}
