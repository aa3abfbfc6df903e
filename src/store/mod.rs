use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;

pub mod http;
pub mod memory;
pub mod session_file;

pub use http::{HttpStore, RetryPolicy};
pub use memory::MemoryStore;
pub use session_file::SessionFile;

/// Opaque version tag of a remote node, used for conditional writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision(pub String);

impl Revision {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A hierarchical JSON document store addressed by slash-separated paths
///
/// Paths have no leading slash and no `.json` suffix, e.g. `tickets/ticket/3`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Reads the node at `path`; a missing node or JSON `null` is `None`
    async fn read(&self, path: &str) -> Result<Option<Value>>;

    /// Replaces the node at `path`
    async fn write(&self, path: &str, value: &Value) -> Result<()>;

    /// Removes the node at `path`
    async fn delete(&self, path: &str) -> Result<()>;

    /// Reads the node together with its current revision
    async fn read_versioned(&self, path: &str) -> Result<(Option<Value>, Revision)>;

    /// Replaces the node only if it is still at `revision`.
    ///
    /// Returns `false` when someone else changed it first.
    async fn write_if(&self, path: &str, value: &Value, revision: &Revision) -> Result<bool>;
}

#[async_trait]
impl<S: RemoteStore + ?Sized> RemoteStore for Arc<S> {
    async fn read(&self, path: &str) -> Result<Option<Value>> {
        (**self).read(path).await
    }

    async fn write(&self, path: &str, value: &Value) -> Result<()> {
        (**self).write(path, value).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        (**self).delete(path).await
    }

    async fn read_versioned(&self, path: &str) -> Result<(Option<Value>, Revision)> {
        (**self).read_versioned(path).await
    }

    async fn write_if(&self, path: &str, value: &Value, revision: &Revision) -> Result<bool> {
        (**self).write_if(path, value, revision).await
    }
}

/// Where each record lives in the store
pub mod paths {
    use crate::domain::task::TaskId;

    pub const TICKETS: &str = "tickets/ticket";
    pub const TICKET_COUNTER: &str = "tickets/ticketCounter";
    pub const USERS: &str = "users";

    pub fn ticket(id: TaskId) -> String {
        format!("{}/{}", TICKETS, id)
    }

    pub fn ticket_status(id: TaskId) -> String {
        format!("{}/{}/status", TICKETS, id)
    }

    pub fn contacts(user_id: &str) -> String {
        format!("contacts/{}", user_id)
    }

    pub fn contact(user_id: &str, key: &str) -> String {
        format!("contacts/{}/{}", user_id, key)
    }

    pub fn user(key: &str) -> String {
        format!("{}/{}", USERS, key)
    }
}

/// Flattens a collection node into `(key, record)` pairs.
///
/// Firebase returns a JSON array (with `null` holes) instead of an object when
/// the keys are mostly consecutive integers, so both shapes are accepted.
/// `null` entries are skipped; any other scalar yields nothing.
pub fn collection_entries(value: Value) -> Vec<(String, Value)> {
    match value {
        Value::Object(map) => map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}
