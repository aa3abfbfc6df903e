//! In-process stand-in for the remote store.
//!
//! Keeps the whole database as one JSON tree with the same path semantics as
//! the Firebase REST API: writing `null` deletes, empty arrays and objects are
//! never stored, deleting the last child of a node removes the node, and reads
//! can address into nested records. Used by the test suite and by the CLI's
//! `--memory` mode.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::error::{JoinError, Result};
use crate::store::{RemoteStore, Revision};

#[derive(Debug, Default)]
pub struct MemoryStore {
    root: RwLock<Value>,
    writes: AtomicU64,
    deletes: AtomicU64,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_data(Value::Object(Map::new()))
    }

    /// Starts from an existing database snapshot
    pub fn with_data(data: Value) -> Self {
        Self {
            root: RwLock::new(data),
            ..Self::default()
        }
    }

    /// Number of successful writes (including conditional ones) so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> u64 {
        self.deletes.load(Ordering::SeqCst)
    }

    /// While offline every call fails with a 503, as an unreachable backend would
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Full copy of the database
    pub async fn snapshot(&self) -> Value {
        self.root.read().await.clone()
    }

    fn ensure_online(&self, path: &str) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(JoinError::Status {
                status: 503,
                path: path.to_string(),
            });
        }
        Ok(())
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut node = root;
    for segment in path {
        node = match node {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

/// Arrays are only a read-side encoding; nested writes go through objects.
fn as_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        let map = match node.take() {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .filter(|(_, v)| !v.is_null())
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => Map::new(),
        };
        *node = Value::Object(map);
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

fn insert(root: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return;
    };
    let mut node = root;
    for segment in parents {
        node = as_object(node)
            .entry(segment.to_string())
            .or_insert(Value::Null);
    }
    as_object(node).insert(last.to_string(), value);
}

/// Removes the node at `path`; returns whether `node` is left empty.
fn remove(node: &mut Value, path: &[&str]) -> bool {
    let Some((first, rest)) = path.split_first() else {
        *node = Value::Null;
        return true;
    };
    if !node.is_object() && !node.is_array() {
        return node.is_null();
    }
    let map = as_object(node);
    let child_empty = match map.get_mut(*first) {
        Some(child) => remove(child, rest),
        None => false,
    };
    if child_empty {
        map.remove(*first);
    }
    map.is_empty()
}

/// Drops `null`s and empty containers; `None` when nothing is left to store.
fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .filter_map(|(key, child)| prune(child).map(|child| (key, child)))
                .collect();
            (!map.is_empty()).then_some(Value::Object(map))
        }
        Value::Array(items) => {
            let items: Vec<Value> = items
                .into_iter()
                .map(|item| prune(item).unwrap_or(Value::Null))
                .collect();
            items
                .iter()
                .any(|item| !item.is_null())
                .then_some(Value::Array(items))
        }
        other => Some(other),
    }
}

fn store_at(root: &mut Value, path: &[&str], value: &Value) {
    match prune(value.clone()) {
        Some(value) => insert(root, path, value),
        None => {
            remove(root, path);
        }
    }
}

fn revision_of(value: Option<&Value>) -> Revision {
    let mut hasher = DefaultHasher::new();
    match value {
        Some(v) => v.to_string().hash(&mut hasher),
        None => "null".hash(&mut hasher),
    }
    Revision(format!("{:016x}", hasher.finish()))
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<Value>> {
        self.ensure_online(path)?;
        let root = self.root.read().await;
        Ok(lookup(&root, &segments(path)).cloned())
    }

    async fn write(&self, path: &str, value: &Value) -> Result<()> {
        self.ensure_online(path)?;
        let segs = segments(path);
        let mut root = self.root.write().await;
        store_at(&mut root, &segs, value);
        if root.is_null() {
            *root = Value::Object(Map::new());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.ensure_online(path)?;
        let mut root = self.root.write().await;
        remove(&mut root, &segments(path));
        if root.is_null() {
            *root = Value::Object(Map::new());
        }
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_versioned(&self, path: &str) -> Result<(Option<Value>, Revision)> {
        self.ensure_online(path)?;
        let root = self.root.read().await;
        let value = lookup(&root, &segments(path)).cloned();
        let revision = revision_of(value.as_ref());
        Ok((value, revision))
    }

    async fn write_if(&self, path: &str, value: &Value, revision: &Revision) -> Result<bool> {
        self.ensure_online(path)?;
        let segs = segments(path);
        let mut root = self.root.write().await;
        if revision_of(lookup(&root, &segs)) != *revision {
            return Ok(false);
        }
        store_at(&mut root, &segs, value);
        if root.is_null() {
            *root = Value::Object(Map::new());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}
