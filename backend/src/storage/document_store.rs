//! # JSON Document Store
//!
//! A realtime document store holding one JSON tree, optionally persisted to
//! `database.json` inside a data directory.
//!
//! ## File Structure
//!
//! ```text
//! data/
//! ├── config.yaml
//! ├── database.json        ← This module manages this file
//! └── local_storage/
//! ```
//!
//! ## Semantics
//!
//! - Writes are serialized by a mutex around the tree
//! - Every write is applied to a copy, persisted, then swapped in, so a failed
//!   disk write leaves the in-memory tree untouched
//! - Null values are never stored: writing `null` deletes, and parents left
//!   empty by a delete are pruned
//! - Listeners are notified after the lock is released, so callbacks may read
//!   or write the store

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use uuid::Uuid;

use super::paths;
use super::traits::{DocumentStore, Listener, Subscription};

const DATABASE_FILE: &str = "database.json";

/// Document store backed by an in-memory JSON tree
#[derive(Clone)]
pub struct JsonDocumentStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    tree: Mutex<Value>,
    file_path: Option<PathBuf>,
    listeners: Mutex<Vec<ListenerEntry>>,
    next_listener_id: AtomicU64,
}

struct ListenerEntry {
    id: u64,
    path: Vec<String>,
    listener: Listener,
}

type Notification = (Listener, Option<Value>);

impl JsonDocumentStore {
    /// Create a store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::with_tree(Value::Object(Map::new()), None)
    }

    /// Open (or create) a store persisted under `directory`
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref();
        if !directory.exists() {
            fs::create_dir_all(directory)
                .with_context(|| format!("Failed to create data directory {:?}", directory))?;
            info!("Created data directory: {:?}", directory);
        }

        let file_path = directory.join(DATABASE_FILE);
        let tree = if file_path.exists() {
            let content = fs::read_to_string(&file_path)
                .with_context(|| format!("Failed to read {:?}", file_path))?;
            if content.trim().is_empty() {
                Value::Object(Map::new())
            } else {
                serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse {:?}", file_path))?
            }
        } else {
            Value::Object(Map::new())
        };

        if !tree.is_object() {
            bail!("Document store root in {:?} must be a JSON object", file_path);
        }

        info!("Opened document store at {:?}", file_path);
        Ok(Self::with_tree(tree, Some(file_path)))
    }

    fn with_tree(tree: Value, file_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                tree: Mutex::new(tree),
                file_path,
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(1),
            }),
        }
    }

    /// Location of the backing file, if this store is persisted
    pub fn file_path(&self) -> Option<&Path> {
        self.inner.file_path.as_deref()
    }

    /// Number of live listener registrations
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    fn lock_tree(&self) -> Result<MutexGuard<'_, Value>> {
        self.inner
            .tree
            .lock()
            .map_err(|_| anyhow::anyhow!("Document store lock poisoned"))
    }

    fn apply_writes(&self, writes: Vec<(Vec<String>, Value)>) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let notifications = {
            let mut tree = self.lock_tree()?;
            let mut next = tree.clone();
            for (path, value) in &writes {
                write_at(&mut next, path, prune_nulls(value.clone()));
            }
            self.persist(&next)?;
            *tree = next;

            let changed: Vec<&[String]> = writes.iter().map(|(p, _)| p.as_slice()).collect();
            self.collect_notifications(&tree, &changed)
        };

        for (listener, value) in notifications {
            listener(value);
        }
        Ok(())
    }

    fn collect_notifications(&self, tree: &Value, changed: &[&[String]]) -> Vec<Notification> {
        let listeners = match self.inner.listeners.lock() {
            Ok(listeners) => listeners,
            Err(_) => {
                warn!("Listener registry lock poisoned; skipping notifications");
                return Vec::new();
            }
        };

        listeners
            .iter()
            .filter(|entry| changed.iter().any(|path| overlaps(&entry.path, path)))
            .map(|entry| {
                let value = value_at(tree, &entry.path).cloned();
                (entry.listener.clone(), value)
            })
            .collect()
    }

    fn persist(&self, tree: &Value) -> Result<()> {
        let Some(file_path) = &self.inner.file_path else {
            return Ok(());
        };

        let content = serde_json::to_string_pretty(tree)?;

        // Atomic write using temp file
        let temp_path = file_path.with_extension("tmp");
        fs::write(&temp_path, content)
            .with_context(|| format!("Failed to write {:?}", temp_path))?;
        fs::rename(&temp_path, file_path)
            .with_context(|| format!("Failed to replace {:?}", file_path))?;

        debug!("Persisted document store to {:?}", file_path);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let segments = owned_segments(path);
        let tree = self.lock_tree()?;
        Ok(value_at(&tree, &segments).cloned())
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        debug!("set {}", path);
        self.apply_writes(vec![(owned_segments(path), value)])
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<()> {
        debug!("update {} ({} fields)", path, fields.len());
        let base = owned_segments(path);
        let writes = fields
            .into_iter()
            .map(|(field, value)| {
                let mut full = base.clone();
                full.extend(owned_segments(&field));
                (full, value)
            })
            .collect();
        self.apply_writes(writes)
    }

    async fn push(&self, collection: &str) -> Result<String> {
        if paths::segments(collection).is_empty() {
            bail!("Cannot push into the store root");
        }
        Ok(generate_push_key())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        debug!("remove {}", path);
        self.apply_writes(vec![(owned_segments(path), Value::Null)])
    }

    async fn multi_update(&self, writes: Vec<(String, Value)>) -> Result<()> {
        debug!("multi_update ({} paths)", writes.len());
        let writes = writes
            .into_iter()
            .map(|(path, value)| (owned_segments(&path), value))
            .collect();
        self.apply_writes(writes)
    }

    fn subscribe(&self, path: &str, listener: Listener) -> Result<Subscription> {
        let segments = owned_segments(path);
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);

        let current = {
            let tree = self.lock_tree()?;
            let mut listeners = self
                .inner
                .listeners
                .lock()
                .map_err(|_| anyhow::anyhow!("Listener registry lock poisoned"))?;
            listeners.push(ListenerEntry {
                id,
                path: segments.clone(),
                listener: listener.clone(),
            });
            value_at(&tree, &segments).cloned()
        };

        debug!("Registered listener {} on {}", id, path);
        listener(current);

        let registry: Weak<StoreInner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = registry.upgrade() {
                if let Ok(mut listeners) = inner.listeners.lock() {
                    listeners.retain(|entry| entry.id != id);
                    debug!("Removed listener {}", id);
                }
            }
        }))
    }
}

/// Time-ordered, collision-resistant key: `<epoch millis>-<random hex>`
static PUSH_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// `{millis}-{sequence}{random}`: sorts in creation order within a process,
/// including keys minted in the same millisecond
fn generate_push_key() -> String {
    let millis = Utc::now().timestamp_millis();
    let sequence = PUSH_SEQUENCE.fetch_add(1, Ordering::Relaxed) & 0xffff_ffff;
    let random = Uuid::new_v4().simple().to_string();
    format!("{:013}-{:08x}{}", millis, sequence, &random[..4])
}

fn owned_segments(path: &str) -> Vec<String> {
    paths::segments(path).into_iter().map(str::to_string).collect()
}

/// True when one path is an ancestor of (or equal to) the other
fn overlaps(a: &[String], b: &[String]) -> bool {
    let len = a.len().min(b.len());
    a[..len] == b[..len]
}

fn value_at<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, segment| node.get(segment))
}

fn write_at(root: &mut Value, path: &[String], value: Value) {
    if value.is_null() {
        if path.is_empty() {
            *root = Value::Object(Map::new());
        } else {
            remove_at(root, path);
        }
        return;
    }

    let mut node = root;
    for segment in path {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map.entry(segment.clone()).or_insert(Value::Null),
            // converted to an object just above
            _ => unreachable!(),
        };
    }
    *node = value;
}

/// Remove the node at `path`; returns true when `node` is left empty
fn remove_at(node: &mut Value, path: &[String]) -> bool {
    let Some((first, rest)) = path.split_first() else {
        return false;
    };
    let Value::Object(map) = node else {
        return false;
    };

    if rest.is_empty() {
        map.remove(first);
    } else if let Some(child) = map.get_mut(first) {
        if remove_at(child, rest) {
            map.remove(first);
        }
    }
    map.is_empty()
}

/// Drop null fields and empty objects; an object that prunes to nothing becomes null
fn prune_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, prune_nulls(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if pruned.is_empty() {
                Value::Null
            } else {
                Value::Object(pruned)
            }
        }
        other => other,
    }
}
