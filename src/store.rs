//! Document store abstraction.
//!
//! User profiles and collections live in a hosted document database. The
//! core only needs three capabilities from it -- read, merge-write and a
//! live subscription -- expressed by [`DocumentStore`]. [`MemoryStore`] is an
//! in-process implementation with the same live-update semantics.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::{Result, TcgpError};

/// Raw field map of one document.
pub type DocumentData = Map<String, Value>;

// ---------------------------------------------------------------------------
// DocumentSnapshot
// ---------------------------------------------------------------------------

/// A point-in-time view of one document, which may not exist.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentSnapshot {
    data: Option<DocumentData>,
}

impl DocumentSnapshot {
    pub fn missing() -> Self {
        Self { data: None }
    }

    pub fn new(data: DocumentData) -> Self {
        Self { data: Some(data) }
    }

    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&DocumentData> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<DocumentData> {
        self.data
    }
}

/// Options for [`DocumentStore::set_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetOptions {
    /// Merge top-level fields into the existing document instead of replacing it.
    pub merge: bool,
}

impl SetOptions {
    pub fn merge() -> Self {
        Self { merge: true }
    }
}

/// Atomic edit of an array field, applied by the store in one step.
///
/// `Union` appends values not already present; `Remove` drops every
/// occurrence of the given values. A missing or non-array field counts as
/// an empty array.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayUpdate {
    Union(Vec<Value>),
    Remove(Vec<Value>),
}

impl ArrayUpdate {
    fn apply(&self, field: Option<Value>) -> Value {
        let mut items = match field {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        match self {
            Self::Union(values) => {
                for value in values {
                    if !items.contains(value) {
                        items.push(value.clone());
                    }
                }
            }
            Self::Remove(values) => items.retain(|item| !values.contains(item)),
        }
        Value::Array(items)
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// One push from a live subscription: a fresh snapshot, or the error message
/// the store reported.
pub type SnapshotEvent = std::result::Result<DocumentSnapshot, String>;

/// Handle to a live document subscription.
///
/// Dropping the handle unsubscribes, so a subscription held in a scope is
/// released on every exit path.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<SnapshotEvent>,
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<F>(events: mpsc::UnboundedReceiver<SnapshotEvent>, unsubscribe: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            events,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Wait for the next event. `None` once the store has closed the stream.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        self.events.recv().await
    }

    /// Release the subscription now rather than at drop.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

/// Minimal document database capability used by the collection core.
///
/// Read failures are reported as [`TcgpError::Store`], write failures as
/// [`TcgpError::Write`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, collection: &str, id: &str) -> Result<DocumentSnapshot>;

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        data: DocumentData,
        options: SetOptions,
    ) -> Result<()>;

    /// Apply `update` to the array at `field` without a read-modify-write
    /// round trip, creating the document if needed. Concurrent updates to
    /// the same field must all take effect.
    async fn update_array(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        update: ArrayUpdate,
    ) -> Result<()>;

    /// Subscribe to a document. The current snapshot is delivered first,
    /// then one snapshot per change.
    async fn subscribe_document(&self, collection: &str, id: &str) -> Result<Subscription>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

type DocPath = (String, String);

#[derive(Default)]
struct MemoryInner {
    docs: HashMap<DocPath, DocumentData>,
    subscribers: HashMap<DocPath, Vec<(u64, mpsc::UnboundedSender<SnapshotEvent>)>>,
    next_subscriber: u64,
}

impl MemoryInner {
    fn snapshot(&self, path: &DocPath) -> DocumentSnapshot {
        self.docs
            .get(path)
            .cloned()
            .map(DocumentSnapshot::new)
            .unwrap_or_default()
    }

    fn publish(&mut self, path: &DocPath, event: SnapshotEvent) {
        if let Some(subs) = self.subscribers.get_mut(path) {
            subs.retain(|(_, tx)| tx.send(event.clone()).is_ok());
        }
    }
}

/// In-process [`DocumentStore`] with live fan-out to subscribers.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push an error to every subscriber of a document, as a hosted store
    /// does on permission loss or disconnect. Subscriptions stay open.
    pub fn report_error(&self, collection: &str, id: &str, message: &str) {
        let path = (collection.to_string(), id.to_string());
        self.inner().publish(&path, Err(message.to_string()));
    }

    /// Number of live subscriptions on a document.
    pub fn subscriber_count(&self, collection: &str, id: &str) -> usize {
        let path = (collection.to_string(), id.to_string());
        self.inner().subscribers.get(&path).map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<DocumentSnapshot> {
        let path = (collection.to_string(), id.to_string());
        Ok(self.inner().snapshot(&path))
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        data: DocumentData,
        options: SetOptions,
    ) -> Result<()> {
        if id.is_empty() {
            return Err(TcgpError::Write("document id must not be empty".into()));
        }
        let path = (collection.to_string(), id.to_string());
        let mut inner = self.inner();
        let doc = inner.docs.entry(path.clone()).or_default();
        if options.merge {
            doc.extend(data);
        } else {
            *doc = data;
        }
        let snapshot = inner.snapshot(&path);
        inner.publish(&path, Ok(snapshot));
        Ok(())
    }

    async fn update_array(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        update: ArrayUpdate,
    ) -> Result<()> {
        if id.is_empty() {
            return Err(TcgpError::Write("document id must not be empty".into()));
        }
        let path = (collection.to_string(), id.to_string());
        let mut inner = self.inner();
        let doc = inner.docs.entry(path.clone()).or_default();
        let updated = update.apply(doc.remove(field));
        doc.insert(field.to_string(), updated);
        let snapshot = inner.snapshot(&path);
        inner.publish(&path, Ok(snapshot));
        Ok(())
    }

    async fn subscribe_document(&self, collection: &str, id: &str) -> Result<Subscription> {
        let path = (collection.to_string(), id.to_string());
        let (tx, rx) = mpsc::unbounded_channel();

        let sub_id = {
            let mut inner = self.inner();
            let sub_id = inner.next_subscriber;
            inner.next_subscriber += 1;
            // Receiver is alive, so the initial send cannot fail.
            let _ = tx.send(Ok(inner.snapshot(&path)));
            inner.subscribers.entry(path.clone()).or_default().push((sub_id, tx));
            sub_id
        };

        let registry = Arc::downgrade(&self.inner);
        Ok(Subscription::new(rx, move || {
            if let Some(inner) = registry.upgrade() {
                let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(subs) = inner.subscribers.get_mut(&path) {
                    subs.retain(|(id, _)| *id != sub_id);
                    if subs.is_empty() {
                        inner.subscribers.remove(&path);
                    }
                }
            }
        }))
    }
}
