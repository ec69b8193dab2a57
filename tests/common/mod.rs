//! Shared test fixtures for the integration tests.
//!
//! Provides a scripted [`FakeBackend`] that counts requests per URL, a
//! [`FailingStore`] whose writes always fail, a [`SlowReadStore`] that
//! widens read-then-write races, and `setup_sdk()` wiring them
//! into a [`TcgpSdk`] with a small two-set catalog.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tcgp_collection::store::{
    ArrayUpdate, DocumentData, DocumentSnapshot, DocumentStore, SetOptions, Subscription,
};
use tcgp_collection::{CatalogBackend, MemoryStore, Result, TcgpError, TcgpSdk};

pub const BASE_URL: &str = "https://api.test/v2/en";

/// Canned reply for one URL.
#[derive(Clone)]
pub enum FakeResponse {
    Json(Value),
    Status(u16),
}

/// Catalog backend serving canned responses keyed by URL path.
#[derive(Default)]
pub struct FakeBackend {
    responses: Mutex<HashMap<String, FakeResponse>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response, so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond(&self, path: &str, response: FakeResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), response);
    }

    /// Requests made for `path` so far.
    pub fn calls(&self, path: &str) -> usize {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogBackend for FakeBackend {
    async fn get_json(&self, url: &str) -> Result<Value> {
        let path = url.strip_prefix(BASE_URL).unwrap_or(url).to_string();
        *self.calls.lock().unwrap().entry(path.clone()).or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let response = self.responses.lock().unwrap().get(&path).cloned();
        match response {
            Some(FakeResponse::Json(body)) => Ok(body),
            Some(FakeResponse::Status(404)) | None => Err(TcgpError::NotFound(url.to_string())),
            Some(FakeResponse::Status(code)) => {
                Err(TcgpError::upstream(url, format!("HTTP status {code}")))
            }
        }
    }
}

/// Two sets: A1 with three cards, A2 with two.
pub fn sample_backend() -> FakeBackend {
    let backend = FakeBackend::new();
    register_catalog(&backend);
    backend
}

pub fn register_catalog(backend: &FakeBackend) {
    backend.respond(
        "/series/tcgp",
        FakeResponse::Json(json!({
            "id": "tcgp",
            "name": "Pokémon TCG Pocket",
            "sets": [
                { "id": "A1", "name": "Genetic Apex", "cardCount": { "official": 3, "total": 3 } },
                { "id": "A2", "name": "Space-Time Smackdown", "cardCount": { "official": 2 } }
            ]
        })),
    );
    backend.respond(
        "/sets/A1",
        FakeResponse::Json(json!({
            "id": "A1",
            "name": "Genetic Apex",
            "cards": [
                { "id": "A1-001", "name": "Bulbasaur", "localId": "001", "image": "https://assets.test/A1/001" },
                { "id": "A1-094", "name": "Pikachu", "localId": "094", "image": "https://assets.test/A1/094" },
                { "id": "A1-095", "name": "Raichu", "localId": "095" }
            ]
        })),
    );
    backend.respond(
        "/sets/A2",
        FakeResponse::Json(json!({
            "id": "A2",
            "name": "Space-Time Smackdown",
            "cards": [
                { "id": "A2-001", "name": "Oddish", "localId": "001" },
                { "id": "A2-050", "name": "Pachirisu", "localId": "050" }
            ]
        })),
    );
}

pub fn setup_sdk(backend: Arc<FakeBackend>, store: Arc<dyn DocumentStore>) -> TcgpSdk {
    TcgpSdk::builder()
        .base_url(BASE_URL)
        .backend(backend)
        .store(store)
        .build()
        .unwrap()
}

/// SDK over the sample catalog and an empty [`MemoryStore`].
pub fn setup_default() -> (TcgpSdk, Arc<FakeBackend>, MemoryStore) {
    let backend = Arc::new(sample_backend());
    let store = MemoryStore::new();
    let sdk = setup_sdk(backend.clone(), Arc::new(store.clone()));
    (sdk, backend, store)
}

/// Store that reads as empty and rejects every write and subscription.
pub struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn get_document(&self, _collection: &str, _id: &str) -> Result<DocumentSnapshot> {
        Ok(DocumentSnapshot::missing())
    }

    async fn set_document(
        &self,
        _collection: &str,
        _id: &str,
        _data: DocumentData,
        _options: SetOptions,
    ) -> Result<()> {
        Err(TcgpError::Write("permission denied".into()))
    }

    async fn update_array(
        &self,
        _collection: &str,
        _id: &str,
        _field: &str,
        _update: ArrayUpdate,
    ) -> Result<()> {
        Err(TcgpError::Write("permission denied".into()))
    }

    async fn subscribe_document(&self, _collection: &str, _id: &str) -> Result<Subscription> {
        Err(TcgpError::Store("offline".into()))
    }
}

/// [`MemoryStore`] whose reads take a while, so concurrent callers that
/// read before writing interleave.
#[derive(Clone, Default)]
pub struct SlowReadStore {
    pub inner: MemoryStore,
    pub read_delay: Duration,
}

impl SlowReadStore {
    pub fn new(inner: MemoryStore, read_delay: Duration) -> Self {
        Self { inner, read_delay }
    }
}

#[async_trait]
impl DocumentStore for SlowReadStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<DocumentSnapshot> {
        tokio::time::sleep(self.read_delay).await;
        self.inner.get_document(collection, id).await
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        data: DocumentData,
        options: SetOptions,
    ) -> Result<()> {
        self.inner.set_document(collection, id, data, options).await
    }

    async fn update_array(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        update: ArrayUpdate,
    ) -> Result<()> {
        self.inner.update_array(collection, id, field, update).await
    }

    async fn subscribe_document(&self, collection: &str, id: &str) -> Result<Subscription> {
        self.inner.subscribe_document(collection, id).await
    }
}
