//! Blocking wrapper around [`TcgpSdk`] for callers without an async runtime.
//!
//! Owns a current-thread Tokio runtime and drives each SDK future to
//! completion on the calling thread.
//!
//! # Example
//!
//! ```no_run
//! use tcgp_collection::{BlockingTcgpSdk, TcgpSdk};
//!
//! let sdk = BlockingTcgpSdk::new(TcgpSdk::builder()).unwrap();
//! let sets = sdk.get_sets().unwrap();
//! let cards = sdk.get_set_cards(&sets[0].id).unwrap();
//! sdk.set_quantity("user-123", &cards[0].id, 1).unwrap();
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::collection::{CardFilter, CollectionSummary, QuantityInput};
use crate::error::Result;
use crate::models::{Card, OwnedQuantityMap, Set};
use crate::{SetSelection, TcgpSdk, TcgpSdkBuilder};

/// Blocking facade over [`TcgpSdk`].
pub struct BlockingTcgpSdk {
    runtime: Runtime,
    inner: TcgpSdk,
}

impl BlockingTcgpSdk {
    /// Build the SDK from `builder` and start a private runtime for it.
    pub fn new(builder: TcgpSdkBuilder) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let inner = builder.build()?;
        Ok(Self { runtime, inner })
    }

    /// Drive any future to completion, e.g. one built from [`Self::sdk`].
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// The wrapped async SDK.
    pub fn sdk(&self) -> &TcgpSdk {
        &self.inner
    }

    pub fn get_sets(&self) -> Result<Arc<[Set]>> {
        self.block_on(self.inner.catalog().get_sets())
    }

    pub fn get_set_cards(&self, set_id: &str) -> Result<Arc<[Card]>> {
        self.block_on(self.inner.catalog().get_set_cards(set_id))
    }

    pub fn get_all_cards(&self) -> Result<Arc<[Card]>> {
        self.block_on(self.inner.catalog().get_all_cards())
    }

    pub fn clear_cache(&self) {
        self.inner.catalog().clear_cache();
    }

    pub fn load_collection(&self, user_id: &str) -> Result<OwnedQuantityMap> {
        self.block_on(self.inner.collection(user_id).load())
    }

    pub fn set_quantity(
        &self,
        user_id: &str,
        card_id: &str,
        quantity: impl Into<QuantityInput>,
    ) -> Result<u32> {
        let collection = self.inner.collection(user_id);
        self.block_on(collection.set_quantity(card_id, quantity))
    }

    pub fn collection_summary(
        &self,
        user_id: &str,
        selection: &SetSelection,
        filter: &CardFilter,
    ) -> Result<CollectionSummary> {
        self.block_on(self.inner.collection_summary(user_id, selection, filter))
    }
}
