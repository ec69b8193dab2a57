//! Pokémon TCG Pocket collection SDK for Rust.
//!
//! Fetches the card catalog from the TCGdex API, memoizes it in-process, and
//! reconciles it with a user's owned quantities kept in a document store to
//! produce per-set completion statistics and filtered card views.
//!
//! # Quick start
//!
//! ```no_run
//! use tcgp_collection::{CardFilter, SetSelection, TcgpSdk};
//!
//! # async fn example() -> tcgp_collection::Result<()> {
//! let sdk = TcgpSdk::builder().build()?;
//!
//! // Catalog
//! let sets = sdk.catalog().get_sets().await?;
//! let cards = sdk.catalog().get_set_cards(&sets[0].id).await?;
//!
//! // Collection
//! let collection = sdk.collection("user-123");
//! collection.set_quantity(&cards[0].id, 2).await?;
//! let summary = sdk
//!     .collection_summary("user-123", &SetSelection::All, &CardFilter::new("pika", false))
//!     .await?;
//! println!("{} cards owned", summary.total_owned);
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "blocking")]
pub mod blocking;
pub mod catalog;
pub mod collection;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod profile;
pub mod store;

#[cfg(feature = "blocking")]
pub use blocking::BlockingTcgpSdk;
pub use catalog::{CacheKey, CatalogCache, SetSelection};
pub use collection::{
    compute_stats, filter_cards, total_owned, CardFilter, CollectionService, CollectionSummary,
    CollectionWatch, FriendCollection, QuantityInput,
};
pub use config::Config;
pub use error::{Result, TcgpError};
pub use http::{CatalogBackend, ReqwestBackend};
pub use models::{Card, ExpansionStats, OwnedQuantityMap, Set, UserProfile};
pub use profile::ProfileService;
pub use store::{
    ArrayUpdate, DocumentSnapshot, DocumentStore, MemoryStore, SetOptions, Subscription,
};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// TcgpSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`TcgpSdk`] instance.
///
/// Use [`TcgpSdk::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](TcgpSdkBuilder::build) to create the SDK.
pub struct TcgpSdkBuilder {
    config: Config,
    backend: Option<Arc<dyn CatalogBackend>>,
    store: Option<Arc<dyn DocumentStore>>,
}

impl Default for TcgpSdkBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            backend: None,
            store: None,
        }
    }
}

impl TcgpSdkBuilder {
    /// Start from [`Config::from_env`] instead of the built-in defaults.
    pub fn from_env() -> Self {
        Self {
            config: Config::from_env(),
            ..Self::default()
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Set the TCGdex API root, including the language segment
    /// (e.g. `https://api.tcgdex.net/v2/en`).
    pub fn base_url(mut self, url: &str) -> Self {
        self.config.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Set the series whose sets make up the catalog. Defaults to `tcgp`.
    pub fn series_id(mut self, series_id: &str) -> Self {
        self.config.series_id = series_id.to_string();
        self
    }

    /// Set the HTTP request timeout. Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Upper bound on simultaneous set fetches when building the all-cards
    /// view. Defaults to 4.
    pub fn max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.config.max_concurrent_fetches = limit;
        self
    }

    /// Use a custom catalog transport instead of the default `reqwest` one.
    pub fn backend(mut self, backend: Arc<dyn CatalogBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use the given document store. Defaults to an empty [`MemoryStore`].
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Validate the configuration and build the SDK. No network traffic
    /// happens here; the catalog is fetched lazily.
    pub fn build(self) -> Result<TcgpSdk> {
        if self.config.base_url.is_empty() {
            return Err(TcgpError::InvalidArgument("base URL must not be empty".into()));
        }
        if self.config.series_id.is_empty() {
            return Err(TcgpError::InvalidArgument("series id must not be empty".into()));
        }
        if self.config.max_concurrent_fetches == 0 {
            return Err(TcgpError::InvalidArgument(
                "max_concurrent_fetches must be at least 1".into(),
            ));
        }

        let backend = match self.backend {
            Some(backend) => backend,
            None => Arc::new(ReqwestBackend::new(self.config.timeout)?),
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn DocumentStore>);

        Ok(TcgpSdk {
            catalog: Arc::new(CatalogCache::new(self.config, backend)),
            store,
        })
    }
}

// ---------------------------------------------------------------------------
// TcgpSdk
// ---------------------------------------------------------------------------

/// The main entry point.
///
/// Owns the process-wide [`CatalogCache`] and the [`DocumentStore`] handle,
/// and hands out per-user services. Cheap to share behind an `Arc`.
pub struct TcgpSdk {
    catalog: Arc<CatalogCache>,
    store: Arc<dyn DocumentStore>,
}

impl TcgpSdk {
    /// Create a new builder for configuring the SDK.
    pub fn builder() -> TcgpSdkBuilder {
        TcgpSdkBuilder::default()
    }

    /// Access the catalog cache.
    pub fn catalog(&self) -> &CatalogCache {
        &self.catalog
    }

    /// Shared handle to the catalog cache, for handing to other tasks.
    pub fn catalog_handle(&self) -> Arc<CatalogCache> {
        self.catalog.clone()
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    /// Collection reads and writes for `user_id`.
    pub fn collection(&self, user_id: &str) -> CollectionService {
        CollectionService::new(self.store.clone(), user_id)
    }

    /// Profile and friend operations on behalf of `user_id`.
    pub fn profiles(&self, user_id: &str) -> ProfileService {
        ProfileService::new(self.store.clone(), user_id)
    }

    /// One-shot summary of `user_id`'s collection over the selected cards.
    ///
    /// Live views should prefer [`CollectionService::watch`] and
    /// [`CollectionWatch::summary`].
    pub async fn collection_summary(
        &self,
        user_id: &str,
        selection: &SetSelection,
        filter: &CardFilter,
    ) -> Result<CollectionSummary> {
        let cards = self.catalog.cards_for(selection).await?;
        let owned = self.collection(user_id).load().await?;
        Ok(CollectionSummary::build(&cards, &owned, filter))
    }

    /// Discard the memoized catalog so the next read goes to the network.
    pub fn refresh_catalog(&self) {
        self.catalog.clear_cache();
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for TcgpSdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.catalog.config();
        write!(
            f,
            "TcgpSdk(base_url={}, series={}, cached=[{}])",
            config.base_url,
            config.series_id,
            self.catalog.cached_keys().join(", ")
        )
    }
}
