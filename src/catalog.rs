//! Memoizing client for the TCGdex card catalog.
//!
//! Sets and per-set card lists are fetched lazily on first access and kept
//! for the lifetime of the [`CatalogCache`]. Nothing expires; only
//! [`CatalogCache::clear_cache`] forces a re-fetch. Concurrent callers asking
//! for the same key share a single in-flight request.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::stream::{self, StreamExt};
use tokio::sync::OnceCell;

use crate::config::Config;
use crate::error::{Result, TcgpError};
use crate::http::CatalogBackend;
use crate::models::{Card, RawSeries, RawSetDetail, Set};

type Slot<T> = Arc<OnceCell<Arc<[T]>>>;

// ---------------------------------------------------------------------------
// CacheKey
// ---------------------------------------------------------------------------

/// Key of one memoized catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    /// The set list of the configured series.
    Sets,
    /// Cards of one set, rendered as `set_<id>`.
    Set(String),
    /// Flattened cards of every set.
    AllCards,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sets => f.write_str("sets"),
            Self::Set(id) => write!(f, "set_{id}"),
            Self::AllCards => f.write_str("all_cards"),
        }
    }
}

// ---------------------------------------------------------------------------
// SetSelection
// ---------------------------------------------------------------------------

/// Which slice of the catalog a view is showing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SetSelection {
    #[default]
    All,
    Set(String),
}

impl From<&str> for SetSelection {
    /// `"all"` (any case) selects every set; anything else is a set id.
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Set(value.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// CatalogCache
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Tables {
    sets: Slot<Set>,
    cards: HashMap<CacheKey, Slot<Card>>,
}

/// Aggregation outcome that must not be memoized.
enum AllCardsError {
    Failed(TcgpError),
    Partial(Arc<[Card]>),
}

/// Process-wide catalog cache.
///
/// Construct once and share (it is `Send + Sync`); returned slices are
/// immutable `Arc`s so no caller can corrupt a cached entry.
pub struct CatalogCache {
    config: Config,
    backend: Arc<dyn CatalogBackend>,
    tables: Mutex<Tables>,
}

impl CatalogCache {
    pub fn new(config: Config, backend: Arc<dyn CatalogBackend>) -> Self {
        Self {
            config,
            backend,
            tables: Mutex::new(Tables::default()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn card_slot(&self, key: CacheKey) -> Slot<Card> {
        self.tables().cards.entry(key).or_default().clone()
    }

    /// Forget a slot whose fetch failed, unless a later caller filled it or
    /// the tables were cleared since.
    fn evict_empty(&self, key: &CacheKey, slot: &Slot<Card>) {
        let mut tables = self.tables();
        if let Some(current) = tables.cards.get(key) {
            if Arc::ptr_eq(current, slot) && !current.initialized() {
                tables.cards.remove(key);
            }
        }
    }

    /// List the sets of the configured series.
    pub async fn get_sets(&self) -> Result<Arc<[Set]>> {
        let slot = self.tables().sets.clone();
        if let Some(sets) = slot.get() {
            tracing::debug!(key = %CacheKey::Sets, "catalog cache hit");
            return Ok(sets.clone());
        }
        let sets = slot.get_or_try_init(|| self.fetch_sets()).await?;
        Ok(sets.clone())
    }

    /// Look a single set up by id in the set list.
    pub async fn get_set(&self, set_id: &str) -> Result<Option<Set>> {
        let sets = self.get_sets().await?;
        Ok(sets.iter().find(|s| s.id == set_id).cloned())
    }

    /// Cards of one set, each annotated with the set's id and name.
    ///
    /// Fails with [`TcgpError::NotFound`] when the API does not know the set.
    pub async fn get_set_cards(&self, set_id: &str) -> Result<Arc<[Card]>> {
        validate_set_id(set_id)?;
        let key = CacheKey::Set(set_id.to_string());
        let slot = self.card_slot(key.clone());
        if let Some(cards) = slot.get() {
            tracing::debug!(key = %key, "catalog cache hit");
            return Ok(cards.clone());
        }
        match slot.get_or_try_init(|| self.fetch_set_cards(set_id)).await {
            Ok(cards) => Ok(cards.clone()),
            Err(e) => {
                self.evict_empty(&key, &slot);
                Err(e)
            }
        }
    }

    /// Every card of every set, in set-list order.
    ///
    /// Sets whose cards cannot be fetched are logged and left out; only a
    /// failure to list the sets fails the call. A result with missing sets
    /// is returned but not memoized, so the next call retries them.
    pub async fn get_all_cards(&self) -> Result<Arc<[Card]>> {
        let slot = self.card_slot(CacheKey::AllCards);
        if let Some(cards) = slot.get() {
            tracing::debug!(key = %CacheKey::AllCards, "catalog cache hit");
            return Ok(cards.clone());
        }

        let outcome = slot
            .get_or_try_init(|| async {
                let (cards, failed) = match self.aggregate_all_cards().await {
                    Ok(outcome) => outcome,
                    Err(e) => return Err(AllCardsError::Failed(e)),
                };
                if failed.is_empty() {
                    Ok(cards)
                } else {
                    Err(AllCardsError::Partial(cards))
                }
            })
            .await;

        match outcome {
            Ok(cards) => Ok(cards.clone()),
            Err(AllCardsError::Partial(cards)) => Ok(cards),
            Err(AllCardsError::Failed(e)) => Err(e),
        }
    }

    /// Cards for a set selector: everything, or one set.
    pub async fn cards_for(&self, selection: &SetSelection) -> Result<Arc<[Card]>> {
        match selection {
            SetSelection::All => self.get_all_cards().await,
            SetSelection::Set(id) => self.get_set_cards(id).await,
        }
    }

    /// Drop every memoized entry. Fetches already in flight finish into the
    /// discarded tables and are not observed by later calls.
    pub fn clear_cache(&self) {
        *self.tables() = Tables::default();
        tracing::info!("catalog cache cleared");
    }

    /// Keys that currently hold a value, sorted.
    pub fn cached_keys(&self) -> Vec<String> {
        let tables = self.tables();
        let mut keys: Vec<CacheKey> = tables
            .cards
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(key, _)| key.clone())
            .collect();
        if tables.sets.initialized() {
            keys.push(CacheKey::Sets);
        }
        keys.sort();
        keys.into_iter().map(|k| k.to_string()).collect()
    }

    // -- Fetching ----------------------------------------------------------

    async fn fetch_sets(&self) -> Result<Arc<[Set]>> {
        let url = self.config.series_url();
        tracing::info!(series = %self.config.series_id, "fetching set list");
        let body = self.backend.get_json(&url).await?;
        let series: RawSeries = serde_json::from_value(body)
            .map_err(|e| TcgpError::upstream(&url, format!("unexpected series payload: {e}")))?;
        let sets = series
            .sets
            .ok_or_else(|| TcgpError::upstream(&url, "response has no `sets` field"))?;
        Ok(sets.into_iter().map(Set::from).collect())
    }

    async fn fetch_set_cards(&self, set_id: &str) -> Result<Arc<[Card]>> {
        let url = self.config.set_url(set_id);
        tracing::info!(set_id, "fetching set cards");
        let body = self.backend.get_json(&url).await?;
        let detail: RawSetDetail = serde_json::from_value(body)
            .map_err(|e| TcgpError::upstream(&url, format!("unexpected set payload: {e}")))?;
        let raw_cards = detail
            .cards
            .ok_or_else(|| TcgpError::upstream(&url, "response has no `cards` field"))?;
        Ok(raw_cards
            .into_iter()
            .map(|raw| raw.into_card(&detail.id, &detail.name))
            .collect())
    }

    /// Fan out over all sets with bounded parallelism. Returns the merged
    /// cards and the ids of sets that failed.
    async fn aggregate_all_cards(&self) -> Result<(Arc<[Card]>, Vec<String>)> {
        let sets = self.get_sets().await?;
        let limit = self.config.max_concurrent_fetches.max(1);

        let fetches: Vec<_> = sets.iter().map(|set| self.set_cards_entry(set)).collect();
        let results: Vec<(&str, Result<Arc<[Card]>>)> =
            stream::iter(fetches).buffered(limit).collect().await;

        let mut cards = Vec::new();
        let mut failed = Vec::new();
        for (set_id, result) in results {
            match result {
                Ok(set_cards) => cards.extend(set_cards.iter().cloned()),
                Err(e) => {
                    tracing::warn!(set_id, error = %e, "skipping set in all-cards view");
                    failed.push(set_id.to_string());
                }
            }
        }
        Ok((cards.into(), failed))
    }

    async fn set_cards_entry<'a>(&self, set: &'a Set) -> (&'a str, Result<Arc<[Card]>>) {
        (set.id.as_str(), self.get_set_cards(&set.id).await)
    }
}

fn validate_set_id(set_id: &str) -> Result<()> {
    if set_id.trim().is_empty() || set_id.contains(['/', '?', '#']) {
        return Err(TcgpError::InvalidArgument(format!("Invalid set id: {set_id:?}")));
    }
    Ok(())
}
