//! Reconciles a user's owned quantities with catalog cards.
//!
//! The pure half ([`compute_stats`], [`filter_cards`], [`total_owned`]) turns
//! a card list and an [`OwnedQuantityMap`] into completion statistics and
//! filtered views. The I/O half ([`CollectionService`], [`CollectionWatch`])
//! reads, watches and writes the `collections/{userId}` document.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::COLLECTIONS_COLLECTION;
use crate::error::{Result, TcgpError};
use crate::models::{owned_from_document, Card, ExpansionStats, OwnedQuantityMap};
use crate::store::{DocumentData, DocumentSnapshot, DocumentStore, SetOptions, Subscription};

// ---------------------------------------------------------------------------
// Statistics and filtering
// ---------------------------------------------------------------------------

/// Per-set completion for the given cards, keyed by set id.
pub fn compute_stats(cards: &[Card], owned: &OwnedQuantityMap) -> BTreeMap<String, ExpansionStats> {
    let mut stats: BTreeMap<String, ExpansionStats> = BTreeMap::new();
    for card in cards {
        let entry = stats
            .entry(card.set_id.clone())
            .or_insert_with(|| ExpansionStats {
                set_id: card.set_id.clone(),
                set_name: card.set_name.clone(),
                total_cards: 0,
                unique_owned: 0,
                total_copies_owned: 0,
            });
        let qty = quantity_of(owned, &card.id);
        entry.total_cards += 1;
        if qty > 0 {
            entry.unique_owned += 1;
        }
        entry.total_copies_owned += u64::from(qty);
    }
    stats
}

/// Cards whose name contains `search_term` (case-insensitive) and, when
/// `owned_only`, that the user holds at least one copy of. Order is kept.
pub fn filter_cards(
    cards: &[Card],
    search_term: &str,
    owned_only: bool,
    owned: &OwnedQuantityMap,
) -> Vec<Card> {
    CardFilter::new(search_term, owned_only).apply(cards, owned)
}

/// Total copies owned across every card. Duplicates count.
pub fn total_owned(owned: &OwnedQuantityMap) -> u64 {
    owned.values().map(|&q| u64::from(q)).sum()
}

/// Owned quantity of one card, zero when absent.
pub fn quantity_of(owned: &OwnedQuantityMap, card_id: &str) -> u32 {
    owned.get(card_id).copied().unwrap_or(0)
}

/// Search criteria for a card list view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFilter {
    search_term: String,
    owned_only: bool,
}

impl CardFilter {
    pub fn new(search_term: &str, owned_only: bool) -> Self {
        Self {
            search_term: search_term.to_lowercase(),
            owned_only,
        }
    }

    pub fn matches(&self, card: &Card, owned: &OwnedQuantityMap) -> bool {
        let name_ok =
            self.search_term.is_empty() || card.name.to_lowercase().contains(&self.search_term);
        let owned_ok = !self.owned_only || quantity_of(owned, &card.id) > 0;
        name_ok && owned_ok
    }

    pub fn apply(&self, cards: &[Card], owned: &OwnedQuantityMap) -> Vec<Card> {
        cards
            .iter()
            .filter(|card| self.matches(card, owned))
            .cloned()
            .collect()
    }
}

/// Everything a collection view renders, computed in one pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub expansion_stats: BTreeMap<String, ExpansionStats>,
    pub filtered_cards: Vec<Card>,
    pub total_owned: u64,
}

impl CollectionSummary {
    pub fn build(cards: &[Card], owned: &OwnedQuantityMap, filter: &CardFilter) -> Self {
        Self {
            expansion_stats: compute_stats(cards, owned),
            filtered_cards: filter.apply(cards, owned),
            total_owned: total_owned(owned),
        }
    }
}

// ---------------------------------------------------------------------------
// QuantityInput
// ---------------------------------------------------------------------------

/// A requested quantity before clamping.
///
/// Anything that is not a non-negative number becomes zero. Strings take
/// their leading integer, so `"3 copies"` is 3 and `"abc"` is 0.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantityInput {
    Int(i64),
    Float(f64),
    Text(String),
}

impl QuantityInput {
    pub fn clamp(&self) -> u32 {
        match self {
            Self::Int(n) => clamp_i64(*n),
            Self::Float(f) if f.is_finite() => clamp_i64(f.trunc() as i64),
            Self::Float(_) => 0,
            Self::Text(s) => parse_leading_int(s).map_or(0, clamp_i64),
        }
    }
}

fn clamp_i64(n: i64) -> u32 {
    u32::try_from(n.max(0)).unwrap_or(u32::MAX)
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Overlong digit runs saturate rather than fail.
    let value = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * value)
}

macro_rules! quantity_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for QuantityInput {
            fn from(n: $t) -> Self {
                Self::Int(i64::from(n))
            }
        })*
    };
}

quantity_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for QuantityInput {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for QuantityInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for QuantityInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// ---------------------------------------------------------------------------
// CollectionService
// ---------------------------------------------------------------------------

/// Reads and writes one user's `collections/{userId}` document.
#[derive(Clone)]
pub struct CollectionService {
    store: Arc<dyn DocumentStore>,
    user_id: String,
}

impl CollectionService {
    pub fn new(store: Arc<dyn DocumentStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// One-shot read of the owned quantities. A missing document is an
    /// empty collection.
    pub async fn load(&self) -> Result<OwnedQuantityMap> {
        let snap = self
            .store
            .get_document(COLLECTIONS_COLLECTION, &self.user_id)
            .await?;
        Ok(owned_from_snapshot(&snap))
    }

    /// Record `quantity` copies of `card_id` and return the stored value.
    ///
    /// The write is a merge of `{card_id: quantity}`; the local view only
    /// changes when a [`CollectionWatch`] receives the next snapshot.
    pub async fn set_quantity(
        &self,
        card_id: &str,
        quantity: impl Into<QuantityInput>,
    ) -> Result<u32> {
        if card_id.is_empty() {
            return Err(TcgpError::InvalidArgument("card id must not be empty".into()));
        }
        let qty = quantity.into().clamp();
        let mut data = DocumentData::new();
        data.insert(card_id.to_string(), Value::from(qty));

        match self
            .store
            .set_document(COLLECTIONS_COLLECTION, &self.user_id, data, SetOptions::merge())
            .await
        {
            Ok(()) => {
                tracing::debug!(user_id = %self.user_id, card_id, qty, "quantity written");
                Ok(qty)
            }
            Err(e) => {
                tracing::error!(user_id = %self.user_id, card_id, error = %e, "quantity write failed");
                Err(match e {
                    TcgpError::Write(msg) => TcgpError::Write(msg),
                    other => TcgpError::Write(other.to_string()),
                })
            }
        }
    }

    /// Create the collection document if it does not exist yet.
    pub async fn ensure_exists(&self) -> Result<()> {
        let snap = self
            .store
            .get_document(COLLECTIONS_COLLECTION, &self.user_id)
            .await?;
        if !snap.exists() {
            self.store
                .set_document(
                    COLLECTIONS_COLLECTION,
                    &self.user_id,
                    DocumentData::new(),
                    SetOptions::default(),
                )
                .await?;
            tracing::info!(user_id = %self.user_id, "created empty collection");
        }
        Ok(())
    }

    /// Start watching the collection. The subscription lives as long as the
    /// returned [`CollectionWatch`].
    pub async fn watch(&self) -> Result<CollectionWatch> {
        let subscription = self
            .store
            .subscribe_document(COLLECTIONS_COLLECTION, &self.user_id)
            .await
            .map_err(|e| TcgpError::Subscription(e.to_string()))?;
        Ok(CollectionWatch {
            subscription,
            owned: OwnedQuantityMap::new(),
            last_error: None,
        })
    }
}

/// Read-only view of another user's collection.
///
/// Exposes reads and live updates but no writes:
///
/// ```compile_fail
/// # async fn f(view: tcgp_collection::FriendCollection) {
/// view.set_quantity("A1-001", 9).await;
/// # }
/// ```
#[derive(Clone)]
pub struct FriendCollection {
    inner: CollectionService,
}

impl FriendCollection {
    pub(crate) fn new(store: Arc<dyn DocumentStore>, user_id: impl Into<String>) -> Self {
        Self {
            inner: CollectionService::new(store, user_id),
        }
    }

    pub fn user_id(&self) -> &str {
        self.inner.user_id()
    }

    pub async fn load(&self) -> Result<OwnedQuantityMap> {
        self.inner.load().await
    }

    pub async fn watch(&self) -> Result<CollectionWatch> {
        self.inner.watch().await
    }

    /// One-shot summary of the friend's collection over `cards`.
    pub async fn summary(&self, cards: &[Card], filter: &CardFilter) -> Result<CollectionSummary> {
        let owned = self.load().await?;
        Ok(CollectionSummary::build(cards, &owned, filter))
    }
}

fn owned_from_snapshot(snap: &DocumentSnapshot) -> OwnedQuantityMap {
    snap.data().map(owned_from_document).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// CollectionWatch
// ---------------------------------------------------------------------------

/// Live mirror of a collection document.
///
/// Holds the last snapshot the store delivered. Errors reported by the
/// subscription are returned from [`next`](Self::next) but leave that
/// snapshot in place.
#[derive(Debug)]
pub struct CollectionWatch {
    subscription: Subscription,
    owned: OwnedQuantityMap,
    last_error: Option<String>,
}

impl CollectionWatch {
    /// Wait for the next push and return the updated quantities.
    ///
    /// Returns `Ok(None)` once the store closes the subscription.
    pub async fn next(&mut self) -> Result<Option<&OwnedQuantityMap>> {
        match self.subscription.next().await {
            Some(event) => self.apply(event).map(Some),
            None => Ok(None),
        }
    }

    fn apply(&mut self, event: crate::store::SnapshotEvent) -> Result<&OwnedQuantityMap> {
        match event {
            Ok(snap) => {
                self.owned = owned_from_snapshot(&snap);
                self.last_error = None;
                Ok(&self.owned)
            }
            Err(message) => {
                tracing::warn!(error = %message, "collection subscription error");
                self.last_error = Some(message.clone());
                Err(TcgpError::Subscription(message))
            }
        }
    }

    /// Last known quantities.
    pub fn owned(&self) -> &OwnedQuantityMap {
        &self.owned
    }

    /// Error from the most recent push, cleared by the next good snapshot.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn summary(&self, cards: &[Card], filter: &CardFilter) -> CollectionSummary {
        CollectionSummary::build(cards, &self.owned, filter)
    }
}
