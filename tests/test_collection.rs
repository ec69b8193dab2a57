//! Collection reconciliation tests: writes, live watches and summaries.

mod common;

use std::sync::Arc;

use tcgp_collection::{CardFilter, MemoryStore, SetSelection, TcgpError};

// ---------------------------------------------------------------------------
// set_quantity / load
// ---------------------------------------------------------------------------

#[tokio::test]
async fn set_quantity_round_trips_through_store() {
    let (sdk, _backend, _store) = common::setup_default();
    let collection = sdk.collection("user-1");

    assert_eq!(collection.set_quantity("A1-094", 3).await.unwrap(), 3);
    let owned = collection.load().await.unwrap();
    assert_eq!(owned.get("A1-094"), Some(&3));
}

#[tokio::test]
async fn set_quantity_merges_with_existing_cards() {
    let (sdk, _backend, _store) = common::setup_default();
    let collection = sdk.collection("user-1");

    collection.set_quantity("A1-001", 1).await.unwrap();
    collection.set_quantity("A1-094", 2).await.unwrap();
    let owned = collection.load().await.unwrap();
    assert_eq!(owned.len(), 2);
    assert_eq!(owned["A1-001"], 1);
}

#[tokio::test]
async fn negative_and_garbage_quantities_store_zero() {
    let (sdk, _backend, _store) = common::setup_default();
    let collection = sdk.collection("user-1");

    collection.set_quantity("A1-001", -5).await.unwrap();
    collection.set_quantity("A1-094", "abc").await.unwrap();
    let owned = collection.load().await.unwrap();
    assert_eq!(owned["A1-001"], 0);
    assert_eq!(owned["A1-094"], 0);
}

#[tokio::test]
async fn missing_collection_loads_empty() {
    let (sdk, _backend, _store) = common::setup_default();
    assert!(sdk.collection("nobody").load().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_write_is_write_error() {
    let backend = Arc::new(common::sample_backend());
    let sdk = common::setup_sdk(backend, Arc::new(common::FailingStore));

    let err = sdk.collection("user-1").set_quantity("A1-001", 1).await.unwrap_err();
    assert!(matches!(err, TcgpError::Write(_)));
}

#[tokio::test]
async fn empty_card_id_is_rejected() {
    let (sdk, _backend, _store) = common::setup_default();
    let err = sdk.collection("user-1").set_quantity("", 1).await.unwrap_err();
    assert!(matches!(err, TcgpError::InvalidArgument(_)));
}

// ---------------------------------------------------------------------------
// watch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn watch_delivers_initial_snapshot_then_writes() {
    let (sdk, _backend, _store) = common::setup_default();
    let collection = sdk.collection("user-1");
    collection.set_quantity("A1-001", 2).await.unwrap();

    let mut watch = collection.watch().await.unwrap();
    let initial = watch.next().await.unwrap().unwrap();
    assert_eq!(initial["A1-001"], 2);

    collection.set_quantity("A1-094", 1).await.unwrap();
    let updated = watch.next().await.unwrap().unwrap();
    assert_eq!(updated["A1-094"], 1);
    assert_eq!(watch.owned().len(), 2);
}

#[tokio::test]
async fn subscription_error_keeps_last_snapshot() {
    let (sdk, _backend, store) = common::setup_default();
    let collection = sdk.collection("user-1");
    collection.set_quantity("A1-001", 4).await.unwrap();

    let mut watch = collection.watch().await.unwrap();
    watch.next().await.unwrap();

    store.report_error("collections", "user-1", "permission revoked");
    let err = watch.next().await.unwrap_err();
    assert!(matches!(err, TcgpError::Subscription(_)));
    assert_eq!(watch.last_error(), Some("permission revoked"));
    assert_eq!(watch.owned()["A1-001"], 4);

    collection.set_quantity("A1-001", 5).await.unwrap();
    watch.next().await.unwrap();
    assert!(watch.last_error().is_none());
    assert_eq!(watch.owned()["A1-001"], 5);
}

#[tokio::test]
async fn dropping_watch_unsubscribes() {
    let store = MemoryStore::new();
    let sdk = common::setup_sdk(Arc::new(common::sample_backend()), Arc::new(store.clone()));

    let watch = sdk.collection("user-1").watch().await.unwrap();
    assert_eq!(store.subscriber_count("collections", "user-1"), 1);
    drop(watch);
    assert_eq!(store.subscriber_count("collections", "user-1"), 0);
}

#[tokio::test]
async fn watch_on_unavailable_store_is_subscription_error() {
    let sdk = common::setup_sdk(Arc::new(common::sample_backend()), Arc::new(common::FailingStore));
    let err = sdk.collection("user-1").watch().await.unwrap_err();
    assert!(matches!(err, TcgpError::Subscription(_)));
}

// ---------------------------------------------------------------------------
// summaries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn summary_over_all_sets() {
    let (sdk, _backend, _store) = common::setup_default();
    let collection = sdk.collection("user-1");
    collection.set_quantity("A1-001", 2).await.unwrap();
    collection.set_quantity("A1-094", 0).await.unwrap();
    collection.set_quantity("A2-050", 1).await.unwrap();

    let summary = sdk
        .collection_summary("user-1", &SetSelection::All, &CardFilter::default())
        .await
        .unwrap();

    assert_eq!(summary.total_owned, 3);
    assert_eq!(summary.filtered_cards.len(), 5);
    let a1 = &summary.expansion_stats["A1"];
    assert_eq!((a1.total_cards, a1.unique_owned, a1.total_copies_owned), (3, 1, 2));
    let a2 = &summary.expansion_stats["A2"];
    assert_eq!((a2.total_cards, a2.unique_owned, a2.total_copies_owned), (2, 1, 1));
    assert_eq!(a2.completion_percent(), 50);
}

#[tokio::test]
async fn summary_for_one_set_with_filter() {
    let (sdk, _backend, _store) = common::setup_default();
    sdk.collection("user-1").set_quantity("A1-094", 1).await.unwrap();

    let summary = sdk
        .collection_summary("user-1", &SetSelection::from("A1"), &CardFilter::new("chu", true))
        .await
        .unwrap();

    let names: Vec<&str> = summary.filtered_cards.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Pikachu"]);
    assert_eq!(summary.expansion_stats.len(), 1);
}

#[tokio::test]
async fn watch_summary_tracks_updates() {
    let (sdk, _backend, _store) = common::setup_default();
    let cards = sdk.catalog().get_all_cards().await.unwrap();
    let collection = sdk.collection("user-1");

    let mut watch = collection.watch().await.unwrap();
    watch.next().await.unwrap();
    assert_eq!(watch.summary(&cards, &CardFilter::default()).total_owned, 0);

    collection.set_quantity("A2-001", 3).await.unwrap();
    watch.next().await.unwrap();
    let summary = watch.summary(&cards, &CardFilter::new("", true));
    assert_eq!(summary.total_owned, 3);
    assert_eq!(summary.filtered_cards.len(), 1);
    assert_eq!(summary.expansion_stats["A2"].unique_owned, 1);
}
