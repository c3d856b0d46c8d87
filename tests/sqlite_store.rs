//! `SqliteStore` against a real database file in a temporary directory.

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use bma_calculator::config::Config;
use bma_calculator::sqlite_store::SqliteStore;
use bma_calculator::{db, migrate};
use bma_core::models::{
    Address, BmaReport, CachedBmaReport, LlmInstructions, PropertyDetails, RawPageData,
};
use bma_core::report::CacheKey;
use bma_core::store::Store;

async fn open_store() -> (TempDir, SqliteStore) {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.db.path = tmp.path().join("data").join("bma.sqlite");

    let pool = db::connect(&config).await.unwrap();
    migrate::migrate_pool(&pool).await.unwrap();
    // Migrations must be idempotent.
    migrate::migrate_pool(&pool).await.unwrap();

    (tmp, SqliteStore::new(pool))
}

fn page(address: &str, url: &str, price: f64) -> RawPageData {
    RawPageData {
        id: String::new(),
        url: url.to_string(),
        content: format!("<html>{}</html>", address),
        property_details: Some(PropertyDetails {
            address: address.to_string(),
            price,
            bedrooms: 3,
            ..Default::default()
        }),
    }
}

fn address(address_str: &str, enabled: bool, primary: bool) -> Address {
    Address {
        address_str: address_str.to_string(),
        enabled,
        primary,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_raw_page_upsert_keys_on_address() {
    let (_tmp, store) = open_store().await;

    let first = store
        .upsert_raw_page(&page("1 Maple St", "https://a/1", 100.0))
        .await
        .unwrap();
    assert!(first.inserted);

    let second = store
        .upsert_raw_page(&page("1 Maple St", "https://a/2", 90.0))
        .await
        .unwrap();
    assert!(!second.inserted);
    assert_eq!(second.id, first.id);

    let stored = store.get_raw_page(&first.id).await.unwrap().unwrap();
    assert_eq!(stored.url, "https://a/2");
    assert_eq!(stored.property_details.unwrap().price, 90.0);

    let other = store
        .upsert_raw_page(&page("2 Oak Ave", "https://a/3", 1.0))
        .await
        .unwrap();
    assert!(other.inserted);
    assert_ne!(other.id, first.id);

    assert!(store.delete_raw_page(&first.id).await.unwrap());
    assert!(!store.delete_raw_page(&first.id).await.unwrap());
    assert!(store.get_raw_page(&first.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_raw_page_requires_details() {
    let (_tmp, store) = open_store().await;
    let bare = RawPageData {
        url: "https://a".to_string(),
        content: "x".to_string(),
        ..Default::default()
    };
    assert!(store.upsert_raw_page(&bare).await.is_err());
}

#[tokio::test]
async fn test_address_string_is_unique() {
    let (_tmp, store) = open_store().await;
    store
        .insert_address(&address("1 Maple St", false, false))
        .await
        .unwrap();
    assert!(store
        .insert_address(&address("1 Maple St", true, false))
        .await
        .is_err());
    assert_eq!(store.list_addresses().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_link_raw_page_by_address_string() {
    let (_tmp, store) = open_store().await;
    let id = store
        .insert_address(&address("1 Maple St", true, false))
        .await
        .unwrap();
    let raw = store
        .upsert_raw_page(&page("1 Maple St", "https://a/1", 100.0))
        .await
        .unwrap();

    let found = store.find_address_by_str("1 Maple St").await.unwrap().unwrap();
    assert_eq!(found.id, id);
    assert!(found.raw_page_id.is_none());
    assert!(store.find_address_by_str("2 Oak Ave").await.unwrap().is_none());

    assert!(store.link_raw_page(&id, &raw.id).await.unwrap());
    let linked = store.get_address(&id).await.unwrap().unwrap();
    assert_eq!(linked.raw_page_id, Some(raw.id));
    assert!(linked.enabled);

    let unknown = uuid::Uuid::new_v4().to_string();
    assert!(!store.link_raw_page(&unknown, "x").await.unwrap());
}

#[tokio::test]
async fn test_address_flag_queries() {
    let (_tmp, store) = open_store().await;
    let a = store
        .insert_address(&address("1 Maple St", false, true))
        .await
        .unwrap();
    let b = store
        .insert_address(&address("2 Oak Ave", true, false))
        .await
        .unwrap();
    let c = store
        .insert_address(&address("3 Pine Rd", false, false))
        .await
        .unwrap();

    let listed: Vec<String> = store
        .list_addresses()
        .await
        .unwrap()
        .into_iter()
        .map(|x| x.id)
        .collect();
    assert_eq!(listed, vec![a.clone(), b.clone(), c.clone()]);

    assert_eq!(store.find_primary_address().await.unwrap().unwrap().id, a);
    let comparisons = store.find_comparison_addresses().await.unwrap();
    assert_eq!(comparisons.len(), 1);
    assert_eq!(comparisons[0].id, b);

    assert_eq!(store.clear_primary_flags().await.unwrap(), 1);
    assert!(store.find_primary_address().await.unwrap().is_none());

    assert!(store.set_address_flags(&c, true, true).await.unwrap());
    let c_row = store.get_address(&c).await.unwrap().unwrap();
    assert!(c_row.enabled && c_row.primary);
    // A primary address is never a comparison, even when enabled.
    assert_eq!(store.find_comparison_addresses().await.unwrap().len(), 1);

    let unknown = uuid::Uuid::new_v4().to_string();
    assert!(!store.set_address_flags(&unknown, true, false).await.unwrap());
    assert!(store.delete_address(&b).await.unwrap());
    assert!(!store.delete_address(&b).await.unwrap());
}

#[tokio::test]
async fn test_cached_report_roundtrip_by_key() {
    let (_tmp, store) = open_store().await;
    let generated_at: DateTime<Utc> = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
    let key = CacheKey::new("p", ["c2", "c1"]);

    let report = BmaReport {
        opinion: "Fairly priced.".to_string(),
        ..Default::default()
    };
    store
        .upsert_cached_report(&CachedBmaReport::new(&key, generated_at, report.clone()))
        .await
        .unwrap();

    // Same members in another order address the same entry.
    let same = CacheKey::new("p", ["c1", "c2"]);
    let cached = store.get_cached_report(&same).await.unwrap().unwrap();
    assert_eq!(cached.generated_at, generated_at);
    assert_eq!(cached.comparison_address_ids, vec!["c1", "c2"]);
    assert_eq!(cached.report, report);

    let newer = BmaReport {
        opinion: "Overpriced.".to_string(),
        ..Default::default()
    };
    store
        .upsert_cached_report(&CachedBmaReport::new(&same, Utc::now(), newer))
        .await
        .unwrap();
    let cached = store.get_cached_report(&key).await.unwrap().unwrap();
    assert_eq!(cached.report.opinion, "Overpriced.");

    assert!(store
        .get_cached_report(&CacheKey::new("p", ["c1"]))
        .await
        .unwrap()
        .is_none());

    store
        .upsert_cached_report(&CachedBmaReport::new(
            &CacheKey::new("p", ["c1"]),
            Utc::now(),
            BmaReport::default(),
        ))
        .await
        .unwrap();
    assert!(store.delete_cached_report(&key).await.unwrap());
    assert!(!store.delete_cached_report(&key).await.unwrap());
    assert_eq!(store.delete_all_cached_reports().await.unwrap(), 1);
}

#[tokio::test]
async fn test_instructions_replace() {
    let (_tmp, store) = open_store().await;
    assert!(store.get_instructions().await.unwrap().is_none());

    store
        .insert_instructions(&LlmInstructions {
            instructions: "Mention schools.".to_string(),
            updated_at: Utc::now(),
        })
        .await
        .unwrap();
    assert_eq!(store.delete_all_instructions().await.unwrap(), 1);
    store
        .insert_instructions(&LlmInstructions {
            instructions: "Mention transit.".to_string(),
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

    let current = store.get_instructions().await.unwrap().unwrap();
    assert_eq!(current.instructions, "Mention transit.");
}
