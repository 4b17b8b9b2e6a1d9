//! Property tests for fixture data management

use std::collections::HashSet;

use proptest::prelude::*;
use tempfile::TempDir;
use webtest_tests::prelude::*;
use webtest_tests::property_testing::{record_strategy, records_strategy};

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime")
        .block_on(fut)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Generated ids are unique and records survive a reopen in order
    #[test]
    fn generated_ids_unique_and_order_preserved(records in records_strategy(1..20)) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");

        let (created, reloaded) = block_on(async {
            let mut data = TestDataManager::open(&path).await.unwrap();
            let mut created = Vec::new();
            for record in records.clone() {
                created.push(data.create_test_data(record).await.unwrap());
            }
            let reloaded = TestDataManager::open(&path).await.unwrap();
            (created, reloaded.records().to_vec())
        });

        let ids: HashSet<String> = created.iter().map(|r| r["id"].to_string()).collect();
        prop_assert_eq!(ids.len(), created.len());
        prop_assert_eq!(&reloaded, &created);

        for (stored, original) in created.iter().zip(&records) {
            prop_assert_eq!(stored.keys().next().map(String::as_str), Some("id"));
            for (key, value) in original.as_object().unwrap() {
                prop_assert_eq!(stored.get(key), Some(value));
            }
        }
    }

    /// Lookups return the earliest record holding the value
    #[test]
    fn lookup_returns_first_match(prefix in records_strategy(0..5), tagged in record_strategy(), copies in 1usize..4) {
        let dir = TempDir::new().unwrap();

        block_on(async {
            let mut data = TestDataManager::open(dir.path().join("data.json")).await.unwrap();
            for record in prefix {
                let mut record = record;
                record.as_object_mut().unwrap().remove("marker");
                data.create_test_data(record).await.unwrap();
            }

            let mut tagged = tagged;
            tagged.as_object_mut().unwrap().insert("marker".to_string(), json!("shared"));
            let mut first = None;
            for _ in 0..copies {
                let stored = data.create_test_data(tagged.clone()).await.unwrap();
                first.get_or_insert(stored);
            }

            assert_eq!(data.get_test_data("marker", "shared"), first.as_ref());
            assert_eq!(data.find_all("marker", "shared").len(), copies);
            assert!(data.get_test_data("marker", "absent").is_none());
        });
    }

    /// Clearing always leaves an empty collection behind
    #[test]
    fn clear_then_reload_is_empty(records in records_strategy(0..10)) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");

        let reloaded = block_on(async {
            let mut data = TestDataManager::open(&path).await.unwrap();
            for record in records {
                data.create_test_data(record).await.unwrap();
            }
            data.clear().await.unwrap();
            TestDataManager::open(&path).await.unwrap()
        });

        prop_assert!(reloaded.is_empty());
    }
}

#[test]
fn test_packet_loss_bounds_property() {
    proptest!(|(packet_loss in -2.0f64..3.0)| {
        let accepted = NetworkConditionSpec::lossy(packet_loss).is_ok();
        prop_assert_eq!(accepted, (0.0..=1.0).contains(&packet_loss));
    });
}
