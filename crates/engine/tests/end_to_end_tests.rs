//! End-to-end scenarios over the full store
//!
//! Each test drives the facade the way the harvester/validator/indexer
//! collaborators would: blob puts, catalog writes, lifecycle transitions,
//! validation outcomes, queries, incremental copies, and cleanup.

use tempfile::tempdir;

use oaistore_core::{
    record_id, NetworkRef, RecordStatus, RecordValidation, RuleFact, SnapshotStatus, StopSignal,
    StoreConfig,
};
use oaistore_engine::{HarvestStore, HarvestedRecord};
use oaistore_snapshot::CleanOutcome;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn network() -> NetworkRef {
    NetworkRef::new(1, "net")
}

fn harvested(n: u32, deleted: bool) -> HarvestedRecord {
    HarvestedRecord {
        identifier: format!("oai:x:{}", n),
        datestamp: 1_650_000_000_000 + n as i64,
        deleted,
        content: format!("<m><a>{}</a></m>", n),
    }
}

#[test]
fn blob_put_is_idempotent() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = HarvestStore::open(StoreConfig::for_testing(dir.path())).unwrap();
    let blobs = store.blob_store(&network()).unwrap();

    let content = "<m><a>1</a></m>";
    let fp = blobs.put(content).unwrap();
    assert_eq!(blobs.put(content).unwrap(), fp);

    let mut hashes = Vec::new();
    blobs.for_each_hash(&mut |h| hashes.push(h.to_string())).unwrap();
    assert_eq!(hashes, vec![fp.clone()]);
    assert_eq!(blobs.get(&fp).unwrap(), content);
}

#[test]
fn harvest_writes_catalog_in_insertion_order() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = HarvestStore::open(StoreConfig::for_testing(dir.path())).unwrap();

    let meta = store.create_snapshot(&network()).unwrap();
    store.start_harvesting(&meta).unwrap();
    for (n, deleted) in [(1, false), (2, false), (3, true)] {
        store.store_record(&meta, &harvested(n, deleted)).unwrap().unwrap();
    }
    store.finish_harvesting(&meta).unwrap();

    let identifiers: Vec<String> = store
        .records(&meta)
        .unwrap()
        .iter()
        .map(|r| r.unwrap().identifier)
        .collect();
    assert_eq!(identifiers, vec!["oai:x:1", "oai:x:2", "oai:x:3"]);

    let row = store.get_snapshot(meta.id).unwrap();
    assert_eq!(row.size, 3);
    assert_eq!(row.valid_size, 0);
    assert_eq!(row.status, Some(SnapshotStatus::HarvestingFinishedValid));
}

fn validated_snapshot(store: &HarvestStore) -> oaistore_core::SnapshotMeta {
    let meta = store.create_snapshot(&network()).unwrap();
    store.start_harvesting(&meta).unwrap();
    for (n, deleted) in [(1, false), (2, false), (3, true)] {
        store.store_record(&meta, &harvested(n, deleted)).unwrap();
    }
    store.finish_harvesting(&meta).unwrap();
    store.start_validation(&meta).unwrap();

    store
        .store_validation(
            &meta,
            &RecordValidation::new("oai:x:1", 1_650_000_000_001, true),
        )
        .unwrap();
    store
        .store_validation(
            &meta,
            &RecordValidation::new("oai:x:2", 1_650_000_000_002, false)
                .with_fact(RuleFact::new(42, vec![], vec!["2022".into()], false)),
        )
        .unwrap();
    store
        .store_validation(
            &meta,
            &RecordValidation::new("oai:x:3", 1_650_000_000_003, false),
        )
        .unwrap();
    store.finish_validation(&meta).unwrap();
    meta
}

#[test]
fn validation_outcomes_land_in_index_and_stats() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = HarvestStore::open(StoreConfig::for_testing(dir.path())).unwrap();
    let meta = validated_snapshot(&store);

    assert_eq!(
        store.list_by_status(&meta, RecordStatus::Untested).unwrap().len(),
        3
    );

    let stats = store.build_stats(&meta, &[]).unwrap();
    assert_eq!(stats.total_records, 3);
    assert_eq!(stats.valid_records, 1);
    assert_eq!(stats.rules[&42].invalid_count, 1);
    assert_eq!(stats.rules[&42].valid_count, 0);

    // The aggregated stats were persisted next to the index
    let row = store.get_snapshot(meta.id).unwrap();
    assert_eq!(row.valid_size, 1);
    let stats_file = dir
        .path()
        .join("NET/snapshots")
        .join(format!("snapshot_{}", meta.id))
        .join("validation/validation_stats.json");
    assert!(stats_file.exists());
}

#[test]
fn rule_filters_conjoin() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = HarvestStore::open(StoreConfig::for_testing(dir.path())).unwrap();
    let meta = validated_snapshot(&store);

    let page = store
        .query_observations_with_pagination(&meta, &["invalid_rules:42".to_string()], 0, 10)
        .unwrap();
    assert_eq!(page.total_filtered, 1);
    assert_eq!(page.records[0].identifier, "oai:x:2");

    let page = store
        .query_observations_with_pagination(
            &meta,
            &[
                "invalid_rules:42".to_string(),
                "record_is_valid:true".to_string(),
            ],
            0,
            10,
        )
        .unwrap();
    assert_eq!(page.total_filtered, 0);
    assert!(page.records.is_empty());
}

#[test]
fn rule_occurrence_histograms() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = HarvestStore::open(StoreConfig::for_testing(dir.path())).unwrap();
    let meta = validated_snapshot(&store);

    let occurrences = store.calculate_rule_occurrences(&meta, 42, &[]).unwrap();
    assert!(occurrences.valid.is_empty());
    assert_eq!(occurrences.invalid.len(), 1);
    assert_eq!(occurrences.invalid["2022"], 1);
}

#[test]
fn incremental_harvest_copies_live_records() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = HarvestStore::open(StoreConfig::for_testing(dir.path())).unwrap();
    let seed = validated_snapshot(&store);

    let meta = store.incremental_harvest(&network()).unwrap();
    assert_ne!(meta.id, seed.id);
    assert_eq!(
        store.snapshots().get_previous_snapshot_id(meta.id).unwrap(),
        Some(seed.id)
    );

    store.finish_harvesting(&meta).unwrap();
    let identifiers: Vec<String> = store
        .records(&meta)
        .unwrap()
        .iter()
        .map(|r| r.unwrap().identifier)
        .collect();
    assert_eq!(identifiers, vec!["oai:x:1", "oai:x:2"]);

    let row = store.get_snapshot(meta.id).unwrap();
    assert_eq!(row.size, 2);
    assert_eq!(row.valid_size, 1);
    assert!(row.last_incremental_time.is_some());
}

#[test]
fn incremental_without_seed_is_not_found() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = HarvestStore::open(StoreConfig::for_testing(dir.path())).unwrap();
    let err = store.incremental_harvest(&network()).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn pagination_is_stable_across_repeats() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = HarvestStore::open(StoreConfig::for_testing(dir.path())).unwrap();
    let meta = validated_snapshot(&store);

    let a = store
        .query_observations_with_pagination(&meta, &[], 1, 1)
        .unwrap();
    let b = store
        .query_observations_with_pagination(&meta, &[], 1, 1)
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(a.total_filtered, 3);
}

#[test]
fn cursor_pagination_ascends_record_ids() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = HarvestStore::open(StoreConfig::for_testing(dir.path())).unwrap();
    let meta = validated_snapshot(&store);

    let mut ids = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = store
            .page_after(&meta, RecordStatus::Untested, cursor.as_deref(), 2)
            .unwrap();
        if page.is_empty() {
            break;
        }
        cursor = Some(page.last().unwrap().record_id());
        ids.extend(page.iter().map(|o| o.record_id()));
    }
    assert_eq!(ids.len(), 3);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    let mut expected: Vec<String> = ["oai:x:1", "oai:x:2", "oai:x:3"]
        .iter()
        .map(|i| record_id(i))
        .collect();
    expected.sort();
    assert_eq!(ids, expected);
}

#[test]
fn clean_snapshot_data_tombstones_good_snapshots() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = HarvestStore::open(StoreConfig::for_testing(dir.path())).unwrap();
    let meta = validated_snapshot(&store);

    assert_eq!(
        store.clean_snapshot_data(meta.id).unwrap(),
        CleanOutcome::Tombstoned
    );

    // Row stays queryable as a tombstone, record data is gone
    let row = store.get_snapshot(meta.id).unwrap();
    assert!(row.deleted);
    assert_eq!(store.records(&meta).unwrap().count().unwrap(), 0);
    assert!(store
        .list_by_status(&meta, RecordStatus::Untested)
        .unwrap()
        .is_empty());

    // Tombstoned snapshots no longer seed incremental harvests
    assert!(store.incremental_harvest(&network()).unwrap_err().is_not_found());
}

#[test]
fn clean_snapshot_data_removes_failed_snapshots() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = HarvestStore::open(StoreConfig::for_testing(dir.path())).unwrap();

    let meta = store.create_snapshot(&network()).unwrap();
    store.start_harvesting(&meta).unwrap();
    store.store_record(&meta, &harvested(1, false)).unwrap();
    store.snapshots().mark_as_failed(meta.id).unwrap();

    assert_eq!(
        store.clean_snapshot_data(meta.id).unwrap(),
        CleanOutcome::Removed
    );
    assert!(store.get_snapshot(meta.id).unwrap_err().is_not_found());
}

#[test]
fn stop_signal_flushes_and_halts_ingest() {
    init_tracing();
    let dir = tempdir().unwrap();
    let config = StoreConfig::for_testing(dir.path()).with_catalog_records_per_file(100);
    let store = HarvestStore::open(config).unwrap();

    let meta = store.create_snapshot(&network()).unwrap();
    store.start_harvesting(&meta).unwrap();

    let stop = StopSignal::new();
    let batch: Vec<HarvestedRecord> = (1..=10).map(|n| harvested(n, false)).collect();

    // Stop raised before the batch begins: nothing is stored, the (empty)
    // buffer flush is a no-op
    stop.stop();
    assert_eq!(store.harvest_batch(&meta, batch.clone(), &stop).unwrap(), 0);

    // A fresh signal lets the batch run to completion
    let stop = StopSignal::new();
    assert_eq!(store.harvest_batch(&meta, batch, &stop).unwrap(), 10);
    store.finish_harvesting(&meta).unwrap();
    assert_eq!(store.records(&meta).unwrap().count().unwrap(), 10);
    assert_eq!(store.get_snapshot(meta.id).unwrap().size, 10);
}

#[test]
fn deduplicated_blobs_shared_across_snapshots() {
    init_tracing();
    let dir = tempdir().unwrap();
    let store = HarvestStore::open(StoreConfig::for_testing(dir.path())).unwrap();
    let net = network();

    // Two snapshots of one network store the same payload once
    for _ in 0..2 {
        let meta = store.create_snapshot(&net).unwrap();
        store.start_harvesting(&meta).unwrap();
        store.store_record(&meta, &harvested(1, false)).unwrap();
        store.finish_harvesting(&meta).unwrap();
    }

    let blobs = store.blob_store(&net).unwrap();
    let mut count = 0;
    blobs.for_each_hash(&mut |_| count += 1).unwrap();
    assert_eq!(count, 1);
}

#[test]
fn reopened_store_sees_persisted_state() {
    init_tracing();
    let dir = tempdir().unwrap();
    let meta;
    {
        let store = HarvestStore::open(StoreConfig::for_testing(dir.path())).unwrap();
        meta = validated_snapshot(&store);
    }

    let store = HarvestStore::open(StoreConfig::for_testing(dir.path())).unwrap();
    let row = store.get_snapshot(meta.id).unwrap();
    assert_eq!(row.size, 3);
    assert_eq!(row.status, Some(SnapshotStatus::Valid));
    assert_eq!(store.records(&meta).unwrap().count().unwrap(), 3);
    assert_eq!(store.build_stats(&meta, &[]).unwrap().valid_records, 1);
}
