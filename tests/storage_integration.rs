//! Persistence Tests
//!
//! A registry and its coprocessor are saved to redb, reopened and resumed;
//! the resumed deployment must behave exactly like the original.

use tempfile::tempdir;
use veil::prelude::*;
use veil_storage::StorageError;

const START: u64 = 1_700_000_000;

fn deploy(oracle: &LocalCoprocessor, clock: &ManualClock) -> AttestationRegistry<LocalCoprocessor, ManualClock> {
    let owner = Address::from_label("owner");
    let config = RegistryConfig::new(Address::from_label("registry"), owner).with_cooldown(10);
    let mut registry = AttestationRegistry::new(config, oracle.clone(), clock.clone()).unwrap();
    registry
        .add_provider(&owner, Address::from_label("provider"))
        .unwrap();
    registry
}

#[test]
fn test_resume_mid_decryption() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("veil.redb");
    let owner = Address::from_label("owner");
    let provider = Address::from_label("provider");
    let clock = ManualClock::new(START);

    let request_id = {
        let oracle = LocalCoprocessor::with_defaults().unwrap();
        let mut registry = deploy(&oracle, &clock);
        let handle = oracle.encrypt(1234, FheType::Uint16).unwrap();
        registry.submit(&provider, handle).unwrap();
        registry.close_current_batch(&owner).unwrap();
        let id = registry.request_batch_validation(&owner, 1).unwrap();

        let storage = Storage::open(&path).unwrap();
        storage.registry.save_state(registry.state()).unwrap();
        storage.registry.save_coprocessor(&oracle.snapshot()).unwrap();
        storage
            .events
            .append(&registry.drain_events(), clock.now())
            .unwrap();
        id
    };

    let storage = Storage::open(&path).unwrap();
    let state = storage.registry.require_state().unwrap();
    let oracle =
        LocalCoprocessor::restore(storage.registry.load_coprocessor().unwrap().unwrap()).unwrap();
    let mut registry = AttestationRegistry::from_snapshot(state, oracle.clone(), clock.clone());

    assert_eq!(registry.pending_requests().len(), 1);
    assert_eq!(oracle.pending()[0].request_id, request_id);

    let response = oracle.fulfill(request_id).unwrap();
    let outcome = registry
        .on_decryption_result(request_id, &response.cleartexts, &response.proof)
        .unwrap();
    assert_eq!(outcome.values[0].value, 1234);

    // cooldown state survived the restart
    assert!(matches!(
        registry.request_batch_validation(&owner, 1),
        Err(RegistryError::CooldownActive { .. })
    ));

    let stats = storage.stats();
    assert!(stats.initialized);
    assert_eq!(stats.event_count, 5);
}

#[test]
fn test_snapshot_roundtrip_preserves_root() {
    let dir = tempdir().unwrap();
    let storage = Storage::open(dir.path().join("veil.redb")).unwrap();
    let clock = ManualClock::new(START);
    let oracle = LocalCoprocessor::with_defaults().unwrap();
    let registry = deploy(&oracle, &clock);

    let root = storage.registry.save_state(&registry.snapshot()).unwrap();
    let loaded = storage.registry.load_state().unwrap().unwrap();

    assert_eq!(loaded, registry.snapshot());
    assert_eq!(loaded.state_root().unwrap(), root);
    assert_eq!(storage.stats().state_root, Some(root));
}

#[test]
fn test_unknown_deployment() {
    let dir = tempdir().unwrap();
    let storage = Storage::open(dir.path().join("empty.redb")).unwrap();
    assert!(matches!(
        storage.registry.require_state(),
        Err(StorageError::NotInitialized)
    ));
    assert!(storage.events.range(1, 10).unwrap().is_empty());
}

#[test]
fn test_event_log_keeps_order_across_commits() {
    let dir = tempdir().unwrap();
    let storage = Storage::open(dir.path().join("veil.redb")).unwrap();
    let clock = ManualClock::new(START);
    let oracle = LocalCoprocessor::with_defaults().unwrap();
    let owner = Address::from_label("owner");
    let mut registry = deploy(&oracle, &clock);

    storage.events.append(&registry.drain_events(), clock.now()).unwrap();
    clock.advance(5);
    registry.close_current_batch(&owner).unwrap();
    registry.pause(&owner).unwrap();
    storage.events.append(&registry.drain_events(), clock.now()).unwrap();

    let log = storage.events.range(1, 100).unwrap();
    let names: Vec<_> = log.iter().map(|e| e.event.name()).collect();
    assert_eq!(names, vec!["provider-added", "batch-closed", "batch-opened", "paused"]);
    assert_eq!(log[0].timestamp, START);
    assert_eq!(log[3].timestamp, START + 5);
    assert_eq!(log.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
}
