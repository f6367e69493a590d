//! Property-Based Tests for the VEIL Registry
//!
//! Uses proptest to generate random operation sequences and verify the
//! registry's invariants hold.

use proptest::prelude::*;
use veil::prelude::*;
use veil_fhe::{decode_cleartexts, encode_cleartexts};
use veil_registry::{content_hash, CooldownGuard};

// =============================================================================
// PROPTEST STRATEGIES
// =============================================================================

/// Strategy for generating random 32-byte arrays
fn bytes32() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>())
}

fn fhe_type() -> impl Strategy<Value = FheType> {
    prop_oneof![
        Just(FheType::Bool),
        Just(FheType::Uint8),
        Just(FheType::Uint16),
        Just(FheType::Uint32),
        Just(FheType::Uint64),
    ]
}

/// A value that fits its type
fn clear_value() -> impl Strategy<Value = ClearValue> {
    fhe_type().prop_flat_map(|ty| {
        (0..=ty.max_value()).prop_map(move |v| ClearValue::new(ty, v).unwrap())
    })
}

fn handle() -> impl Strategy<Value = CiphertextHandle> {
    (bytes32(), fhe_type()).prop_map(|(seed, ty)| CiphertextHandle::derive(&seed, ty))
}

#[derive(Debug, Clone)]
enum Op {
    Submit(usize),
    Close,
    Advance(u64),
    Pause,
    Unpause,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..3usize).prop_map(Op::Submit),
        2 => Just(Op::Close),
        3 => (0..90u64).prop_map(Op::Advance),
        1 => Just(Op::Pause),
        1 => Just(Op::Unpause),
    ]
}

const START: u64 = 1_000_000;
const COOLDOWN: u64 = 30;

// =============================================================================
// BATCH LIFECYCLE PROPERTIES
// =============================================================================

proptest! {
    /// Property: batch ids strictly increase, exactly one batch is active and
    /// every submission landed in the batch that was active at the time
    #[test]
    fn batch_lifecycle_invariants(ops in prop::collection::vec(op(), 1..60)) {
        let owner = Address::from_label("owner");
        let providers: Vec<_> = (0..3).map(|i| Address::from_label(&format!("p{}", i))).collect();
        let oracle = LocalCoprocessor::with_defaults().unwrap();
        let clock = ManualClock::new(START);
        let config = RegistryConfig::new(Address::from_label("registry"), owner).with_cooldown(COOLDOWN);
        let mut registry = AttestationRegistry::new(config, oracle.clone(), clock.clone()).unwrap();
        for p in &providers {
            registry.add_provider(&owner, *p).unwrap();
        }

        let mut last_id = registry.current_batch_id();
        for op in ops {
            match op {
                Op::Submit(i) => {
                    let before = registry.current_batch_id();
                    let handle = oracle.encrypt(1, FheType::Uint8).unwrap();
                    if let Ok(record) = registry.submit(&providers[i], handle) {
                        prop_assert_eq!(record.batch_id, before);
                    }
                }
                Op::Close => {
                    let before = registry.current_batch_id();
                    match registry.close_current_batch(&owner) {
                        Ok(transition) => prop_assert_eq!(transition.opened.id, before + 1),
                        Err(e) => {
                            prop_assert_eq!(e, RegistryError::PausedError);
                            prop_assert!(registry.is_paused());
                            prop_assert_eq!(registry.current_batch_id(), before);
                        }
                    }
                }
                Op::Advance(s) => clock.advance(s),
                Op::Pause => { let _ = registry.pause(&owner); }
                Op::Unpause => { let _ = registry.unpause(&owner); }
            }

            let current = registry.current_batch_id();
            prop_assert!(current >= last_id);
            last_id = current;

            let batches = registry.batches();
            prop_assert_eq!(batches.iter().filter(|b| b.active).count(), 1);
            prop_assert!(registry.current_batch().unwrap().active);
            for b in batches.iter().filter(|b| b.id < current) {
                prop_assert!(b.is_closed());
            }
        }
    }

    /// Property: no two successful submissions by one provider are closer
    /// than the cooldown interval
    #[test]
    fn submissions_respect_cooldown(steps in prop::collection::vec(0..45u64, 1..40)) {
        let owner = Address::from_label("owner");
        let provider = Address::from_label("provider");
        let oracle = LocalCoprocessor::with_defaults().unwrap();
        let clock = ManualClock::new(START);
        let config = RegistryConfig::new(Address::from_label("registry"), owner).with_cooldown(COOLDOWN);
        let mut registry = AttestationRegistry::new(config, oracle.clone(), clock.clone()).unwrap();
        registry.add_provider(&owner, provider).unwrap();

        let mut accepted: Vec<u64> = Vec::new();
        for step in steps {
            clock.advance(step);
            let handle = oracle.encrypt(0, FheType::Bool).unwrap();
            match registry.submit(&provider, handle) {
                Ok(record) => accepted.push(record.timestamp),
                Err(RegistryError::CooldownActive { ready_at, .. }) => {
                    prop_assert!(clock.now() < ready_at);
                }
                Err(e) => prop_assert!(false, "unexpected error {:?}", e),
            }
        }

        prop_assert!(!accepted.is_empty());
        for pair in accepted.windows(2) {
            prop_assert!(pair[1] - pair[0] >= COOLDOWN);
        }
    }

    /// Property: a cooldown check passes exactly when the interval elapsed
    #[test]
    fn cooldown_window_is_exact(last in 0..1_000_000u64, secs in 1..10_000u64, delta in 0..20_000u64) {
        let principal = Address::from_label("p");
        let mut guard = CooldownGuard::new(secs).unwrap();
        guard.record(principal, OperationKind::DecryptionRequest, last);

        let now = last + delta;
        let allowed = guard.check(&principal, OperationKind::DecryptionRequest, now).is_ok();
        prop_assert_eq!(allowed, delta >= secs);
        // the other operation kind is unaffected
        prop_assert!(guard.check(&principal, OperationKind::Submission, now).is_ok());
    }
}

// =============================================================================
// CONTENT HASH & CLEARTEXT PROPERTIES
// =============================================================================

proptest! {
    /// Property: swapping two distinct handles changes the content hash
    #[test]
    fn content_hash_is_order_sensitive(
        handles in prop::collection::vec(handle(), 2..10),
        i in 0..10usize,
        j in 0..10usize,
    ) {
        let registry = Address::from_label("registry");
        let (i, j) = (i % handles.len(), j % handles.len());
        prop_assume!(handles[i] != handles[j]);

        let mut swapped = handles.clone();
        swapped.swap(i, j);
        prop_assert_ne!(content_hash(&registry, &handles), content_hash(&registry, &swapped));
    }

    /// Property: appending any handle changes the content hash
    #[test]
    fn content_hash_detects_growth(handles in prop::collection::vec(handle(), 0..10), extra in handle()) {
        let registry = Address::from_label("registry");
        let mut grown = handles.clone();
        grown.push(extra);
        prop_assert_ne!(content_hash(&registry, &handles), content_hash(&registry, &grown));
    }

    /// Property: decoding accepts exactly what encoding produced
    #[test]
    fn cleartexts_decode_to_encoded_values(values in prop::collection::vec(clear_value(), 0..16)) {
        let types: Vec<_> = values.iter().map(|v| v.fhe_type).collect();
        let bytes = encode_cleartexts(&values);
        prop_assert_eq!(bytes.len(), 32 * values.len());
        prop_assert_eq!(decode_cleartexts(&bytes, &types).unwrap(), values);
    }

    /// Property: any length other than 32 bytes per handle is rejected
    #[test]
    fn cleartexts_wrong_length_rejected(
        values in prop::collection::vec(clear_value(), 1..8),
        cut in 1..32usize,
    ) {
        let types: Vec<_> = values.iter().map(|v| v.fhe_type).collect();
        let bytes = encode_cleartexts(&values);
        prop_assert!(decode_cleartexts(&bytes[..bytes.len() - cut], &types).is_err());

        let mut longer = bytes.clone();
        longer.extend(std::iter::repeat(0u8).take(cut));
        prop_assert!(decode_cleartexts(&longer, &types).is_err());
    }
}
