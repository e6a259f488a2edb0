//! Fuzz tests for party identities and message routing

use proptest::prelude::*;
use tss_sim_core::mpc::ProtocolMessage;
use tss_sim_core::{PartyId, PeerContext, SortKey, build_party_ids};

// ============================================================================
// Strategies for generating test data
// ============================================================================

/// Party counts worth exercising
fn party_count_strategy() -> impl Strategy<Value = usize> {
    1usize..64usize
}

/// A shuffled list of distinct party indices
fn shuffled_indices_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::btree_set(1usize..10_000, 1..32)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
}

// ============================================================================
// Identity Fuzzing
// ============================================================================

proptest! {
    /// build_party_ids is sorted, 1-based and collision free
    #[test]
    fn party_ids_sorted_and_unique(n in party_count_strategy()) {
        let parties = build_party_ids(n);

        prop_assert_eq!(parties.len(), n);
        for (i, party) in parties.iter().enumerate() {
            prop_assert_eq!(party.index(), i + 1);
            prop_assert_eq!(party.key(), SortKey::from_index(i + 1));
        }
        prop_assert!(parties.windows(2).all(|w| w[0].key() < w[1].key()));
    }

    /// The peer context ordering does not depend on input order
    #[test]
    fn peer_context_order_independent(indices in shuffled_indices_strategy()) {
        let parties: Vec<PartyId> = indices
            .iter()
            .map(|i| PartyId::new(*i, i.to_string(), SortKey::from_index(*i)))
            .collect();
        let context = PeerContext::new(parties.clone()).unwrap();

        let mut sorted = indices.clone();
        sorted.sort();
        let ordered: Vec<usize> = context.parties().iter().map(|p| p.index()).collect();
        prop_assert_eq!(ordered, sorted);

        for party in &parties {
            let position = context.position(party).unwrap();
            prop_assert_eq!(context.at(position).unwrap().key(), party.key());
        }
    }

    /// Sort keys survive their string encoding
    #[test]
    fn sort_key_string_encoding(index in any::<usize>()) {
        let key = SortKey::from_index(index);
        let json = serde_json::to_string(&key).unwrap();
        let restored: SortKey = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(restored, key);
    }
}

// ============================================================================
// Routing Metadata Fuzzing
// ============================================================================

proptest! {
    /// A message is a broadcast exactly when it names no recipients
    #[test]
    fn broadcast_iff_no_recipients(
        n in 2usize..16,
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
        payload in prop::collection::vec(any::<u8>(), 1..64),
    ) {
        let parties = build_party_ids(n);
        let recipients: Vec<PartyId> = picks.iter().map(|p| p.get(&parties).clone()).collect();

        let msg = if recipients.is_empty() {
            ProtocolMessage::broadcast(parties[0].clone(), payload.clone())
        } else {
            ProtocolMessage::directed(parties[0].clone(), recipients.clone(), payload.clone())
        };

        prop_assert_eq!(msg.is_broadcast(), recipients.is_empty());
        let (wire, routing) = msg.wire_bytes().unwrap();
        prop_assert_eq!(wire, payload.as_slice());
        prop_assert_eq!(routing.is_broadcast, recipients.is_empty());
    }
}
