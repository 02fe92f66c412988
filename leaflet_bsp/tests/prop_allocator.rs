//! Property tests for pin ownership and address-map construction
//!
//! - Exclusivity: a pin never has two owners, whatever the claim order
//! - Idempotence: re-claiming by the owner is a no-op
//! - Last row wins: duplicate descriptor keys keep the final address
//! - Determinism: building the same rows twice gives equal maps
//! - Relay inversion word mirrors the set of inverted positions

use std::collections::{BTreeMap, BTreeSet, HashMap};

use leaflet_bsp::address_map::{AddressMapBuilder, DescriptorRow};
use leaflet_bsp::allocator::PinAllocator;
use leaflet_bsp::presence::PresenceSnapshot;
use leaflet_bsp::settings::ProtectedSettings;
use leaflet_common::prelude::*;
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Claim { claimant: usize, position: u8 },
    Release { claimant: usize, position: u8 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..3, 1u8..=6).prop_map(|(claimant, position)| Op::Claim { claimant, position }),
        (0usize..3, 1u8..=6).prop_map(|(claimant, position)| Op::Release { claimant, position }),
    ]
}

fn all_relays_present() -> PinAllocator {
    let allocator = PinAllocator::new();
    allocator.update_presence(PresenceSnapshot::default().with_bits(ModuleType::Rel, 0b1111));
    allocator
}

const CLAIMANTS: [&str; 3] = ["relay0", "relay1", "relay2"];

fn header_rows() -> Vec<DescriptorRow> {
    vec![
        vec!["Modbus Offset".into(), "Modul Typ".into(), "ModulNr".into(), "Mreg".into()],
        vec!["Version 0.78".into(), String::new(), String::new(), String::new()],
    ]
}

// ============================================================================
// Ownership
// ============================================================================

proptest! {
    /// A pin has at most one owner and only the owner's release frees it.
    #[test]
    fn ownership_is_exclusive(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let allocator = all_relays_present();
        let mut model: HashMap<u8, usize> = HashMap::new();

        for op in ops {
            match op {
                Op::Claim { claimant, position } => {
                    let pin = PinIdentity::new(ModuleType::Rel, 1, position);
                    let result = allocator.claim(pin, CLAIMANTS[claimant]);
                    match model.get(&position) {
                        Some(&owner) if owner != claimant => prop_assert!(result.is_err()),
                        _ => {
                            prop_assert!(result.is_ok());
                            model.insert(position, claimant);
                        }
                    }
                }
                Op::Release { claimant, position } => {
                    let pin = PinIdentity::new(ModuleType::Rel, 1, position);
                    let released = allocator.release_owned(pin, CLAIMANTS[claimant]);
                    let expected = model.get(&position) == Some(&claimant);
                    prop_assert_eq!(released, expected);
                    if expected {
                        model.remove(&position);
                    }
                }
            }

            for position in 1..=6u8 {
                let pin = PinIdentity::new(ModuleType::Rel, 1, position);
                let expected = model.get(&position).map(|&c| CLAIMANTS[c].to_string());
                prop_assert_eq!(allocator.owner_of(pin), expected);
            }
        }
        prop_assert_eq!(allocator.claimed_count(), model.len());
    }

    /// Repeated claims by the same owner leave exactly one entry.
    #[test]
    fn reclaim_is_idempotent(position in 1u8..=16, repeats in 1usize..8) {
        let allocator = all_relays_present();
        let pin = PinIdentity::new(ModuleType::Rel, 2, position);

        for _ in 0..repeats {
            prop_assert!(allocator.claim(pin, "relay0").is_ok());
        }
        prop_assert_eq!(allocator.claimed_count(), 1);
        prop_assert_eq!(allocator.positions(ModuleType::Rel, 2), BTreeSet::from([position]));
    }
}

// ============================================================================
// Address map
// ============================================================================

proptest! {
    /// Duplicate keys resolve to the address of their last row.
    #[test]
    fn last_row_wins(entries in prop::collection::vec((0u16..2000, 1u8..=8), 1..40)) {
        let mut rows = header_rows();
        let mut expected = BTreeMap::new();
        for (address, position) in &entries {
            rows.push(vec![
                address.to_string(),
                "REL".into(),
                "1".into(),
                position.to_string(),
            ]);
            expected.insert(*position, *address);
        }

        let map = AddressMapBuilder::default().build(&rows).unwrap();
        let again = AddressMapBuilder::default().build(&rows).unwrap();
        prop_assert_eq!(&map, &again);
        prop_assert_eq!(map.len(), expected.len());
        for (position, address) in expected {
            let pin = PinIdentity::new(ModuleType::Rel, 1, position);
            prop_assert_eq!(map.resolve_for_type(pin), Ok(address));
        }
    }
}

// ============================================================================
// Protected settings
// ============================================================================

proptest! {
    /// After any invert/revert sequence the word has exactly the inverted bits.
    #[test]
    fn relay_word_tracks_inverted_positions(
        steps in prop::collection::vec((1u8..=16, any::<bool>()), 1..50)
    ) {
        let settings = ProtectedSettings::new();
        let mut inverted = BTreeSet::new();
        let mut word = 0u16;

        for (position, invert) in steps {
            word = settings.set_relay_inversion(1, position, invert, |_| ()).unwrap();
            if invert {
                inverted.insert(position);
            } else {
                inverted.remove(&position);
            }
        }

        let expected = inverted.iter().fold(0u16, |acc, p| acc | (1 << (p - 1)));
        prop_assert_eq!(word, expected);
    }
}
