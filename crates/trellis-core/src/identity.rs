//! Node identity generation
//!
//! An identity is the XOR of a position seed and a modifier seed. The
//! position seed comes from where the node is declared; the modifier comes
//! from the surrounding builder scope (for example the item of a loop).
//!
//! The default strategy keys on the source location of the declaring call,
//! which the builder obtains through `#[track_caller]`. Declaring a node on
//! the same line in two independent passes therefore produces the same
//! identity, and the reconciliation engine can pair the two nodes up without
//! explicit keys.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;
use std::sync::Arc;

use crate::NodeId;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Fixed-seed FNV-1a hasher
///
/// Output depends only on the bytes written, never on the process or the
/// toolchain, so identities agree between runs.
#[derive(Clone, Copy, Debug)]
pub struct StableHasher {
    state: u64,
}

impl StableHasher {
    pub fn new() -> Self {
        StableHasher {
            state: FNV_OFFSET_BASIS,
        }
    }
}

impl Default for StableHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for StableHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= byte as u64;
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
    }

    #[inline]
    fn write_usize(&mut self, n: usize) {
        // Same value on 32- and 64-bit targets
        self.write(&(n as u64).to_le_bytes());
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.state
    }
}

/// Hash any value with [`StableHasher`]
pub fn stable_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = StableHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Position seed for a declaration at `location`
pub fn call_site_seed(location: &Location<'_>) -> u64 {
    let mut hasher = StableHasher::new();
    location.file().hash(&mut hasher);
    location.line().hash(&mut hasher);
    location.column().hash(&mut hasher);
    hasher.finish()
}

/// Identity for an explicitly keyed declaration
pub fn keyed_identity<K: Hash + ?Sized>(key: &K, modifier: u64) -> NodeId {
    NodeId(stable_hash(key)).with_modifier(modifier)
}

/// Where a node sits relative to its siblings at declaration time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Slot {
    /// Identity of the enclosing node, `NodeId::ZERO` for the root sequence
    pub parent: NodeId,
    /// Number of nodes already declared under the same parent in this pass
    pub index: usize,
}

impl Slot {
    pub fn new(parent: NodeId, index: usize) -> Self {
        Slot { parent, index }
    }
}

/// Custom identity function: modifier in, identity out
pub type IdentityFn = Arc<dyn Fn(u64) -> u64 + Send + Sync>;

/// How the builder derives a node's identity
#[derive(Clone, Default)]
pub enum IdentityStrategy {
    /// Hash of the declaring source location, XOR the modifier
    #[default]
    CallSite,
    /// Hash of (parent identity, sibling index), XOR the modifier.
    ///
    /// Does not depend on source locations, but a node's identity changes
    /// whenever an earlier sibling appears or disappears.
    Sequential,
    /// Caller-supplied function of the modifier alone
    Custom(IdentityFn),
}

impl IdentityStrategy {
    /// Wrap a closure as a custom strategy
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(u64) -> u64 + Send + Sync + 'static,
    {
        IdentityStrategy::Custom(Arc::new(f))
    }

    /// Identity of a node declared at `location` in `slot`.
    ///
    /// Without a location the call-site strategy falls back to the raw
    /// modifier.
    pub fn identify(&self, location: Option<&Location<'_>>, slot: Slot, modifier: u64) -> NodeId {
        match self {
            IdentityStrategy::CallSite => match location {
                Some(location) => NodeId(call_site_seed(location)).with_modifier(modifier),
                None => NodeId(modifier),
            },
            IdentityStrategy::Sequential => {
                NodeId(stable_hash(&(slot.parent.0, slot.index))).with_modifier(modifier)
            }
            IdentityStrategy::Custom(f) => NodeId(f(modifier)),
        }
    }
}

impl fmt::Debug for IdentityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityStrategy::CallSite => f.write_str("CallSite"),
            IdentityStrategy::Sequential => f.write_str("Sequential"),
            IdentityStrategy::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[track_caller]
    fn here() -> &'static Location<'static> {
        Location::caller()
    }

    #[test]
    fn test_stable_hasher_known_vectors() {
        // FNV-1a reference values
        let mut empty = StableHasher::new();
        empty.write(b"");
        assert_eq!(empty.finish(), 0xcbf2_9ce4_8422_2325);

        let mut a = StableHasher::new();
        a.write(b"a");
        assert_eq!(a.finish(), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_same_site_same_identity() {
        let mut ids = Vec::new();
        for _ in 0..2 {
            let site = here();
            ids.push(IdentityStrategy::CallSite.identify(Some(site), Slot::default(), 7));
        }
        assert_eq!(ids[0], ids[1]);
    }

    #[test]
    fn test_different_sites_differ() {
        let first = here();
        let second = here();
        let strategy = IdentityStrategy::CallSite;
        assert_ne!(
            strategy.identify(Some(first), Slot::default(), 0),
            strategy.identify(Some(second), Slot::default(), 0)
        );
    }

    #[test]
    fn test_modifier_changes_identity() {
        let site = here();
        let strategy = IdentityStrategy::CallSite;
        let a = strategy.identify(Some(site), Slot::default(), 1);
        let b = strategy.identify(Some(site), Slot::default(), 2);
        assert_ne!(a, b);
        assert_eq!(a.with_modifier(1), b.with_modifier(2));
    }

    #[test]
    fn test_missing_location_falls_back_to_modifier() {
        let id = IdentityStrategy::CallSite.identify(None, Slot::default(), 99);
        assert_eq!(id, NodeId(99));
    }

    #[test]
    fn test_sequential_strategy() {
        let strategy = IdentityStrategy::Sequential;
        let a = strategy.identify(None, Slot::new(NodeId(5), 0), 0);
        let b = strategy.identify(None, Slot::new(NodeId(5), 1), 0);
        let c = strategy.identify(None, Slot::new(NodeId(6), 0), 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, strategy.identify(None, Slot::new(NodeId(5), 0), 0));
    }

    #[test]
    fn test_custom_strategy_sees_only_modifier() {
        let strategy = IdentityStrategy::custom(|m| m.wrapping_mul(31) + 1);
        let site = here();
        assert_eq!(strategy.identify(Some(site), Slot::new(NodeId(3), 4), 2), NodeId(63));
        assert_eq!(strategy.identify(None, Slot::default(), 2), NodeId(63));
    }

    #[test]
    fn test_keyed_identity() {
        assert_eq!(keyed_identity("header", 0), keyed_identity("header", 0));
        assert_ne!(keyed_identity("header", 0), keyed_identity("footer", 0));
        assert_ne!(keyed_identity("header", 0), keyed_identity("header", 1));
    }

    proptest! {
        #[test]
        fn prop_identity_is_pure(modifier in any::<u64>()) {
            let site = here();
            let strategy = IdentityStrategy::CallSite;
            prop_assert_eq!(
                strategy.identify(Some(site), Slot::default(), modifier),
                strategy.identify(Some(site), Slot::default(), modifier)
            );
        }

        #[test]
        fn prop_stable_hash_matches_hasher(value in any::<(u32, String)>()) {
            let mut hasher = StableHasher::new();
            value.hash(&mut hasher);
            prop_assert_eq!(stable_hash(&value), hasher.finish());
        }
    }
}
