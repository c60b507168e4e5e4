//! Finger table of the Chord DHT.
use std::ops::Index;

use serde::Deserialize;
use serde::Serialize;

use super::did::strictly_between;
use super::did::Did;
use super::types::NodeRef;
use crate::consts::RING_BITS;

/// One routing shortcut: a fixed target position on the ring and the
/// member last believed to own it. The owner goes stale between
/// refresh cycles; routing tolerates that because it only needs a hop
/// that is no worse than the true successor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerEntry {
    /// (owner + 2^i) mod 2^160 for table index i.
    pub target: Did,
    /// Last known successor of `target`.
    pub node: NodeRef,
}

/// Ordered table of [RING_BITS] routing shortcuts. Entries are never
/// removed and the length is fixed for the node's lifetime; only the
/// owner of one entry at a time is replaced by the refresh cycle.
#[derive(Clone, Debug)]
pub struct FingerTable {
    owner: NodeRef,
    entries: Vec<FingerEntry>,
    next_fix: usize,
}

impl FingerTable {
    /// Build the table of a freshly created node: every target is owned
    /// by the node itself, the degenerate single-node ring.
    pub fn new(owner: NodeRef) -> Self {
        let entries = (0..RING_BITS)
            .map(|i| FingerEntry {
                target: owner.id.finger_target(i),
                node: owner.clone(),
            })
            .collect();
        Self {
            owner,
            entries,
            next_fix: 0,
        }
    }

    /// getter
    pub fn get(&self, index: usize) -> Option<&FingerEntry> {
        self.entries.get(index)
    }

    /// Replace the owner of one entry. Out-of-range indexes are logged
    /// and ignored rather than grown into.
    pub fn update(&mut self, index: usize, node: NodeRef) {
        if index >= self.entries.len() {
            tracing::error!(index, "finger update out of range");
            return;
        }
        tracing::debug!(index, node = %node.id, "finger updated");
        self.entries[index].node = node;
    }

    /// The furthest entry whose target lies strictly inside
    /// (self, id), scanning from the highest index down; falls back to
    /// the owner when nothing qualifies. The highest qualifying finger
    /// is the longest known hop toward `id` that cannot overshoot it.
    pub fn closest_preceding(&self, id: Did) -> NodeRef {
        for entry in self.entries.iter().rev() {
            if strictly_between(entry.target, self.owner.id, id) {
                return entry.node.clone();
            }
        }
        self.owner.clone()
    }

    /// Index the refresh cycle should fix next.
    pub fn next_fix(&self) -> usize {
        self.next_fix
    }

    /// Move the refresh cursor forward, wrapping at the table length.
    pub fn advance_fix(&mut self) {
        self.next_fix = (self.next_fix + 1) % self.entries.len();
    }

    /// Number of entries, always [RING_BITS].
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true; kept so clippy-conventional callers can ask.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Owners of all entries, in index order.
    pub fn owners(&self) -> Vec<NodeRef> {
        self.entries.iter().map(|e| e.node.clone()).collect()
    }
}

impl Index<usize> for FingerTable {
    type Output = FingerEntry;
    fn index(&self, index: usize) -> &Self::Output {
        &self.entries[index]
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;

    use super::*;

    fn member(n: u32) -> NodeRef {
        NodeRef {
            id: Did::from(n),
            addr: format!("127.0.0.1:{}", 9000 + n),
        }
    }

    #[test]
    fn test_new_table_points_at_owner() {
        let owner = member(10);
        let table = FingerTable::new(owner.clone());
        assert_eq!(table.len(), RING_BITS);
        assert_eq!(table.next_fix(), 0);
        for i in [0usize, 1, 80, 159] {
            assert_eq!(table[i].target, owner.id.finger_target(i));
            assert_eq!(table[i].node, owner);
        }
        // Targets really are owner + 2^i.
        assert_eq!(
            table[3].target,
            Did::from(BigUint::from(10u32 + 8u32))
        );
    }

    #[test]
    fn test_update_replaces_one_owner() {
        let mut table = FingerTable::new(member(10));
        let other = member(500);
        table.update(4, other.clone());
        assert_eq!(table[4].node, other);
        assert_eq!(table[3].node, member(10));
        // Out of range is ignored.
        table.update(RING_BITS, other);
        assert_eq!(table.len(), RING_BITS);
    }

    #[test]
    fn test_advance_fix_wraps() {
        let mut table = FingerTable::new(member(1));
        for _ in 0..RING_BITS - 1 {
            table.advance_fix();
        }
        assert_eq!(table.next_fix(), RING_BITS - 1);
        table.advance_fix();
        assert_eq!(table.next_fix(), 0);
    }

    #[test]
    fn test_closest_preceding_picks_highest_qualifying_entry() {
        let owner = member(0);
        let mut table = FingerTable::new(owner.clone());
        let near = member(2);
        let far = member(64);
        table.update(1, near.clone()); // target 0 + 2^1 = 2
        table.update(6, far.clone()); // target 0 + 2^6 = 64

        // Highest target inside (0, 100) is 64, owned by `far`.
        assert_eq!(table.closest_preceding(Did::from(100u32)), far);
        // Highest target inside (0, 4) is 2, owned by `near`.
        assert_eq!(table.closest_preceding(Did::from(4u32)), near);
        // Nothing precedes an id right next to self: fall back.
        assert_eq!(table.closest_preceding(Did::from(1u32)), owner);
        // A fresh (self-owned) entry past the updated ones still wins
        // the scan; stale-toward-self is fine for routing.
        assert_eq!(table.closest_preceding(Did::from(2000u32)), owner);
    }

    #[test]
    fn test_closest_preceding_wraps_the_ring() {
        // Owner near the top of the ring; a query past the zero point
        // must still match the finger whose target wrapped around.
        let owner_id = Did::from(BigUint::from(2u16).pow(160) - 4u16);
        let owner = NodeRef {
            id: owner_id,
            addr: "127.0.0.1:9000".into(),
        };
        let mut table = FingerTable::new(owner.clone());
        let wrapped = member(3); // sits past the zero point
        table.update(3, wrapped.clone()); // target owner + 8 wraps to 4
        assert_eq!(table[3].target, Did::from(4u32));
        // Inside (owner, 5) the highest wrapped target is 4.
        assert_eq!(table.closest_preceding(Did::from(5u32)), wrapped);
    }
}
