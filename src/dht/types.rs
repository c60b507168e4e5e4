//! DHT types: ring member references and the protocol surface of a node.
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use super::did::Did;
use crate::error::Result;

/// Reference to a ring member: its position on the ring and where to
/// reach it. Immutable value, passed by value across the RPC boundary.
///
/// Two refs are equal iff their ids are bit-identical; the address is
/// deliberately excluded so a member that re-binds is still itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeRef {
    /// Ring position of the member.
    pub id: Did,
    /// Network location the transport dials.
    pub addr: String,
}

impl NodeRef {
    /// Build a ref whose id is the hash of `identity`.
    pub fn new(identity: &str, addr: impl Into<String>) -> Self {
        Self {
            id: Did::hash_of(identity.as_bytes()),
            addr: addr.into(),
        }
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NodeRef {}

impl std::hash::Hash for NodeRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}@{}", self.id, self.addr)
    }
}

/// Chord is a distributed hash table algorithm. All members form a
/// clockwise ring in the order of their [Did]; each member keeps a
/// successor, a predecessor and a finger table of routing shortcuts,
/// and the periodic operations below let the ring heal itself after
/// joins and failures with no central coordinator.
///
/// Routing takes O(log n) hops in expectation: `find_successor`
/// forwards a query to the closest preceding finger until the id falls
/// into the gap just past some member.
#[async_trait]
pub trait Chord {
    /// Join a ring through `introducer`, or found a fresh single-node
    /// ring when no introducer is given. The predecessor stays unset
    /// until a later notify fills it in.
    async fn join(&self, introducer: Option<&NodeRef>) -> Result<()>;

    /// Resolve the member owning `id`.
    async fn find_successor(&self, id: Did) -> Result<NodeRef>;

    /// The furthest finger that precedes `id` without overshooting it,
    /// or self when no finger qualifies.
    async fn closest_preceding_node(&self, id: Did) -> Result<NodeRef>;

    /// Handle a peer announcing itself as our predecessor. Adopts the
    /// candidate when it is closer than the current one and hands off
    /// any key range the adoption implies.
    async fn notify(&self, candidate: NodeRef) -> Result<()>;

    /// One stabilization round: learn the successor's predecessor,
    /// splice in a closer successor if one appeared, then notify the
    /// successor of ourselves. Called periodically.
    async fn stabilize(&self) -> Result<()>;

    /// Re-resolve the owner of one finger target and advance the
    /// cursor. Called periodically, one finger at a time.
    async fn fix_finger(&self) -> Result<()>;

    /// Probe the predecessor; clear it on any failure so a future
    /// notify can rediscover it. Called periodically.
    async fn check_predecessor(&self) -> Result<()>;
}

/// Key-value operations routed over a [Chord] ring. Keys are hashed
/// onto the ring and every operation is served by the owning member.
#[async_trait]
pub trait ChordStorage: Chord {
    /// The member currently owning `key`.
    async fn find(&self, key: &str) -> Result<NodeRef>;

    /// Fetch `key` from its owner.
    async fn get(&self, key: &str) -> Result<String>;

    /// Store `key` on its owner.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key` from its owner.
    async fn delete(&self, key: &str) -> Result<()>;
}
