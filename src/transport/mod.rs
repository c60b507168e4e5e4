//! Transport seam between ring nodes.
//!
//! [Transport] is the client side the node dials peers through;
//! [ChordService] is the handler set a listening transport dispatches
//! inbound requests to. The core is transport-agnostic: it needs
//! reliable request/response calls with bounded timeouts, nothing
//! protocol-specific. [memory::MemTransport] wires the two together
//! in-process for tests and single-binary rings.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::dht::Did;
use crate::dht::NodeRef;
use crate::error::Result;
use crate::storage::KvPair;

/// Inbound protocol surface of a ring node, invoked by the transport
/// when a peer calls us. Absent neighbours are `None` here, never a
/// sentinel value.
#[async_trait]
pub trait ChordService: Send + Sync {
    /// Current successor, if any.
    async fn get_successor(&self) -> Result<Option<NodeRef>>;

    /// Overwrite the successor. Used by a departing predecessor-side
    /// neighbour to splice itself out.
    async fn set_successor(&self, succ: NodeRef) -> Result<()>;

    /// Current predecessor, if any.
    async fn get_predecessor(&self) -> Result<Option<NodeRef>>;

    /// Overwrite the predecessor. Used by a departing successor-side
    /// neighbour to splice itself out.
    async fn set_predecessor(&self, pred: NodeRef) -> Result<()>;

    /// Run the routing algorithm here for `id`.
    async fn find_successor(&self, id: Did) -> Result<NodeRef>;

    /// A peer announces itself as our predecessor.
    async fn notify(&self, candidate: NodeRef) -> Result<()>;

    /// Liveness probe; answering at all is the answer.
    async fn ping(&self) -> Result<()>;

    /// Read a key from local storage, no routing.
    async fn get_key(&self, key: String) -> Result<String>;

    /// Write a key to local storage, no routing.
    async fn set_key(&self, key: String, value: String) -> Result<()>;

    /// Delete a key from local storage, no routing.
    async fn delete_key(&self, key: String) -> Result<()>;

    /// Local records hashing into (low, high], for key handoff.
    async fn keys_between(&self, low: Did, high: Did) -> Result<Vec<KvPair>>;

    /// Bulk-delete local records, the tail end of a key handoff.
    async fn delete_keys(&self, keys: Vec<String>) -> Result<()>;
}

/// Outbound RPC surface the node uses to talk to peers. Implementations
/// own connection pooling and must bound every call with a timeout;
/// callers treat timeout and connection failure identically.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start listening and dispatch inbound requests to `service`.
    async fn start(&self, service: Arc<dyn ChordService>) -> Result<()>;

    /// Stop listening and drop pooled connections.
    async fn stop(&self) -> Result<()>;

    async fn get_successor(&self, node: &NodeRef) -> Result<Option<NodeRef>>;

    async fn find_successor(&self, node: &NodeRef, id: Did) -> Result<Option<NodeRef>>;

    async fn set_successor(&self, node: &NodeRef, succ: &NodeRef) -> Result<()>;

    async fn get_predecessor(&self, node: &NodeRef) -> Result<Option<NodeRef>>;

    async fn set_predecessor(&self, node: &NodeRef, pred: &NodeRef) -> Result<()>;

    /// Probe `node` for liveness.
    async fn check_predecessor(&self, node: &NodeRef) -> Result<()>;

    /// Tell `node` that `candidate` believes it is its predecessor.
    async fn notify(&self, node: &NodeRef, candidate: &NodeRef) -> Result<()>;

    async fn get_key(&self, node: &NodeRef, key: &str) -> Result<String>;

    async fn set_key(&self, node: &NodeRef, key: &str, value: &str) -> Result<()>;

    async fn delete_key(&self, node: &NodeRef, key: &str) -> Result<()>;

    /// Ask `node` for its records hashing into (low, high].
    async fn request_keys_between(
        &self,
        node: &NodeRef,
        low: Did,
        high: Did,
    ) -> Result<Vec<KvPair>>;

    /// Bulk-delete records on `node`.
    async fn delete_keys(&self, node: &NodeRef, keys: &[String]) -> Result<()>;
}
