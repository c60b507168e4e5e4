//! ringkv: a Chord distributed hash table node.
//!
//! A set of nodes forms a clockwise ring in the order of their 160-bit
//! ids; each key lives on the first node whose id is equal to or
//! follows the key's hash. Every node keeps a successor, a predecessor
//! and a [finger table](crate::dht::FingerTable) of shortcuts, which is
//! enough to route any lookup in O(log n) hops and to heal the ring
//! after joins and failures with no coordinator:
//!
//! - [stabilize](crate::dht::RingNode::stabilize) splices freshly
//!   joined nodes into the successor chain,
//! - [fix_finger](crate::dht::RingNode::fix_finger) re-resolves one
//!   routing shortcut per tick,
//! - [check_predecessor](crate::dht::RingNode::check_predecessor)
//!   evicts a dead neighbour so its replacement can be discovered.
//!
//! Key ranges move between neighbours when ownership boundaries move:
//! on join, on predecessor change and on graceful departure.
//!
//! The node is transport- and storage-agnostic. It talks to peers
//! through the [Transport](crate::transport::Transport) trait, serves
//! them through [ChordService](crate::transport::ChordService), and
//! keeps its share of the keys behind
//! [Storage](crate::storage::Storage). In-memory implementations of
//! both seams ship in-tree; anything that can carry a request/response
//! call with a timeout can replace them.
pub mod config;
pub mod consts;
pub mod dht;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod storage;
pub mod transport;

pub use async_trait::async_trait;
