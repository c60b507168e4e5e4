//! Re-exports of what an embedder typically needs.
pub use async_trait::async_trait;

pub use crate::config::Config;
pub use crate::dht::Chord;
pub use crate::dht::ChordStorage;
pub use crate::dht::Did;
pub use crate::dht::NodeRef;
pub use crate::dht::RingNode;
pub use crate::dht::Stabilization;
pub use crate::error::Error;
pub use crate::error::Result;
pub use crate::logging::init_logging;
pub use crate::storage::KvPair;
pub use crate::storage::MemStorage;
pub use crate::storage::Storage;
pub use crate::transport::memory::MemRouter;
pub use crate::transport::memory::MemTransport;
pub use crate::transport::ChordService;
pub use crate::transport::Transport;
