//! In-process transport: a shared router table instead of a wire.
//!
//! Every node registers its [ChordService] under its address on a
//! [MemRouter]; calls are direct async dispatch bounded by the same
//! per-call timeout a networked transport would enforce. Dropping a
//! node's registration makes it unreachable, which is how tests
//! simulate a crashed peer.
use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::dht::Did;
use crate::dht::NodeRef;
use crate::error::Error;
use crate::error::Result;
use crate::storage::KvPair;
use crate::transport::ChordService;
use crate::transport::Transport;

/// Address book shared by every [MemTransport] of one in-process ring.
#[derive(Default)]
pub struct MemRouter {
    nodes: DashMap<String, Arc<dyn ChordService>>,
}

impl MemRouter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn register(&self, addr: &str, service: Arc<dyn ChordService>) {
        self.nodes.insert(addr.to_string(), service);
    }

    /// Drop a registration, making the address unreachable. Tests use
    /// this to kill a node without a graceful stop.
    pub fn deregister(&self, addr: &str) {
        self.nodes.remove(addr);
    }

    fn lookup(&self, addr: &str) -> Result<Arc<dyn ChordService>> {
        self.nodes
            .get(addr)
            .map(|svc| svc.value().clone())
            .ok_or_else(|| Error::RemoteUnavailable(format!("no route to {addr}")))
    }
}

/// One node's endpoint on a [MemRouter].
pub struct MemTransport {
    addr: String,
    router: Arc<MemRouter>,
    timeout: Duration,
    running: AtomicBool,
}

impl MemTransport {
    pub fn new(router: Arc<MemRouter>, addr: impl Into<String>, timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            addr: addr.into(),
            router,
            timeout,
            running: AtomicBool::new(false),
        })
    }

    fn target(&self, node: &NodeRef) -> Result<Arc<dyn ChordService>> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(Error::RemoteUnavailable("transport is shut down".into()));
        }
        self.router.lookup(&node.addr)
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>> + Send) -> Result<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| Error::RemoteUnavailable("call timed out".into()))?
    }
}

#[async_trait]
impl Transport for MemTransport {
    async fn start(&self, service: Arc<dyn ChordService>) -> Result<()> {
        self.router.register(&self.addr, service);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        self.router.deregister(&self.addr);
        Ok(())
    }

    async fn get_successor(&self, node: &NodeRef) -> Result<Option<NodeRef>> {
        let svc = self.target(node)?;
        self.bounded(svc.get_successor()).await
    }

    async fn find_successor(&self, node: &NodeRef, id: Did) -> Result<Option<NodeRef>> {
        let svc = self.target(node)?;
        self.bounded(svc.find_successor(id)).await.map(Some)
    }

    async fn set_successor(&self, node: &NodeRef, succ: &NodeRef) -> Result<()> {
        let svc = self.target(node)?;
        self.bounded(svc.set_successor(succ.clone())).await
    }

    async fn get_predecessor(&self, node: &NodeRef) -> Result<Option<NodeRef>> {
        let svc = self.target(node)?;
        self.bounded(svc.get_predecessor()).await
    }

    async fn set_predecessor(&self, node: &NodeRef, pred: &NodeRef) -> Result<()> {
        let svc = self.target(node)?;
        self.bounded(svc.set_predecessor(pred.clone())).await
    }

    async fn check_predecessor(&self, node: &NodeRef) -> Result<()> {
        let svc = self.target(node)?;
        self.bounded(svc.ping()).await
    }

    async fn notify(&self, node: &NodeRef, candidate: &NodeRef) -> Result<()> {
        let svc = self.target(node)?;
        self.bounded(svc.notify(candidate.clone())).await
    }

    async fn get_key(&self, node: &NodeRef, key: &str) -> Result<String> {
        let svc = self.target(node)?;
        self.bounded(svc.get_key(key.to_string())).await
    }

    async fn set_key(&self, node: &NodeRef, key: &str, value: &str) -> Result<()> {
        let svc = self.target(node)?;
        self.bounded(svc.set_key(key.to_string(), value.to_string()))
            .await
    }

    async fn delete_key(&self, node: &NodeRef, key: &str) -> Result<()> {
        let svc = self.target(node)?;
        self.bounded(svc.delete_key(key.to_string())).await
    }

    async fn request_keys_between(
        &self,
        node: &NodeRef,
        low: Did,
        high: Did,
    ) -> Result<Vec<KvPair>> {
        let svc = self.target(node)?;
        self.bounded(svc.keys_between(low, high)).await
    }

    async fn delete_keys(&self, node: &NodeRef, keys: &[String]) -> Result<()> {
        let svc = self.target(node)?;
        self.bounded(svc.delete_keys(keys.to_vec())).await
    }
}
