//! Chord ring node: identity, neighbour pointers, finger table, and
//! the protocol operations that keep them converging.
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::did::between_right_incl;
use super::did::strictly_between;
use super::did::Did;
use super::finger::FingerTable;
use super::stabilization::Stabilization;
use super::types::Chord;
use super::types::ChordStorage;
use super::types::NodeRef;
use crate::config::Config;
use crate::error::Error;
use crate::error::Result;
use crate::storage::KvPair;
use crate::storage::Storage;
use crate::transport::ChordService;
use crate::transport::Transport;

/// One ring member. All members of a ring form a clockwise circle in
/// the order of their [Did]; this struct owns the member's slice of
/// that circle: its identity, its believed neighbours, its routing
/// shortcuts and its share of the keys.
///
/// Predecessor, successor and finger table are guarded by independent
/// reader-writer locks. Writers scope their exclusive access strictly
/// to the read-modify-write of one field and no lock is ever held
/// across a remote call, so a blocked peer cannot stall routing
/// through this node. The protocol tolerates the resulting races:
/// every write moves a believed neighbour closer to the true one, and
/// the periodic jobs re-run until the ring has converged.
pub struct RingNode {
    node: NodeRef,
    config: Config,
    predecessor: RwLock<Option<NodeRef>>,
    successor: RwLock<Option<NodeRef>>,
    finger: RwLock<FingerTable>,
    storage: Arc<dyn Storage>,
    transport: Arc<dyn Transport>,
    shutdown: CancellationToken,
}

impl RingNode {
    /// Bring a node to life: derive its ring id, start the transport,
    /// join through the introducer (or found a fresh ring), and spawn
    /// the periodic maintenance jobs.
    ///
    /// Fails on invalid configuration, on a transport that cannot
    /// start listening, and on an id collision with an existing ring
    /// member; nothing else is fatal.
    pub async fn create(
        config: Config,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn Storage>,
        introducer: Option<NodeRef>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let identity = config.id.clone().unwrap_or_else(|| config.addr.clone());
        let node = NodeRef {
            id: Did::hash_of(identity.as_bytes()),
            addr: config.addr.clone(),
        };
        tracing::info!(id = %node.id, addr = %node.addr, "creating ring node");

        let ring = Arc::new(Self {
            finger: RwLock::new(FingerTable::new(node.clone())),
            predecessor: RwLock::new(None),
            successor: RwLock::new(None),
            storage,
            transport,
            shutdown: CancellationToken::new(),
            config,
            node,
        });

        ring.transport.start(ring.clone()).await?;
        if let Err(e) = ring.join(introducer.as_ref()).await {
            let _ = ring.transport.stop().await;
            return Err(e);
        }
        Stabilization::new(ring.clone()).spawn();
        Ok(ring)
    }

    /// This member's own reference.
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token the schedulers watch; cancelled by [RingNode::stop].
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Current successor, cloned out from under the shared lock.
    pub fn successor(&self) -> Result<Option<NodeRef>> {
        Ok(self
            .successor
            .read()
            .map_err(|_| Error::RingStatePoisoned)?
            .clone())
    }

    /// Current predecessor, cloned out from under the shared lock.
    pub fn predecessor(&self) -> Result<Option<NodeRef>> {
        Ok(self
            .predecessor
            .read()
            .map_err(|_| Error::RingStatePoisoned)?
            .clone())
    }

    /// Owners of all finger entries, for inspection.
    pub fn finger_owners(&self) -> Result<Vec<NodeRef>> {
        Ok(self.lock_finger()?.owners())
    }

    fn update_successor(&self, value: Option<NodeRef>) -> Result<()> {
        *self
            .successor
            .write()
            .map_err(|_| Error::RingStatePoisoned)? = value;
        Ok(())
    }

    fn update_predecessor(&self, value: Option<NodeRef>) -> Result<()> {
        *self
            .predecessor
            .write()
            .map_err(|_| Error::RingStatePoisoned)? = value;
        Ok(())
    }

    fn lock_finger(&self) -> Result<RwLockReadGuard<FingerTable>> {
        self.finger.read().map_err(|_| Error::RingStatePoisoned)
    }

    fn lock_finger_mut(&self) -> Result<RwLockWriteGuard<FingerTable>> {
        self.finger.write().map_err(|_| Error::RingStatePoisoned)
    }

    /// Join a ring through `introducer`, or found a fresh single-node
    /// ring without one. The predecessor stays unset either way; the
    /// first notify fills it in once stabilization runs.
    pub async fn join(&self, introducer: Option<&NodeRef>) -> Result<()> {
        let succ = match introducer {
            Some(peer) => {
                let found = self
                    .transport
                    .find_successor(peer, self.node.id)
                    .await?
                    .ok_or(Error::NoSuccessorFound)?;
                if found.id == self.node.id {
                    return Err(Error::NodeIdCollision);
                }
                found
            }
            // No introducer: a fresh ring where we own everything.
            None => self.node.clone(),
        };
        tracing::info!(id = %self.node.id, successor = %succ.id, "joined ring");
        self.update_successor(Some(succ))?;
        Ok(())
    }

    /// Resolve the member owning `id`.
    pub async fn find_successor(&self, id: Did) -> Result<NodeRef> {
        let succ = match self.successor()? {
            Some(succ) => succ,
            None => return Ok(self.node.clone()),
        };
        if between_right_incl(id, self.node.id, succ.id) {
            return Ok(succ);
        }
        let closest = self.closest_preceding_node(id)?;
        if closest.id == self.node.id {
            // Every finger points at us; take one hop through the
            // successor instead of recursing on ourselves.
            let next = self.transport.get_successor(&succ).await?;
            return Ok(next.unwrap_or_else(|| self.node.clone()));
        }
        match self.transport.find_successor(&closest, id).await? {
            Some(found) => Ok(found),
            // The ring could not be walked further; conservatively
            // answer with ourselves and let stabilization catch up.
            None => Ok(self.node.clone()),
        }
    }

    /// The furthest finger preceding `id` without overshooting it, or
    /// self when no finger qualifies.
    pub fn closest_preceding_node(&self, id: Did) -> Result<NodeRef> {
        Ok(self.lock_finger()?.closest_preceding(id))
    }

    /// Handle a peer announcing itself as our predecessor. Adopt it
    /// when it is closer than the current one, and hand off whatever
    /// key range the adoption implies.
    pub async fn notify(&self, candidate: NodeRef) -> Result<()> {
        if candidate.id == self.node.id {
            return Ok(());
        }

        let (adopted, previous) = {
            let mut pred = self
                .predecessor
                .write()
                .map_err(|_| Error::RingStatePoisoned)?;
            match pred.clone() {
                None => {
                    *pred = Some(candidate.clone());
                    (true, None)
                }
                Some(current)
                    if strictly_between(candidate.id, current.id, self.node.id) =>
                {
                    *pred = Some(candidate.clone());
                    (true, Some(current))
                }
                _ => (false, None),
            }
        };
        if !adopted {
            return Ok(());
        }
        tracing::debug!(id = %self.node.id, predecessor = %candidate.id, "predecessor updated");

        match previous {
            // First predecessor we learn of: sync our owned range
            // (candidate, self] from the successor, which held it
            // while we did not exist (or while we were away).
            None => {
                if let Some(succ) = self.successor()? {
                    if succ.id != self.node.id {
                        if let Err(e) =
                            self.pull_keys(&succ, candidate.id, self.node.id).await
                        {
                            tracing::warn!(error = %e, "initial key sync failed");
                        }
                    }
                }
            }
            // Our owned interval split: everything in (old, new]
            // belongs to the new predecessor now, so hand it over.
            Some(old) => {
                if let Err(e) = self.push_keys(&candidate, old.id, candidate.id).await {
                    tracing::warn!(error = %e, "split key handoff failed");
                }
            }
        }
        Ok(())
    }

    /// One stabilization round. Learn the successor's predecessor,
    /// splice in a closer successor if one appeared, then notify the
    /// successor of ourselves. Remote failures surface to the caller;
    /// the scheduler logs them and the next round tries again.
    pub async fn stabilize(&self) -> Result<()> {
        let mut succ = match self.successor()? {
            Some(succ) => succ,
            None => return Ok(()),
        };
        // A node that appeared between us and our successor shows up
        // as the successor's predecessor; splice it in.
        if let Some(x) = self.transport.get_predecessor(&succ).await? {
            if strictly_between(x.id, self.node.id, succ.id) {
                tracing::debug!(id = %self.node.id, successor = %x.id, "successor updated");
                self.update_successor(Some(x.clone()))?;
                succ = x;
            }
        }
        // Whether or not anything changed, remind the successor that
        // we might be its predecessor.
        self.transport.notify(&succ, &self.node).await
    }

    /// Re-resolve the owner of the finger at the refresh cursor and
    /// advance the cursor. The cursor advances on failure too; a stale
    /// entry routes worse, not wrong, so it is kept until a later pass
    /// succeeds.
    pub async fn fix_finger(&self) -> Result<()> {
        let (index, target) = {
            let finger = self.lock_finger()?;
            let index = finger.next_fix();
            (index, self.node.id.finger_target(index))
        };
        match self.find_successor(target).await {
            Ok(owner) => {
                let mut finger = self.lock_finger_mut()?;
                finger.update(index, owner);
                finger.advance_fix();
                Ok(())
            }
            Err(e) => {
                tracing::debug!(index, error = %e, "finger resolution failed");
                self.lock_finger_mut()?.advance_fix();
                Err(e)
            }
        }
    }

    /// Probe the predecessor; clear it on any failure so a future
    /// notify can rediscover it. Never errors the caller: one failed
    /// probe is final until a new notify arrives.
    pub async fn check_predecessor(&self) -> Result<()> {
        let pred = match self.predecessor()? {
            Some(pred) => pred,
            None => return Ok(()),
        };
        if let Err(e) = self.transport.check_predecessor(&pred).await {
            tracing::warn!(predecessor = %pred.id, error = %e, "predecessor failed, clearing");
            self.update_predecessor(None)?;
        }
        Ok(())
    }

    /// The member currently owning `key`.
    pub async fn find(&self, key: &str) -> Result<NodeRef> {
        self.find_successor(Did::hash_of(key.as_bytes())).await
    }

    /// Fetch `key` from its owner.
    pub async fn get(&self, key: &str) -> Result<String> {
        let owner = self.find(key).await?;
        self.transport.get_key(&owner, key).await
    }

    /// Store `key` on its owner.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let owner = self.find(key).await?;
        tracing::debug!(key, owner = %owner.id, "storing key");
        self.transport.set_key(&owner, key, value).await
    }

    /// Remove `key` from its owner.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let owner = self.find(key).await?;
        self.transport.delete_key(&owner, key).await
    }

    /// Leave the ring: halt the schedulers, hand our keys and our
    /// neighbours over to each other, then stop the transport. The
    /// handoff is best effort; a peer that cannot be reached is
    /// logged, not retried, and the ring heals around the gap.
    pub async fn stop(&self) -> Result<()> {
        tracing::info!(id = %self.node.id, "leaving the ring");
        self.shutdown.cancel();

        let succ = self.successor()?;
        let pred = self.predecessor()?;
        if let (Some(succ), Some(pred)) = (succ, pred) {
            if succ.id != self.node.id {
                if let Err(e) = self.push_keys(&succ, pred.id, succ.id).await {
                    tracing::warn!(error = %e, "departure key handoff failed");
                }
                if let Err(e) = self.transport.set_predecessor(&succ, &pred).await {
                    tracing::warn!(error = %e, "could not relink successor");
                }
                if let Err(e) = self.transport.set_successor(&pred, &succ).await {
                    tracing::warn!(error = %e, "could not relink predecessor");
                }
            }
        }
        self.transport.stop().await
    }

    /// Move every local record hashing into (low, high] onto `to`:
    /// remote set per record, then a local bulk delete of what was
    /// delivered. A record that fails to deliver stays here and is
    /// logged; nothing is deleted before its copy is acknowledged.
    async fn push_keys(&self, to: &NodeRef, low: Did, high: Did) -> Result<()> {
        let pairs = self.storage.between(low, high).await?;
        if pairs.is_empty() {
            return Ok(());
        }
        tracing::info!(count = pairs.len(), to = %to.id, "handing off keys");
        let mut delivered = Vec::with_capacity(pairs.len());
        for kv in pairs {
            match self.transport.set_key(to, &kv.key, &kv.value).await {
                Ok(()) => delivered.push(kv.key),
                Err(e) => tracing::warn!(key = %kv.key, error = %e, "key handoff failed"),
            }
        }
        if !delivered.is_empty() {
            self.storage.multi_delete(&delivered).await?;
        }
        Ok(())
    }

    /// Import every record hashing into (low, high] from `from`:
    /// fetch the batch, insert locally, then bulk-delete the imported
    /// keys on the source. The two steps are deliberately not atomic;
    /// a crash in between leaves a duplicate that correct routing
    /// never serves, so it is harmless until the next handoff sweeps
    /// it up.
    async fn pull_keys(&self, from: &NodeRef, low: Did, high: Did) -> Result<()> {
        let pairs = self.transport.request_keys_between(from, low, high).await?;
        if pairs.is_empty() {
            return Ok(());
        }
        tracing::info!(count = pairs.len(), from = %from.id, "importing keys");
        let mut imported = Vec::with_capacity(pairs.len());
        for kv in &pairs {
            self.storage.set(&kv.key, &kv.value).await?;
            imported.push(kv.key.clone());
        }
        self.transport.delete_keys(from, &imported).await?;
        Ok(())
    }
}

#[async_trait]
impl Chord for RingNode {
    async fn join(&self, introducer: Option<&NodeRef>) -> Result<()> {
        RingNode::join(self, introducer).await
    }

    async fn find_successor(&self, id: Did) -> Result<NodeRef> {
        RingNode::find_successor(self, id).await
    }

    async fn closest_preceding_node(&self, id: Did) -> Result<NodeRef> {
        RingNode::closest_preceding_node(self, id)
    }

    async fn notify(&self, candidate: NodeRef) -> Result<()> {
        RingNode::notify(self, candidate).await
    }

    async fn stabilize(&self) -> Result<()> {
        RingNode::stabilize(self).await
    }

    async fn fix_finger(&self) -> Result<()> {
        RingNode::fix_finger(self).await
    }

    async fn check_predecessor(&self) -> Result<()> {
        RingNode::check_predecessor(self).await
    }
}

#[async_trait]
impl ChordStorage for RingNode {
    async fn find(&self, key: &str) -> Result<NodeRef> {
        RingNode::find(self, key).await
    }

    async fn get(&self, key: &str) -> Result<String> {
        RingNode::get(self, key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        RingNode::set(self, key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        RingNode::delete(self, key).await
    }
}

#[async_trait]
impl ChordService for RingNode {
    async fn get_successor(&self) -> Result<Option<NodeRef>> {
        self.successor()
    }

    async fn set_successor(&self, succ: NodeRef) -> Result<()> {
        self.update_successor(Some(succ))
    }

    async fn get_predecessor(&self) -> Result<Option<NodeRef>> {
        self.predecessor()
    }

    async fn set_predecessor(&self, pred: NodeRef) -> Result<()> {
        self.update_predecessor(Some(pred))
    }

    async fn find_successor(&self, id: Did) -> Result<NodeRef> {
        RingNode::find_successor(self, id).await
    }

    async fn notify(&self, candidate: NodeRef) -> Result<()> {
        RingNode::notify(self, candidate).await
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get_key(&self, key: String) -> Result<String> {
        self.storage.get(&key).await
    }

    async fn set_key(&self, key: String, value: String) -> Result<()> {
        self.storage.set(&key, &value).await
    }

    async fn delete_key(&self, key: String) -> Result<()> {
        self.storage.delete(&key).await
    }

    async fn keys_between(&self, low: Did, high: Did) -> Result<Vec<KvPair>> {
        self.storage.between(low, high).await
    }

    async fn delete_keys(&self, keys: Vec<String>) -> Result<()> {
        self.storage.multi_delete(&keys).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::storage::MemStorage;
    use crate::transport::memory::MemRouter;
    use crate::transport::memory::MemTransport;

    async fn lone_node(router: &Arc<MemRouter>, addr: &str) -> Arc<RingNode> {
        let config = Config::new(addr);
        let transport =
            MemTransport::new(router.clone(), addr, Duration::from_millis(200));
        RingNode::create(config, transport, Arc::new(MemStorage::new()), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn single_node_ring_owns_every_id() {
        let router = MemRouter::new();
        let node = lone_node(&router, "127.0.0.1:9101").await;

        assert_eq!(node.successor().unwrap(), Some(node.node().clone()));
        assert_eq!(node.predecessor().unwrap(), None);

        for probe in ["a", "b", "anything at all"] {
            let id = Did::hash_of(probe.as_bytes());
            assert_eq!(node.find_successor(id).await.unwrap(), *node.node());
            assert_eq!(node.find(probe).await.unwrap(), *node.node());
        }
    }

    #[tokio::test]
    async fn notify_adopts_only_closer_candidates() {
        let router = MemRouter::new();
        let node = lone_node(&router, "127.0.0.1:9102").await;

        // A notify by ourselves is ignored outright.
        node.notify(node.node().clone()).await.unwrap();
        assert_eq!(node.predecessor().unwrap(), None);

        let further = NodeRef {
            id: node.node().id - Did::from(100u32),
            addr: "127.0.0.1:9103".into(),
        };
        let closer = NodeRef {
            id: node.node().id - Did::from(5u32),
            addr: "127.0.0.1:9104".into(),
        };

        node.notify(further.clone()).await.unwrap();
        assert_eq!(node.predecessor().unwrap(), Some(further.clone()));

        // Closer candidate wins.
        node.notify(closer.clone()).await.unwrap();
        assert_eq!(node.predecessor().unwrap(), Some(closer.clone()));

        // Going backwards does not.
        node.notify(further).await.unwrap();
        assert_eq!(node.predecessor().unwrap(), Some(closer));
    }

    #[tokio::test]
    async fn join_collision_is_fatal_to_the_join() {
        let router = MemRouter::new();
        let first = lone_node(&router, "127.0.0.1:9105").await;

        // Same identity string, different address: same ring id.
        let config = Config::new("127.0.0.1:9106").with_id("127.0.0.1:9105");
        let transport = MemTransport::new(
            router.clone(),
            "127.0.0.1:9106",
            Duration::from_millis(200),
        );
        let result = RingNode::create(
            config,
            transport,
            Arc::new(MemStorage::new()),
            Some(first.node().clone()),
        )
        .await;
        assert!(matches!(result, Err(Error::NodeIdCollision)));
    }

    #[tokio::test]
    async fn ring_node_works_behind_trait_objects() {
        let router = MemRouter::new();
        let node = lone_node(&router, "127.0.0.1:9108").await;

        let kv: Arc<dyn ChordStorage> = node.clone();
        kv.set("via-trait", "object").await.unwrap();
        assert_eq!(kv.get("via-trait").await.unwrap(), "object");
        assert_eq!(kv.find("via-trait").await.unwrap(), *node.node());

        let ring: Arc<dyn Chord> = node.clone();
        ring.stabilize().await.unwrap();
        ring.check_predecessor().await.unwrap();
    }

    #[tokio::test]
    async fn join_through_unreachable_introducer_fails() {
        let router = MemRouter::new();
        let config = Config::new("127.0.0.1:9107");
        let transport = MemTransport::new(
            router.clone(),
            "127.0.0.1:9107",
            Duration::from_millis(50),
        );
        let ghost = NodeRef::new("ghost", "127.0.0.1:1");
        let result = RingNode::create(
            config,
            transport,
            Arc::new(MemStorage::new()),
            Some(ghost),
        )
        .await;
        assert!(matches!(result, Err(Error::RemoteUnavailable(_))));
    }
}
