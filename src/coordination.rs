/*!
 * Coordination collaborator: cross-instance locks, watched configuration
 * paths, and the listener that turns configuration changes into snapshot
 * swaps.
 *
 * The coordination protocol itself lives behind the [`Coordinator`] trait.
 * [`MemoryCoordinator`] implements it in-process for tests and embedded use.
 */

use crate::config::RoutingConfig;
use crate::error::{Error, Result};
use crate::snapshot::{RuleSnapshot, SnapshotHolder};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shardgate_core_sharding::AlgorithmRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const LOCK_ROOT: &str = "/lock";
const LOCKS_NODE: &str = "locks";
const ACK_NODE: &str = "ack";
const CONFIG_ROOT: &str = "/config";

/// Paths of the lock tree
pub struct LockNode;

impl LockNode {
    /// `/lock/locks/{name}`
    pub fn lock_path(name: &str) -> String {
        format!("{}/{}/{}", LOCK_ROOT, LOCKS_NODE, name)
    }

    /// `/lock/ack/{name}`
    pub fn ack_path(name: &str) -> String {
        format!("{}/{}/{}", LOCK_ROOT, ACK_NODE, name)
    }

    /// `/lock/ack`
    pub fn ack_root() -> String {
        format!("{}/{}", LOCK_ROOT, ACK_NODE)
    }

    /// Lock name from a sequential node under `/lock/locks/{name}/`
    pub fn lock_name(node_path: &str) -> Option<String> {
        let prefix = format!("{}/{}/", LOCK_ROOT, LOCKS_NODE);
        let rest = node_path.strip_prefix(&prefix)?;
        let (name, sequence) = rest.rsplit_once('/')?;
        if name.is_empty() || sequence.is_empty() {
            return None;
        }
        Some(name.to_string())
    }
}

/// `/config/{name}`: where a named rule configuration is published
pub fn config_path(name: &str) -> String {
    format!("{}/{}", CONFIG_ROOT, name)
}

/// Acquire/release/watch over hierarchical named paths
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Take an exclusive lock, waiting at most `timeout`; `false` on timeout
    async fn acquire(&self, path: &str, timeout: Duration) -> Result<bool>;

    async fn release(&self, path: &str) -> Result<()>;

    /// Store a value and notify watchers of `path`
    async fn put(&self, path: &str, value: &str) -> Result<()>;

    /// Subscribe to a path; the current value counts as already seen
    async fn watch(&self, path: &str) -> Result<watch::Receiver<Option<String>>>;
}

/// In-process coordinator
#[derive(Debug, Default)]
pub struct MemoryCoordinator {
    locks: DashMap<String, ()>,
    released: Notify,
    nodes: DashMap<String, watch::Sender<Option<String>>>,
}

impl MemoryCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn try_lock(&self, path: &str) -> bool {
        match self.locks.entry(path.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn is_locked(&self, path: &str) -> bool {
        self.locks.contains_key(path)
    }

    /// Current value of a path
    pub fn get(&self, path: &str) -> Option<String> {
        self.nodes.get(path)?.borrow().clone()
    }
}

#[async_trait]
impl Coordinator for MemoryCoordinator {
    async fn acquire(&self, path: &str, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.try_lock(path) {
                debug!(path, "Lock acquired");
                return Ok(true);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                debug!(path, "Lock acquisition timed out");
                return Ok(false);
            }
        }
    }

    async fn release(&self, path: &str) -> Result<()> {
        if self.locks.remove(path).is_none() {
            return Err(Error::Coordination(format!("lock '{}' is not held", path)));
        }
        self.released.notify_waiters();
        debug!(path, "Lock released");
        Ok(())
    }

    async fn put(&self, path: &str, value: &str) -> Result<()> {
        self.nodes
            .entry(path.to_string())
            .or_insert_with(|| watch::channel(None).0)
            .send_replace(Some(value.to_string()));
        Ok(())
    }

    async fn watch(&self, path: &str) -> Result<watch::Receiver<Option<String>>> {
        Ok(self
            .nodes
            .entry(path.to_string())
            .or_insert_with(|| watch::channel(None).0)
            .subscribe())
    }
}

/// Publish a configuration under the named lock so concurrent publishers
/// cannot interleave
pub async fn publish_config(
    coordinator: &dyn Coordinator,
    name: &str,
    contents: &str,
    timeout: Duration,
) -> Result<()> {
    let lock = LockNode::lock_path(name);
    if !coordinator.acquire(&lock, timeout).await? {
        return Err(Error::Coordination(format!(
            "timed out acquiring '{}' after {:?}",
            lock, timeout
        )));
    }
    let stored = coordinator.put(&config_path(name), contents).await;
    coordinator.release(&lock).await?;
    stored
}

/// Rebuilds and swaps the snapshot whenever the watched configuration
/// changes. An invalid configuration leaves the current snapshot live.
pub struct ReloadListener {
    coordinator: Arc<dyn Coordinator>,
    holder: Arc<SnapshotHolder>,
    registry: Arc<AlgorithmRegistry>,
    config_name: String,
    instance_id: String,
}

impl ReloadListener {
    pub fn new(
        coordinator: Arc<dyn Coordinator>,
        holder: Arc<SnapshotHolder>,
        registry: Arc<AlgorithmRegistry>,
        config_name: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            coordinator,
            holder,
            registry,
            config_name: config_name.into(),
            instance_id: instance_id.into(),
        }
    }

    /// Build and publish one configuration text
    pub fn apply(&self, contents: &str) -> Result<u64> {
        let config = RoutingConfig::from_toml_str(contents)?;
        let snapshot = RuleSnapshot::build(&config, &self.registry)?;
        Ok(self.holder.publish(snapshot))
    }

    /// Subscribe, then handle changes on a background task until the
    /// coordinator drops the watched path
    pub async fn start(self) -> Result<JoinHandle<()>> {
        let receiver = self.coordinator.watch(&config_path(&self.config_name)).await?;
        Ok(tokio::spawn(self.run(receiver)))
    }

    async fn run(self, mut receiver: watch::Receiver<Option<String>>) {
        while receiver.changed().await.is_ok() {
            let contents = receiver.borrow_and_update().clone();
            let Some(contents) = contents else {
                continue;
            };
            match self.apply(&contents) {
                Ok(version) => {
                    let ack = LockNode::ack_path(&self.instance_id);
                    if let Err(e) = self.coordinator.put(&ack, &version.to_string()).await {
                        warn!(error = %e, path = %ack, "Failed to acknowledge reload");
                    }
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        config = %self.config_name,
                        version = self.holder.version(),
                        "Rejected configuration change, keeping current snapshot"
                    );
                }
            }
        }
        info!(config = %self.config_name, "Configuration watch closed");
    }
}
