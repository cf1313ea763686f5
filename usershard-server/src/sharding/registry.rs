//! Shard Registry
//!
//! Owns exactly one `ShardStore` per descriptor in the topology for the whole
//! process lifetime. Shards are never added, removed or moved after `open`.

use super::hasher::HashStrategy;
use super::topology::{ShardRouter, ShardTopology};
use super::types::{InvalidShardPolicy, ShardId};
use crate::core::ShardStore;
use crate::core::error::{Result, ShardError};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where shard stores keep their records
#[derive(Debug, Clone, Copy)]
pub enum StorageBackend<'a> {
    Memory,
    /// JSON files under this directory, one per storage location
    Files(&'a Path),
}

/// Shard id → store handle table
#[derive(Debug)]
pub struct ShardRegistry {
    topology: ShardTopology,
    router: ShardRouter,
    policy: InvalidShardPolicy,
    /// Index `i` holds shard `i + 1`
    handles: Vec<Arc<ShardStore>>,
}

impl ShardRegistry {
    /// Build one store per descriptor
    pub async fn open(
        topology: ShardTopology,
        strategy: HashStrategy,
        policy: InvalidShardPolicy,
        backend: StorageBackend<'_>,
    ) -> Result<Self> {
        let mut handles = Vec::with_capacity(topology.shards().len());
        for descriptor in topology.shards() {
            let store = match backend {
                StorageBackend::Memory => ShardStore::in_memory(descriptor),
                StorageBackend::Files(dir) => ShardStore::open(descriptor, dir, strategy).await?,
            };
            handles.push(Arc::new(store));
        }

        info!(
            "Shard registry ready: {} shards, strategy={}, invalid_shard_policy={:?}",
            handles.len(),
            strategy,
            policy
        );

        Ok(Self {
            router: ShardRouter::new(strategy, topology.shard_count()),
            topology,
            policy,
            handles,
        })
    }

    /// In-memory registry over the given topology
    pub async fn in_memory(
        topology: ShardTopology,
        strategy: HashStrategy,
        policy: InvalidShardPolicy,
    ) -> Result<Self> {
        Self::open(topology, strategy, policy, StorageBackend::Memory).await
    }

    /// Store handle for a shard id, applying the invalid-id policy
    pub fn handle_for(&self, id: ShardId) -> Result<Arc<ShardStore>> {
        if let Some(handle) = self.slot(id) {
            return Ok(Arc::clone(handle));
        }

        match self.policy {
            InvalidShardPolicy::Strict => Err(ShardError::UnknownShard(id.value())),
            InvalidShardPolicy::Fallback => {
                warn!("Unknown shard id {}, falling back to shard {}", id, ShardId::FIRST);
                self.slot(ShardId::FIRST)
                    .map(Arc::clone)
                    .ok_or(ShardError::UnknownShard(id.value()))
            }
        }
    }

    fn slot(&self, id: ShardId) -> Option<&Arc<ShardStore>> {
        let index = id.value().checked_sub(1)? as usize;
        self.handles.get(index)
    }

    /// Shard id owning `key`
    pub fn shard_for(&self, key: &str) -> Result<ShardId> {
        self.router.shard_for(key)
    }

    /// Handle used for create/update/delete of `key`
    pub fn route_for_write(&self, key: &str) -> Result<Arc<ShardStore>> {
        let id = self.shard_for(key)?;
        debug!("Routing write for {} to shard {}", key, id);
        self.handle_for(id)
    }

    /// Handle used for point lookups of `key`
    pub fn route_for_read(&self, key: &str) -> Result<Arc<ShardStore>> {
        let id = self.shard_for(key)?;
        debug!("Routing read for {} to shard {}", key, id);
        self.handle_for(id)
    }

    /// Every handle, in ascending shard id order
    pub fn all_handles(&self) -> &[Arc<ShardStore>] {
        &self.handles
    }

    pub fn topology(&self) -> &ShardTopology {
        &self.topology
    }

    pub fn strategy(&self) -> HashStrategy {
        self.router.strategy()
    }

    pub fn policy(&self) -> InvalidShardPolicy {
        self.policy
    }

    pub fn shard_count(&self) -> u32 {
        self.topology.shard_count()
    }
}
