//! Static shard topology and key → shard resolution

use super::hasher::HashStrategy;
use super::types::{DEFAULT_SHARD_COUNT, ShardDescriptor, ShardId};
use crate::core::error::{Result, ShardError};
use std::collections::HashSet;
use tracing::info;

/// Longest accepted routing key (RFC 5321 address limit)
pub const MAX_KEY_LEN: usize = 320;

/// Map a hash value to a shard id in `[1, shard_count]`.
///
/// Negative hashes are folded with their absolute value before the modulo.
///
/// # Example
/// ```
/// use usershard_server::sharding::{ShardId, resolve};
///
/// assert_eq!(resolve(624, 3), ShardId::new(1));
/// assert_eq!(resolve(-4, 3), ShardId::new(2));
/// ```
pub fn resolve(hash: i64, shard_count: u32) -> ShardId {
    assert!(shard_count > 0, "shard count must be positive");
    let bucket = hash.unsigned_abs() % u64::from(shard_count);
    // bucket < shard_count, so it fits in u32
    ShardId::new(bucket as u32 + 1)
}

/// Reject keys that cannot be routed
pub fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(ShardError::InvalidKey("key must not be empty".to_string()));
    }
    if key.chars().count() > MAX_KEY_LEN {
        return Err(ShardError::InvalidKey(format!(
            "key longer than {} characters",
            MAX_KEY_LEN
        )));
    }
    if key.chars().any(char::is_control) {
        return Err(ShardError::InvalidKey(
            "key contains control characters".to_string(),
        ));
    }
    Ok(())
}

/// Immutable shard table, built once at startup
#[derive(Debug, Clone)]
pub struct ShardTopology {
    shards: Vec<ShardDescriptor>,
}

impl ShardTopology {
    /// Build a topology, checking ids are contiguous from 1 and locations unique
    pub fn new(mut shards: Vec<ShardDescriptor>) -> Result<Self> {
        if shards.is_empty() {
            return Err(ShardError::InvalidTopology(
                "at least one shard is required".to_string(),
            ));
        }

        shards.sort_by_key(|s| s.id);

        {
            let mut locations = HashSet::new();
            for (index, shard) in shards.iter().enumerate() {
                let expected = index as u32 + 1;
                if shard.id.value() != expected {
                    return Err(ShardError::InvalidTopology(format!(
                        "shard ids must be contiguous from 1: expected {}, found {}",
                        expected, shard.id
                    )));
                }
                if shard.storage_location.trim().is_empty() {
                    return Err(ShardError::InvalidTopology(format!(
                        "shard {} has an empty storage location",
                        shard.id
                    )));
                }
                if !locations.insert(shard.storage_location.as_str()) {
                    return Err(ShardError::InvalidTopology(format!(
                        "storage location {} is used by more than one shard",
                        shard.storage_location
                    )));
                }
            }
        }

        info!("Shard topology initialized with {} shards", shards.len());
        Ok(Self { shards })
    }

    /// Number of shards (N)
    pub fn shard_count(&self) -> u32 {
        self.shards.len() as u32
    }

    /// Descriptors in ascending id order
    pub fn shards(&self) -> &[ShardDescriptor] {
        &self.shards
    }

    pub fn get(&self, id: ShardId) -> Option<&ShardDescriptor> {
        let index = id.value().checked_sub(1)? as usize;
        self.shards.get(index)
    }

    pub fn contains(&self, id: ShardId) -> bool {
        self.get(id).is_some()
    }

    /// Shard ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = ShardId> + '_ {
        self.shards.iter().map(|s| s.id)
    }
}

impl Default for ShardTopology {
    fn default() -> Self {
        let shards = (1..=DEFAULT_SHARD_COUNT)
            .map(|id| ShardDescriptor::new(id, format!("shard{}.json", id)))
            .collect();
        Self { shards }
    }
}

/// Hash strategy bound to a shard count
#[derive(Debug, Clone, Copy)]
pub struct ShardRouter {
    strategy: HashStrategy,
    shard_count: u32,
}

impl ShardRouter {
    pub fn new(strategy: HashStrategy, shard_count: u32) -> Self {
        assert!(shard_count > 0, "shard count must be positive");
        Self {
            strategy,
            shard_count,
        }
    }

    /// Shard owning `key`
    pub fn shard_for(&self, key: &str) -> Result<ShardId> {
        validate_key(key)?;
        Ok(resolve(self.strategy.hash(key), self.shard_count))
    }

    pub fn strategy(&self) -> HashStrategy {
        self.strategy
    }

    pub fn shard_count(&self) -> u32 {
        self.shard_count
    }
}
