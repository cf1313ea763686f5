use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of shards in the default topology
pub const DEFAULT_SHARD_COUNT: u32 = 3;

/// Shard identifier. Valid ids are `1..=N` for a topology of N shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardId(u32);

impl ShardId {
    /// The default shard used by the fallback policy
    pub const FIRST: ShardId = ShardId(1);

    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for ShardId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<ShardId> for u32 {
    fn from(id: ShardId) -> Self {
        id.0
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static description of one shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardDescriptor {
    pub id: ShardId,
    /// Where the shard keeps its records, relative to the storage data directory
    pub storage_location: String,
}

impl ShardDescriptor {
    pub fn new(id: u32, storage_location: impl Into<String>) -> Self {
        Self {
            id: ShardId(id),
            storage_location: storage_location.into(),
        }
    }
}

/// What the registry does with a shard id outside the topology
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvalidShardPolicy {
    /// Resolve unknown ids to shard 1
    #[default]
    Fallback,
    /// Reject unknown ids with `ShardError::UnknownShard`
    Strict,
}
