//! Sharding - key routing and fan-out across user shards
//!
//! - Versioned key hashing (`char-sum-v1`, `rolling-v2`)
//! - Static topology and modulo resolution to shard ids `1..=N`
//! - Registry owning one store handle per shard
//! - Single-shard and all-shard (fan-out) execution

pub mod fanout;
pub mod hasher;
pub mod registry;
pub mod topology;
pub mod types;

pub use fanout::{Access, FanoutCoordinator, FanoutOptions};
pub use hasher::HashStrategy;
pub use registry::{ShardRegistry, StorageBackend};
pub use topology::{MAX_KEY_LEN, ShardRouter, ShardTopology, resolve, validate_key};
pub use types::{DEFAULT_SHARD_COUNT, InvalidShardPolicy, ShardDescriptor, ShardId};
