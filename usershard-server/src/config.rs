use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::Result;
use crate::sharding::{
    FanoutOptions, HashStrategy, InvalidShardPolicy, ShardDescriptor, ShardTopology,
};

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub server: Server,
    pub sharding: ShardingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub fanout: FanoutConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardingConfig {
    #[serde(default)]
    pub hash_strategy: HashStrategy,
    #[serde(default)]
    pub invalid_shard_policy: InvalidShardPolicy,
    pub shards: Vec<ShardEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardEntry {
    pub id: u32,
    pub storage_location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Persist shards to `data_dir/<storage_location>`
    pub persist: bool,
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Per-shard deadline for all-shard operations (none if unset)
    pub shard_timeout_ms: Option<u64>,
    #[serde(default)]
    pub cancel_on_abandon: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            persist: false,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: Server {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            sharding: ShardingConfig {
                hash_strategy: HashStrategy::CharSumV1,
                invalid_shard_policy: InvalidShardPolicy::Fallback,
                shards: ShardTopology::default()
                    .shards()
                    .iter()
                    .map(|s| ShardEntry {
                        id: s.id.value(),
                        storage_location: s.storage_location.clone(),
                    })
                    .collect(),
            },
            storage: StorageConfig::default(),
            fanout: FanoutConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ServerConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Build the validated shard topology
    pub fn to_topology(&self) -> Result<ShardTopology> {
        ShardTopology::new(
            self.sharding
                .shards
                .iter()
                .map(|s| ShardDescriptor::new(s.id, s.storage_location.clone()))
                .collect(),
        )
    }

    /// Convert to FanoutOptions
    pub fn to_fanout_options(&self) -> FanoutOptions {
        FanoutOptions {
            shard_timeout: self.fanout.shard_timeout_ms.map(Duration::from_millis),
            cancel_on_abandon: self.fanout.cancel_on_abandon,
        }
    }

    /// Get server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
