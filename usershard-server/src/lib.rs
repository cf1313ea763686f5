pub mod config;
pub mod core;
pub mod metrics;
pub mod server;
pub mod sharding;

// Re-export commonly used types
pub use config::ServerConfig;
pub use core::{NewUser, ShardError, ShardStore, UserUpdate, UserView};
pub use server::{AppState, create_router, init_metrics};
pub use sharding::{
    FanoutCoordinator, FanoutOptions, HashStrategy, InvalidShardPolicy, ShardDescriptor, ShardId,
    ShardRegistry, ShardTopology,
};
