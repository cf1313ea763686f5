pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, ShardError};
pub use store::ShardStore;
pub use types::{NewUser, Profile, ProfileView, ShardStats, User, UserUpdate, UserView};
