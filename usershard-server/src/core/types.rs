use crate::core::error::{Result, ShardError};
use crate::sharding::ShardId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored profile record, one per user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: u64,
    pub shard_id: ShardId,
    pub bio: String,
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored user record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub shard_id: ShardId,
    pub username: String,
    pub email: String,
    pub password: String,
    pub profile_id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create-user payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default, rename = "avatarURL")]
    pub avatar_url: String,
}

impl NewUser {
    /// Field checks that do not depend on shard state
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(ShardError::InvalidRequest(
                "username is required".to_string(),
            ));
        }
        if !self.email.contains('@') {
            return Err(ShardError::InvalidRequest(format!(
                "invalid email address: {}",
                self.email
            )));
        }
        if self.password.is_empty() {
            return Err(ShardError::InvalidRequest(
                "password is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Update-user payload; email is the routing key and cannot change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.username.is_none() && self.password.is_none() {
            return Err(ShardError::InvalidRequest(
                "nothing to update: provide username or password".to_string(),
            ));
        }
        if self.username.as_deref().is_some_and(|u| u.trim().is_empty()) {
            return Err(ShardError::InvalidRequest(
                "username must not be empty".to_string(),
            ));
        }
        if self.password.as_deref().is_some_and(str::is_empty) {
            return Err(ShardError::InvalidRequest(
                "password must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Public profile representation (timestamps omitted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: u64,
    pub shard_id: ShardId,
    pub bio: String,
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
}

impl From<&Profile> for ProfileView {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            shard_id: profile.shard_id,
            bio: profile.bio.clone(),
            avatar_url: profile.avatar_url.clone(),
        }
    }
}

/// Public user representation (password and profile id omitted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: u64,
    pub shard_id: ShardId,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub profile: Option<ProfileView>,
}

impl UserView {
    pub fn new(user: &User, profile: Option<&Profile>) -> Self {
        Self {
            id: user.id,
            shard_id: user.shard_id,
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
            profile: profile.map(ProfileView::from),
        }
    }
}

/// Per-shard record counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardStats {
    pub shard_id: ShardId,
    pub storage_location: String,
    pub online: bool,
    pub users: usize,
    pub profiles: usize,
}
