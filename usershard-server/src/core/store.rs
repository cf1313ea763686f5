//! Per-shard record store
//!
//! Each shard owns its users and profiles exclusively. State lives in memory
//! behind a `parking_lot::RwLock`; when persistence is enabled every mutation
//! is written to the shard's storage file before it becomes visible.

use super::error::{Result, ShardError};
use super::types::{NewUser, Profile, ShardStats, User, UserUpdate, UserView};
use crate::metrics;
use crate::sharding::{HashStrategy, ShardDescriptor, ShardId};
use chrono::Utc;
use parking_lot::RwLock;
use radix_trie::{Trie, TrieCommon};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const SHARD_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Default)]
struct ShardState {
    /// Users keyed by email
    users: Trie<String, User>,
    profiles: BTreeMap<u64, Profile>,
    next_user_id: u64,
    next_profile_id: u64,
}

impl ShardState {
    fn view(&self, user: &User) -> UserView {
        UserView::new(user, self.profiles.get(&user.profile_id))
    }

    fn allocate_user_id(&mut self) -> u64 {
        self.next_user_id += 1;
        self.next_user_id
    }

    fn allocate_profile_id(&mut self) -> u64 {
        self.next_profile_id += 1;
        self.next_profile_id
    }
}

/// On-disk representation of one shard
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShardDocument {
    format_version: u32,
    hash_strategy: HashStrategy,
    shard_id: ShardId,
    next_user_id: u64,
    next_profile_id: u64,
    users: Vec<User>,
    profiles: Vec<Profile>,
}

/// JSON file backing a shard
#[derive(Debug)]
struct ShardFile {
    path: PathBuf,
    strategy: HashStrategy,
}

impl ShardFile {
    async fn load(&self, shard_id: ShardId) -> Result<ShardState> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Shard {} has no file at {:?}, starting empty", shard_id, self.path);
                return Ok(ShardState::default());
            }
            Err(e) => return Err(ShardError::unavailable(shard_id.value(), e.to_string())),
        };

        let doc: ShardDocument = serde_json::from_slice(&content)?;
        if doc.format_version != SHARD_FILE_VERSION {
            return Err(ShardError::SerializationError(format!(
                "unsupported shard file version {} in {:?}",
                doc.format_version, self.path
            )));
        }
        if doc.shard_id != shard_id {
            return Err(ShardError::InvalidTopology(format!(
                "{:?} belongs to shard {}, not shard {}",
                self.path, doc.shard_id, shard_id
            )));
        }
        if doc.hash_strategy != self.strategy {
            return Err(ShardError::InvalidTopology(format!(
                "{:?} was written with hash strategy {}, configured strategy is {}",
                self.path, doc.hash_strategy, self.strategy
            )));
        }

        let mut state = ShardState {
            next_user_id: doc.next_user_id,
            next_profile_id: doc.next_profile_id,
            ..ShardState::default()
        };
        for profile in doc.profiles {
            state.profiles.insert(profile.id, profile);
        }
        for user in doc.users {
            state.users.insert(user.email.clone(), user);
        }

        info!(
            "Loaded shard {} from {:?}: {} users",
            shard_id,
            self.path,
            state.users.len()
        );
        Ok(state)
    }

    /// `<storage_location>.tmp` beside the shard file
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn save(&self, shard_id: ShardId, state: &ShardState) -> Result<()> {
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by_key(|u| u.id);

        let doc = ShardDocument {
            format_version: SHARD_FILE_VERSION,
            hash_strategy: self.strategy,
            shard_id,
            next_user_id: state.next_user_id,
            next_profile_id: state.next_profile_id,
            users,
            profiles: state.profiles.values().cloned().collect(),
        };
        let bytes = serde_json::to_vec_pretty(&doc)?;

        let unavailable = |e: std::io::Error| ShardError::unavailable(shard_id.value(), e.to_string());
        let tmp = self.temp_path();
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(unavailable)?;
        }

        let mut file = tokio::fs::File::create(&tmp).await.map_err(unavailable)?;
        file.write_all(&bytes).await.map_err(unavailable)?;
        file.sync_all().await.map_err(unavailable)?;
        drop(file);
        tokio::fs::rename(&tmp, &self.path).await.map_err(unavailable)?;

        debug!("Persisted shard {} ({} bytes)", shard_id, bytes.len());
        Ok(())
    }
}

/// Storage handle for a single shard
#[derive(Debug)]
pub struct ShardStore {
    shard_id: ShardId,
    storage_location: String,
    state: RwLock<ShardState>,
    online: AtomicBool,
    file: Option<ShardFile>,
    /// Serializes mutations so file writes and in-memory swaps stay ordered
    write_lock: Mutex<()>,
}

impl ShardStore {
    /// Memory-only store for a shard
    pub fn in_memory(descriptor: &ShardDescriptor) -> Self {
        debug!(
            "Initializing in-memory store for shard {} ({})",
            descriptor.id, descriptor.storage_location
        );
        Self::with_state(descriptor, ShardState::default(), None)
    }

    /// Open a file-backed store at `data_dir/storage_location`, loading existing records
    pub async fn open(
        descriptor: &ShardDescriptor,
        data_dir: &Path,
        strategy: HashStrategy,
    ) -> Result<Self> {
        let file = ShardFile {
            path: data_dir.join(&descriptor.storage_location),
            strategy,
        };
        let state = file.load(descriptor.id).await?;
        Ok(Self::with_state(descriptor, state, Some(file)))
    }

    fn with_state(descriptor: &ShardDescriptor, state: ShardState, file: Option<ShardFile>) -> Self {
        metrics::set_shard_records(descriptor.id, state.users.len());
        Self {
            shard_id: descriptor.id,
            storage_location: descriptor.storage_location.clone(),
            state: RwLock::new(state),
            online: AtomicBool::new(true),
            file,
            write_lock: Mutex::new(()),
        }
    }

    pub fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    pub fn storage_location(&self) -> &str {
        &self.storage_location
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Take the shard offline (or back online). Offline shards fail every operation.
    pub fn set_online(&self, online: bool) {
        if online != self.online.swap(online, Ordering::AcqRel) {
            warn!(
                "Shard {} is now {}",
                self.shard_id,
                if online { "online" } else { "offline" }
            );
        }
    }

    fn ensure_online(&self) -> Result<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(ShardError::unavailable(self.shard_id.value(), "shard is offline"))
        }
    }

    /// Apply a mutation, persisting it first when the shard is file-backed
    async fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut ShardState) -> Result<T>,
    {
        let _guard = self.write_lock.lock().await;
        self.ensure_online()?;

        let (out, count) = match &self.file {
            None => {
                let mut state = self.state.write();
                let out = f(&mut state)?;
                (out, state.users.len())
            }
            Some(file) => {
                let mut next = self.state.read().clone();
                let out = f(&mut next)?;
                file.save(self.shard_id, &next).await?;
                let count = next.users.len();
                *self.state.write() = next;
                (out, count)
            }
        };

        metrics::set_shard_records(self.shard_id, count);
        Ok(out)
    }

    /// Create a profile and its user
    pub async fn create(&self, new_user: NewUser) -> Result<UserView> {
        debug!("CREATE shard={} email={}", self.shard_id, new_user.email);
        let shard_id = self.shard_id;

        self.mutate(move |state| {
            if state.users.get(&new_user.email).is_some() {
                return Err(ShardError::UserExists(new_user.email));
            }

            let now = Utc::now();
            let profile = Profile {
                id: state.allocate_profile_id(),
                shard_id,
                bio: new_user.bio,
                avatar_url: new_user.avatar_url,
                created_at: now,
                updated_at: now,
            };
            let user = User {
                id: state.allocate_user_id(),
                shard_id,
                username: new_user.username,
                email: new_user.email,
                password: new_user.password,
                profile_id: profile.id,
                created_at: now,
                updated_at: now,
            };

            let view = UserView::new(&user, Some(&profile));
            state.profiles.insert(profile.id, profile);
            state.users.insert(user.email.clone(), user);
            Ok(view)
        })
        .await
    }

    /// Look up a user by email
    pub async fn find_by_key(&self, email: &str) -> Result<UserView> {
        debug!("FIND shard={} email={}", self.shard_id, email);
        self.ensure_online()?;

        let state = self.state.read();
        state
            .users
            .get(email)
            .map(|user| state.view(user))
            .ok_or_else(|| ShardError::UserNotFound(email.to_string()))
    }

    /// Update username and/or password
    pub async fn update(&self, email: &str, update: UserUpdate) -> Result<UserView> {
        debug!("UPDATE shard={} email={}", self.shard_id, email);

        self.mutate(|state| {
            let Some(user) = state.users.get_mut(email) else {
                return Err(ShardError::UserNotFound(email.to_string()));
            };
            if let Some(username) = update.username {
                user.username = username;
            }
            if let Some(password) = update.password {
                user.password = password;
            }
            user.updated_at = Utc::now();

            let user = user.clone();
            Ok(state.view(&user))
        })
        .await
    }

    /// Remove a user and its profile
    pub async fn delete(&self, email: &str) -> Result<()> {
        debug!("DELETE shard={} email={}", self.shard_id, email);

        self.mutate(|state| {
            let user = state
                .users
                .remove(email)
                .ok_or_else(|| ShardError::UserNotFound(email.to_string()))?;
            state.profiles.remove(&user.profile_id);
            Ok(())
        })
        .await
    }

    /// All users on this shard in insertion (id) order, with profiles
    pub async fn find_all(&self) -> Result<Vec<UserView>> {
        self.ensure_online()?;

        let state = self.state.read();
        let mut users: Vec<&User> = state.users.values().collect();
        users.sort_by_key(|u| u.id);
        Ok(users.into_iter().map(|u| state.view(u)).collect())
    }

    /// Number of users stored on this shard
    pub fn len(&self) -> usize {
        self.state.read().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record counts; reported for offline shards too, flagged by `online`
    pub async fn stats(&self) -> Result<ShardStats> {
        let state = self.state.read();
        Ok(ShardStats {
            shard_id: self.shard_id,
            storage_location: self.storage_location.clone(),
            online: self.is_online(),
            users: state.users.len(),
            profiles: state.profiles.len(),
        })
    }
}
