//! Fan-out Coordinator
//!
//! Point operations run against exactly one shard, chosen from the key.
//! All-shard operations run the same call on every shard in its own task,
//! join on all of them and return results grouped by ascending shard id.
//! A failure on any shard fails the whole call; partial results are never
//! returned.

use super::registry::ShardRegistry;
use super::types::ShardId;
use crate::core::error::{Result, ShardError};
use crate::core::types::{NewUser, ShardStats, UserUpdate, UserView};
use crate::core::ShardStore;
use crate::metrics;
use futures_util::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::AbortHandle;
use tracing::{debug, error, warn};

/// Fan-out behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutOptions {
    /// Per-shard deadline; a shard exceeding it fails the aggregate
    pub shard_timeout: Option<Duration>,
    /// Abort in-flight shard tasks when the caller stops waiting
    pub cancel_on_abandon: bool,
}

/// Which routing entry point a single-shard call goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Aborts the wrapped tasks when dropped
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Runs operations against one shard or all of them
#[derive(Debug, Clone)]
pub struct FanoutCoordinator {
    registry: Arc<ShardRegistry>,
    options: FanoutOptions,
}

impl FanoutCoordinator {
    pub fn new(registry: Arc<ShardRegistry>, options: FanoutOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &Arc<ShardRegistry> {
        &self.registry
    }

    pub fn options(&self) -> FanoutOptions {
        self.options
    }

    /// Run `op` against the single shard owning `key`
    pub async fn on_shard<T, F, Fut>(
        &self,
        operation: &'static str,
        access: Access,
        key: &str,
        op: F,
    ) -> Result<T>
    where
        F: FnOnce(Arc<ShardStore>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let handle = match access {
            Access::Read => self.registry.route_for_read(key)?,
            Access::Write => self.registry.route_for_write(key)?,
        };
        let shard = handle.shard_id();

        let start = Instant::now();
        let result = op(handle).await;
        metrics::record_shard_op(
            shard,
            operation,
            metrics::status_label(&result),
            start.elapsed().as_secs_f64(),
        );
        result
    }

    /// Run `op` against every shard concurrently.
    ///
    /// Returns one entry per shard in ascending shard id order, or the first
    /// failure (by shard id) if any shard failed.
    pub async fn fan_out<T, F, Fut>(
        &self,
        operation: &'static str,
        op: F,
    ) -> Result<Vec<(ShardId, T)>>
    where
        F: Fn(Arc<ShardStore>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let start = Instant::now();
        let shard_timeout = self.options.shard_timeout;
        let handles = self.registry.all_handles();

        let mut shard_ids = Vec::with_capacity(handles.len());
        let mut tasks = Vec::with_capacity(handles.len());
        for handle in handles {
            let shard = handle.shard_id();
            let fut = op(Arc::clone(handle));
            shard_ids.push(shard);
            tasks.push(tokio::spawn(run_on_shard(
                shard,
                operation,
                shard_timeout,
                fut,
            )));
        }
        debug!("Fan-out {} dispatched to {} shards", operation, tasks.len());

        let _abort = self
            .options
            .cancel_on_abandon
            .then(|| AbortOnDrop(tasks.iter().map(|t| t.abort_handle()).collect()));

        let joined = join_all(tasks).await;

        let mut results = Vec::with_capacity(joined.len());
        let mut failure = None;
        for (shard, outcome) in shard_ids.into_iter().zip(joined) {
            match outcome {
                Ok(Ok(value)) => results.push((shard, value)),
                Ok(Err(e)) => {
                    warn!("Fan-out {} failed on shard {}: {}", operation, shard, e);
                    failure.get_or_insert(e);
                }
                Err(e) => {
                    error!(
                        "Fan-out {} task for shard {} did not complete: {}",
                        operation, shard, e
                    );
                    failure.get_or_insert(ShardError::InternalError(format!(
                        "shard {} task failed: {}",
                        shard, e
                    )));
                }
            }
        }

        let outcome = match failure {
            Some(e) => Err(e),
            None => Ok(results),
        };
        metrics::record_fanout(
            operation,
            metrics::status_label(&outcome),
            start.elapsed().as_secs_f64(),
        );
        outcome
    }

    /// Create a user on the shard owning its email
    pub async fn create_user(&self, new_user: NewUser) -> Result<UserView> {
        new_user.validate()?;
        let email = new_user.email.clone();
        self.on_shard("create", Access::Write, &email, |store| async move {
            store.create(new_user).await
        })
        .await
    }

    pub async fn find_user(&self, email: &str) -> Result<UserView> {
        self.on_shard("find", Access::Read, email, |store| async move {
            store.find_by_key(email).await
        })
        .await
    }

    pub async fn update_user(&self, email: &str, update: UserUpdate) -> Result<UserView> {
        update.validate()?;
        self.on_shard("update", Access::Write, email, |store| async move {
            store.update(email, update).await
        })
        .await
    }

    pub async fn delete_user(&self, email: &str) -> Result<()> {
        self.on_shard("delete", Access::Write, email, |store| async move {
            store.delete(email).await
        })
        .await
    }

    /// Every user on every shard, grouped by ascending shard id
    pub async fn list_users(&self) -> Result<Vec<UserView>> {
        let per_shard = self
            .fan_out("list_users", |store| async move { store.find_all().await })
            .await?;
        Ok(per_shard.into_iter().flat_map(|(_, users)| users).collect())
    }

    /// Record counts for every shard
    pub async fn shard_stats(&self) -> Result<Vec<ShardStats>> {
        let per_shard = self
            .fan_out("shard_stats", |store| async move { store.stats().await })
            .await?;
        Ok(per_shard.into_iter().map(|(_, stats)| stats).collect())
    }
}

async fn run_on_shard<T, Fut>(
    shard: ShardId,
    operation: &'static str,
    shard_timeout: Option<Duration>,
    fut: Fut,
) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let result = match shard_timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or_else(|_| {
                Err(ShardError::ShardTimeout {
                    shard: shard.value(),
                    timeout_ms: limit.as_millis() as u64,
                })
            }),
        None => fut.await,
    };
    metrics::record_shard_op(
        shard,
        operation,
        metrics::status_label(&result),
        start.elapsed().as_secs_f64(),
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sharding::{HashStrategy, InvalidShardPolicy, ShardTopology};

    async fn coordinator(options: FanoutOptions) -> FanoutCoordinator {
        let registry = ShardRegistry::in_memory(
            ShardTopology::default(),
            HashStrategy::CharSumV1,
            InvalidShardPolicy::Fallback,
        )
        .await
        .unwrap();
        FanoutCoordinator::new(Arc::new(registry), options)
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            username: email.split('@').next().unwrap_or_default().to_string(),
            email: email.to_string(),
            password: "pw".to_string(),
            bio: String::new(),
            avatar_url: String::new(),
        }
    }

    #[tokio::test]
    async fn test_single_shard_path_touches_one_shard() {
        let coordinator = coordinator(FanoutOptions::default()).await;
        let user = coordinator.create_user(new_user("b@b.com")).await.unwrap();
        assert_eq!(user.shard_id, ShardId::new(2));

        let counts: Vec<usize> = coordinator
            .registry()
            .all_handles()
            .iter()
            .map(|h| h.len())
            .collect();
        assert_eq!(counts, vec![0, 1, 0]);
    }

    #[tokio::test]
    async fn test_create_validates_before_routing() {
        let coordinator = coordinator(FanoutOptions::default()).await;
        let result = coordinator.create_user(new_user("no-at-sign")).await;
        assert!(matches!(result, Err(ShardError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_fan_out_orders_by_shard_id() {
        let coordinator = coordinator(FanoutOptions::default()).await;
        let ids: Vec<u32> = coordinator
            .fan_out("ids", |store| async move { Ok(store.shard_id().value()) })
            .await
            .unwrap()
            .into_iter()
            .map(|(id, value)| {
                assert_eq!(id.value(), value);
                value
            })
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fan_out_reports_lowest_failing_shard() {
        let coordinator = coordinator(FanoutOptions::default()).await;
        let result: Result<Vec<(ShardId, ())>> = coordinator
            .fan_out("fail", |store| async move {
                match store.shard_id().value() {
                    1 => Ok(()),
                    id => Err(ShardError::unavailable(id, "down")),
                }
            })
            .await;
        assert!(matches!(
            result,
            Err(ShardError::ShardUnavailable { shard: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_fan_out_panic_fails_aggregate() {
        let coordinator = coordinator(FanoutOptions::default()).await;
        let result: Result<Vec<(ShardId, u32)>> = coordinator
            .fan_out("panic", |store| async move {
                let id = store.shard_id().value();
                if id == 3 {
                    panic!("shard task blew up");
                }
                Ok(id)
            })
            .await;
        assert!(matches!(result, Err(ShardError::InternalError(_))));
    }
}
