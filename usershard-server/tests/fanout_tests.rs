// Fan-out Coordinator Tests
// All-shard aggregation, per-shard deadlines and abandonment behaviour

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use usershard_server::sharding::FanoutCoordinator;
use usershard_server::{
    FanoutOptions, HashStrategy, InvalidShardPolicy, NewUser, ShardError, ShardId, ShardRegistry,
    ShardTopology,
};

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
        password: "securepassword".to_string(),
        bio: String::new(),
        avatar_url: String::new(),
    }
}

#[tokio::test]
async fn test_fan_out_visits_every_shard_once() {
    let coordinator = coordinator(FanoutOptions::default()).await;
    let calls = Arc::new(AtomicUsize::new(0));

    let results = coordinator
        .fan_out("count", |store| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(store.shard_id().value() * 10)
            }
        })
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        results,
        vec![
            (ShardId::new(1), 10),
            (ShardId::new(2), 20),
            (ShardId::new(3), 30)
        ]
    );
}

#[tokio::test]
async fn test_results_ordered_by_shard_not_completion() {
    let coordinator = coordinator(FanoutOptions::default()).await;

    // Shard 1 finishes last
    let results = coordinator
        .fan_out("ordered", |store| async move {
            let id = store.shard_id().value();
            tokio::time::sleep(Duration::from_millis(u64::from(4 - id) * 30)).await;
            Ok(id)
        })
        .await
        .unwrap();

    let ids: Vec<u32> = results.into_iter().map(|(_, id)| id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_offline_shard_fails_aggregate() {
    let coordinator = coordinator(FanoutOptions::default()).await;
    coordinator.create_user(new_user("a@b.com")).await.unwrap();
    coordinator.create_user(new_user("c@b.com")).await.unwrap();

    let registry = coordinator.registry();
    registry.handle_for(ShardId::new(3)).unwrap().set_online(false);

    match coordinator.list_users().await {
        Err(ShardError::ShardUnavailable { shard, .. }) => assert_eq!(shard, 3),
        other => panic!("expected unavailable shard 3, got {:?}", other),
    }

    registry.handle_for(ShardId::new(3)).unwrap().set_online(true);
    assert_eq!(coordinator.list_users().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_lowest_failing_shard_reported() {
    let coordinator = coordinator(FanoutOptions::default()).await;
    let registry = coordinator.registry();
    registry.handle_for(ShardId::new(3)).unwrap().set_online(false);
    registry.handle_for(ShardId::new(2)).unwrap().set_online(false);

    match coordinator.list_users().await {
        Err(ShardError::ShardUnavailable { shard, .. }) => assert_eq!(shard, 2),
        other => panic!("expected unavailable shard 2, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_shard_times_out() {
    let coordinator = coordinator(FanoutOptions {
        shard_timeout: Some(Duration::from_millis(50)),
        cancel_on_abandon: false,
    })
    .await;

    let result = coordinator
        .fan_out("slow", |store| async move {
            if store.shard_id() == ShardId::new(2) {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Ok(())
        })
        .await;

    match result {
        Err(ShardError::ShardTimeout { shard, timeout_ms }) => {
            assert_eq!(shard, 2);
            assert_eq!(timeout_ms, 50);
        }
        other => panic!("expected timeout on shard 2, got {:?}", other),
    }
}

#[tokio::test]
async fn test_no_timeout_waits_for_slow_shard() {
    let coordinator = coordinator(FanoutOptions::default()).await;

    let results = coordinator
        .fan_out("slow", |store| async move {
            if store.shard_id() == ShardId::new(2) {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            Ok(store.shard_id())
        })
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
}

async fn abandon_slow_fan_out(cancel_on_abandon: bool) -> bool {
    let coordinator = coordinator(FanoutOptions {
        shard_timeout: None,
        cancel_on_abandon,
    })
    .await;
    let finished = Arc::new(AtomicBool::new(false));

    let call = coordinator.fan_out("abandoned", |_store| {
        let finished = Arc::clone(&finished);
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            finished.store(true, Ordering::SeqCst);
            Ok(())
        }
    });

    // Caller gives up well before the shards finish
    let outcome = tokio::time::timeout(Duration::from_millis(20), call).await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_millis(300)).await;
    finished.load(Ordering::SeqCst)
}

#[tokio::test]
async fn test_abandoned_fan_out_keeps_running_by_default() {
    assert!(abandon_slow_fan_out(false).await);
}

#[tokio::test]
async fn test_abandoned_fan_out_cancelled_when_configured() {
    assert!(!abandon_slow_fan_out(true).await);
}

#[tokio::test]
async fn test_point_operations_touch_one_shard() {
    let coordinator = coordinator(FanoutOptions::default()).await;

    let user = coordinator.create_user(new_user("b@b.com")).await.unwrap();
    assert_eq!(user.shard_id, ShardId::new(2));

    let registry = coordinator.registry();
    let sizes: Vec<usize> = registry.all_handles().iter().map(|h| h.len()).collect();
    assert_eq!(sizes, vec![0, 1, 0]);

    // A different shard going offline does not affect this key
    registry.handle_for(ShardId::new(1)).unwrap().set_online(false);
    let found = coordinator.find_user("b@b.com").await.unwrap();
    assert_eq!(found.email, "b@b.com");
}

#[tokio::test]
async fn test_shard_stats_flag_offline_shards() {
    let coordinator = coordinator(FanoutOptions::default()).await;
    coordinator.create_user(new_user("c@b.com")).await.unwrap();
    coordinator
        .registry()
        .handle_for(ShardId::new(3))
        .unwrap()
        .set_online(false);

    let stats = coordinator.shard_stats().await.unwrap();
    let online: Vec<bool> = stats.iter().map(|s| s.online).collect();
    assert_eq!(online, vec![true, true, false]);
    assert_eq!(stats[2].users, 1);
}
