use std::sync::Arc;

use staking_engine::{
    channel, CreatePoolParams, EngineConfig, FixedPointAmount, PoolId, StakingEngine, StakingEvent,
    TokenId, UserId,
};

fn create_pool(engine: &StakingEngine) -> PoolId {
    let params = CreatePoolParams {
        staking_token:          TokenId::from("STK"),
        reward_token:           TokenId::from("RWD"),
        reward_rate_per_second: FixedPointAmount::from_tokens(1),
        lock_duration_seconds:  60,
        minimum_stake:          None,
    };
    engine.create_pool(params, 0).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pools_progress_independently() {
    let engine = Arc::new(StakingEngine::new(EngineConfig::default()).unwrap());
    let pools: Vec<PoolId> = (0..8).map(|_| create_pool(&engine)).collect();

    let mut handles = Vec::new();
    for &pool in &pools {
        let engine = engine.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            for i in 0..200u64 {
                let user = UserId(format!("user-{}", i % 10));
                engine.stake(pool, &user, FixedPointAmount::from_tokens(1), i).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for pool in pools {
        let stored = engine.get_pool(pool).unwrap();
        assert_eq!(stored.total_staked, FixedPointAmount::from_tokens(200));
        assert_eq!(stored.last_accrual_timestamp, 199);
        assert_eq!(engine.total_stakers(pool).unwrap(), 10);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_pool_calls_are_serialized() {
    let engine = Arc::new(StakingEngine::new(EngineConfig::default()).unwrap());
    let pool = create_pool(&engine);
    let (sink, mut rx) = channel();
    engine.subscribe(Arc::new(sink));

    // Every caller uses the same instant so ordering between them is free.
    let mut handles = Vec::new();
    for worker in 0..16 {
        let engine = engine.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let user = UserId(format!("worker-{worker}"));
            for _ in 0..50 {
                engine.stake(pool, &user, FixedPointAmount::from_tokens(2), 10).unwrap();
                engine.withdraw(pool, &user, FixedPointAmount::from_tokens(1), 10).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stored = engine.get_pool(pool).unwrap();
    assert_eq!(stored.total_staked, FixedPointAmount::from_tokens(16 * 50));
    // 500 bps on each 1-token early withdrawal
    assert_eq!(stored.collected_fees, FixedPointAmount::from_tokens(40));

    let mut staked = 0;
    let mut withdrawn = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            StakingEvent::Staked { .. } => staked += 1,
            StakingEvent::Withdrawn { .. } => withdrawn += 1,
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!((staked, withdrawn), (800, 800));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cross_pool_reads_do_not_deadlock() {
    let engine = Arc::new(StakingEngine::new(EngineConfig::default()).unwrap());
    let a = create_pool(&engine);
    let b = create_pool(&engine);
    engine.stake(a, &UserId::from("alice"), FixedPointAmount::from_tokens(100), 0).unwrap();
    engine.stake(b, &UserId::from("bob"), FixedPointAmount::from_tokens(400), 0).unwrap();

    let forward = {
        let engine = engine.clone();
        tokio::task::spawn_blocking(move || {
            (0..500).map(|_| engine.utilization_rate(a, b, 0).unwrap()).last()
        })
    };
    let backward = {
        let engine = engine.clone();
        tokio::task::spawn_blocking(move || {
            (0..500).map(|_| engine.utilization_rate(b, a, 0).unwrap()).last()
        })
    };

    assert_eq!(forward.await.unwrap(), Some(FixedPointAmount::from_tokens(25)));
    assert_eq!(backward.await.unwrap(), Some(FixedPointAmount::from_tokens(400)));
}
