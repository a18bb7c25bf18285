//! Weight snapshots and collision logs on disk

use rand::rngs::StdRng;
use rand::SeedableRng;
use rollnet_agent::{ActorCritic, AgentConfig, CollisionLog, PersistError};
use rollnet_link::CollisionPoint;

fn config() -> AgentConfig {
    AgentConfig {
        actor_hidden: vec![6, 4],
        critic_hidden: vec![5],
        ..AgentConfig::default()
    }
}

#[tokio::test]
async fn test_saved_weights_reproduce_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.bin.gz");

    let mut rng = StdRng::seed_from_u64(21);
    let mut agent = ActorCritic::new(config(), &mut rng).unwrap();
    agent.state_value(&[0.1, -0.3, 0.2]).unwrap();
    agent.action(&[0.1, -0.3, 0.2], 255.0).unwrap();
    agent.learn(0.3, 0.1, 0.7, 0.01).unwrap();
    agent.save(&path).await.unwrap();

    let mut loaded = ActorCritic::load(&path, config()).await.unwrap().unwrap();
    assert_eq!(loaded.updates(), 1);
    assert_eq!(loaded.actor().snapshot(), agent.actor().snapshot());
    assert_eq!(loaded.critic().snapshot(), agent.critic().snapshot());

    let state = [0.4, 0.25, -0.6];
    assert_eq!(
        loaded.state_value(&state).unwrap().to_bits(),
        agent.state_value(&state).unwrap().to_bits()
    );
    assert_eq!(
        loaded.action(&state, 255.0).unwrap(),
        agent.action(&state, 255.0).unwrap()
    );
}

#[tokio::test]
async fn test_missing_file_loads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = ActorCritic::load(&dir.path().join("absent.bin.gz"), config())
        .await
        .unwrap();
    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_garbage_file_is_an_error_and_load_or_init_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.bin.gz");
    tokio::fs::write(&path, b"definitely not a snapshot").await.unwrap();

    assert!(ActorCritic::load(&path, config()).await.is_err());

    let mut rng = StdRng::seed_from_u64(4);
    let agent = ActorCritic::load_or_init(&path, config(), &mut rng).await.unwrap();
    assert_eq!(agent.updates(), 0);
    assert_eq!(agent.actor().topology(), vec![3, 6, 4, 2]);
}

#[tokio::test]
async fn test_truncated_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.bin.gz");
    let mut rng = StdRng::seed_from_u64(8);
    ActorCritic::new(config(), &mut rng)
        .unwrap()
        .save(&path)
        .await
        .unwrap();

    let bytes = tokio::fs::read(&path).await.unwrap();
    tokio::fs::write(&path, &bytes[..bytes.len() / 2]).await.unwrap();
    assert!(ActorCritic::load(&path, config()).await.is_err());
}

#[tokio::test]
async fn test_snapshot_from_other_topology_is_incompatible() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.bin.gz");
    let mut rng = StdRng::seed_from_u64(8);
    ActorCritic::new(config(), &mut rng)
        .unwrap()
        .save(&path)
        .await
        .unwrap();

    let other = AgentConfig {
        critic_hidden: vec![10, 10],
        ..config()
    };
    assert!(matches!(
        ActorCritic::load(&path, other.clone()).await,
        Err(PersistError::Incompatible(_))
    ));

    let agent = ActorCritic::load_or_init(&path, other, &mut rng).await.unwrap();
    assert_eq!(agent.critic().topology(), vec![3, 10, 10, 1]);
}

#[tokio::test]
async fn test_load_or_init_prefers_saved_weights() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("weights.bin.gz");
    let mut rng = StdRng::seed_from_u64(30);
    let agent = ActorCritic::new(config(), &mut rng).unwrap();
    agent.save(&path).await.unwrap();

    let mut other_rng = StdRng::seed_from_u64(31);
    let loaded = ActorCritic::load_or_init(&path, config(), &mut other_rng)
        .await
        .unwrap();
    assert_eq!(loaded.actor().snapshot(), agent.actor().snapshot());
}

#[tokio::test]
async fn test_collision_log_accumulates_across_saves() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("collisions.txt");

    let mut first = CollisionLog::new();
    first.record(CollisionPoint::new(1, 2, 0));
    first.record(CollisionPoint::new(3, 4, 0));
    assert_eq!(first.save(&path).await.unwrap(), 2);

    let mut second = CollisionLog::new();
    second.record(CollisionPoint::new(3, 4, 0));
    second.record(CollisionPoint::new(-5, 6, 0));
    assert_eq!(second.save(&path).await.unwrap(), 3);

    let text = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(text, "-5,6,0\n1,2,0\n3,4,0\n");

    let loaded = CollisionLog::load(&path).await.unwrap();
    assert_eq!(loaded.len(), 3);
    assert!(loaded.contains(&CollisionPoint::new(-5, 6, 0)));
}

#[tokio::test]
async fn test_missing_collision_log_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let log = CollisionLog::load(&dir.path().join("none.txt")).await.unwrap();
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_save_keeps_good_points_from_damaged_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("collisions.txt");
    let damaged = "1,2,0\n1.5,2,0\n";
    tokio::fs::write(&path, damaged).await.unwrap();

    let mut log = CollisionLog::new();
    log.record(CollisionPoint::new(7, 7, 0));
    assert_eq!(log.save(&path).await.unwrap(), 2);

    let text = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(text, "1,2,0\n7,7,0\n");
    let backup = tokio::fs::read_to_string(dir.path().join("collisions.txt.bak"))
        .await
        .unwrap();
    assert_eq!(backup, damaged);
    assert!(!dir.path().join("collisions.txt.tmp").exists());

    let loaded = CollisionLog::load(&path).await.unwrap();
    assert!(loaded.contains(&CollisionPoint::new(1, 2, 0)));
    assert!(loaded.contains(&CollisionPoint::new(7, 7, 0)));
}
