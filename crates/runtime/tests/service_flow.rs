use std::time::Duration;

use tokio::time::timeout;

use warren_core::LevelId;
use warren_runtime::{GameService, ResponseType, RuntimeConfig};

fn test_config() -> RuntimeConfig {
    RuntimeConfig {
        master_seed: 1234,
        idle_poll: Duration::from_millis(10),
        ..RuntimeConfig::default()
    }
}

#[tokio::test]
async fn login_streams_state_frames_and_wait_consumes_the_turn() {
    let handle = GameService::spawn(test_config());
    let mut login = handle.login("tok-alpha").await.unwrap();
    let entity = login.entity;

    let first = timeout(Duration::from_secs(10), login.responses.recv())
        .await
        .expect("first frame within deadline")
        .expect("channel open");
    assert_eq!(first.response_type, ResponseType::State);
    assert_eq!(first.my_entity_id, Some(entity));
    assert!(first.grid.is_some());
    assert!(first.map.as_ref().is_some_and(|m| !m.is_empty()));

    handle
        .submit(entity, "WAIT", serde_json::Value::Null)
        .await
        .unwrap();
    let second = timeout(Duration::from_secs(10), login.responses.recv())
        .await
        .expect("second frame within deadline")
        .expect("channel open");
    assert!(second.tick >= first.tick);
}

#[tokio::test]
async fn relogin_with_the_same_token_reuses_the_entity_and_replaces_the_channel() {
    let handle = GameService::spawn(test_config());
    let first = handle.login("tok-beta").await.unwrap();
    let entity = first.entity;
    let mut old_rx = first.responses;

    let second = handle.login("tok-beta").await.unwrap();
    assert_eq!(second.entity, entity);

    // The replaced channel drains its buffer and then closes.
    let closed = timeout(Duration::from_secs(10), async {
        while old_rx.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "old observer channel never closed");
}

#[tokio::test]
async fn unknown_actions_are_dropped_without_breaking_the_session() {
    let handle = GameService::spawn(test_config());
    let mut login = handle.login("tok-gamma").await.unwrap();
    let entity = login.entity;

    timeout(Duration::from_secs(10), login.responses.recv())
        .await
        .expect("initial frame")
        .expect("channel open");

    handle
        .submit(entity, "DANCE", serde_json::Value::Null)
        .await
        .unwrap();
    handle
        .submit(entity, "wait", serde_json::Value::Null)
        .await
        .unwrap();

    // The lowercase WAIT still lands, so frames keep flowing.
    let frame = timeout(Duration::from_secs(10), login.responses.recv())
        .await
        .expect("frame after commands")
        .expect("channel open");
    assert_eq!(frame.response_type, ResponseType::State);
}

#[tokio::test]
async fn report_exposes_the_running_level() {
    let handle = GameService::spawn(test_config());
    let _login = handle.login("tok-delta").await.unwrap();

    let report = timeout(
        Duration::from_secs(10),
        handle.report(LevelId::SURFACE),
    )
    .await
    .expect("report within deadline")
    .unwrap()
    .expect("surface level is running");

    assert_eq!(report.level, LevelId::SURFACE);
    assert!(report.queue_len >= 1);
    assert!(report.entity_count >= 1);

    let missing = handle.report(LevelId(40)).await.unwrap();
    assert!(missing.is_none());
}
