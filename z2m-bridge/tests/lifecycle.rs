//! Startup, settle, restore and shutdown behavior

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{config, eventually, light, started_bridge, started_bridge_with, RecordingHost, DISCOVERY_TOPIC};
use z2m_bridge::{
    Bridge, BridgeConfig, BridgeError, Entity, HostCommand, HostHandles, MemoryClient, MqttClient,
    SettleReason, StartOutcome,
};

#[tokio::test]
async fn test_start_without_url_is_disabled() {
    let bridge = Bridge::new(BridgeConfig::default(), HostHandles::new(), None);
    assert_eq!(bridge.start().await.unwrap(), StartOutcome::Disabled);

    let health = bridge.health();
    assert!(!health.connected);
    assert_eq!(health.live_topics, 0);
}

#[tokio::test]
async fn test_start_with_unusable_url_is_disabled() {
    let config = BridgeConfig {
        mqtt_url: Some("ws://broker.lan/mqtt".to_string()),
        ..Default::default()
    };
    let bridge = Bridge::new(config, HostHandles::new(), None);
    assert_eq!(bridge.start().await.unwrap(), StartOutcome::Disabled);
}

#[tokio::test]
async fn test_connect_failure_leaves_bridge_disabled() {
    let client = Arc::new(MemoryClient::new());
    client.refuse_connect(true);
    let bridge = Bridge::new(config(), HostHandles::new(), None);

    let result = bridge.start_with_client(client.clone()).await;
    assert!(matches!(result, Err(BridgeError::BrokerConnectFailed(_))));
    assert!(!bridge.health().connected);

    let command = HostCommand::new("c1", "TurnOn");
    let result = bridge.handle_command(&command, Entity::new("entity-x", "device-x")).await;
    assert!(matches!(result, Err(BridgeError::NotConnected)));
}

#[tokio::test]
async fn test_discovery_subscribe_failure_disconnects() {
    let client = Arc::new(MemoryClient::new());
    client.refuse_topic(DISCOVERY_TOPIC);
    let bridge = Bridge::new(config(), HostHandles::new(), None);

    let result = bridge.start_with_client(client.clone()).await;
    assert!(matches!(result, Err(BridgeError::BrokerSubscribeFailed(_))));
    assert!(!client.is_connected());

    // A later attempt can succeed
    client.accept_topic(DISCOVERY_TOPIC);
    assert!(bridge.start_with_client(client.clone()).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_quiet_broker_settles_after_initial_quiet() {
    let host = RecordingHost::new();
    let client = Arc::new(MemoryClient::new());
    let bridge = Bridge::new(config(), host.handles(), None);

    let started = tokio::time::Instant::now();
    let outcome = bridge.start_with_client(client.clone()).await.unwrap();

    assert_eq!(outcome, StartOutcome::Ready(SettleReason::Quiet));
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(bridge.health().settled);
}

#[tokio::test(start_paused = true)]
async fn test_retained_burst_is_absorbed_before_ready() {
    let host = RecordingHost::new();
    let client = Arc::new(MemoryClient::new());
    let bridge = Bridge::new(config(), host.handles(), None);

    let replay = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            eventually(|| client.subscribe_count(DISCOVERY_TOPIC) == 1).await;
            for i in 0..5 {
                let (topic, payload) = light(&format!("bulb{i}"), &format!("hw{i}"), &format!("zigbee2mqtt/bulb{i}"));
                client.inject(&topic, payload).await;
                tokio::time::sleep(Duration::from_millis(40)).await;
            }
        })
    };

    let outcome = bridge.start_with_client(client.clone()).await.unwrap();
    replay.await.unwrap();

    assert_eq!(outcome, StartOutcome::Ready(SettleReason::Quiet));
    assert_eq!(bridge.store().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_endless_burst_hits_ceiling() {
    let host = RecordingHost::new();
    let client = Arc::new(MemoryClient::new());
    let bridge = Bridge::new(config(), host.handles(), None);

    let replay = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            eventually(|| client.subscribe_count(DISCOVERY_TOPIC) == 1).await;
            let (topic, payload) = light("bulb", "hw", "zigbee2mqtt/bulb");
            loop {
                if client.inject(&topic, payload.clone()).await == 0 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
    };

    let started = tokio::time::Instant::now();
    let outcome = bridge.start_with_client(client.clone()).await.unwrap();

    assert_eq!(outcome, StartOutcome::Ready(SettleReason::Ceiling));
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(started.elapsed() < Duration::from_secs(6));

    bridge.shutdown().await;
    replay.await.unwrap();
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let host = RecordingHost::new();
    let (client, bridge) = started_bridge(&host).await;

    let result = bridge.start_with_client(client).await;
    assert!(matches!(result, Err(BridgeError::AlreadyStarted)));
}

#[tokio::test]
async fn test_restored_entities_are_rewired_on_start() {
    let host = RecordingHost::new();
    let (client, bridge) = started_bridge(&host).await;
    let (topic, payload) = light("lamp", "hw", "zigbee2mqtt/lamp");
    bridge.handle_discovery(&topic, payload.as_bytes()).unwrap();
    let blob = bridge.storage_blob().unwrap();
    bridge.shutdown().await;
    drop(client);

    let host = RecordingHost::new();
    let (client, bridge) = started_bridge_with(&host, config(), Some(&blob)).await;

    assert_eq!(bridge.store().len(), 1);
    eventually(|| client.subscribe_count("zigbee2mqtt/lamp") == 1).await;
    assert_eq!(
        host.command_subscriptions(),
        vec![("device-hw".to_string(), "entity-lamp".to_string())]
    );
}

#[tokio::test]
async fn test_malformed_blob_starts_empty() {
    for blob in [&b"null"[..], &b"{broken"[..], &b""[..]] {
        let bridge = Bridge::new(config(), HostHandles::new(), Some(blob));
        assert!(bridge.store().is_empty());
    }
}

#[tokio::test]
async fn test_shutdown_drains_background_work() {
    let host = RecordingHost::new();
    let (client, bridge) = started_bridge(&host).await;

    for i in 0..3 {
        let (topic, payload) = light(&format!("bulb{i}"), "hw", &format!("zigbee2mqtt/bulb{i}"));
        bridge.handle_discovery(&topic, payload.as_bytes()).unwrap();
    }
    // discovery, bridge state and three state topics
    eventually(|| client.subscriptions().len() == 5).await;
    eventually(|| bridge.health().live_topics == 4).await;

    tokio::time::timeout(Duration::from_secs(2), bridge.shutdown())
        .await
        .expect("shutdown should drain once the broker disconnects");

    let health = bridge.health();
    assert!(!health.connected);
    assert_eq!(health.live_topics, 0);
    assert_eq!(health.discovered_entities, 3);
    assert_eq!(client.inject("zigbee2mqtt/bulb0", "ON").await, 0);

    // Shutting down twice is harmless
    bridge.shutdown().await;
}

#[tokio::test]
async fn test_connect_failure_is_disabled_by_start_or_disable() {
    let config = BridgeConfig {
        mqtt_url: Some("tcp://127.0.0.1:1".to_string()),
        ..config()
    };
    let bridge = Bridge::new(config, HostHandles::new(), None);

    let outcome = tokio::time::timeout(Duration::from_secs(15), bridge.start_or_disable())
        .await
        .expect("connect should fail well within the connect timeout");
    assert_eq!(outcome, StartOutcome::Disabled);
    assert!(!bridge.health().connected);
}

#[tokio::test]
async fn test_tracks_zigbee2mqtt_availability() {
    let host = RecordingHost::new();
    let (client, bridge) = started_bridge(&host).await;
    assert_eq!(bridge.health().zigbee2mqtt_online, None);

    eventually(|| client.subscribe_count("zigbee2mqtt/bridge/state") == 1).await;
    client.inject("zigbee2mqtt/bridge/state", r#"{"state":"online"}"#).await;
    eventually(|| bridge.health().zigbee2mqtt_online == Some(true)).await;

    client.inject("zigbee2mqtt/bridge/state", "offline").await;
    eventually(|| bridge.health().zigbee2mqtt_online == Some(false)).await;
    assert!(host.events().is_empty());

    bridge.shutdown().await;
    assert_eq!(bridge.health().zigbee2mqtt_online, None);
}

#[tokio::test]
async fn test_manifest() {
    let bridge = Bridge::new(config(), HostHandles::new(), None);
    let manifest = bridge.manifest();
    assert_eq!(manifest.id, "plugin-zigbee2mqtt");
    assert_eq!(manifest.name, "Plugin Zigbee2mqtt");
    assert_eq!(manifest.version, env!("CARGO_PKG_VERSION"));
}
