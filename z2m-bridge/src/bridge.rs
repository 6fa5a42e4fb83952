//! Bridge lifecycle
//!
//! One [`Bridge`] owns the discovered-entity store, the settle tracker and,
//! once started, a broker session (client, topic fan-out, command router).
//! The host drives it through the `on_*` callbacks and `handle_command`.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashSet;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use z2m_codec::decode_payload;
use z2m_discovery::DiscoveryError;
use z2m_event_manager::{Message, MessageStream, MqttClient, RumqttClient, TopicFanout};
use z2m_state::{
    device_raw_config, entity_raw_config, reconcile_devices, reconcile_entities, Device,
    DiscoveredEntity, Entity, ReconciliationStore, SyncStatus, UpsertOutcome,
};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::host::{HostCommand, HostHandles, InboundEvent, Manifest};
use crate::router::CommandRouter;
use crate::settle::{DiscoverySettle, SettleReason};

pub const PLUGIN_ID: &str = "plugin-zigbee2mqtt";
pub const PLUGIN_NAME: &str = "Plugin Zigbee2mqtt";

/// Result of [`Bridge::start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// No usable broker URL; the bridge only serves stored state
    Disabled,
    /// Connected and the initial discovery burst has settled
    Ready(SettleReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub connected: bool,
    pub settled: bool,
    pub discovered_entities: usize,
    pub live_topics: usize,
    /// Last availability zigbee2mqtt reported on its bridge state topic
    pub zigbee2mqtt_online: Option<bool>,
}

struct Session {
    client: Arc<dyn MqttClient>,
    fanout: TopicFanout,
    router: CommandRouter,
}

struct Shared {
    config: BridgeConfig,
    host: HostHandles,
    store: Arc<ReconciliationStore>,
    settle: DiscoverySettle,
    wired: DashSet<String>,
    session: RwLock<Option<Arc<Session>>>,
    online: Arc<RwLock<Option<bool>>>,
}

pub struct Bridge {
    shared: Arc<Shared>,
    discovery_task: Mutex<Option<JoinHandle<()>>>,
}

impl Bridge {
    /// Create a bridge, restoring discovered entities from `stored`
    pub fn new(config: BridgeConfig, host: HostHandles, stored: Option<&[u8]>) -> Self {
        let store = Arc::new(ReconciliationStore::restore(stored));
        let settle = DiscoverySettle::new(config.settle.clone());

        Self {
            shared: Arc::new(Shared {
                config,
                host,
                store,
                settle,
                wired: DashSet::new(),
                session: RwLock::new(None),
                online: Arc::new(RwLock::new(None)),
            }),
            discovery_task: Mutex::new(None),
        }
    }

    pub fn manifest(&self) -> Manifest {
        Manifest {
            id: PLUGIN_ID.to_string(),
            name: PLUGIN_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.shared.config
    }

    pub fn store(&self) -> &ReconciliationStore {
        &self.shared.store
    }

    /// Connect to the configured broker and wait for discovery to settle
    ///
    /// A missing or unusable broker URL disables the bridge instead of
    /// failing.
    pub async fn start(&self) -> Result<StartOutcome> {
        let url = self
            .shared
            .config
            .mqtt_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty());

        let Some(url) = url else {
            tracing::info!("No MQTT URL configured; discovery disabled");
            return Ok(StartOutcome::Disabled);
        };

        let client_config = match self.shared.config.client_config(url) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("{}; discovery disabled", e);
                return Ok(StartOutcome::Disabled);
            }
        };

        self.start_with_client(Arc::new(RumqttClient::new(client_config)))
            .await
    }

    /// [`start`](Self::start), treating startup failures as disabled
    ///
    /// The failure is logged; stored state stays available to the host.
    pub async fn start_or_disable(&self) -> StartOutcome {
        match self.start().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("{}; discovery disabled", e);
                StartOutcome::Disabled
            }
        }
    }

    /// Start against an already constructed broker client
    pub async fn start_with_client(&self, client: Arc<dyn MqttClient>) -> Result<StartOutcome> {
        if self.shared.session().is_some() {
            return Err(BridgeError::AlreadyStarted);
        }

        client.connect().await.map_err(|e| {
            tracing::error!("MQTT connect failed: {}", e);
            BridgeError::BrokerConnectFailed(e)
        })?;

        let session = Arc::new(Session {
            client: Arc::clone(&client),
            fanout: TopicFanout::new(Arc::clone(&client)),
            router: CommandRouter::new(
                Arc::clone(&client),
                Arc::clone(&self.shared.store),
                self.shared.host.clone(),
                self.shared.config.optimistic_echo_delay,
            ),
        });
        *self.shared.session.write() = Some(Arc::clone(&session));

        let restored = self.shared.store.snapshot();
        if !restored.is_empty() {
            tracing::info!("Re-wiring {} stored entities", restored.len());
        }
        for entity in &restored {
            self.shared.wire(entity);
        }

        let topic = self.shared.config.discovery_topic.clone();
        let stream = match client.subscribe(&topic).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("Discovery subscribe failed: {}", e);
                self.shared.session.write().take();
                client.disconnect().await;
                session.fanout.wait().await;
                self.shared.wired.clear();
                return Err(BridgeError::BrokerSubscribeFailed(e));
            }
        };

        let availability = self.shared.config.bridge_state_topic();
        session
            .fanout
            .subscribe(&availability, availability_handler(Arc::clone(&self.shared.online)));

        self.shared.settle.start();
        let shared = Arc::clone(&self.shared);
        *self.discovery_task.lock() = Some(tokio::spawn(consume_discovery(shared, stream)));

        tracing::info!(
            "Subscribed to {}, waiting for discovery burst to settle",
            topic
        );

        let reason = self.shared.settle.wait_settled().await;
        match reason {
            SettleReason::Quiet => tracing::info!(
                "Initial discovery burst complete ({} entities)",
                self.shared.store.len()
            ),
            SettleReason::Ceiling => tracing::info!(
                "Discovery burst still running at the {:?} ceiling, proceeding",
                self.shared.config.settle.ceiling
            ),
        }

        Ok(StartOutcome::Ready(reason))
    }

    /// Apply one discovery message
    pub fn handle_discovery(
        &self,
        topic: &str,
        payload: &[u8],
    ) -> std::result::Result<UpsertOutcome, DiscoveryError> {
        self.shared.handle_discovery(topic, payload)
    }

    /// Serialized discovered entities for the host to persist
    pub fn storage_blob(&self) -> Result<Vec<u8>> {
        Ok(self.shared.store.serialize()?)
    }

    /// Forget every entity of a deleted device; returns how many were removed
    pub fn on_device_delete(&self, device_id: &str) -> usize {
        let removed = self.shared.store.delete_device(device_id);
        tracing::debug!("Deleted device {} ({} entities)", device_id, removed.len());
        removed.len()
    }

    /// Forget one deleted entity; returns whether it was known
    pub fn on_entity_delete(&self, device_id: &str, entity_id: &str) -> bool {
        let removed = self.shared.store.delete_entity(device_id, entity_id).is_some();
        tracing::debug!("Deleted entity {} (known: {})", entity_id, removed);
        removed
    }

    /// Reconcile the host's device list and refresh device raw configs
    pub fn on_devices_list(&self, current: Vec<Device>) -> Vec<Device> {
        let discovered = self.shared.store.snapshot();

        let mut raw_configs: BTreeMap<String, Value> = BTreeMap::new();
        for entity in discovered.iter().filter(|e| e.is_device_groupable()) {
            raw_configs.insert(entity.device_id(), device_raw_config(entity));
        }
        for (device_id, config) in &raw_configs {
            self.shared.host.write_raw_device(device_id, config);
        }

        reconcile_devices(&discovered, current)
    }

    /// Reconcile one device's entity list and refresh entity raw configs
    pub fn on_entities_list(&self, device_id: &str, current: Vec<Entity>) -> Vec<Entity> {
        let discovered = self.shared.store.snapshot();

        for entity in discovered
            .iter()
            .filter(|e| e.is_device_groupable() && e.device_id() == device_id)
        {
            self.shared.host.write_raw_entity(
                device_id,
                &entity.entity_id(),
                &entity_raw_config(entity),
            );
        }

        tracing::debug!(
            "Listing entities for {} ({} known to host)",
            device_id,
            current.len()
        );
        reconcile_entities(device_id, &discovered, current)
    }

    pub async fn handle_command(&self, command: &HostCommand, entity: Entity) -> Result<Entity> {
        let session = self.shared.session().ok_or(BridgeError::NotConnected)?;
        session.router.handle(command, entity).await
    }

    /// Record a state report for `entity`
    pub fn on_event(&self, payload: Value, mut entity: Entity) -> Entity {
        entity.data.reported = Some(payload);
        entity.data.sync_status = SyncStatus::InSync;
        entity
    }

    pub fn health(&self) -> Health {
        let session = self.shared.session();
        Health {
            connected: session
                .as_ref()
                .map(|s| s.client.is_connected())
                .unwrap_or(false),
            settled: self.shared.settle.is_settled(),
            discovered_entities: self.shared.store.len(),
            live_topics: session
                .as_ref()
                .map(|s| s.fanout.live_topics().len())
                .unwrap_or(0),
            zigbee2mqtt_online: *self.shared.online.read(),
        }
    }

    /// Disconnect and wait for all background work to finish
    pub async fn shutdown(&self) {
        let Some(session) = self.shared.session.write().take() else {
            return;
        };

        tracing::info!("Shutting down bridge");
        session.client.disconnect().await;

        let discovery_task = self.discovery_task.lock().take();
        if let Some(task) = discovery_task {
            if let Err(e) = task.await {
                tracing::error!("Discovery task failed: {}", e);
            }
        }

        session.fanout.wait().await;
        session.router.drain().await;
        self.shared.wired.clear();
        self.shared.online.write().take();

        tracing::info!("Bridge shut down");
    }
}

impl Shared {
    fn session(&self) -> Option<Arc<Session>> {
        self.session.read().clone()
    }

    fn handle_discovery(
        &self,
        topic: &str,
        payload: &[u8],
    ) -> std::result::Result<UpsertOutcome, DiscoveryError> {
        let record = z2m_discovery::parse(topic, payload)?;
        let entity = DiscoveredEntity::from(&record);

        tracing::debug!(
            "Discovered {} (type={}, device={:?})",
            entity.unique_id,
            entity.entity_type,
            entity.device_key
        );

        let outcome = self.store.upsert(entity.clone());
        self.settle.record_message();
        self.wire(&entity);
        Ok(outcome)
    }

    /// Give an entity its state subscription and command registration, once
    fn wire(&self, entity: &DiscoveredEntity) {
        let Some(session) = self.session() else {
            return;
        };
        if !self.wired.insert(entity.unique_id.clone()) {
            return;
        }

        if !entity.state_topic.is_empty() {
            let handler = state_handler(
                Arc::clone(&self.store),
                self.host.clone(),
                entity.unique_id.clone(),
            );
            session.fanout.subscribe(&entity.state_topic, handler);
        }

        if entity.is_device_groupable() {
            self.host
                .subscribe_commands(&entity.device_id(), &entity.entity_id());
        }

        tracing::debug!("Wired {}", entity.unique_id);
    }
}

/// Decode state messages for one entity, reading its current record at
/// delivery time
fn state_handler(
    store: Arc<ReconciliationStore>,
    host: HostHandles,
    unique_id: String,
) -> z2m_event_manager::StateHandler {
    Arc::new(move |message: &Message| {
        let Some(entity) = store.get(&unique_id) else {
            return;
        };

        let decoded = decode_payload(&message.payload, &entity.payload_on, &entity.value_key);
        host.emit(InboundEvent {
            device_id: entity.device_id(),
            entity_id: entity.entity_id(),
            correlation_id: String::new(),
            payload: Value::Object(decoded.properties),
        });
    })
}

/// Track zigbee2mqtt's `online`/`offline` reports
///
/// Accepts the JSON form (`{"state":"online"}`) and the legacy bare string.
fn availability_handler(online: Arc<RwLock<Option<bool>>>) -> z2m_event_manager::StateHandler {
    Arc::new(move |message: &Message| {
        let Some(now) = parse_availability(&message.payload) else {
            tracing::debug!("Unrecognized bridge state on {}", message.topic);
            return;
        };

        let before = online.write().replace(now);
        if before != Some(now) {
            tracing::info!(
                "zigbee2mqtt is {}",
                if now { "online" } else { "offline" }
            );
        }
    })
}

fn parse_availability(raw: &[u8]) -> Option<bool> {
    let state = match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(map)) => map.get("state")?.as_str()?.to_string(),
        Ok(Value::String(text)) => text,
        _ => String::from_utf8_lossy(raw).trim().to_string(),
    };

    match state.to_ascii_lowercase().as_str() {
        "online" => Some(true),
        "offline" => Some(false),
        _ => None,
    }
}

async fn consume_discovery(shared: Arc<Shared>, mut stream: MessageStream) {
    while let Some(message) = stream.recv().await {
        if let Err(e) = shared.handle_discovery(&message.topic, &message.payload) {
            tracing::debug!("Ignoring discovery message on {}: {}", message.topic, e);
        }
    }
    tracing::debug!("Discovery stream closed");
}
