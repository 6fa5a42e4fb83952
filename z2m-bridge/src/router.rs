//! Host command routing
//!
//! A command resolves to the entity's command topic through the store, is
//! encoded for the wire and published. On success the entity is marked
//! pending and the expected state is echoed to the host ahead of the
//! hardware's own report.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinSet;
use z2m_codec::{encode, CommandKind};
use z2m_event_manager::MqttClient;
use z2m_state::{Entity, ReconciliationStore, SyncStatus};

use crate::error::{BridgeError, Result};
use crate::host::{HostCommand, HostHandles, InboundEvent};

pub struct CommandRouter {
    client: Arc<dyn MqttClient>,
    store: Arc<ReconciliationStore>,
    host: HostHandles,
    echo_delay: Duration,
    echoes: Mutex<JoinSet<()>>,
}

impl CommandRouter {
    pub fn new(
        client: Arc<dyn MqttClient>,
        store: Arc<ReconciliationStore>,
        host: HostHandles,
        echo_delay: Duration,
    ) -> Self {
        Self {
            client,
            store,
            host,
            echo_delay,
            echoes: Mutex::new(JoinSet::new()),
        }
    }

    /// Publish `command` for `entity` and return the entity as the host
    /// should now see it
    ///
    /// Commands that encode to nothing (e.g. `SetTemperature` without a
    /// usable `kelvin`) return the entity unchanged without publishing.
    pub async fn handle(&self, command: &HostCommand, entity: Entity) -> Result<Entity> {
        let target = self
            .store
            .find_by_entity_id(&entity.id)
            .filter(|found| !found.command_topic.is_empty())
            .ok_or_else(|| BridgeError::NoCommandTopic(entity.id.clone()))?;

        let kind = CommandKind::from_name(&command.name)
            .ok_or_else(|| BridgeError::UnsupportedCommand(command.name.clone()))?;

        let encoded = encode(kind, &command.params, &target.payload_on, &target.payload_off);
        let Some(payload) = encoded.payload else {
            tracing::debug!("{} for {} encodes to nothing, skipping", kind, entity.id);
            return Ok(entity);
        };

        self.client
            .publish(&target.command_topic, Bytes::from(payload))
            .await
            .map_err(BridgeError::BrokerPublishFailed)?;

        tracing::debug!("Published {} to {}", kind, target.command_topic);

        let mut entity = entity;
        entity.data.sync_status = SyncStatus::Pending;

        self.echo(InboundEvent {
            device_id: entity.device_id.clone(),
            entity_id: entity.id.clone(),
            correlation_id: command.id.clone(),
            payload: Value::Object(encoded.delta),
        });

        Ok(entity)
    }

    fn echo(&self, event: InboundEvent) {
        if self.host.events.is_none() {
            return;
        }
        if self.echo_delay.is_zero() {
            self.host.emit(event);
            return;
        }

        let host = self.host.clone();
        let delay = self.echo_delay;
        let mut echoes = self.echoes.lock();
        while echoes.try_join_next().is_some() {}
        echoes.spawn(async move {
            tokio::time::sleep(delay).await;
            host.emit(event);
        });
    }

    /// Echoes spawned and not yet reaped
    pub fn pending_echoes(&self) -> usize {
        self.echoes.lock().len()
    }

    /// Wait for pending optimistic echoes
    pub async fn drain(&self) {
        let mut echoes = std::mem::take(&mut *self.echoes.lock());
        while echoes.join_next().await.is_some() {}
    }
}
