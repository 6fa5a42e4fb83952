//! `rumqttc`-backed [`MqttClient`]
//!
//! `rumqttc` hands out a request handle ([`AsyncClient`]) and an [`EventLoop`]
//! that must be polled for anything to happen. After the CONNACK arrives the
//! event loop moves into a pump task that routes incoming publishes to every
//! subscription whose filter matches, and re-issues subscriptions when the
//! broker comes back without a session.
//!
//! `subscribe` returns once the broker's SUBACK arrives. The pump pairs each
//! outgoing SUBSCRIBE with the caller that queued it (requests leave the
//! request channel in order) and resolves the caller when the matching
//! SUBACK comes back.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, SubAck, SubscribeReasonCode,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::client::{topic_matches, Message, MessageStream, MqttClient};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

struct Route {
    filter: String,
    sender: mpsc::Sender<Message>,
}

type Routes = Arc<Mutex<Vec<Route>>>;

type AckResult = std::result::Result<(), String>;
type AckWaiter = Option<oneshot::Sender<AckResult>>;

/// Pairs SUBSCRIBE requests with their SUBACKs
///
/// Waiters are queued in request order and bound to a packet id when the
/// pump sees the SUBSCRIBE go out. Re-issued subscriptions queue `None`.
#[derive(Default)]
struct SubAckTracker {
    queued: VecDeque<AckWaiter>,
    inflight: HashMap<u16, AckWaiter>,
}

impl SubAckTracker {
    fn track(&mut self) -> oneshot::Receiver<AckResult> {
        let (tx, rx) = oneshot::channel();
        self.queued.push_back(Some(tx));
        rx
    }

    fn untracked(&mut self) {
        self.queued.push_back(None);
    }

    fn on_outgoing(&mut self, pkid: u16) {
        // Replayed after a reconnect; already bound
        if self.inflight.contains_key(&pkid) {
            return;
        }
        if let Some(waiter) = self.queued.pop_front() {
            self.inflight.insert(pkid, waiter);
        }
    }

    fn on_suback(&mut self, ack: &SubAck) {
        let Some(waiter) = self.inflight.remove(&ack.pkid) else {
            return;
        };

        let refused = ack
            .return_codes
            .iter()
            .any(|code| matches!(code, SubscribeReasonCode::Failure));
        let result = if refused {
            Err("broker refused the subscription".to_string())
        } else {
            Ok(())
        };

        if let Some(waiter) = waiter {
            let _ = waiter.send(result);
        }
    }

    /// Drop every waiter, failing callers still waiting
    fn clear(&mut self) {
        self.queued.clear();
        self.inflight.clear();
    }
}

type Acks = Arc<Mutex<SubAckTracker>>;

/// Broker connection over `rumqttc`
pub struct RumqttClient {
    config: ClientConfig,
    client: AsyncClient,
    /// Present until `connect` hands it to the pump task
    event_loop: tokio::sync::Mutex<Option<EventLoop>>,
    routes: Routes,
    acks: Acks,
    connected: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl RumqttClient {
    pub fn new(config: ClientConfig) -> Self {
        let mut options = MqttOptions::new(config.client_id(), config.host.clone(), config.port);
        options.set_keep_alive(config.keep_alive.max(Duration::from_secs(1)));
        options.set_clean_session(true);
        if let Some(username) = &config.username {
            options.set_credentials(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            );
        }

        let (client, event_loop) = AsyncClient::new(options, config.request_capacity.max(1));
        let (shutdown, _) = watch::channel(false);

        Self {
            config,
            client,
            event_loop: tokio::sync::Mutex::new(Some(event_loop)),
            routes: Arc::new(Mutex::new(Vec::new())),
            acks: Arc::new(Mutex::new(SubAckTracker::default())),
            connected: Arc::new(AtomicBool::new(false)),
            shutdown,
            pump: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn remove_route(&self, sender: &mpsc::Sender<Message>) {
        self.routes
            .lock()
            .retain(|route| !route.sender.same_channel(sender));
    }
}

#[async_trait]
impl MqttClient for RumqttClient {
    async fn connect(&self) -> Result<()> {
        let mut slot = self.event_loop.lock().await;
        let Some(mut event_loop) = slot.take() else {
            return if self.is_connected() {
                Ok(())
            } else {
                Err(ClientError::ConnectFailed(
                    "client was disconnected and cannot be reused".to_string(),
                ))
            };
        };

        tracing::debug!(
            "Connecting to MQTT broker at {}:{}",
            self.config.host,
            self.config.port
        );

        let handshake = async {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(_) => continue,
                    Err(e) => return Err(e.to_string()),
                }
            }
        };

        let outcome = tokio::time::timeout(self.config.connect_timeout, handshake).await;
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(reason)) => Some(reason),
            Err(_) => Some(format!(
                "no CONNACK within {:?}",
                self.config.connect_timeout
            )),
        };

        if let Some(reason) = failure {
            // Keep the event loop so connect can be retried
            *slot = Some(event_loop);
            return Err(ClientError::ConnectFailed(reason));
        }

        self.connected.store(true, Ordering::SeqCst);
        tracing::info!(
            "Connected to MQTT broker at {}:{}",
            self.config.host,
            self.config.port
        );

        let handle = tokio::spawn(pump(
            event_loop,
            self.client.clone(),
            Arc::clone(&self.routes),
            Arc::clone(&self.acks),
            Arc::clone(&self.connected),
            self.shutdown.subscribe(),
        ));
        *self.pump.lock() = Some(handle);

        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<MessageStream> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        let (sender, receiver) = mpsc::channel(self.config.channel_capacity.max(1));

        // Route before subscribing so retained messages are not missed
        self.routes.lock().push(Route {
            filter: topic.to_string(),
            sender: sender.clone(),
        });

        // Queue under the tracker lock so the pump sees requests in order
        let ack = {
            let mut acks = self.acks.lock();
            match self.client.try_subscribe(topic, QoS::AtLeastOnce) {
                Ok(()) => Ok(acks.track()),
                Err(e) => Err(e.to_string()),
            }
        };

        let failure = match ack {
            Err(reason) => Some(reason),
            Ok(ack) => match tokio::time::timeout(self.config.connect_timeout, ack).await {
                Ok(Ok(Ok(()))) => None,
                Ok(Ok(Err(reason))) => Some(reason),
                Ok(Err(_)) => Some("connection closed before SUBACK".to_string()),
                Err(_) => Some(format!(
                    "no SUBACK within {:?}",
                    self.config.connect_timeout
                )),
            },
        };

        if let Some(reason) = failure {
            self.remove_route(&sender);
            return Err(ClientError::SubscribeFailed {
                topic: topic.to_string(),
                reason,
            });
        }

        tracing::debug!("Subscribed to {}", topic);
        Ok(receiver)
    }

    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }

        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload.to_vec())
            .await
            .map_err(|e| ClientError::PublishFailed {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;

        tracing::trace!("Published {} bytes to {}", payload.len(), topic);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);

        // Dropping the senders ends every open stream
        self.routes.lock().clear();
        self.acks.lock().clear();

        let handle = self.pump.lock().take();
        let Some(mut handle) = handle else {
            return;
        };

        if let Err(e) = self.client.try_disconnect() {
            tracing::debug!("Failed to queue MQTT disconnect: {}", e);
        }

        if tokio::time::timeout(DISCONNECT_GRACE, &mut handle)
            .await
            .is_err()
        {
            let _ = self.shutdown.send(true);
            let _ = handle.await;
        }

        tracing::info!("Disconnected from MQTT broker");
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

async fn pump(
    mut event_loop: EventLoop,
    client: AsyncClient,
    routes: Routes,
    acks: Acks,
    connected: Arc<AtomicBool>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            event = event_loop.poll() => match event {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    deliver(&routes, Message::new(publish.topic, publish.payload));
                }
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    let was_connected = connected.swap(true, Ordering::SeqCst);
                    if !was_connected {
                        tracing::info!("Reconnected to MQTT broker");
                    }
                    if !ack.session_present {
                        resubscribe(&client, &routes, &acks);
                    }
                }
                Ok(Event::Outgoing(Outgoing::Subscribe(pkid))) => acks.lock().on_outgoing(pkid),
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    if ack.return_codes.iter().any(|c| matches!(c, SubscribeReasonCode::Failure)) {
                        tracing::warn!("Broker refused subscription (packet {})", ack.pkid);
                    }
                    acks.lock().on_suback(&ack);
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(_) => {}
                Err(e) => {
                    if *shutdown.borrow() {
                        break;
                    }
                    if connected.swap(false, Ordering::SeqCst) {
                        tracing::warn!("MQTT connection lost: {}", e);
                    } else {
                        tracing::debug!("MQTT reconnect failed: {}", e);
                    }
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
    acks.lock().clear();
    tracing::debug!("MQTT event loop stopped");
}

/// Hand a message to every matching route without blocking the event loop
fn deliver(routes: &Routes, message: Message) {
    let mut routes = routes.lock();
    routes.retain(|route| !route.sender.is_closed());

    for route in routes.iter() {
        if !topic_matches(&route.filter, &message.topic) {
            continue;
        }
        if let Err(mpsc::error::TrySendError::Full(_)) = route.sender.try_send(message.clone()) {
            tracing::warn!(
                "Subscription buffer for {} is full, dropping message on {}",
                route.filter,
                message.topic
            );
        }
    }
}

fn resubscribe(client: &AsyncClient, routes: &Routes, acks: &Acks) {
    let mut filters: Vec<String> = routes.lock().iter().map(|r| r.filter.clone()).collect();
    filters.sort();
    filters.dedup();

    let mut acks = acks.lock();
    for filter in filters {
        match client.try_subscribe(filter.as_str(), QoS::AtLeastOnce) {
            Ok(()) => acks.untracked(),
            Err(e) => tracing::warn!("Failed to restore subscription to {}: {}", filter, e),
        }
    }
}
