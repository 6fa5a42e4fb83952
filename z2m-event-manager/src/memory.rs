//! In-process broker double
//!
//! [`MemoryClient`] implements [`MqttClient`] without a network: publishes are
//! recorded, messages are injected by the caller, and individual operations
//! can be made to fail. The bridge's integration tests run against it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::client::{topic_matches, Message, MessageStream, MqttClient};
use crate::error::{ClientError, Result};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
pub struct MemoryClient {
    connected: AtomicBool,
    routes: Mutex<Vec<(String, mpsc::Sender<Message>)>>,
    subscriptions: Mutex<Vec<String>>,
    published: Mutex<Vec<Message>>,
    refuse_connect: AtomicBool,
    refuse_publish: AtomicBool,
    refused_topics: Mutex<HashSet<String>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `connect` fail until reset
    pub fn refuse_connect(&self, refuse: bool) {
        self.refuse_connect.store(refuse, Ordering::SeqCst);
    }

    /// Make `publish` fail until reset
    pub fn refuse_publish(&self, refuse: bool) {
        self.refuse_publish.store(refuse, Ordering::SeqCst);
    }

    /// Make subscriptions to `topic` fail until [`accept_topic`](Self::accept_topic)
    pub fn refuse_topic(&self, topic: &str) {
        self.refused_topics.lock().insert(topic.to_string());
    }

    pub fn accept_topic(&self, topic: &str) {
        self.refused_topics.lock().remove(topic);
    }

    /// Deliver a message to every matching subscription
    ///
    /// Returns how many subscriptions received it.
    pub async fn inject(&self, topic: &str, payload: impl Into<Bytes>) -> usize {
        let message = Message::new(topic, payload);
        let senders: Vec<mpsc::Sender<Message>> = self
            .routes
            .lock()
            .iter()
            .filter(|(filter, _)| topic_matches(filter, topic))
            .map(|(_, sender)| sender.clone())
            .collect();

        let mut delivered = 0;
        for sender in senders {
            if sender.send(message.clone()).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Every successful subscribe call, in order
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().clone()
    }

    pub fn subscribe_count(&self, topic: &str) -> usize {
        self.subscriptions
            .lock()
            .iter()
            .filter(|t| t.as_str() == topic)
            .count()
    }

    /// Every successful publish, in order
    pub fn published(&self) -> Vec<Message> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl MqttClient for MemoryClient {
    async fn connect(&self) -> Result<()> {
        if self.refuse_connect.load(Ordering::SeqCst) {
            return Err(ClientError::ConnectFailed("connection refused".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<MessageStream> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        if self.refused_topics.lock().contains(topic) {
            return Err(ClientError::SubscribeFailed {
                topic: topic.to_string(),
                reason: "not authorized".to_string(),
            });
        }

        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        self.routes.lock().push((topic.to_string(), sender));
        self.subscriptions.lock().push(topic.to_string());
        Ok(receiver)
    }

    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        if self.refuse_publish.load(Ordering::SeqCst) {
            return Err(ClientError::PublishFailed {
                topic: topic.to_string(),
                reason: "broker rejected publish".to_string(),
            });
        }
        self.published.lock().push(Message::new(topic, payload));
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.routes.lock().clear();
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inject_reaches_matching_subscriptions() {
        let client = MemoryClient::new();
        client.connect().await.unwrap();

        let mut lamp = client.subscribe("zigbee2mqtt/lamp").await.unwrap();
        let mut all = client.subscribe("zigbee2mqtt/#").await.unwrap();

        assert_eq!(client.inject("zigbee2mqtt/lamp", "ON").await, 2);
        assert_eq!(client.inject("zigbee2mqtt/plug", "OFF").await, 1);

        assert_eq!(lamp.recv().await.unwrap().payload, Bytes::from_static(b"ON"));
        assert_eq!(all.recv().await.unwrap().topic, "zigbee2mqtt/lamp");
        assert_eq!(all.recv().await.unwrap().topic, "zigbee2mqtt/plug");
    }

    #[tokio::test]
    async fn test_disconnect_closes_streams() {
        let client = MemoryClient::new();
        client.connect().await.unwrap();
        let mut stream = client.subscribe("a/b").await.unwrap();

        client.disconnect().await;
        assert!(stream.recv().await.is_none());
        assert!(matches!(
            client.publish("a/b", Bytes::new()).await,
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_refusals() {
        let client = MemoryClient::new();
        client.refuse_connect(true);
        assert!(client.connect().await.is_err());
        client.refuse_connect(false);
        client.connect().await.unwrap();

        client.refuse_topic("a/b");
        assert!(client.subscribe("a/b").await.is_err());
        client.accept_topic("a/b");
        assert!(client.subscribe("a/b").await.is_ok());
        assert_eq!(client.subscribe_count("a/b"), 1);

        client.refuse_publish(true);
        assert!(client.publish("a/b/set", Bytes::new()).await.is_err());
        assert!(client.published().is_empty());
    }

    #[test]
    fn test_publish_records_messages() {
        let client = MemoryClient::new();
        tokio_test::block_on(async {
            client.connect().await.unwrap();
            client
                .publish("zigbee2mqtt/lamp/set", Bytes::from_static(b"ON"))
                .await
                .unwrap();
        });

        let published = client.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "zigbee2mqtt/lamp/set");
        assert_eq!(published[0].payload, Bytes::from_static(b"ON"));
    }
}
