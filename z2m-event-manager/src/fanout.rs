//! Per-topic subscription fan-out
//!
//! Several entities can share one state topic (zigbee2mqtt publishes a whole
//! device on `zigbee2mqtt/<friendly name>`). The broker is subscribed to once
//! per topic and each message is handed to every handler registered for it.
//!
//! ## Lifecycle
//!
//! 1. The first `subscribe` for a topic records the handler and spawns a
//!    receive task for that topic
//! 2. Later calls only append their handler; the running task picks it up on
//!    the next message
//! 3. If the broker subscription fails, or the stream ends, the topic is
//!    marked idle and the next `subscribe` call spawns a fresh task
//! 4. [`TopicFanout::wait`] drains every receive task after the client has
//!    been disconnected

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinSet;

use crate::client::{Message, MqttClient};

/// Callback invoked for every message on a topic
pub type StateHandler = Arc<dyn Fn(&Message) + Send + Sync>;

/// What a [`TopicFanout::subscribe`] call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// A receive task was spawned for the topic
    Spawned,
    /// The handler joined an existing receive task
    Joined,
}

#[derive(Default)]
struct TopicEntry {
    handlers: Vec<StateHandler>,
    live: bool,
}

type Topics = Arc<Mutex<HashMap<String, TopicEntry>>>;

/// Deduplicating topic subscriber
pub struct TopicFanout {
    client: Arc<dyn MqttClient>,
    topics: Topics,
    tasks: Mutex<JoinSet<()>>,
    runtime: Handle,
}

impl TopicFanout {
    /// Create a fan-out on the current tokio runtime
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(client: Arc<dyn MqttClient>) -> Self {
        Self::with_runtime(client, Handle::current())
    }

    pub fn with_runtime(client: Arc<dyn MqttClient>, runtime: Handle) -> Self {
        Self {
            client,
            topics: Arc::new(Mutex::new(HashMap::new())),
            tasks: Mutex::new(JoinSet::new()),
            runtime,
        }
    }

    /// Register `handler` for `topic`, subscribing on the broker if needed
    ///
    /// Returns immediately; the broker subscription happens in the spawned
    /// task and failures are logged there.
    pub fn subscribe(&self, topic: &str, handler: StateHandler) -> SubscribeOutcome {
        let needs_task = {
            let mut topics = self.topics.lock();
            let entry = topics.entry(topic.to_string()).or_default();
            entry.handlers.push(handler);

            tracing::debug!(
                "Handler registered for {} ({} total)",
                topic,
                entry.handlers.len()
            );

            let needs_task = !entry.live;
            entry.live = true;
            needs_task
        };

        if !needs_task {
            return SubscribeOutcome::Joined;
        }

        let task = receive(
            Arc::clone(&self.client),
            Arc::clone(&self.topics),
            topic.to_string(),
        );
        let mut tasks = self.tasks.lock();
        while tasks.try_join_next().is_some() {}
        tasks.spawn_on(task, &self.runtime);
        SubscribeOutcome::Spawned
    }

    /// Receive tasks spawned and not yet reaped
    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Number of handlers registered for a topic
    pub fn handler_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .get(topic)
            .map(|entry| entry.handlers.len())
            .unwrap_or(0)
    }

    /// Topics with a running receive task, sorted
    pub fn live_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .topics
            .lock()
            .iter()
            .filter(|(_, entry)| entry.live)
            .map(|(topic, _)| topic.clone())
            .collect();
        topics.sort();
        topics
    }

    pub fn is_live(&self, topic: &str) -> bool {
        self.topics
            .lock()
            .get(topic)
            .map(|entry| entry.live)
            .unwrap_or(false)
    }

    /// Wait for every receive task spawned so far to finish
    ///
    /// Tasks end when their stream closes, so call this after disconnecting
    /// the client.
    pub async fn wait(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                if e.is_panic() {
                    tracing::error!("Topic receive task panicked: {}", e);
                }
            }
        }
    }
}

async fn receive(client: Arc<dyn MqttClient>, topics: Topics, topic: String) {
    let mut stream = match client.subscribe(&topic).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("Failed to subscribe to state topic {}: {}", topic, e);
            mark_idle(&topics, &topic);
            return;
        }
    };

    while let Some(message) = stream.recv().await {
        let handlers: Vec<StateHandler> = topics
            .lock()
            .get(&topic)
            .map(|entry| entry.handlers.clone())
            .unwrap_or_default();

        for handler in &handlers {
            handler(&message);
        }
    }

    tracing::debug!("State topic stream closed: {}", topic);
    mark_idle(&topics, &topic);
}

fn mark_idle(topics: &Topics, topic: &str) {
    if let Some(entry) = topics.lock().get_mut(topic) {
        entry.live = false;
    }
}
