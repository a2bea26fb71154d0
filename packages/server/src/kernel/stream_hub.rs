//! In-process pub/sub hub for real-time streaming.
//!
//! Topic-keyed broadcast channels feeding the SSE endpoint. Registration
//! attempts publish on `registration:{session_id}` and voice calls on
//! `voice:{call_id}`; the hub itself does not interpret payloads.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::warn;

pub fn registration_topic(session_id: impl Display) -> String {
    format!("registration:{}", session_id)
}

pub fn voice_topic(call_id: impl Display) -> String {
    format!("voice:{}", call_id)
}

/// Thread-safe, cloneable hub. Payloads are `serde_json::Value`.
#[derive(Clone)]
pub struct StreamHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<serde_json::Value>>>>,
    capacity: usize,
}

impl StreamHub {
    /// Default capacity is 64 messages per topic.
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Publish a JSON value to a topic. No-op if nobody subscribed.
    pub async fn publish(&self, topic: &str, value: serde_json::Value) {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(topic) {
            let _ = tx.send(value);
        }
    }

    /// Serialize and publish a typed event with a `type` tag.
    pub async fn publish_event<T: Serialize>(&self, topic: &str, event_type: &str, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(data) => {
                self.publish(topic, serde_json::json!({ "type": event_type, "data": data }))
                    .await
            }
            Err(e) => warn!(topic, event_type, error = %e, "Failed to serialize stream event"),
        }
    }

    /// Publish without waiting for the channel map lock. Returns false when
    /// the map is locked for writing and the event was dropped.
    pub fn try_publish_event<T: Serialize>(
        &self,
        topic: &str,
        event_type: &str,
        payload: &T,
    ) -> bool {
        let Ok(channels) = self.channels.try_read() else {
            return false;
        };
        if let Some(tx) = channels.get(topic) {
            match serde_json::to_value(payload) {
                Ok(data) => {
                    let _ = tx.send(serde_json::json!({ "type": event_type, "data": data }));
                }
                Err(e) => warn!(topic, event_type, error = %e, "Failed to serialize stream event"),
            }
        }
        true
    }

    /// Subscribe to a topic, creating the channel on first use.
    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<serde_json::Value> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        tx.subscribe()
    }

    /// Drop channels nobody listens to any more.
    pub async fn cleanup(&self) {
        let mut channels = self.channels.write().await;
        channels.retain(|_, tx| tx.receiver_count() > 0);
    }
}

impl Default for StreamHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_typed_event_is_wrapped() {
        let hub = StreamHub::new();
        let topic = registration_topic("abc");
        let mut rx = hub.subscribe(&topic).await;

        hub.publish_event(&topic, "attempt", &serde_json::json!({"phase": "creating_auth"}))
            .await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received["type"], "attempt");
        assert_eq!(received["data"]["phase"], "creating_auth");
    }

    #[tokio::test]
    async fn test_try_publish_reaches_subscribers() {
        let hub = StreamHub::new();
        let topic = registration_topic("abc");
        let mut rx = hub.subscribe(&topic).await;

        assert!(hub.try_publish_event(&topic, "attempt", &serde_json::json!({"phase": "failed"})));

        let received = rx.recv().await.unwrap();
        assert_eq!(received["type"], "attempt");
        assert_eq!(received["data"]["phase"], "failed");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let hub = StreamHub::new();
        hub.publish(&voice_topic("call-1"), serde_json::json!({"level": 0.4}))
            .await;
        assert!(hub.channels.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_removes_abandoned_topics() {
        let hub = StreamHub::new();
        let rx = hub.subscribe("registration:gone").await;
        drop(rx);

        hub.cleanup().await;

        assert!(hub.channels.read().await.is_empty());
    }
}
