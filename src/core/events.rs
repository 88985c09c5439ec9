//! Booking notifications
//!
//! After a booking is committed the workflow hands a [`BookingEvent`] to a
//! [`NotificationSink`]. Delivery is best-effort: the booking stays
//! created whether or not the sink accepts the event.
//!
//! # Sinks
//!
//! - [`EventBus`]: in-process `tokio::sync::broadcast` channel
//! - [`LogSink`]: writes each event to the log
//! - `KafkaNotificationSink` (feature `kafka`): publishes to a Kafka topic
//!
//! # Usage
//!
//! ```rust,ignore
//! let event_bus = EventBus::new(1024);
//! let mut rx = event_bus.subscribe();
//!
//! event_bus.publish(BookingEvent::BookingCreated { booking_id: 42 });
//!
//! if let Ok(envelope) = rx.recv().await {
//!     println!("Received: {:?}", envelope.event);
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::core::error::{BookingError, Result};

/// Events emitted by the booking workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BookingEvent {
    /// A booking was committed
    BookingCreated { booking_id: i64 },
}

impl BookingEvent {
    /// Partition key for the event
    pub fn key(&self) -> String {
        match self {
            BookingEvent::BookingCreated { booking_id } => booking_id.to_string(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BookingEvent::BookingCreated { .. } => "booking_created",
        }
    }

    /// JSON payload published to external brokers
    pub fn to_payload(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| BookingError::Notification(err.to_string()))
    }
}

/// Envelope wrapping a booking event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// Topic the event was sent to
    pub topic: String,
    /// The actual event
    pub event: BookingEvent,
}

impl EventEnvelope {
    /// Create a new event envelope
    pub fn new(topic: impl Into<String>, event: BookingEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            topic: topic.into(),
            event,
        }
    }
}

/// Destination for booking notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Publish `event` under `key` on `topic`
    async fn send(&self, topic: &str, key: &str, event: &BookingEvent) -> Result<()>;
}

/// Broadcast-based event bus
///
/// Cheap to clone and shareable across tasks. Events published with no
/// subscriber are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    topic: String,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    ///
    /// Slow receivers that fall more than `capacity` events behind get a
    /// `Lagged` error on their next `recv()`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            topic: crate::config::BOOKING_TOPIC.to_string(),
        }
    }

    /// Publish an event on the bus's own topic
    ///
    /// Returns the number of receivers that will receive the event.
    pub fn publish(&self, event: BookingEvent) -> usize {
        self.publish_envelope(EventEnvelope::new(self.topic.clone(), event))
    }

    fn publish_envelope(&self, envelope: EventEnvelope) -> usize {
        // send() only fails when nobody is listening
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Get the current number of active subscribers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl NotificationSink for EventBus {
    async fn send(&self, topic: &str, _key: &str, event: &BookingEvent) -> Result<()> {
        self.publish_envelope(EventEnvelope::new(topic, event.clone()));
        Ok(())
    }
}

/// Sink that only logs events
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, topic: &str, key: &str, event: &BookingEvent) -> Result<()> {
        tracing::info!(
            target: "booking::notify",
            topic,
            key,
            event = event.name(),
            "notification emitted"
        );
        Ok(())
    }
}
