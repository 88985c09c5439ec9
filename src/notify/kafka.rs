//! Kafka notification sink using rdkafka.
//!
//! # Feature flag
//!
//! This module is gated behind the `kafka` feature flag:
//! ```toml
//! [dependencies]
//! booking-rs = { version = "0.1", features = ["kafka"] }
//! ```

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::time::Duration;

use crate::core::error::{BookingError, Result};
use crate::core::events::{BookingEvent, NotificationSink};

/// How long `send` waits for room in the producer queue
const QUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishes booking events to a Kafka topic
#[derive(Clone)]
pub struct KafkaNotificationSink {
    producer: FutureProducer,
}

impl KafkaNotificationSink {
    /// Connect a producer to `brokers` (comma-separated `host:port` list)
    pub fn new(brokers: &str) -> anyhow::Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;
        Ok(Self { producer })
    }

    pub fn from_producer(producer: FutureProducer) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl NotificationSink for KafkaNotificationSink {
    async fn send(&self, topic: &str, key: &str, event: &BookingEvent) -> Result<()> {
        let payload = event.to_payload()?;
        let record = FutureRecord::to(topic).key(key).payload(&payload);

        let (partition, offset) = self
            .producer
            .send(record, QUEUE_TIMEOUT)
            .await
            .map_err(|(err, _)| BookingError::Notification(err.to_string()))?;

        tracing::debug!(
            target: "booking::notify",
            topic,
            key,
            partition,
            offset,
            "event delivered"
        );
        Ok(())
    }
}
