//! Notification transports beyond the in-process sinks in
//! [`crate::core::events`]

#[cfg(feature = "kafka")]
pub mod kafka;

#[cfg(feature = "kafka")]
pub use kafka::KafkaNotificationSink;

pub use crate::core::events::{EventBus, LogSink, NotificationSink};
