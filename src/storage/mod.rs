//! Storage implementations for different backends

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::{InMemoryBookingStore, InMemoryTransaction};
#[cfg(feature = "postgres")]
pub use postgres::{PostgresBookingStore, PostgresTransaction};
