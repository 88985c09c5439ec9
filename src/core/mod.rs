//! Core module containing the booking domain types, storage traits and the
//! request-validation and row-locking pipeline

pub mod booking;
pub mod error;
pub mod events;
pub mod query;
pub mod store;
pub mod transaction;
pub mod validation;

pub use booking::{Booking, BookingChanges, BookingStatus, DateCount, NewBooking};
pub use error::{BookingError, ErrorBody, Result};
pub use events::{BookingEvent, EventBus, EventEnvelope, LogSink, NotificationSink};
pub use query::{BookingFilter, Page, PageRequest, PaginatedResponse, PaginationMeta};
pub use store::{BookingStore, EntityKind, RowFilter, StoreTransaction};
pub use transaction::{LockSpec, LockingTransactionRunner};
pub use validation::{
    FieldSet, FieldSpec, Params, RawRequest, RequestParameterBinder, Schema, SchemaValidator,
};
