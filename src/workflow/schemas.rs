//! Per-operation parameter declarations
//!
//! Each booking operation has two descriptions: a [`FieldSet`] telling the
//! binder where to find each HTTP parameter, and a [`Schema`] the workflow
//! re-validates the bound parameters against.

use crate::config::{CUSTOMER_NAME_MAX_LEN, DEFAULT_PAGE_LIMIT, DEFAULT_PAGE_NUMBER, MAX_PAGE_LIMIT};
use crate::core::booking::BookingStatus;
use crate::core::validation::{FieldSet, FieldSpec, PropertySchema, Schema};

/// Name of the bound id parameter for row-level operations
pub const BOOKING_ID: &str = "booking_id";

/// Schemas used by [`BookingWorkflow`](super::BookingWorkflow)
#[derive(Debug, Clone)]
pub struct BookingSchemas {
    pub paginate: Schema,
    pub create: Schema,
    pub update: Schema,
    pub delete: Schema,
}

impl Default for BookingSchemas {
    fn default() -> Self {
        Self {
            paginate: paginate_schema(),
            create: create_schema(),
            update: update_schema(),
            delete: delete_schema(),
        }
    }
}

fn status() -> PropertySchema {
    PropertySchema::string().one_of(BookingStatus::values())
}

fn customer_name() -> PropertySchema {
    PropertySchema::string().min_length(1).max_length(CUSTOMER_NAME_MAX_LEN)
}

pub fn paginate_schema() -> Schema {
    Schema::new()
        .property("customer_name", PropertySchema::string())
        .property("phone", PropertySchema::integer())
        .property("booking_from", PropertySchema::date_or_date_time())
        .property("booking_to", PropertySchema::date_or_date_time())
        .property("status", status())
        .property("created_from", PropertySchema::date_or_date_time())
        .property("created_to", PropertySchema::date_or_date_time())
        .property("page", PropertySchema::integer())
        .property("size", PropertySchema::integer())
}

pub fn create_schema() -> Schema {
    Schema::new()
        .property("customer_name", customer_name())
        .property("phone", PropertySchema::integer())
        .property("booking_date", PropertySchema::date_time())
        .property("note", PropertySchema::string())
        .require(["customer_name", "phone", "booking_date"])
}

pub fn update_schema() -> Schema {
    Schema::new()
        .property(BOOKING_ID, PropertySchema::integer())
        .property("customer_name", customer_name())
        .property("phone", PropertySchema::integer())
        .property("booking_date", PropertySchema::date_time())
        .property("note", PropertySchema::string())
        .property("status", status())
        .require([BOOKING_ID])
}

pub fn delete_schema() -> Schema {
    Schema::new()
        .property(BOOKING_ID, PropertySchema::integer())
        .require([BOOKING_ID])
}

/// Field sets the HTTP layer binds requests with
#[derive(Debug, Clone)]
pub struct BookingFields {
    pub paginate: FieldSet,
    pub create: FieldSet,
    pub update: FieldSet,
}

impl BookingFields {
    pub fn new(default_page: usize, default_size: usize) -> Self {
        Self {
            paginate: paginate_fields(default_page, default_size),
            create: create_fields(),
            update: update_fields(),
        }
    }
}

impl Default for BookingFields {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_LIMIT)
    }
}

pub fn paginate_fields(default_page: usize, default_size: usize) -> FieldSet {
    FieldSet::new([
        FieldSpec::string("customer_name").in_query(),
        FieldSpec::integer("phone").in_query(),
        FieldSpec::string("booking_from").in_query(),
        FieldSpec::string("booking_to").in_query(),
        FieldSpec::string("status").in_query(),
        FieldSpec::string("created_from").in_query(),
        FieldSpec::string("created_to").in_query(),
        FieldSpec::integer("page")
            .in_query()
            .default_value(default_page as u64),
        FieldSpec::integer("size")
            .in_query()
            .default_value(default_size as u64)
            .min(1.0)
            .max(MAX_PAGE_LIMIT as f64),
    ])
}

pub fn create_fields() -> FieldSet {
    FieldSet::new([
        FieldSpec::string("customer_name")
            .required()
            .max(CUSTOMER_NAME_MAX_LEN as f64),
        FieldSpec::integer("phone").required(),
        FieldSpec::string("booking_date").required(),
        FieldSpec::string("note"),
    ])
}

pub fn update_fields() -> FieldSet {
    FieldSet::new([
        FieldSpec::string("customer_name").max(CUSTOMER_NAME_MAX_LEN as f64),
        FieldSpec::integer("phone"),
        FieldSpec::string("booking_date"),
        FieldSpec::string("note"),
        FieldSpec::string("status"),
    ])
}
