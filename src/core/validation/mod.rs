//! Request validation pipeline
//!
//! Two stages run before any business logic:
//!
//! 1. [`RequestParameterBinder`] pulls the parameters a route declares out
//!    of the request body or query string, coerces them and checks bounds.
//! 2. [`SchemaValidator`] re-validates the bound parameters against a
//!    per-operation [`Schema`] (required fields, types, formats, allowed
//!    values) and drops anything undeclared.

pub mod binder;
pub mod extractor;
pub mod field;
pub mod schema;

pub use binder::{RawRequest, RequestParameterBinder};
pub use field::{FieldSet, FieldSpec, FieldType, Location, Params, params_from_json};
pub use schema::{PropertySchema, Schema, SchemaType, SchemaValidator, StringFormat};
