//! Request parameter binding
//!
//! [`RequestParameterBinder`] reads the parameters declared in a
//! [`FieldSet`] out of a [`RawRequest`], normalises booleans, collections
//! and numbers, applies defaults and enforces bounds. The result is a
//! [`Params`] mapping holding only non-empty values.

use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use super::field::{FieldSet, FieldSpec, FieldType, Location, Params, is_empty_value};
use crate::core::error::{BookingError, Result};

/// Framework-independent view of an inbound request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRequest {
    /// Request URL, used for logging only
    pub url: String,
    /// Query string parameters
    pub query: HashMap<String, String>,
    /// JSON body, when the request carried a JSON object
    pub body: Option<Map<String, Value>>,
}

impl RawRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Attach a JSON body; non-object bodies are ignored
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = match body {
            Value::Object(map) => Some(map),
            _ => None,
        };
        self
    }

    fn raw_value(&self, spec: &FieldSpec) -> Option<Value> {
        match spec.location {
            Location::Body => self
                .body
                .as_ref()
                .and_then(|body| body.get(&spec.name))
                .filter(|value| !value.is_null())
                .cloned(),
            Location::Query => self
                .query
                .get(&spec.name)
                .map(|value| Value::String(value.clone())),
        }
    }
}

/// Binds declared parameters from a request
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestParameterBinder;

impl RequestParameterBinder {
    pub fn new() -> Self {
        Self
    }

    /// Bind every field of `fields`, in declaration order
    ///
    /// Fails on the first missing, malformed or out-of-bounds parameter.
    pub fn bind(&self, fields: &FieldSet, request: &RawRequest) -> Result<Params> {
        let mut bound = Params::new();
        for spec in fields.iter() {
            if let Some(value) = bind_field(spec, request.raw_value(spec))? {
                bound.insert(spec.name.clone(), value);
            }
        }

        tracing::info!(url = %request.url, params = ?bound, "request parameters bound");
        Ok(bound)
    }
}

fn bind_field(spec: &FieldSpec, raw: Option<Value>) -> Result<Option<Value>> {
    let mut value = raw;

    if spec.field_type == FieldType::Boolean {
        value = parse_boolean(spec, value)?;
    }

    if is_empty_value(value.as_ref()) {
        if spec.required {
            return Err(required(spec));
        }
        value = spec.effective_default().cloned();
    }

    let Some(mut value) = value else {
        return Ok(None);
    };

    if matches!(spec.field_type, FieldType::List | FieldType::Map) {
        value = parse_collection(spec, value)?;
    }

    if !is_empty_value(Some(&value)) {
        check_bounds(spec, &value)?;
    }

    let value = match spec.field_type {
        FieldType::Integer => coerce_integer(spec, value)?,
        FieldType::Float => coerce_float(spec, value)?,
        FieldType::String => coerce_string(spec, value)?,
        FieldType::Boolean | FieldType::List | FieldType::Map => value,
    };

    Ok((!is_empty_value(Some(&value))).then_some(value))
}

fn required(spec: &FieldSpec) -> BookingError {
    BookingError::bad_input(format!("{} is required", spec.name))
}

fn invalid(spec: &FieldSpec) -> BookingError {
    BookingError::bad_input(format!("{} is invalid", spec.name))
}

fn parse_boolean(spec: &FieldSpec, value: Option<Value>) -> Result<Option<Value>> {
    let token = match value {
        Some(Value::Bool(flag)) => return Ok(Some(Value::Bool(flag))),
        Some(Value::String(s)) if !s.is_empty() => s.to_lowercase(),
        Some(Value::Number(n)) => n.to_string(),
        None | Some(Value::String(_)) => {
            if spec.required {
                return Err(required(spec));
            }
            return Ok(spec.effective_default().cloned());
        }
        Some(_) => return Err(invalid(spec)),
    };

    match token.as_str() {
        "true" | "1" | "yes" => Ok(Some(Value::Bool(true))),
        "false" | "0" | "no" => Ok(Some(Value::Bool(false))),
        _ => Err(invalid(spec)),
    }
}

fn parse_collection(spec: &FieldSpec, value: Value) -> Result<Value> {
    let parsed = match value {
        Value::String(text) => serde_json::from_str(&text).map_err(|_| invalid(spec))?,
        other => other,
    };

    let matches_type = match spec.field_type {
        FieldType::List => parsed.is_array(),
        FieldType::Map => parsed.is_object(),
        _ => true,
    };
    if matches_type {
        Ok(parsed)
    } else {
        Err(invalid(spec))
    }
}

fn check_bounds(spec: &FieldSpec, value: &Value) -> Result<()> {
    if spec.field_type.is_sized() {
        let len = value_len(value) as f64;
        if let Some(min) = spec.min
            && len < min
        {
            return Err(BookingError::bad_input(format!(
                "length of {} must be at least {}",
                spec.name, min
            )));
        }
        if let Some(max) = spec.max
            && len > max
        {
            return Err(BookingError::bad_input(format!(
                "length of {} must be at most {}",
                spec.name, max
            )));
        }
    } else if spec.field_type.is_numeric() {
        // Unparseable input is left for coercion to reject
        let Some(number) = numeric_value(value) else {
            return Ok(());
        };
        if let Some(min) = spec.min
            && number < min
        {
            return Err(BookingError::bad_input(format!(
                "{} must be at least {}",
                spec.name, min
            )));
        }
        if let Some(max) = spec.max
            && number > max
        {
            return Err(BookingError::bad_input(format!(
                "{} must be at most {}",
                spec.name, max
            )));
        }
    }
    Ok(())
}

fn value_len(value: &Value) -> usize {
    match value {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => other.to_string().chars().count(),
    }
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_integer(spec: &FieldSpec, value: Value) -> Result<Value> {
    let parsed = match &value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.map(Value::from).ok_or_else(|| invalid(spec))
}

fn coerce_float(spec: &FieldSpec, value: Value) -> Result<Value> {
    let parsed = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| invalid(spec))
}

fn coerce_string(spec: &FieldSpec, value: Value) -> Result<Value> {
    match value {
        Value::String(_) => Ok(value),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(flag) => Ok(Value::String(flag.to_string())),
        _ => Err(invalid(spec)),
    }
}
