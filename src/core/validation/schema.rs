//! Schema-driven parameter validation
//!
//! A [`Schema`] is a small JSON-Schema-like description: typed properties
//! with optional format, pattern, length and allowed-value constraints,
//! plus a list of required names. [`SchemaValidator::validate`] strips
//! undeclared keys, checks required fields, then checks every remaining
//! value against its property.

use chrono::{DateTime, NaiveDate};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use super::field::{Params, is_empty_value};
use crate::core::error::{BookingError, Result};

/// JSON type a property must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    String,
    /// Whole number within `i64`; `2.0` is accepted
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl SchemaType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            SchemaType::String => value.is_string(),
            SchemaType::Integer => match value {
                Value::Number(n) => n.is_i64() || whole_float(n).is_some(),
                _ => false,
            },
            SchemaType::Number => value.is_number(),
            SchemaType::Boolean => value.is_boolean(),
            SchemaType::Array => value.is_array(),
            SchemaType::Object => value.is_object(),
        }
    }
}

/// Textual formats checked on string properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    /// RFC 3339 timestamp with offset
    DateTime,
    /// `YYYY-MM-DD`
    Date,
    /// Either of the above
    DateOrDateTime,
}

impl StringFormat {
    fn accepts(&self, text: &str) -> bool {
        match self {
            StringFormat::DateTime => DateTime::parse_from_rfc3339(text).is_ok(),
            StringFormat::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok(),
            StringFormat::DateOrDateTime => {
                StringFormat::DateTime.accepts(text) || StringFormat::Date.accepts(text)
            }
        }
    }
}

/// Constraints on one property
#[derive(Debug, Clone)]
pub struct PropertySchema {
    pub schema_type: SchemaType,
    pub format: Option<StringFormat>,
    pub pattern: Option<Regex>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Literal values the property may take
    pub allowed: Option<Vec<String>>,
    /// Name used in error messages instead of the key
    pub display_name: Option<String>,
}

impl PropertySchema {
    pub fn new(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            format: None,
            pattern: None,
            min_length: None,
            max_length: None,
            allowed: None,
            display_name: None,
        }
    }

    pub fn string() -> Self {
        Self::new(SchemaType::String)
    }

    pub fn integer() -> Self {
        Self::new(SchemaType::Integer)
    }

    pub fn number() -> Self {
        Self::new(SchemaType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(SchemaType::Boolean)
    }

    pub fn array() -> Self {
        Self::new(SchemaType::Array)
    }

    pub fn object() -> Self {
        Self::new(SchemaType::Object)
    }

    /// A string in RFC 3339 form
    pub fn date_time() -> Self {
        Self::string().format(StringFormat::DateTime)
    }

    /// A string in RFC 3339 or `YYYY-MM-DD` form
    pub fn date_or_date_time() -> Self {
        Self::string().format(StringFormat::DateOrDateTime)
    }

    pub fn format(mut self, format: StringFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn named(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    fn check(&self, value: &Value) -> std::result::Result<(), Violation> {
        if !self.schema_type.accepts(value) {
            return Err(Violation::Type);
        }

        if let Value::String(text) = value {
            if let Some(format) = self.format
                && !format.accepts(text)
            {
                return Err(Violation::Format);
            }
            if let Some(pattern) = &self.pattern
                && !pattern.is_match(text)
            {
                return Err(Violation::Pattern);
            }
        }

        let len = match value {
            Value::String(text) => Some(text.chars().count()),
            Value::Array(items) => Some(items.len()),
            _ => None,
        };
        if let Some(len) = len {
            if self.min_length.is_some_and(|min| len < min) {
                return Err(Violation::MinLength);
            }
            if self.max_length.is_some_and(|max| len > max) {
                return Err(Violation::MaxLength);
            }
        }

        if let Some(allowed) = &self.allowed {
            let literal = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            if !allowed.contains(&literal) {
                return Err(Violation::NotAllowed(format!(
                    "{} is not one of {:?}",
                    value, allowed
                )));
            }
        }

        Ok(())
    }
}

/// Integral value of a whole float that fits in `i64`
fn whole_float(n: &serde_json::Number) -> Option<i64> {
    let f = n.as_f64()?;
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

/// Which constraint a value broke
#[derive(Debug, Clone, PartialEq, Eq)]
enum Violation {
    Type,
    Format,
    Pattern,
    MinLength,
    MaxLength,
    /// Carries the raw constraint message
    NotAllowed(String),
}

/// Structural description of a parameter set
#[derive(Debug, Clone, Default)]
pub struct Schema {
    properties: IndexMap<String, PropertySchema>,
    required: Vec<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, name: impl Into<String>, property: PropertySchema) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    pub fn require<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn properties(&self) -> impl Iterator<Item = (&String, &PropertySchema)> {
        self.properties.iter()
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Name shown to clients for `field`
    pub fn display_name<'a>(&'a self, field: &'a str) -> &'a str {
        self.properties
            .get(field)
            .and_then(|p| p.display_name.as_deref())
            .unwrap_or(field)
    }
}

/// Validates bound parameters against a [`Schema`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `params`, returning only the declared keys
    ///
    /// Whole floats given for integer properties come back as integers;
    /// every other value is returned unchanged. The first failure is
    /// reported as a single [`BookingError::BadInput`].
    pub fn validate(&self, schema: &Schema, params: &Params) -> Result<Params> {
        let mut filtered: Params = params
            .iter()
            .filter(|(name, _)| schema.is_declared(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        for name in &schema.required {
            if is_falsy(filtered.get(name)) {
                return Err(BookingError::bad_input(format!(
                    "{} is required",
                    schema.display_name(name)
                )));
            }
        }

        for (name, property) in schema.properties() {
            let Some(value) = filtered.get(name) else {
                continue;
            };
            if let Err(violation) = property.check(value) {
                tracing::debug!(field = %name, ?violation, "schema validation failed");
                let message = match violation {
                    Violation::NotAllowed(message) => message,
                    _ => format!("{} is invalid", schema.display_name(name)),
                };
                return Err(BookingError::BadInput(message));
            }
        }

        for (name, property) in schema.properties() {
            if property.schema_type != SchemaType::Integer {
                continue;
            }
            if let Some(value) = filtered.get_mut(name)
                && let Value::Number(n) = value
                && !n.is_i64()
                && let Some(whole) = whole_float(n)
            {
                *value = Value::from(whole);
            }
        }

        Ok(filtered)
    }
}

fn is_falsy(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Bool(false))) || is_empty_value(value)
}
