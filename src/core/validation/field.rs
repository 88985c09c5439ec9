//! Declarative descriptions of request parameters

use indexmap::IndexMap;
use serde_json::Value;

/// Bound request parameters, in declaration order
pub type Params = IndexMap<String, Value>;

/// Convert a JSON object into [`Params`]
///
/// Anything other than an object yields an empty mapping.
pub fn params_from_json(value: Value) -> Params {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => Params::new(),
    }
}

/// Value type a parameter is coerced into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Map,
}

impl FieldType {
    /// Whether `min`/`max` bound a length rather than a magnitude
    pub fn is_sized(&self) -> bool {
        matches!(self, FieldType::String | FieldType::List | FieldType::Map)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Float)
    }
}

/// Part of the request a parameter is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Location {
    /// JSON request body
    #[default]
    Body,
    /// URL query string
    Query,
}

/// One bindable request parameter
///
/// When `required` is set, `default` is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub default: Option<Value>,
    pub location: Location,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FieldSpec {
    /// An optional body parameter with no default and no bounds
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            default: None,
            location: Location::Body,
            min: None,
            max: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::List)
    }

    pub fn map(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Map)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn in_query(mut self) -> Self {
        self.location = Location::Query;
        self
    }

    pub fn in_body(mut self) -> Self {
        self.location = Location::Body;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Default applied when the parameter is empty
    pub fn effective_default(&self) -> Option<&Value> {
        if self.required {
            None
        } else {
            self.default.as_ref()
        }
    }
}

/// Ordered, name-unique collection of [`FieldSpec`]s for one route
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet {
    fields: Vec<FieldSpec>,
}

impl FieldSet {
    /// Build a set, a later spec replacing an earlier one with the same name
    pub fn new(specs: impl IntoIterator<Item = FieldSpec>) -> Self {
        let mut fields: Vec<FieldSpec> = Vec::new();
        for spec in specs {
            match fields.iter_mut().find(|f| f.name == spec.name) {
                Some(existing) => *existing = spec,
                None => fields.push(spec),
            }
        }
        Self { fields }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Whether a value counts as "not supplied"
///
/// Null, the empty string, numeric zero, and empty lists or maps are all
/// empty. `false` is a real value.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Bool(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_defaults() {
        let spec = FieldSpec::integer("page").in_query().default_value(1);
        assert_eq!(spec.location, Location::Query);
        assert!(!spec.required);
        assert_eq!(spec.effective_default(), Some(&json!(1)));
    }

    #[test]
    fn test_required_ignores_default() {
        let spec = FieldSpec::string("name").default_value("x").required();
        assert_eq!(spec.effective_default(), None);
    }

    #[test]
    fn test_field_set_names_are_unique() {
        let set = FieldSet::new([
            FieldSpec::string("phone"),
            FieldSpec::string("note"),
            FieldSpec::integer("phone"),
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("phone").unwrap().field_type, FieldType::Integer);
        let names: Vec<_> = set.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["phone", "note"]);
    }

    #[test]
    fn test_emptiness() {
        assert!(is_empty_value(None));
        assert!(is_empty_value(Some(&json!(null))));
        assert!(is_empty_value(Some(&json!(""))));
        assert!(is_empty_value(Some(&json!(0))));
        assert!(is_empty_value(Some(&json!(0.0))));
        assert!(is_empty_value(Some(&json!([]))));
        assert!(is_empty_value(Some(&json!({}))));
        assert!(!is_empty_value(Some(&json!(false))));
        assert!(!is_empty_value(Some(&json!("0"))));
    }

    #[test]
    fn test_params_from_json() {
        let params = params_from_json(json!({"b": 1, "a": 2}));
        assert_eq!(params.len(), 2);
        assert_eq!(params["a"], json!(2));
        assert!(params_from_json(json!([1, 2])).is_empty());
    }
}
