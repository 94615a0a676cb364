use serde::Deserialize;
use serde_json::Value;

/// A property or environment value from the service definition.
///
/// Classification happens once, while the definition is deserialized, so
/// nothing downstream has to inspect the raw JSON shape again.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(from = "Value")]
pub enum PropertyValue {
    /// Concrete value rendered as the string handed to the queue service.
    /// Nested plain values are JSON-encoded.
    Resolved(String),

    /// Reference to another resource (`Ref`, `Fn::GetAtt`, ...) that only the
    /// owning infrastructure tool could resolve
    DynamicReference(Value),

    /// Explicit `null`
    Null,
}

impl PropertyValue {
    pub fn as_resolved(&self) -> Option<&str> {
        match self {
            PropertyValue::Resolved(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, PropertyValue::DynamicReference(_))
    }

    /// Raw JSON form, used in warnings.
    pub fn raw(&self) -> String {
        match self {
            PropertyValue::Resolved(value) => Value::String(value.clone()).to_string(),
            PropertyValue::DynamicReference(value) => value.to_string(),
            PropertyValue::Null => "null".to_string(),
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => PropertyValue::Null,
            Value::String(value) => PropertyValue::Resolved(value),
            Value::Bool(value) => PropertyValue::Resolved(value.to_string()),
            Value::Number(value) => PropertyValue::Resolved(value.to_string()),
            nested if is_reference(&nested) => PropertyValue::DynamicReference(nested),
            nested => PropertyValue::Resolved(nested.to_string()),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Resolved(value.to_string())
    }
}

fn is_reference(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.keys().any(|key| key == "Ref" || key.starts_with("Fn::"))
                || map.values().any(contains_object)
        }
        Value::Array(items) => items.iter().any(contains_object),
        _ => false,
    }
}

fn contains_object(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => items.iter().any(contains_object),
        _ => false,
    }
}
