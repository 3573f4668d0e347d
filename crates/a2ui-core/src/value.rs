use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Object storage used by [`DataValue::Object`].
pub type ObjectMap = BTreeMap<Arc<str>, DataValue>;

/// Reference-counted data model value.
///
/// Scalars are inline. `Str`, `Array` and `Object` sit behind `Arc`, so a
/// clone is a pointer copy and an updated tree shares every subtree it did
/// not touch with the tree it was derived from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum DataValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Array(Arc<Vec<DataValue>>),
    Object(Arc<ObjectMap>),
}

impl DataValue {
    pub fn empty_object() -> Self {
        DataValue::Object(Arc::new(ObjectMap::new()))
    }

    pub fn string(s: impl AsRef<str>) -> Self {
        DataValue::Str(Arc::from(s.as_ref()))
    }

    /// JavaScript `Boolean(value)`: containers are truthy even when empty.
    #[inline]
    pub fn is_truthy(&self) -> bool {
        match self {
            DataValue::Null => false,
            DataValue::Bool(b) => *b,
            DataValue::Int(n) => *n != 0,
            DataValue::Float(f) => *f != 0.0 && !f.is_nan(),
            DataValue::Str(s) => !s.is_empty(),
            DataValue::Array(_) | DataValue::Object(_) => true,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, DataValue::Int(_) | DataValue::Float(_))
    }

    /// Numeric view. Strings and booleans are not coerced.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Int(n) => Some(*n as f64),
            DataValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array(&self) -> Option<&[DataValue]> {
        match self {
            DataValue::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<&ObjectMap> {
        match self {
            DataValue::Object(map) => Some(map.as_ref()),
            _ => None,
        }
    }

    /// Field lookup on objects; every other variant misses.
    pub fn field(&self, key: &str) -> Option<&DataValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Reference identity of two container values.
    ///
    /// Scalars never share storage and always report `false`.
    pub fn ptr_eq(&self, other: &DataValue) -> bool {
        match (self, other) {
            (DataValue::Str(a), DataValue::Str(b)) => Arc::ptr_eq(a, b),
            (DataValue::Array(a), DataValue::Array(b)) => Arc::ptr_eq(a, b),
            (DataValue::Object(a), DataValue::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// String conversion used when splicing values into paths and labels.
    pub fn display_string(&self) -> String {
        match self {
            DataValue::Null => String::new(),
            DataValue::Bool(b) => b.to_string(),
            DataValue::Int(n) => n.to_string(),
            DataValue::Float(f) => format_f64(*f),
            DataValue::Str(s) => s.to_string(),
            DataValue::Array(_) | DataValue::Object(_) => Value::from(self).to_string(),
        }
    }
}

impl PartialEq for DataValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Int(_) | Self::Float(_), Self::Int(_) | Self::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Null, Self::Null) => true,
            _ => false,
        }
    }
}

/// Integral floats print without a fraction, like JS `String(2.0)`.
fn format_f64(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

impl From<&Number> for DataValue {
    fn from(n: &Number) -> Self {
        n.as_i64()
            .map(Self::Int)
            .or_else(|| n.as_f64().map(Self::Float))
            .unwrap_or_default()
    }
}

impl FromIterator<Value> for DataValue {
    fn from_iter<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Self::Array(Arc::new(items.into_iter().map(Self::from).collect()))
    }
}

impl FromIterator<(String, Value)> for DataValue {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(entries: I) -> Self {
        let map: ObjectMap = entries
            .into_iter()
            .map(|(key, value)| (Arc::from(key), Self::from(value)))
            .collect();
        Self::Object(Arc::new(map))
    }
}

impl From<Value> for DataValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::from(&n),
            Value::String(s) => Self::string(s),
            Value::Array(items) => items.into_iter().collect(),
            Value::Object(entries) => entries.into_iter().collect(),
        }
    }
}

impl From<&DataValue> for Value {
    fn from(dv: &DataValue) -> Self {
        match dv {
            DataValue::Null => Value::Null,
            DataValue::Bool(b) => Value::Bool(*b),
            DataValue::Int(n) => Value::Number(Number::from(*n)),
            DataValue::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            DataValue::Str(s) => Value::String(s.to_string()),
            DataValue::Array(arr) => Value::Array(arr.iter().map(Value::from).collect()),
            DataValue::Object(obj) => {
                let map: Map<String, Value> = obj
                    .iter()
                    .map(|(k, v)| (k.to_string(), Value::from(v)))
                    .collect();
                Value::Object(map)
            }
        }
    }
}

impl From<DataValue> for Value {
    fn from(dv: DataValue) -> Self {
        Value::from(&dv)
    }
}

impl From<bool> for DataValue {
    fn from(b: bool) -> Self {
        DataValue::Bool(b)
    }
}

impl From<i64> for DataValue {
    fn from(n: i64) -> Self {
        DataValue::Int(n)
    }
}

impl From<f64> for DataValue {
    fn from(f: f64) -> Self {
        DataValue::Float(f)
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::string(s)
    }
}
