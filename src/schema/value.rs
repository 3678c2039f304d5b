//! Wire and domain values
//!
//! A single tagged enum covers both sides of the boundary:
//! - null, bool, int, float, string, list, map: the wire variants, as
//!   produced by a JSON-like payload parser
//! - timestamp, record: domain-only variants, produced by marshallers and
//!   nested model loads
//!
//! Maps preserve insertion order so dumps feed ordered wire formats.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Number, Value as Json};

/// Ordered string-keyed map of values
pub type WireMap = IndexMap<String, Value>;

/// A wire or domain value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(WireMap),
    /// Domain only: produced by a timestamp marshaller
    Timestamp(NaiveDateTime),
    /// Domain only: a loaded model instance
    Record(Record),
}

/// Variant tag of a [`Value`], used in type diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
    Map,
    Timestamp,
    Record,
}

impl ValueKind {
    /// Returns the type name for error messages
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Str => "string",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Timestamp => "timestamp",
            ValueKind::Record => "record",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// Returns the variant tag
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::Record(_) => ValueKind::Record,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&WireMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Python-style truthiness: null, false, zero and empty containers are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Timestamp(_) | Value::Record(_) => true,
        }
    }

    /// True when the value contains no domain-only variants at any depth.
    pub fn is_wire(&self) -> bool {
        match self {
            Value::Timestamp(_) | Value::Record(_) => false,
            Value::List(items) => items.iter().all(Value::is_wire),
            Value::Map(map) => map.values().all(Value::is_wire),
            _ => true,
        }
    }

    /// Lowers the value to JSON.
    ///
    /// Timestamps become ISO-8601 strings and records become objects keyed
    /// by field identifier. Non-finite floats become null.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::Number(Number::from(*n)),
            Value::Float(x) => Number::from_f64(*x).map_or(Json::Null, Json::Number),
            Value::Str(s) => Json::String(s.clone()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => Json::Object(map_to_json(map)),
            Value::Timestamp(ts) => Json::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Value::Record(record) => Json::Object(map_to_json(&record.fields)),
        }
    }
}

fn map_to_json(map: &WireMap) -> JsonMap<String, Json> {
    map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Str(s),
            Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Value::Map(wire_map_from_json(map)),
        }
    }
}

/// Lifts a JSON object into a wire map, keeping key order.
pub fn wire_map_from_json(map: JsonMap<String, Json>) -> WireMap {
    map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
}

impl From<&Value> for Json {
    fn from(value: &Value) -> Self {
        value.to_json()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<WireMap> for Value {
    fn from(map: WireMap) -> Self {
        Value::Map(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

/// Orders two values when they are comparable.
///
/// Ints and floats compare numerically with each other; strings, bools and
/// timestamps compare within their own kind. Everything else is `None`.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Timestamp(x), Value::Timestamp(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Equality used for set membership: numeric across int/float, structural otherwise.
pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    match compare(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

/// A domain instance of a model.
///
/// Fields are keyed by field identifier, not wire key. A field that has
/// never been assigned is absent, which `dump` distinguishes from null.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    model: String,
    fields: WireMap,
}

impl Record {
    /// Creates an empty record of the given model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            fields: WireMap::new(),
        }
    }

    /// Builder-style assignment
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Returns the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Removes a field, keeping the order of the remaining ones
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
