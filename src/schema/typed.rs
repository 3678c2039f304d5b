//! Typed models
//!
//! Plain Rust structs become models by declaring their schema and moving
//! their fields in and out of a [`Record`].

use chrono::NaiveDateTime;

use super::errors::{ErrorKind, ModelResult};
use super::model::Schema;
use super::value::{Record, Value, WireMap};

/// A Rust type with a declared schema
pub trait ApiModel: Sized {
    /// Registered model name
    const NAME: &'static str;

    /// Declares the schema; called once at registration
    fn schema() -> ModelResult<Schema>;

    /// Builds the value from a loaded record
    fn from_record(record: Record) -> ModelResult<Self>;

    /// Converts the value into a record for dumping
    fn to_record(&self) -> Record;
}

/// Extraction of a typed value out of a [`Value`].
///
/// On mismatch the original value is handed back for diagnostics.
pub trait FromValue: Sized {
    const EXPECTED: &'static str;

    /// Expected shape, as shown in conversion errors
    fn expected() -> String {
        Self::EXPECTED.to_owned()
    }

    fn from_value(value: Value) -> Result<Self, Value>;
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "int";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Int(n) => Ok(n),
            other => Err(other),
        }
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "float";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Float(x) => Ok(x),
            Value::Int(n) => Ok(n as f64),
            other => Err(other),
        }
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other),
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl FromValue for NaiveDateTime {
    const EXPECTED: &'static str = "timestamp";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            other => Err(other),
        }
    }
}

impl FromValue for WireMap {
    const EXPECTED: &'static str = "map";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Map(map) => Ok(map),
            other => Err(other),
        }
    }
}

impl FromValue for Record {
    const EXPECTED: &'static str = "record";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Record(record) => Ok(record),
            other => Err(other),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "list";

    fn expected() -> String {
        format!("list of {}", T::expected())
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            // A mismatch reports the whole list, not the offending element.
            Value::List(items) => items
                .clone()
                .into_iter()
                .map(T::from_value)
                .collect::<Result<_, _>>()
                .map_err(|_| Value::List(items)),
            other => Err(other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn expected() -> String {
        T::expected()
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl Record {
    /// Removes a field and converts it; unset reads as null.
    pub fn take<T: FromValue>(&mut self, field: &str) -> ModelResult<T> {
        let value = self.remove(field).unwrap_or(Value::Null);
        T::from_value(value).map_err(|found| {
            ErrorKind::Conversion {
                field: field.to_owned(),
                expected: T::expected(),
                found: shape(&found),
            }
            .into()
        })
    }
}

/// Kind name of a value; lists also name the kinds they hold
fn shape(value: &Value) -> String {
    match value {
        Value::List(items) if !items.is_empty() => {
            let mut kinds: Vec<&str> = items.iter().map(|item| item.kind().name()).collect();
            kinds.sort_unstable();
            kinds.dedup();
            format!("list of {}", kinds.join(" and "))
        }
        other => other.kind().name().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_scalars() {
        let mut record = Record::new("M").with("id", 3).with("name", "x").with("ok", true);
        assert_eq!(record.take::<i64>("id").unwrap(), 3);
        assert_eq!(record.take::<String>("name").unwrap(), "x");
        assert!(record.take::<bool>("ok").unwrap());
        assert!(record.is_empty());
    }

    #[test]
    fn test_take_optional() {
        let mut record = Record::new("M").with("note", Value::Null);
        assert_eq!(record.take::<Option<String>>("note").unwrap(), None);
        assert_eq!(record.take::<Option<String>>("absent").unwrap(), None);
    }

    #[test]
    fn test_take_records() {
        let parts = vec![Value::Record(Record::new("Part")), Value::Record(Record::new("Part"))];
        let mut record = Record::new("Message").with("parts", Value::List(parts));
        let parts: Vec<Record> = record.take("parts").unwrap();
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_take_mismatch_names_field() {
        let mut record = Record::new("M").with("id", "seven");
        let err = record.take::<i64>("id").unwrap_err();
        match err.kind() {
            ErrorKind::Conversion { field, expected, found } => {
                assert_eq!(field, "id");
                assert_eq!(expected, "int");
                assert_eq!(found, "string");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_take_list_mismatch_reports_the_list() {
        let mut record = Record::new("M").with("tags", Value::List(vec![Value::from("a"), Value::Int(1)]));
        let err = record.take::<Vec<String>>("tags").unwrap_err();
        match err.kind() {
            ErrorKind::Conversion { field, expected, found } => {
                assert_eq!(field, "tags");
                assert_eq!(expected, "list of string");
                assert_eq!(found, "list of int and string");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
