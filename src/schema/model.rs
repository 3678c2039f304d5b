//! Schemas and the load/dump walk
//!
//! Load (wire to domain), per property in declaration order:
//! 1. resolve the wire key
//! 2. require the key to be present
//! 3. convert non-simple values
//! 4. validate type and constraints
//! 5. assign onto a scratch record (setter, else field write)
//!
//! Dump (domain to wire), per property in declaration order:
//! 1. resolve the wire key
//! 2. read the value (getter, else field read); unset is only allowed for
//!    nullable properties and dumps as null
//! 3. validate
//! 4. convert non-simple values
//! 5. write under the wire key
//!
//! Any failure aborts the whole call; no partial record or map escapes.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{trace, warn};

use super::errors::{ErrorKind, ModelError, ModelResult};
use super::marshaller::MarshallerRegistry;
use super::property::{Property, PropertyDescription};
use super::registry::SchemaRegistry;
use super::value::{Record, Value, WireMap};

/// An immutable, ordered set of properties
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    properties: Vec<Property>,
}

/// Serializable summary of a schema
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDescription {
    pub model: String,
    pub properties: Vec<PropertyDescription>,
}

/// Collects property declarations for a schema
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    properties: Vec<Property>,
}

impl SchemaBuilder {
    /// Declares a property under a field identifier
    pub fn property(mut self, field: impl Into<String>, mut property: Property) -> Self {
        property.set_field(field.into());
        self.properties.push(property);
        self
    }

    /// Checks identifiers and wire keys, then freezes the schema.
    pub fn build(self) -> ModelResult<Schema> {
        if self.name.is_empty() {
            return Err(ModelError::schema_definition("<unnamed>", "model name is empty"));
        }

        let mut fields = HashSet::new();
        let mut keys = HashSet::new();
        for property in &self.properties {
            if property.field().is_empty() {
                return Err(ModelError::schema_definition(&self.name, "empty field identifier"));
            }
            if !fields.insert(property.field()) {
                return Err(ModelError::schema_definition(
                    &self.name,
                    format!("field '{}' declared twice", property.field()),
                ));
            }
            if !keys.insert(property.wire_key()) {
                return Err(ModelError::schema_definition(
                    &self.name,
                    format!("wire key '{}' used by more than one property", property.wire_key()),
                ));
            }
        }

        Ok(Schema {
            name: self.name,
            properties: self.properties,
        })
    }
}

impl Schema {
    /// Starts a schema declaration
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Properties in declaration order
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Looks up a property by field identifier
    pub fn property(&self, field: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.field() == field)
    }

    /// Looks up a property by wire key
    pub fn property_by_wire_key(&self, key: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.wire_key() == key)
    }

    /// `(field, model)` pairs for every nested model reference
    pub fn references(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .filter_map(|p| p.referenced_model().map(|model| (p.field(), model)))
    }

    pub fn describe(&self) -> SchemaDescription {
        SchemaDescription {
            model: self.name.clone(),
            properties: self.properties.iter().map(Property::describe).collect(),
        }
    }

    /// Builds a record from a wire map.
    ///
    /// # Errors
    ///
    /// - `MissingProperty` if a declared wire key is absent
    /// - `InvalidProperty` if a value fails its type or constraint check
    /// - `UnexpectedProperty` for undeclared keys when the scope is strict
    /// - `Format` if a marshaller cannot read a value
    /// - any error of a nested model, annotated with its path
    pub fn load(&self, scope: &Scope<'_>, wire: &WireMap) -> ModelResult<Record> {
        let scope = scope.descend(self)?;
        trace!(model = %self.name, depth = scope.depth(), "loading record");

        if scope.rejects_unknown_keys() {
            if let Some(key) = wire.keys().find(|k| self.property_by_wire_key(k).is_none()) {
                return Err(ErrorKind::UnexpectedProperty {
                    model: self.name.clone(),
                    property: key.clone(),
                }
                .into());
            }
        }

        let mut record = Record::new(&self.name);
        for property in &self.properties {
            let key = property.wire_key();
            let raw = wire.get(key).ok_or_else(|| ErrorKind::MissingProperty {
                model: self.name.clone(),
                property: key.to_owned(),
            })?;

            let value = if property.is_simple() {
                raw.clone()
            } else {
                property.convert(&scope, raw.clone())?
            };

            self.validate(property, &value)?;

            match property.set_with() {
                Some(setter) => setter(&mut record, value)?,
                None => record.set(property.field(), value),
            }
        }

        Ok(record)
    }

    /// Builds a wire map from a record.
    ///
    /// The output has exactly the declared wire keys, in declaration order.
    ///
    /// # Errors
    ///
    /// - `WrongModel` if the record belongs to another model
    /// - `UndefinedProperty` if a non-nullable property is unset
    /// - `InvalidProperty` if a value fails its type or constraint check
    /// - any error of a nested model, annotated with its path
    pub fn dump(&self, scope: &Scope<'_>, record: &Record) -> ModelResult<WireMap> {
        let scope = scope.descend(self)?;
        trace!(model = %self.name, depth = scope.depth(), "dumping record");

        if record.model() != self.name {
            return Err(ErrorKind::WrongModel {
                expected: self.name.clone(),
                found: record.model().to_owned(),
            }
            .into());
        }

        let mut wire = WireMap::with_capacity(self.properties.len());
        for property in &self.properties {
            let key = property.wire_key();
            let current = match property.get_with() {
                Some(getter) => getter(record),
                None => record.get(property.field()).cloned(),
            };

            let value = match current {
                Some(value) => value,
                None if property.is_nullable() => Value::Null,
                None => {
                    return Err(ErrorKind::UndefinedProperty {
                        model: self.name.clone(),
                        property: property.field().to_owned(),
                    }
                    .into())
                }
            };

            self.validate(property, &value)?;

            let value = if property.is_simple() {
                value
            } else {
                property.to_wire(&scope, value)?
            };
            wire.insert(key.to_owned(), value);
        }

        Ok(wire)
    }

    fn validate(&self, property: &Property, value: &Value) -> ModelResult<()> {
        match property.violation(value) {
            None => Ok(()),
            Some(constraint) => Err(ErrorKind::InvalidProperty {
                model: self.name.clone(),
                property: property.wire_key().to_owned(),
                constraint,
                actual: value.to_string(),
            }
            .into()),
        }
    }
}

/// Context threaded through one load or dump call.
///
/// Carries the registries used to resolve nested models and marshallers,
/// the limits of the owning engine, and the current model and depth.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    schemas: &'a SchemaRegistry,
    marshallers: &'a MarshallerRegistry,
    max_depth: usize,
    reject_unknown_keys: bool,
    model: &'a str,
    depth: usize,
}

impl<'a> Scope<'a> {
    /// Top-level scope; no model entered yet
    pub fn new(
        schemas: &'a SchemaRegistry,
        marshallers: &'a MarshallerRegistry,
        max_depth: usize,
        reject_unknown_keys: bool,
    ) -> Self {
        Self {
            schemas,
            marshallers,
            max_depth,
            reject_unknown_keys,
            model: "",
            depth: 0,
        }
    }

    pub fn marshallers(&self) -> &'a MarshallerRegistry {
        self.marshallers
    }

    pub fn schemas(&self) -> &'a SchemaRegistry {
        self.schemas
    }

    /// Model currently being loaded or dumped
    pub fn model(&self) -> &str {
        self.model
    }

    /// Number of models entered, the current one included
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn rejects_unknown_keys(&self) -> bool {
        self.reject_unknown_keys
    }

    /// Loads a registered model by name
    pub fn load(&self, model: &str, wire: &WireMap) -> ModelResult<Record> {
        let schema = self.schemas.get(model)?;
        schema.load(self, wire)
    }

    /// Dumps a record through a registered model by name
    pub fn dump(&self, model: &str, record: &Record) -> ModelResult<WireMap> {
        let schema = self.schemas.get(model)?;
        schema.dump(self, record)
    }

    fn descend<'b>(&self, schema: &'b Schema) -> ModelResult<Scope<'b>>
    where
        'a: 'b,
    {
        if self.depth >= self.max_depth {
            warn!(model = %schema.name(), limit = self.max_depth, "nesting depth limit reached");
            return Err(ErrorKind::DepthExceeded {
                limit: self.max_depth,
            }
            .into());
        }
        Ok(Scope {
            schemas: self.schemas,
            marshallers: self.marshallers,
            max_depth: self.max_depth,
            reject_unknown_keys: self.reject_unknown_keys,
            model: schema.name(),
            depth: self.depth + 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::marshaller::SlashDateTime;
    use crate::schema::value::wire_map_from_json;
    use serde_json::json;

    fn wire(value: serde_json::Value) -> WireMap {
        match value {
            serde_json::Value::Object(map) => wire_map_from_json(map),
            _ => panic!("fixture must be an object"),
        }
    }

    fn setup() -> (SchemaRegistry, MarshallerRegistry) {
        let schemas = SchemaRegistry::new();
        schemas
            .register(
                Schema::builder("Part")
                    .property("id", Property::int().min(1))
                    .property("body", Property::string())
                    .build()
                    .unwrap(),
            )
            .unwrap();
        schemas
            .register(
                Schema::builder("Message")
                    .property("id", Property::int())
                    .property("from_", Property::string().named("from"))
                    .property("date", Property::timestamp::<SlashDateTime>())
                    .property("parts", Property::list_of("Part"))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        (schemas, MarshallerRegistry::new())
    }

    fn message_wire() -> WireMap {
        wire(json!({
            "id": 1,
            "from": "a@x.com",
            "date": "2024/01/02 03:04:05",
            "parts": [{"id": 1, "body": "one"}, {"id": 2, "body": "two"}]
        }))
    }

    #[test]
    fn test_builder_rejects_duplicate_fields() {
        let err = Schema::builder("M")
            .property("id", Property::int())
            .property("id", Property::string())
            .build()
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::SchemaDefinition { .. }));
    }

    #[test]
    fn test_builder_rejects_duplicate_wire_keys() {
        let err = Schema::builder("M")
            .property("from", Property::string())
            .property("from_", Property::string().named("from"))
            .build()
            .unwrap_err();
        assert!(err.message().contains("wire key 'from'"));
    }

    #[test]
    fn test_load_then_dump_reproduces_wire() {
        let (schemas, marshallers) = setup();
        let scope = Scope::new(&schemas, &marshallers, 8, false);

        let record = scope.load("Message", &message_wire()).unwrap();
        assert_eq!(record.get("from_"), Some(&Value::from("a@x.com")));
        assert!(record.get("from").is_none());

        let dumped = scope.dump("Message", &record).unwrap();
        assert_eq!(dumped, message_wire());
    }

    #[test]
    fn test_load_does_not_touch_input() {
        let (schemas, marshallers) = setup();
        let scope = Scope::new(&schemas, &marshallers, 8, false);
        let input = message_wire();
        scope.load("Message", &input).unwrap();
        assert_eq!(input, message_wire());
    }

    #[test]
    fn test_nested_error_carries_path() {
        let (schemas, marshallers) = setup();
        let scope = Scope::new(&schemas, &marshallers, 8, false);
        let mut input = message_wire();
        input["parts"] = Value::from(json!([{"id": 1, "body": "ok"}, {"id": 0, "body": "bad"}]));

        let err = scope.load("Message", &input).unwrap_err();
        assert_eq!(err.path_string(), "parts[1]");
        match err.kind() {
            ErrorKind::InvalidProperty { model, property, constraint, .. } => {
                assert_eq!(model, "Part");
                assert_eq!(property, "id");
                assert_eq!(constraint, "in interval [1, +inf)");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_depth_limit() {
        let (schemas, marshallers) = setup();
        let scope = Scope::new(&schemas, &marshallers, 1, false);
        let err = scope.load("Message", &message_wire()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::DepthExceeded { limit: 1 }));
        assert_eq!(err.path_string(), "parts[0]");
    }

    #[test]
    fn test_strict_scope_rejects_unknown_keys() {
        let (schemas, marshallers) = setup();
        let scope = Scope::new(&schemas, &marshallers, 8, true);
        let mut input = message_wire();
        input.insert("x-extra".into(), Value::Bool(true));
        let err = scope.load("Message", &input).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnexpectedProperty { .. }));
    }

    #[test]
    fn test_dump_rejects_wrong_model() {
        let (schemas, marshallers) = setup();
        let scope = Scope::new(&schemas, &marshallers, 8, false);
        let err = scope
            .dump("Message", &Record::new("Part").with("id", 1).with("body", "x"))
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::WrongModel { .. }));
    }

    #[test]
    fn test_describe_lists_wire_keys() {
        let (schemas, _) = setup();
        let description = schemas.get("Message").unwrap().describe();
        let keys: Vec<&str> = description.properties.iter().map(|p| p.wire_key.as_str()).collect();
        assert_eq!(keys, ["id", "from", "date", "parts"]);
    }
}
