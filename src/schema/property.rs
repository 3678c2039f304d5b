//! Property declarations
//!
//! A property describes one named field of a schema: its declared type,
//! its constraints, and how the value moves between wire and domain form.
//!
//! Variants:
//! - simple: int, float, string, bool, raw list, raw map (exact type check)
//! - marshallable: converted through a registered marshaller
//! - model: a nested model, loaded/dumped recursively
//! - list of models: a homogeneous list of a nested model, order preserved

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::constraint::{Boundary, Constraint, Members};
use super::errors::{ErrorKind, ModelError, ModelResult};
use super::marshaller::{Marshaller, MarshallerRegistry, TimestampFormat, TimestampMarshaller};
use super::model::Scope;
use super::value::{Record, Value, ValueKind};

/// Custom read used by `dump` instead of the direct field read
pub type Getter = fn(&Record) -> Option<Value>;

/// Custom assignment used by `load` instead of the direct field write
pub type Setter = fn(&mut Record, Value) -> ModelResult<()>;

/// Primitive types of simple properties
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleType {
    Int,
    Float,
    Str,
    Bool,
    /// Raw collection: list of wire values, no structural conversion
    List,
    /// Raw collection: map of wire values, no structural conversion
    Map,
}

impl SimpleType {
    pub fn kind(self) -> ValueKind {
        match self {
            SimpleType::Int => ValueKind::Int,
            SimpleType::Float => ValueKind::Float,
            SimpleType::Str => ValueKind::Str,
            SimpleType::Bool => ValueKind::Bool,
            SimpleType::List => ValueKind::List,
            SimpleType::Map => ValueKind::Map,
        }
    }
}

type Resolver = fn(&MarshallerRegistry) -> ModelResult<Arc<dyn Marshaller>>;

fn resolve<M: Marshaller + Default>(registry: &MarshallerRegistry) -> ModelResult<Arc<dyn Marshaller>> {
    let marshaller: Arc<dyn Marshaller> = registry.get::<M>()?;
    Ok(marshaller)
}

/// Reference from a property to a marshaller type.
///
/// Only the type is captured at declaration; the instance comes from the
/// registry when a value is converted.
#[derive(Clone, Copy)]
pub struct MarshallerBinding {
    type_name: &'static str,
    domain_kind: ValueKind,
    resolve: Resolver,
}

impl MarshallerBinding {
    pub fn of<M: Marshaller + Default>() -> Self {
        Self {
            type_name: std::any::type_name::<M>(),
            domain_kind: M::domain_kind(),
            resolve: resolve::<M>,
        }
    }

    pub fn domain_kind(&self) -> ValueKind {
        self.domain_kind
    }

    pub fn resolve(&self, registry: &MarshallerRegistry) -> ModelResult<Arc<dyn Marshaller>> {
        (self.resolve)(registry)
    }
}

impl fmt::Debug for MarshallerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarshallerBinding")
            .field("type", &self.type_name)
            .field("domain_kind", &self.domain_kind)
            .finish()
    }
}

/// Property variant
#[derive(Debug, Clone)]
pub enum PropertyKind {
    Simple(SimpleType),
    Marshallable(MarshallerBinding),
    /// Nested model, by registered name
    Model(String),
    /// List of a nested model, by registered name
    ListOfModels(String),
}

/// One field of a schema
#[derive(Clone)]
pub struct Property {
    field: String,
    name: Option<String>,
    kind: PropertyKind,
    constraints: Vec<Constraint>,
    /// Index of the interval owned by `min`/`max`
    bounds: Option<usize>,
    nullable: bool,
    getter: Option<Getter>,
    setter: Option<Setter>,
}

/// Serializable summary of a property, for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct PropertyDescription {
    pub field: String,
    pub wire_key: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub simple: bool,
    pub nullable: bool,
    pub constraints: Vec<String>,
}

impl Property {
    fn new(kind: PropertyKind) -> Self {
        Self {
            field: String::new(),
            name: None,
            kind,
            constraints: Vec::new(),
            bounds: None,
            nullable: false,
            getter: None,
            setter: None,
        }
    }

    // ==================
    // Declaration
    // ==================

    pub fn simple(ty: SimpleType) -> Self {
        Self::new(PropertyKind::Simple(ty))
    }

    pub fn int() -> Self {
        Self::simple(SimpleType::Int)
    }

    pub fn float() -> Self {
        Self::simple(SimpleType::Float)
    }

    pub fn string() -> Self {
        Self::simple(SimpleType::Str)
    }

    pub fn boolean() -> Self {
        Self::simple(SimpleType::Bool)
    }

    pub fn list() -> Self {
        Self::simple(SimpleType::List)
    }

    pub fn map() -> Self {
        Self::simple(SimpleType::Map)
    }

    /// Property converted through the registry's `M` instance
    pub fn marshalled<M: Marshaller + Default>() -> Self {
        Self::new(PropertyKind::Marshallable(MarshallerBinding::of::<M>()))
    }

    /// Timestamp in the pattern of `F`
    pub fn timestamp<F: TimestampFormat>() -> Self {
        Self::marshalled::<TimestampMarshaller<F>>()
    }

    /// Nested model; resolved by name at load/dump time
    pub fn model(name: impl Into<String>) -> Self {
        Self::new(PropertyKind::Model(name.into()))
    }

    /// List of a nested model; resolved by name at load/dump time
    pub fn list_of(name: impl Into<String>) -> Self {
        Self::new(PropertyKind::ListOfModels(name.into()))
    }

    /// Wire key override, for fields whose identifier differs from the key
    pub fn named(mut self, wire_key: impl Into<String>) -> Self {
        self.name = Some(wire_key.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Inclusive lower bound.
    ///
    /// `min` and `max` share one closed interval. Intervals added through
    /// [`Property::constraint`] are left alone.
    pub fn min(self, min: impl Into<Value>) -> Self {
        self.bound(Some(min.into()), None)
    }

    /// Inclusive upper bound; see [`Property::min`]
    pub fn max(self, max: impl Into<Value>) -> Self {
        self.bound(None, Some(max.into()))
    }

    fn bound(mut self, new_min: Option<Value>, new_max: Option<Value>) -> Self {
        let owned = self.bounds.and_then(|index| self.constraints.get_mut(index));
        match owned {
            Some(Constraint::InInterval { min, max, .. }) => {
                if new_min.is_some() {
                    *min = new_min;
                }
                if new_max.is_some() {
                    *max = new_max;
                }
            }
            _ => {
                self.bounds = Some(self.constraints.len());
                self.constraints
                    .push(Constraint::interval(new_min, new_max, Boundary::Closed));
            }
        }
        self
    }

    pub fn one_of(self, members: impl Into<Members>) -> Self {
        self.constraint(Constraint::in_set(members))
    }

    pub fn not_empty(self) -> Self {
        self.constraint(Constraint::NotEmpty)
    }

    pub fn getter(mut self, getter: Getter) -> Self {
        self.getter = Some(getter);
        self
    }

    pub fn setter(mut self, setter: Setter) -> Self {
        self.setter = Some(setter);
        self
    }

    pub(crate) fn set_field(&mut self, field: String) {
        self.field = field;
    }

    // ==================
    // Accessors
    // ==================

    /// Field identifier on the record
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Wire key override, if declared
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Key used on the wire map: the override, else the field identifier
    pub fn wire_key(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.field)
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// True when no structural conversion is needed
    pub fn is_simple(&self) -> bool {
        matches!(self.kind, PropertyKind::Simple(_))
    }

    pub fn get_with(&self) -> Option<Getter> {
        self.getter
    }

    pub fn set_with(&self) -> Option<Setter> {
        self.setter
    }

    /// Model referenced by a model or list-of-models property
    pub fn referenced_model(&self) -> Option<&str> {
        match &self.kind {
            PropertyKind::Model(name) | PropertyKind::ListOfModels(name) => Some(name),
            _ => None,
        }
    }

    /// Declared type, as shown in type-mismatch messages
    pub fn type_name(&self) -> String {
        match &self.kind {
            PropertyKind::Simple(ty) => ty.kind().name().to_owned(),
            PropertyKind::Marshallable(binding) => binding.domain_kind().name().to_owned(),
            PropertyKind::Model(name) => name.clone(),
            PropertyKind::ListOfModels(name) => format!("list of {}", name),
        }
    }

    pub fn describe(&self) -> PropertyDescription {
        PropertyDescription {
            field: self.field.clone(),
            wire_key: self.wire_key().to_owned(),
            type_name: self.type_name(),
            simple: self.is_simple(),
            nullable: self.nullable,
            constraints: self.constraints.iter().map(Constraint::describe).collect(),
        }
    }

    // ==================
    // Validation
    // ==================

    /// Type check on a domain value.
    ///
    /// Simple properties need the exact kind. The other variants check that
    /// the value is an instance of the declared domain type, which differs
    /// from its wire form.
    pub fn check_type(&self, value: &Value) -> bool {
        match &self.kind {
            PropertyKind::Simple(ty) => value.kind() == ty.kind(),
            PropertyKind::Marshallable(binding) => value.kind() == binding.domain_kind(),
            PropertyKind::Model(name) => is_record_of(value, name),
            PropertyKind::ListOfModels(name) => match value {
                Value::List(items) => items.iter().all(|item| is_record_of(item, name)),
                _ => false,
            },
        }
    }

    /// Description of the first failed check, or `None` when valid.
    ///
    /// Null is valid on a nullable property unless a `NotNull` constraint is
    /// declared; other constraints are not evaluated against null.
    pub fn violation(&self, value: &Value) -> Option<String> {
        if value.is_null() {
            if !self.nullable {
                return Some(Constraint::NotNull.describe());
            }
            return self
                .constraints
                .iter()
                .find(|c| matches!(c, Constraint::NotNull))
                .map(Constraint::describe);
        }
        if !self.check_type(value) {
            return Some(format!("type {}", self.type_name()));
        }
        self.constraints
            .iter()
            .find(|c| !c.evaluate(value))
            .map(Constraint::describe)
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.violation(value).is_none()
    }

    // ==================
    // Conversion
    // ==================

    /// Wire to domain. Returns a new value; the input is never aliased.
    ///
    /// Null passes through untouched so validation can report it. Values
    /// that already have the declared domain type pass through model and
    /// list-of-models properties unchanged.
    pub fn convert(&self, scope: &Scope<'_>, value: Value) -> ModelResult<Value> {
        if value.is_null() {
            return Ok(value);
        }
        match &self.kind {
            PropertyKind::Simple(_) => Ok(value),
            PropertyKind::Marshallable(binding) => binding
                .resolve(scope.marshallers())?
                .unmarshall(&value)
                .map_err(|e| e.in_property(scope.model(), self.wire_key())),
            PropertyKind::Model(name) => {
                if self.check_type(&value) {
                    return Ok(value);
                }
                match value {
                    Value::Map(map) => scope
                        .load(name, &map)
                        .map(Value::Record)
                        .map_err(|e| e.at_key(self.wire_key())),
                    other => Err(self.structural_error(scope, &other, "type map")),
                }
            }
            PropertyKind::ListOfModels(name) => {
                if self.check_type(&value) {
                    return Ok(value);
                }
                let items = match value {
                    Value::List(items) => items,
                    other => return Err(self.structural_error(scope, &other, "type list")),
                };
                let mut loaded = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    let record = match item {
                        Value::Record(record) if record.model() == name => record,
                        Value::Map(map) => scope
                            .load(name, &map)
                            .map_err(|e| e.at_index(index).at_key(self.wire_key()))?,
                        other => {
                            return Err(self
                                .structural_error(scope, &other, "type map")
                                .at_index(index)
                                .at_key(self.wire_key()))
                        }
                    };
                    loaded.push(Value::Record(record));
                }
                Ok(Value::List(loaded))
            }
        }
    }

    /// Domain to wire; mirrors [`Property::convert`].
    pub fn to_wire(&self, scope: &Scope<'_>, value: Value) -> ModelResult<Value> {
        if value.is_null() {
            return Ok(value);
        }
        match &self.kind {
            PropertyKind::Simple(_) => Ok(value),
            PropertyKind::Marshallable(binding) => binding
                .resolve(scope.marshallers())?
                .marshall(&value)
                .map_err(|e| e.in_property(scope.model(), self.wire_key())),
            PropertyKind::Model(name) => match value {
                Value::Record(record) => scope
                    .dump(name, &record)
                    .map(Value::Map)
                    .map_err(|e| e.at_key(self.wire_key())),
                other => Err(self.structural_error(scope, &other, &format!("type {}", name))),
            },
            PropertyKind::ListOfModels(name) => {
                let items = match value {
                    Value::List(items) => items,
                    other => {
                        return Err(self.structural_error(scope, &other, &format!("type list of {}", name)))
                    }
                };
                let mut dumped = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let record = item.as_record().ok_or_else(|| {
                        self.structural_error(scope, item, &format!("type {}", name))
                            .at_index(index)
                            .at_key(self.wire_key())
                    })?;
                    let map = scope
                        .dump(name, record)
                        .map_err(|e| e.at_index(index).at_key(self.wire_key()))?;
                    dumped.push(Value::Map(map));
                }
                Ok(Value::List(dumped))
            }
        }
    }

    fn structural_error(&self, scope: &Scope<'_>, actual: &Value, constraint: &str) -> ModelError {
        ErrorKind::InvalidProperty {
            model: scope.model().to_owned(),
            property: self.wire_key().to_owned(),
            constraint: constraint.to_owned(),
            actual: actual.to_string(),
        }
        .into()
    }
}

fn is_record_of(value: &Value, model: &str) -> bool {
    matches!(value, Value::Record(record) if record.model() == model)
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("field", &self.field)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("constraints", &self.constraints)
            .field("nullable", &self.nullable)
            .field("getter", &self.getter.is_some())
            .field("setter", &self.setter.is_some())
            .finish()
    }
}
