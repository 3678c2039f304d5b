//! Declarative object schemas
//!
//! A model is a named, ordered set of typed, constrained properties. It
//! loads wire maps (parsed JSON-like payloads) into domain records and
//! dumps records back into wire maps.
//!
//! # Design Principles
//!
//! - Schemas are declared explicitly and frozen at registration
//! - Nested models are referenced by name and resolved lazily
//! - Marshallers are type-keyed singletons, built on first use
//! - Load and dump are pure: inputs are never mutated
//! - Properties are processed in declaration order; the first failure aborts

mod constraint;
mod errors;
mod marshaller;
mod model;
mod property;
mod registry;
mod typed;
mod value;

pub use constraint::{Boundary, Constraint, Members};
pub use errors::{ErrorKind, ModelError, ModelResult, PathSegment};
pub use marshaller::{
    compile_pattern, format_error, IsoDateTime, Marshaller, MarshallerRegistry, SlashDateTime,
    TimestampFormat, TimestampMarshaller,
};
pub use model::{Schema, SchemaBuilder, SchemaDescription, Scope};
pub use property::{
    Getter, MarshallerBinding, Property, PropertyDescription, PropertyKind, Setter, SimpleType,
};
pub use registry::SchemaRegistry;
pub use typed::{ApiModel, FromValue};
pub use value::{compare, loosely_equal, wire_map_from_json, Record, Value, ValueKind, WireMap};
