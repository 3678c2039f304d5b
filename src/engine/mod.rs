//! Engine context
//!
//! The engine owns the configuration, the schema registry and the
//! marshaller registry. Construct it once at startup and share it (it is
//! `Send + Sync`); every load and dump goes through it.

mod config;

pub use config::EngineConfig;

use std::sync::Arc;

use serde_json::Value as Json;
use tracing::trace;

use crate::schema::{
    wire_map_from_json, ApiModel, ErrorKind, MarshallerRegistry, ModelResult, Record, Schema,
    SchemaRegistry, Scope, Value, WireMap,
};

/// Owner of schemas, marshallers and limits
#[derive(Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    schemas: SchemaRegistry,
    marshallers: MarshallerRegistry,
}

impl Engine {
    /// Create an engine with no registered schemas
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            schemas: SchemaRegistry::new(),
            marshallers: MarshallerRegistry::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn marshallers(&self) -> &MarshallerRegistry {
        &self.marshallers
    }

    /// Top-level scope for driving a [`Schema`] directly
    pub fn scope(&self) -> Scope<'_> {
        Scope::new(
            &self.schemas,
            &self.marshallers,
            self.config.max_depth,
            self.config.reject_unknown_keys,
        )
    }

    // ==================
    // Registration
    // ==================

    pub fn register(&self, schema: Schema) -> ModelResult<Arc<Schema>> {
        self.schemas.register(schema)
    }

    pub fn register_all(&self, schemas: Vec<Schema>) -> ModelResult<Vec<Arc<Schema>>> {
        self.schemas.register_all(schemas)
    }

    /// Registers the schema declared by `M`
    pub fn register_model<M: ApiModel>(&self) -> ModelResult<Arc<Schema>> {
        self.schemas.register(M::schema()?)
    }

    pub fn schema(&self, model: &str) -> ModelResult<Arc<Schema>> {
        self.schemas.get(model)
    }

    // ==================
    // Load / dump
    // ==================

    /// Loads a wire map into a record of `model`
    pub fn load(&self, model: &str, wire: &WireMap) -> ModelResult<Record> {
        trace!(model, keys = wire.len(), "load");
        self.scope().load(model, wire)
    }

    /// Dumps a record of `model` into a wire map
    pub fn dump(&self, model: &str, record: &Record) -> ModelResult<WireMap> {
        trace!(model, "dump");
        self.scope().dump(model, record)
    }

    /// Loads a parsed JSON object
    pub fn load_json(&self, model: &str, json: &Json) -> ModelResult<Record> {
        match json {
            Json::Object(map) => self.load(model, &wire_map_from_json(map.clone())),
            other => Err(ErrorKind::Conversion {
                field: "$root".into(),
                expected: "map".into(),
                found: Value::from(other.clone()).kind().name().into(),
            }
            .into()),
        }
    }

    /// Dumps a record into a JSON object
    pub fn dump_json(&self, model: &str, record: &Record) -> ModelResult<Json> {
        let wire = self.dump(model, record)?;
        Ok(Value::Map(wire).to_json())
    }

    /// Loads a wire map into a typed model
    pub fn load_model<M: ApiModel>(&self, wire: &WireMap) -> ModelResult<M> {
        M::from_record(self.load(M::NAME, wire)?)
    }

    /// Dumps a typed model into a wire map
    pub fn dump_model<M: ApiModel>(&self, model: &M) -> ModelResult<WireMap> {
        self.dump(M::NAME, &model.to_record())
    }
}
