//! Schema registry
//!
//! Schemas are registered once and never replaced. Nested model
//! references are checked at registration and resolved by name at
//! load/dump time, so schema graphs may be cyclic.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::errors::{ErrorKind, ModelError, ModelResult};
use super::model::Schema;

/// In-memory registry of immutable schemas, indexed by model name
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<String, Arc<Schema>>>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a single schema.
    ///
    /// Its model references must point at already registered schemas or at
    /// the schema itself.
    pub fn register(&self, schema: Schema) -> ModelResult<Arc<Schema>> {
        let mut registered = self.register_all(vec![schema])?;
        registered
            .pop()
            .ok_or_else(|| ModelError::new(ErrorKind::Internal("empty registration batch".into())))
    }

    /// Registers a batch of schemas atomically.
    ///
    /// References may point anywhere inside the batch, which is how mutually
    /// recursive schemas are declared. Either every schema is registered or
    /// none is.
    pub fn register_all(&self, batch: Vec<Schema>) -> ModelResult<Vec<Arc<Schema>>> {
        let mut schemas = self.schemas.write().map_err(|_| ModelError::lock_poisoned())?;

        let mut names = HashSet::new();
        for schema in &batch {
            if schemas.contains_key(schema.name()) || !names.insert(schema.name()) {
                return Err(ModelError::schema_definition(
                    schema.name(),
                    "model already registered; schemas are immutable",
                ));
            }
        }

        for schema in &batch {
            for (field, target) in schema.references() {
                if !names.contains(target) && !schemas.contains_key(target) {
                    return Err(ModelError::schema_definition(
                        schema.name(),
                        format!("property '{}' references unknown model '{}'", field, target),
                    ));
                }
            }
        }

        let mut registered = Vec::with_capacity(batch.len());
        for schema in batch {
            debug!(
                model = schema.name(),
                properties = schema.properties().len(),
                "registered schema"
            );
            let schema = Arc::new(schema);
            schemas.insert(schema.name().to_owned(), Arc::clone(&schema));
            registered.push(schema);
        }

        Ok(registered)
    }

    /// Gets a schema by model name
    pub fn get(&self, model: &str) -> ModelResult<Arc<Schema>> {
        let schemas = self.schemas.read().map_err(|_| ModelError::lock_poisoned())?;
        schemas
            .get(model)
            .cloned()
            .ok_or_else(|| ErrorKind::UnknownModel(model.to_owned()).into())
    }

    /// Checks if a model is registered
    pub fn contains(&self, model: &str) -> bool {
        self.schemas
            .read()
            .map(|schemas| schemas.contains_key(model))
            .unwrap_or(false)
    }

    /// Registered model names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .schemas
            .read()
            .map(|schemas| schemas.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.schemas.read().map(|schemas| schemas.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
