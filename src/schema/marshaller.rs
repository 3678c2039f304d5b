//! Marshallers and their registry
//!
//! A marshaller converts one kind of domain value to and from its wire
//! form. Marshallers are stateless and keyed by type: the registry holds at
//! most one instance per marshaller type and builds it on first use.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use chrono::NaiveDateTime;
use tracing::debug;

use super::errors::{ErrorKind, ModelError, ModelResult};
use super::value::{Value, ValueKind};

/// Converter between a domain value and its wire representation
pub trait Marshaller: Send + Sync + 'static {
    /// Kind of value produced by `unmarshall`
    fn domain_kind() -> ValueKind
    where
        Self: Sized;

    /// Short name used in errors and logs
    fn name(&self) -> &'static str;

    /// Domain to wire
    fn marshall(&self, value: &Value) -> ModelResult<Value>;

    /// Wire to domain
    fn unmarshall(&self, value: &Value) -> ModelResult<Value>;
}

/// Creates a format error for a marshaller
pub fn format_error(marshaller: &str, input: &Value, reason: impl Into<String>) -> ModelError {
    ErrorKind::Format {
        model: String::new(),
        property: String::new(),
        marshaller: marshaller.to_owned(),
        input: input.to_string(),
        reason: reason.into(),
    }
    .into()
}

type Instance = Arc<dyn Any + Send + Sync>;

/// Lazily populated, type-keyed marshaller cache
#[derive(Default)]
pub struct MarshallerRegistry {
    instances: RwLock<HashMap<TypeId, Instance>>,
}

impl MarshallerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the instance for `M`, constructing it on first use.
    ///
    /// Repeated calls return the same `Arc`. Concurrent first calls race on
    /// the write lock and only the winner constructs.
    pub fn get<M: Marshaller + Default>(&self) -> ModelResult<Arc<M>> {
        let key = TypeId::of::<M>();

        {
            let instances = self.instances.read().map_err(|_| ModelError::lock_poisoned())?;
            if let Some(existing) = instances.get(&key) {
                return downcast::<M>(Arc::clone(existing));
            }
        }

        let mut instances = self.instances.write().map_err(|_| ModelError::lock_poisoned())?;
        let entry = instances.entry(key).or_insert_with(|| {
            let marshaller = M::default();
            debug!(marshaller = marshaller.name(), "instantiated marshaller");
            Arc::new(marshaller)
        });
        downcast::<M>(Arc::clone(entry))
    }

    /// Evicts the instance for `M`. Returns whether one was cached.
    pub fn remove<M: Marshaller>(&self) -> ModelResult<bool> {
        let mut instances = self.instances.write().map_err(|_| ModelError::lock_poisoned())?;
        let removed = instances.remove(&TypeId::of::<M>()).is_some();
        if removed {
            debug!(marshaller = std::any::type_name::<M>(), "evicted marshaller");
        }
        Ok(removed)
    }

    /// Checks whether an instance for `M` is cached
    pub fn contains<M: Marshaller>(&self) -> bool {
        self.instances
            .read()
            .map(|instances| instances.contains_key(&TypeId::of::<M>()))
            .unwrap_or(false)
    }

    /// Number of cached instances
    pub fn len(&self) -> usize {
        self.instances.read().map(|instances| instances.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for MarshallerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarshallerRegistry")
            .field("cached", &self.len())
            .finish()
    }
}

fn downcast<M: Marshaller>(instance: Instance) -> ModelResult<Arc<M>> {
    instance.downcast::<M>().map_err(|_| {
        ModelError::new(ErrorKind::Internal(format!(
            "marshaller registry entry for {} has the wrong type",
            std::any::type_name::<M>()
        )))
    })
}

// =============================================================================
// Timestamps
// =============================================================================

/// Compile-time timestamp pattern.
///
/// Patterns use a compact notation: `Y` year, `M` month, `d` day, `H` hour,
/// `m` minute, `s` second. Every other character is literal.
pub trait TimestampFormat: Send + Sync + 'static {
    const PATTERN: &'static str;
}

/// `2024/01/02 03:04:05`
#[derive(Debug, Clone, Copy)]
pub struct SlashDateTime;

impl TimestampFormat for SlashDateTime {
    const PATTERN: &'static str = "Y/M/d H:m:s";
}

/// `2024-01-02T03:04:05`
#[derive(Debug, Clone, Copy)]
pub struct IsoDateTime;

impl TimestampFormat for IsoDateTime {
    const PATTERN: &'static str = "Y-M-dTH:m:s";
}

/// Translates a compact pattern into a chrono format string.
pub fn compile_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        match c {
            'Y' => out.push_str("%Y"),
            'M' => out.push_str("%m"),
            'd' => out.push_str("%d"),
            'H' => out.push_str("%H"),
            'm' => out.push_str("%M"),
            's' => out.push_str("%S"),
            '%' => out.push_str("%%"),
            other => out.push(other),
        }
    }
    out
}

/// Timestamp marshaller for the pattern of `F`.
///
/// Sub-second precision is not part of any pattern and is lost on marshall.
pub struct TimestampMarshaller<F: TimestampFormat> {
    format: String,
    _format: PhantomData<fn() -> F>,
}

impl<F: TimestampFormat> TimestampMarshaller<F> {
    /// The compiled chrono format
    pub fn format(&self) -> &str {
        &self.format
    }
}

impl<F: TimestampFormat> Default for TimestampMarshaller<F> {
    fn default() -> Self {
        Self {
            format: compile_pattern(F::PATTERN),
            _format: PhantomData,
        }
    }
}

impl<F: TimestampFormat> fmt::Debug for TimestampMarshaller<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimestampMarshaller")
            .field("pattern", &F::PATTERN)
            .finish()
    }
}

impl<F: TimestampFormat> Marshaller for TimestampMarshaller<F> {
    fn domain_kind() -> ValueKind {
        ValueKind::Timestamp
    }

    fn name(&self) -> &'static str {
        "timestamp"
    }

    fn marshall(&self, value: &Value) -> ModelResult<Value> {
        match value {
            Value::Timestamp(ts) => Ok(Value::Str(ts.format(&self.format).to_string())),
            other => Err(format_error(
                self.name(),
                other,
                format!("expected a timestamp, got {}", other.kind()),
            )),
        }
    }

    fn unmarshall(&self, value: &Value) -> ModelResult<Value> {
        match value {
            Value::Str(s) => NaiveDateTime::parse_from_str(s, &self.format)
                .map(Value::Timestamp)
                .map_err(|e| {
                    format_error(
                        self.name(),
                        value,
                        format!("does not match pattern '{}': {}", F::PATTERN, e),
                    )
                }),
            other => Err(format_error(
                self.name(),
                other,
                format!("expected a string, got {}", other.kind()),
            )),
        }
    }
}
