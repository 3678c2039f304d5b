//! Property constraints
//!
//! A constraint is a pure predicate applied after the type check. A
//! property evaluates its constraints in declaration order and reports the
//! first one that fails.

use std::fmt;
use std::sync::Arc;

use super::value::{compare, loosely_equal, Value};

/// Which ends of an interval are included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Boundary {
    /// `min < v < max`
    Open,
    /// `min <= v <= max`
    #[default]
    Closed,
    /// `min < v <= max`
    LeftOpen,
    /// `min <= v < max`
    RightOpen,
}

impl Boundary {
    fn lower_inclusive(self) -> bool {
        matches!(self, Boundary::Closed | Boundary::RightOpen)
    }

    fn upper_inclusive(self) -> bool {
        matches!(self, Boundary::Closed | Boundary::LeftOpen)
    }
}

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A single validity predicate
#[derive(Clone)]
pub enum Constraint {
    /// Fails iff the value is null
    NotNull,
    /// Fails iff the value is an empty string, list or map (or null)
    NotEmpty,
    /// Fails iff the value is falsy: zero, false, empty or null
    NonZero,
    /// Interval membership; an absent side is unconstrained
    InInterval {
        min: Option<Value>,
        max: Option<Value>,
        boundary: Boundary,
    },
    /// Set membership
    InSet(Vec<Value>),
    /// User predicate with a description for error messages
    Custom {
        description: String,
        predicate: Predicate,
    },
}

/// Members of an [`Constraint::InSet`]; a scalar becomes a one-element set.
#[derive(Debug, Clone, PartialEq)]
pub struct Members(Vec<Value>);

macro_rules! scalar_members {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Members {
                fn from(value: $t) -> Self {
                    Members(vec![Value::from(value)])
                }
            }
        )*
    };
}

scalar_members!(bool, i32, i64, f64, &str, String, Value);

impl<T: Into<Value>> From<Vec<T>> for Members {
    fn from(items: Vec<T>) -> Self {
        Members(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Members {
    fn from(items: [T; N]) -> Self {
        Members(items.into_iter().map(Into::into).collect())
    }
}

impl Constraint {
    /// Interval with explicit bounds and boundary mode
    pub fn interval(min: Option<Value>, max: Option<Value>, boundary: Boundary) -> Self {
        Constraint::InInterval { min, max, boundary }
    }

    /// Closed interval `[min, max]`
    pub fn between(min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Self::interval(Some(min.into()), Some(max.into()), Boundary::Closed)
    }

    /// `v >= min`
    pub fn at_least(min: impl Into<Value>) -> Self {
        Self::interval(Some(min.into()), None, Boundary::Closed)
    }

    /// `v <= max`
    pub fn at_most(max: impl Into<Value>) -> Self {
        Self::interval(None, Some(max.into()), Boundary::Closed)
    }

    /// Set membership; accepts a scalar, a `Vec` or an array
    pub fn in_set(members: impl Into<Members>) -> Self {
        Constraint::InSet(members.into().0)
    }

    pub fn custom<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Constraint::Custom {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluates the constraint. Total: incomparable values simply fail.
    pub fn evaluate(&self, value: &Value) -> bool {
        match self {
            Constraint::NotNull => !value.is_null(),
            Constraint::NotEmpty => match value {
                Value::Null => false,
                Value::Str(s) => !s.is_empty(),
                Value::List(items) => !items.is_empty(),
                Value::Map(map) => !map.is_empty(),
                _ => true,
            },
            Constraint::NonZero => value.is_truthy(),
            Constraint::InInterval { min, max, boundary } => {
                let lower = match min {
                    None => true,
                    Some(min) => match compare(min, value) {
                        Some(ord) if boundary.lower_inclusive() => ord.is_le(),
                        Some(ord) => ord.is_lt(),
                        None => false,
                    },
                };
                let upper = match max {
                    None => true,
                    Some(max) => match compare(value, max) {
                        Some(ord) if boundary.upper_inclusive() => ord.is_le(),
                        Some(ord) => ord.is_lt(),
                        None => false,
                    },
                };
                lower && upper
            }
            Constraint::InSet(members) => members.iter().any(|m| loosely_equal(m, value)),
            Constraint::Custom { predicate, .. } => predicate(value),
        }
    }

    /// Stable code, usable as a localization key
    pub fn code(&self) -> &'static str {
        match self {
            Constraint::NotNull => "NOT_NULL",
            Constraint::NotEmpty => "NOT_EMPTY",
            Constraint::NonZero => "NON_ZERO",
            Constraint::InInterval { .. } => "IN_INTERVAL",
            Constraint::InSet(_) => "IN_SET",
            Constraint::Custom { .. } => "CUSTOM",
        }
    }

    /// Human-readable description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Constraint::NotNull => "not null".into(),
            Constraint::NotEmpty => "not empty".into(),
            Constraint::NonZero => "non-zero".into(),
            Constraint::InInterval { min, max, boundary } => {
                let open = if min.is_some() && boundary.lower_inclusive() { '[' } else { '(' };
                let close = if max.is_some() && boundary.upper_inclusive() { ']' } else { ')' };
                let min = min.as_ref().map_or_else(|| "-inf".to_owned(), Value::to_string);
                let max = max.as_ref().map_or_else(|| "+inf".to_owned(), Value::to_string);
                format!("in interval {}{}, {}{}", open, min, max, close)
            }
            Constraint::InSet(members) => {
                let rendered: Vec<String> = members.iter().map(Value::to_string).collect();
                format!("in set {{{}}}", rendered.join(", "))
            }
            Constraint::Custom { description, .. } => description.clone(),
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constraint({})", self.describe())
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_closed_interval_includes_bounds() {
        let c = Constraint::interval(Some(1.into()), Some(10.into()), Boundary::Closed);
        assert!(c.evaluate(&Value::Int(1)));
        assert!(c.evaluate(&Value::Int(10)));
        assert!(!c.evaluate(&Value::Int(0)));
        assert!(!c.evaluate(&Value::Int(11)));
    }

    #[test]
    fn test_open_interval_excludes_bounds() {
        let c = Constraint::interval(Some(1.into()), Some(10.into()), Boundary::Open);
        assert!(!c.evaluate(&Value::Int(1)));
        assert!(!c.evaluate(&Value::Int(10)));
        for v in 2..=9 {
            assert!(c.evaluate(&Value::Int(v)));
        }
    }

    #[test]
    fn test_half_open_intervals() {
        let left = Constraint::interval(Some(1.into()), Some(10.into()), Boundary::LeftOpen);
        assert!(!left.evaluate(&Value::Int(1)));
        assert!(left.evaluate(&Value::Int(10)));

        let right = Constraint::interval(Some(1.into()), Some(10.into()), Boundary::RightOpen);
        assert!(right.evaluate(&Value::Int(1)));
        assert!(!right.evaluate(&Value::Int(10)));
    }

    #[test]
    fn test_absent_side_is_unconstrained() {
        let c = Constraint::at_least(0);
        assert!(c.evaluate(&Value::Int(i64::MAX)));
        assert!(!c.evaluate(&Value::Int(-1)));

        let unbounded = Constraint::interval(None, None, Boundary::Open);
        assert!(unbounded.evaluate(&Value::from("anything")));
    }

    #[test]
    fn test_interval_is_total_for_incomparable_values() {
        let c = Constraint::between(1, 10);
        assert!(!c.evaluate(&Value::from("5")));
        assert!(!c.evaluate(&Value::Null));
        assert!(c.evaluate(&Value::Float(5.5)));
    }

    #[test]
    fn test_set_membership() {
        let c = Constraint::in_set([1, 2, 3]);
        assert!(c.evaluate(&Value::Int(2)));
        assert!(!c.evaluate(&Value::Int(4)));
    }

    #[test]
    fn test_scalar_set_is_singleton() {
        let scalar = Constraint::in_set(5);
        let set = Constraint::in_set(vec![5]);
        for v in [4, 5, 6] {
            assert_eq!(scalar.evaluate(&Value::Int(v)), set.evaluate(&Value::Int(v)));
        }
        assert_eq!(scalar.describe(), "in set {5}");
    }

    #[test]
    fn test_not_empty_ignores_zero() {
        let c = Constraint::NotEmpty;
        assert!(c.evaluate(&Value::Int(0)));
        assert!(!c.evaluate(&Value::from("")));
        assert!(!c.evaluate(&Value::List(vec![])));
        assert!(c.evaluate(&Value::from("x")));
    }

    #[test]
    fn test_non_zero() {
        let c = Constraint::NonZero;
        assert!(!c.evaluate(&Value::Int(0)));
        assert!(!c.evaluate(&Value::Float(0.0)));
        assert!(c.evaluate(&Value::Int(3)));
    }

    #[test]
    fn test_not_null() {
        assert!(!Constraint::NotNull.evaluate(&Value::Null));
        assert!(Constraint::NotNull.evaluate(&Value::Bool(false)));
    }

    #[test]
    fn test_custom_predicate() {
        let c = Constraint::custom("an email address", |v| {
            v.as_str().is_some_and(|s| s.contains('@'))
        });
        assert!(c.evaluate(&Value::from("a@x.com")));
        assert!(!c.evaluate(&Value::from("nobody")));
        assert_eq!(c.describe(), "an email address");
        assert_eq!(c.code(), "CUSTOM");
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(Constraint::between(1, 10).describe(), "in interval [1, 10]");
        assert_eq!(
            Constraint::interval(Some(1.into()), Some(10.into()), Boundary::LeftOpen).describe(),
            "in interval (1, 10]"
        );
        assert_eq!(Constraint::at_least(0).describe(), "in interval [0, +inf)");
        assert_eq!(Constraint::in_set(["a", "b"]).describe(), "in set {\"a\", \"b\"}");
    }

    proptest! {
        #[test]
        fn closed_interval_matches_ordering(min in -1000i64..1000, span in 0i64..1000, v in -3000i64..3000) {
            let max = min + span;
            let c = Constraint::between(min, max);
            prop_assert_eq!(c.evaluate(&Value::Int(v)), min <= v && v <= max);
        }

        #[test]
        fn open_interval_matches_ordering(min in -1000i64..1000, span in 0i64..1000, v in -3000i64..3000) {
            let max = min + span;
            let c = Constraint::interval(Some(min.into()), Some(max.into()), Boundary::Open);
            prop_assert_eq!(c.evaluate(&Value::Int(v)), min < v && v < max);
        }
    }
}
