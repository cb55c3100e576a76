//! Canonical hashable key for join and group-by lookups.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::Value;

/// Hashable, totally ordered projection of a [`Value`].
///
/// Floats are stored as normalized bits: `-0.0` folds to `0.0`, every NaN
/// folds to one canonical NaN, and integral floats become `Int` so that
/// `1` and `1.0` land in the same bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(String),
    Bytes(Vec<u8>),
    Date(i32),
    Timestamp(i64),
}

impl KeyValue {
    /// Build the canonical key for a value.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Int64(i) => Self::Int(*i),
            Value::Float64(f) => Self::from_f64(*f),
            Value::String(s) => Self::Str(s.clone()),
            Value::Binary(b) => Self::Bytes(b.clone()),
            Value::Date(d) => Self::Date(*d),
            Value::Timestamp(t) => Self::Timestamp(*t),
        }
    }

    fn from_f64(f: f64) -> Self {
        if f.is_nan() {
            return Self::Float(f64::NAN.to_bits());
        }
        if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
            return Self::Int(f as i64);
        }
        Self::Float(f.to_bits())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert back to a runtime value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Int64(*i),
            Self::Float(bits) => Value::Float64(f64::from_bits(*bits)),
            Self::Str(s) => Value::String(s.clone()),
            Self::Bytes(b) => Value::Binary(b.clone()),
            Self::Date(d) => Value::Date(*d),
            Self::Timestamp(t) => Value::Timestamp(*t),
        }
    }
}

impl From<&Value> for KeyValue {
    fn from(value: &Value) -> Self {
        Self::from_value(value)
    }
}

/// Composite key over several columns.
///
/// A composite key containing a null never matches in an equi-join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CompositeKey(pub Vec<KeyValue>);

impl CompositeKey {
    /// Extract the key at the given column indices.
    pub fn extract(values: &[Value], indices: &[usize]) -> Self {
        Self(
            indices
                .iter()
                .map(|&i| values.get(i).map_or(KeyValue::Null, KeyValue::from_value))
                .collect(),
        )
    }

    pub fn has_null(&self) -> bool {
        self.0.iter().any(KeyValue::is_null)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0.iter().map(KeyValue::to_value).collect()
    }
}

impl PartialOrd for CompositeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CompositeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_integral_float_joins_int() {
        assert_eq!(
            KeyValue::from_value(&Value::Float64(1.0)),
            KeyValue::from_value(&Value::Int64(1))
        );
        assert_ne!(
            KeyValue::from_value(&Value::Float64(1.5)),
            KeyValue::from_value(&Value::Int64(1))
        );
    }

    #[test]
    fn test_negative_zero_and_nan_normalize() {
        assert_eq!(
            KeyValue::from_value(&Value::Float64(-0.0)),
            KeyValue::from_value(&Value::Float64(0.0))
        );
        let a = KeyValue::from_value(&Value::Float64(f64::NAN));
        let b = KeyValue::from_value(&Value::Float64(-f64::NAN));
        assert_eq!(a, b);
    }

    #[test]
    fn test_composite_key_hashing() {
        let row = vec![Value::Int64(1), Value::from("x"), Value::Null];
        let k1 = CompositeKey::extract(&row, &[0, 1]);
        let k2 = CompositeKey::extract(&[Value::Float64(1.0), Value::from("x")], &[0, 1]);

        let mut set = HashSet::new();
        set.insert(k1);
        assert!(set.contains(&k2));

        assert!(CompositeKey::extract(&row, &[2]).has_null());
        assert!(!CompositeKey::extract(&row, &[0]).has_null());
    }
}
