use rust_decimal::Decimal;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A single concrete parameter value.
///
/// Mixed integer/decimal/text parameters can coexist in one space, so each
/// value carries its own tag. Integer values stay integers end to end; they
/// are never widened to decimals during enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Number(Decimal),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

/// Declares the candidate values for one parameter axis.
///
/// Deserializes from either a plain list (`ma_fast = [10, 12, 15]`) or a
/// range table (`ma_slow = { start = 20, end = 50, step = 5 }`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterSpec {
    DiscreteInt(Vec<i64>),
    DiscreteDecimal(Vec<Decimal>),
    DiscreteText(Vec<String>),
    RangeInt { start: i64, end: i64, step: i64 },
    RangeDecimal { start: Decimal, end: Decimal, step: Decimal },
}

/// An ordered mapping from parameter name to [`ParameterSpec`].
///
/// Axis order is declaration order and is preserved through serde, so
/// enumeration order is deterministic for a given space definition.
/// Inserting an existing name replaces its spec in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSpace {
    axes: Vec<(String, ParameterSpec)>,
}

impl ParameterSpace {
    #[must_use]
    pub const fn new() -> Self {
        Self { axes: Vec::new() }
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: ParameterSpec) {
        let name = name.into();
        if let Some(slot) = self.axes.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = spec;
        } else {
            self.axes.push((name, spec));
        }
    }

    /// Builder-style insert, convenient for tests and fixtures.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.insert(name, spec);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterSpec)> {
        self.axes.iter().map(|(n, s)| (n.as_str(), s))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.axes.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }
}

impl Serialize for ParameterSpace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.axes.len()))?;
        for (name, spec) in &self.axes {
            map.serialize_entry(name, spec)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ParameterSpace {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpaceVisitor;

        impl<'de> Visitor<'de> for SpaceVisitor {
            type Value = ParameterSpace;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map of parameter name to spec")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut space = ParameterSpace::new();
                while let Some((name, spec)) = access.next_entry::<String, ParameterSpec>()? {
                    space.insert(name, spec);
                }
                Ok(space)
            }
        }

        deserializer.deserialize_map(SpaceVisitor)
    }
}

/// One concrete point in a parameter space: name -> value, one entry per axis.
///
/// The `BTreeMap` representation gives a stable serialized form, which makes
/// an assignment usable as the identity key for a backtest run.
pub type ParameterAssignment = BTreeMap<String, ParamValue>;
