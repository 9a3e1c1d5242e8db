//! Parameter spaces, combinations and range-based search space definitions.

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::ops::Index;

use crate::errors::InvalidArgument;
use crate::invalid_argument;

/// A concrete parameter value for dynamically typed spaces.
///
/// Integers are tried before floats so that `1` stays an `Int` after a JSON
/// round trip; integers above `i64::MAX` land in `UInt` rather than losing
/// precision as a float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Json(serde_json::Value),
}

impl ParameterValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Json(v) => v.as_f64(),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for ParameterValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<serde_json::Value> for ParameterValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

// ---------------------------------------------------------------------------
// Parameter space
// ---------------------------------------------------------------------------

/// Ordered mapping from parameter name to its candidate values.
///
/// Insertion order is the enumeration order of the grid: the first parameter
/// varies slowest, the last one fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpace<V = ParameterValue> {
    parameters: Vec<(String, Vec<V>)>,
}

impl<V> ParameterSpace<V> {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn add(mut self, name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        self.insert(name, values);
        self
    }

    /// Set the candidates for `name`. An existing parameter keeps its
    /// position and has its candidates replaced.
    pub fn insert(&mut self, name: impl Into<String>, values: impl IntoIterator<Item = V>) {
        let name = name.into();
        let values: Vec<V> = values.into_iter().collect();
        match self.parameters.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = values,
            None => self.parameters.push((name, values)),
        }
    }

    /// Number of parameters (not combinations).
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|(name, _)| name.as_str())
    }

    pub fn candidates(&self, name: &str) -> Option<&[V]> {
        self.parameters
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[V])> {
        self.parameters
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Total number of combinations, or `None` if it overflows `usize`.
    ///
    /// A parameter with no candidates makes the whole product empty; a space
    /// with no parameters has exactly one (empty) combination.
    pub fn grid_size(&self) -> Option<usize> {
        if self.parameters.iter().any(|(_, values)| values.is_empty()) {
            return Some(0);
        }
        self.parameters
            .iter()
            .try_fold(1usize, |total, (_, values)| total.checked_mul(values.len()))
    }
}

impl<V> ParameterSpace<V>
where
    V: for<'de> Deserialize<'de>,
{
    /// Parse a JSON object of the form `{"name": [candidates...]}`, keeping
    /// the key order of the document.
    pub fn from_json_str(text: &str) -> Result<Self, InvalidArgument> {
        serde_json::from_str(text)
            .map_err(|e| invalid_argument!("malformed parameter space: {e}"))
    }
}

impl<V> Default for ParameterSpace<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Serialize> Serialize for ParameterSpace<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.parameters.len()))?;
        for (name, values) in &self.parameters {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for ParameterSpace<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = deserializer.deserialize_map(EntriesVisitor::<Vec<V>>::new(
            "an object mapping parameter names to candidate arrays",
        ))?;
        Ok(ParameterSpace {
            parameters: entries,
        })
    }
}

// ---------------------------------------------------------------------------
// Combination
// ---------------------------------------------------------------------------

/// One value chosen for every parameter of a [`ParameterSpace`], in the
/// space's parameter order.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination<V = ParameterValue> {
    entries: Vec<(String, V)>,
}

impl<V> Combination<V> {
    pub fn from_entries(entries: Vec<(String, V)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn into_entries(self) -> Vec<(String, V)> {
        self.entries
    }

    /// True when this combination assigns exactly the parameters of `space`.
    pub fn matches<W>(&self, space: &ParameterSpace<W>) -> bool {
        self.len() == space.len() && self.names().zip(space.names()).all(|(a, b)| a == b)
    }
}

impl<V> Index<&str> for Combination<V> {
    type Output = V;

    fn index(&self, name: &str) -> &V {
        match self.get(name) {
            Some(value) => value,
            None => panic!("combination has no parameter `{name}`"),
        }
    }
}

impl<V: fmt::Display> fmt::Display for Combination<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str("}")
    }
}

impl<V: Serialize> Serialize for Combination<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Combination<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = deserializer
            .deserialize_map(EntriesVisitor::<V>::new("an object mapping parameter names to values"))?;
        Ok(Combination::from_entries(entries))
    }
}

/// Collects map entries in document order, rejecting repeated names.
struct EntriesVisitor<T> {
    expecting: &'static str,
    marker: PhantomData<T>,
}

impl<T> EntriesVisitor<T> {
    fn new(expecting: &'static str) -> Self {
        Self {
            expecting,
            marker: PhantomData,
        }
    }
}

impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
    type Value = Vec<(String, T)>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.expecting)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries: Vec<(String, T)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((name, value)) = map.next_entry::<String, T>()? {
            if entries.iter().any(|(earlier, _)| *earlier == name) {
                return Err(de::Error::custom(format!("duplicate parameter `{name}`")));
            }
            entries.push((name, value));
        }
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Range-based search space
// ---------------------------------------------------------------------------

/// Upper bound on the grid points a single range may produce.
pub const MAX_RANGE_POINTS: usize = 1 << 20;

/// How one dimension of a [`SearchSpace`] turns into grid points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Range {
    /// Evenly spaced floats on `[low, high]`, endpoints included.
    Linear { low: f64, high: f64 },
    /// Evenly spaced in log-space, for scale parameters such as learning rates.
    Log { low: f64, high: f64 },
    /// Every integer in `[low, high]`.
    Integers { low: i64, high: i64 },
    /// Explicit candidates, used as given.
    Choice { values: Vec<serde_json::Value> },
}

impl Range {
    fn check(&self, name: &str) -> Result<(), InvalidArgument> {
        match self {
            Self::Linear { low, high } if !(low.is_finite() && high.is_finite() && low <= high) => {
                Err(invalid_argument!("`{name}`: bad linear range [{low}, {high}]"))
            }
            Self::Log { low, high } if !(*low > 0.0 && high.is_finite() && low <= high) => {
                Err(invalid_argument!("`{name}`: log range [{low}, {high}] must be positive"))
            }
            Self::Integers { low, high } => {
                let width = i128::from(*high) - i128::from(*low) + 1;
                if width < 1 {
                    Err(invalid_argument!("`{name}`: bad integer range [{low}, {high}]"))
                } else if width > MAX_RANGE_POINTS as i128 {
                    Err(invalid_argument!(
                        "`{name}`: integer range [{low}, {high}] has {width} points, limit is {MAX_RANGE_POINTS}"
                    ))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    /// Grid points for this range; continuous ranges get `steps` of them.
    fn points(&self, steps: usize) -> Vec<ParameterValue> {
        match self {
            Self::Linear { low, high } => spaced(*low, *high, steps)
                .map(ParameterValue::Float)
                .collect(),
            Self::Log { low, high } => spaced(low.ln(), high.ln(), steps)
                .map(|x| ParameterValue::Float(x.exp()))
                .collect(),
            Self::Integers { low, high } => (*low..=*high).map(ParameterValue::Int).collect(),
            Self::Choice { values } => values.iter().cloned().map(ParameterValue::Json).collect(),
        }
    }
}

/// `steps` points from `from` to `to`, both ends included. `steps >= 2`.
fn spaced(from: f64, to: f64, steps: usize) -> impl Iterator<Item = f64> {
    let last = (steps - 1) as f64;
    (0..steps).map(move |i| from + (to - from) * (i as f64 / last))
}

/// A named [`Range`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    #[serde(flatten)]
    pub range: Range,
}

/// Range definitions that discretize into a [`ParameterSpace`].
///
/// JSON form: `{"dimensions": [{"name": "lr", "kind": "log", "low": 1e-4, "high": 1e-1}]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub dimensions: Vec<Dimension>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, range: Range) -> Self {
        self.dimensions.push(Dimension {
            name: name.into(),
            range,
        });
        self
    }

    pub fn linear(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.with(name, Range::Linear { low, high })
    }

    pub fn log(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.with(name, Range::Log { low, high })
    }

    pub fn integers(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.with(name, Range::Integers { low, high })
    }

    pub fn choice(self, name: impl Into<String>, values: Vec<serde_json::Value>) -> Self {
        self.with(name, Range::Choice { values })
    }

    pub fn validate(&self) -> Result<(), InvalidArgument> {
        for (i, dim) in self.dimensions.iter().enumerate() {
            if self.dimensions[..i].iter().any(|earlier| earlier.name == dim.name) {
                return Err(invalid_argument!("duplicate parameter `{}`", dim.name));
            }
            dim.range.check(&dim.name)?;
        }
        Ok(())
    }

    /// Expand every dimension into its grid points. Continuous dimensions
    /// get `steps` points, raised to 2 so both endpoints are present.
    pub fn discretize(&self, steps: usize) -> Result<ParameterSpace, InvalidArgument> {
        self.validate()?;
        if steps > MAX_RANGE_POINTS {
            return Err(invalid_argument!(
                "{steps} steps per range exceeds the limit of {MAX_RANGE_POINTS}"
            ));
        }
        let steps = steps.max(2);

        Ok(self.dimensions.iter().fold(ParameterSpace::new(), |space, dim| {
            space.add(dim.name.clone(), dim.range.points(steps))
        }))
    }
}
