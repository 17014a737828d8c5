use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

use crate::{diff::ChangeKey, CanonicalizeError, ChangeList, DiffError, Number};

/// Signature of the functions a [`Callable`] wraps.
pub type CallableFn = dyn Fn(&[Value]) -> Value + Send + Sync;

/// A named, shareable function reference carried inside state values.
///
/// Two callables are equal only when they share the same underlying function
/// allocation; clones of a callable compare equal, separately constructed
/// callables never do.
///
/// ```
/// # use treesync_core::{Callable, Value};
/// let reset = Callable::new("reset", |_| Value::Null);
/// assert_eq!(reset, reset.clone());
/// assert_ne!(reset, Callable::new("reset", |_| Value::Null));
/// assert_eq!(reset.call(&[]), Value::Null);
/// ```
#[derive(Clone)]
pub struct Callable {
    name: Arc<str>,
    func: Arc<CallableFn>,
}

impl Callable {
    /// Wraps `func` under a diagnostic `name`.
    pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self { name: name.into(), func: Arc::new(func) }
    }

    /// Returns the name the callable was registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the wrapped function.
    pub fn call(&self, args: &[Value]) -> Value {
        (self.func)(args)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.func), Arc::as_ptr(&other.func))
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.name)
    }
}

/// Structural classification used for dispatch and error reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// The absent sentinel.
    Void,
    /// Null, booleans, numbers, strings and callables.
    Scalar,
    /// Ordered sequence.
    Sequence,
    /// Keyed mapping.
    Mapping,
}

impl Shape {
    /// Whether values of this shape contain other values.
    #[must_use]
    pub fn is_composite(self) -> bool {
        matches!(self, Self::Sequence | Self::Mapping)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("absent value"),
            Self::Scalar => f.write_str("scalar"),
            Self::Sequence => f.write_str("sequence"),
            Self::Mapping => f.write_str("mapping"),
        }
    }
}

/// Structured value: the currency of diffing and patching.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Sentinel representing the absence of a value.
    Void,
    /// `null`.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Finite number.
    Number(Number),
    /// String scalar.
    String(String),
    /// Ordered sequence. Elements are shared so unchanged subtrees can be
    /// reused across snapshots.
    Sequence(Vec<Arc<Value>>),
    /// Keyed mapping with deterministic key ordering.
    Mapping(BTreeMap<String, Arc<Value>>),
    /// Function reference, compared by identity.
    Callable(Callable),
}

impl Value {
    /// Parses a JSON string into a structured value.
    ///
    /// Blank input yields [`Value::Void`].
    ///
    /// ```
    /// # use treesync_core::Value;
    /// let value = Value::from_json_str("{\"hello\":\"world\"}")?;
    /// assert!(matches!(value, Value::Mapping(_)));
    /// assert_eq!(Value::from_json_str("  ")?, Value::Void);
    /// # Ok::<(), treesync_core::CanonicalizeError>(())
    /// ```
    pub fn from_json_str(input: &str) -> Result<Self, CanonicalizeError> {
        if input.trim().is_empty() {
            return Ok(Self::Void);
        }
        let value: JsonValue = serde_json::from_str(input)?;
        Self::from_json_value(value)
    }

    /// Parses a YAML string into a structured value.
    ///
    /// ```
    /// # use treesync_core::Value;
    /// let value = Value::from_yaml_str("---\nanswer: 42\n")?;
    /// assert!(matches!(value, Value::Mapping(_)));
    /// # Ok::<(), treesync_core::CanonicalizeError>(())
    /// ```
    pub fn from_yaml_str(input: &str) -> Result<Self, CanonicalizeError> {
        if input.trim().is_empty() {
            return Ok(Self::Void);
        }
        let value: YamlValue = serde_yaml::from_str(input)?;
        Self::from_yaml_value(value)
    }

    /// Converts a serde JSON value into a [`Value`].
    pub fn from_json_value(value: JsonValue) -> Result<Self, CanonicalizeError> {
        match value {
            JsonValue::Null => Ok(Self::Null),
            JsonValue::Bool(v) => Ok(Self::Bool(v)),
            JsonValue::Number(num) => {
                let text = num.to_string();
                let Some(as_f64) = num.as_f64() else {
                    return Err(CanonicalizeError::NumberOutOfRange { value: text });
                };
                Ok(Self::Number(Number::new(as_f64)?))
            }
            JsonValue::String(s) => Ok(Self::String(s)),
            JsonValue::Array(values) => {
                let mut items = Vec::with_capacity(values.len());
                for value in values {
                    items.push(Arc::new(Self::from_json_value(value)?));
                }
                Ok(Self::Sequence(items))
            }
            JsonValue::Object(map) => {
                let mut mapping = BTreeMap::new();
                for (key, value) in map {
                    mapping.insert(key, Arc::new(Self::from_json_value(value)?));
                }
                Ok(Self::Mapping(mapping))
            }
        }
    }

    fn from_yaml_value(value: YamlValue) -> Result<Self, CanonicalizeError> {
        match value {
            YamlValue::Null => Ok(Self::Null),
            YamlValue::Bool(v) => Ok(Self::Bool(v)),
            YamlValue::Number(num) => {
                if let Some(f) = num.as_f64() {
                    return Ok(Self::Number(Number::new(f)?));
                }
                Err(CanonicalizeError::NumberOutOfRange { value: num.to_string() })
            }
            YamlValue::String(s) => Ok(Self::String(s)),
            YamlValue::Sequence(seq) => {
                let mut items = Vec::with_capacity(seq.len());
                for value in seq {
                    items.push(Arc::new(Self::from_yaml_value(value)?));
                }
                Ok(Self::Sequence(items))
            }
            YamlValue::Mapping(map) => {
                let mut mapping = BTreeMap::new();
                for (key, value) in map {
                    let key = match key {
                        YamlValue::String(s) => s,
                        other => {
                            return Err(CanonicalizeError::NonStringYamlKey {
                                found: format!("{other:?}"),
                            });
                        }
                    };
                    mapping.insert(key, Arc::new(Self::from_yaml_value(value)?));
                }
                Ok(Self::Mapping(mapping))
            }
            YamlValue::Tagged(tagged) => {
                Err(CanonicalizeError::UnsupportedYamlTag { tag: tagged.tag.to_string() })
            }
        }
    }

    /// Converts the value into a serde JSON value when representable.
    ///
    /// Callable members of mappings are omitted, since they carry no data.
    /// Returns `None` for `Void` and for callables anywhere else.
    #[must_use]
    pub fn to_json_value(&self) -> Option<JsonValue> {
        match self {
            Self::Void | Self::Callable(_) => None,
            Self::Null => Some(JsonValue::Null),
            Self::Bool(v) => Some(JsonValue::Bool(*v)),
            Self::Number(n) => Some(JsonValue::Number(n.to_json_number())),
            Self::String(s) => Some(JsonValue::String(s.clone())),
            Self::Sequence(values) => {
                let mut result = Vec::with_capacity(values.len());
                for value in values {
                    result.push(value.to_json_value()?);
                }
                Some(JsonValue::Array(result))
            }
            Self::Mapping(map) => {
                let mut object = serde_json::Map::new();
                for (key, value) in map {
                    if value.is_callable() {
                        continue;
                    }
                    object.insert(key.clone(), value.to_json_value()?);
                }
                Some(JsonValue::Object(object))
            }
        }
    }

    /// Returns the structural shape of the value.
    ///
    /// ```
    /// # use treesync_core::{Shape, Value};
    /// assert_eq!(Value::from(1).shape(), Shape::Scalar);
    /// assert_eq!(Value::Sequence(vec![]).shape(), Shape::Sequence);
    /// assert_eq!(Value::Void.shape(), Shape::Void);
    /// ```
    #[must_use]
    pub fn shape(&self) -> Shape {
        match self {
            Self::Void => Shape::Void,
            Self::Null
            | Self::Bool(_)
            | Self::Number(_)
            | Self::String(_)
            | Self::Callable(_) => Shape::Scalar,
            Self::Sequence(_) => Shape::Sequence,
            Self::Mapping(_) => Shape::Mapping,
        }
    }

    /// Whether the value is a mapping or a sequence.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        self.shape().is_composite()
    }

    /// Whether the value is a function reference.
    #[must_use]
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Callable(_))
    }

    /// Looks up a direct child by mapping key or sequence index.
    ///
    /// ```
    /// # use treesync_core::{ChangeKey, Value};
    /// let value = Value::from_json_str("{\"foo\":[1,2]}")?;
    /// let foo = value.get(&ChangeKey::key("foo")).unwrap();
    /// assert_eq!(foo.get(&ChangeKey::Index(1)), Some(&Value::from(2)));
    /// assert_eq!(value.get(&ChangeKey::Index(0)), None);
    /// # Ok::<(), treesync_core::CanonicalizeError>(())
    /// ```
    #[must_use]
    pub fn get(&self, key: &ChangeKey) -> Option<&Value> {
        self.child(key).map(Arc::as_ref)
    }

    /// Like [`Value::get`], but returns the shared handle of the child.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use treesync_core::{ChangeKey, Value};
    /// let value = Value::from_json_str("{\"foo\":[1,2]}")?;
    /// let copy = value.clone();
    /// let key = ChangeKey::key("foo");
    /// assert!(Arc::ptr_eq(value.child(&key).unwrap(), copy.child(&key).unwrap()));
    /// # Ok::<(), treesync_core::CanonicalizeError>(())
    /// ```
    #[must_use]
    pub fn child(&self, key: &ChangeKey) -> Option<&Arc<Value>> {
        match (self, key) {
            (Self::Mapping(map), ChangeKey::Key(key)) => map.get(key),
            (Self::Sequence(items), ChangeKey::Index(index)) => items.get(*index),
            _ => None,
        }
    }

    /// Computes the one-level change list from `self` to `other`.
    ///
    /// ```
    /// # use treesync_core::Value;
    /// let old = Value::from_json_str("{\"foo\":1}")?;
    /// let new = Value::from_json_str("{\"foo\":2}")?;
    /// let changes = old.diff(&new)?;
    /// assert_eq!(changes.render(), "[[\"update\",\"foo\",2]]");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn diff(&self, other: &Self) -> Result<ChangeList, DiffError> {
        crate::diff::diff(self, other)
    }
}

impl TryFrom<JsonValue> for Value {
    type Error = CanonicalizeError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        Self::from_json_value(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Sequence(value.into_iter().map(Arc::new).collect())
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        value.into_iter().collect()
    }
}

impl From<Callable> for Value {
    fn from(value: Callable) -> Self {
        Self::Callable(value)
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::Mapping(iter.into_iter().map(|(key, value)| (key, Arc::new(value))).collect())
    }
}
