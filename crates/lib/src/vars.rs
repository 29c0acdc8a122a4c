//! Variable mappings used for `%name` substitution.
//!
//! A [`VarMap`] keeps its keys in insertion order. Substitution walks the keys
//! in that order, so the order is part of the observable behavior whenever one
//! key is a prefix of another (`%prj` vs `%prjDir`).

use indexmap::IndexMap;
use serde_json::Value;

use crate::consts::NULL_PATH;

/// The value bound to a variable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarValue {
  /// A single replacement value.
  Scalar(String),
  /// Several replacement values; each one yields a separate candidate.
  List(Vec<String>),
}

impl VarValue {
  /// All replacement values, in order.
  pub fn values(&self) -> &[String] {
    match self {
      VarValue::Scalar(s) => std::slice::from_ref(s),
      VarValue::List(list) => list,
    }
  }

  /// Convert a JSON value into a variable value.
  ///
  /// Strings are taken as-is, numbers and booleans are stringified and `null`
  /// becomes the literal `"null"` (which later degrades a path to "absent").
  /// Arrays become lists of their scalar elements. Objects are not variables.
  pub fn from_json(value: &Value) -> Option<Self> {
    match value {
      Value::Array(items) => Some(VarValue::List(items.iter().filter_map(scalar_to_string).collect())),
      Value::Object(_) => None,
      other => scalar_to_string(other).map(VarValue::Scalar),
    }
  }
}

fn scalar_to_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    Value::Null => Some(NULL_PATH.to_string()),
    Value::Array(_) | Value::Object(_) => None,
  }
}

impl From<&str> for VarValue {
  fn from(value: &str) -> Self {
    VarValue::Scalar(value.to_string())
  }
}

impl From<String> for VarValue {
  fn from(value: String) -> Self {
    VarValue::Scalar(value)
  }
}

impl From<Vec<String>> for VarValue {
  fn from(values: Vec<String>) -> Self {
    VarValue::List(values)
  }
}

impl From<Vec<&str>> for VarValue {
  fn from(values: Vec<&str>) -> Self {
    VarValue::List(values.into_iter().map(str::to_string).collect())
  }
}

/// Insertion-ordered mapping from variable name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarMap(IndexMap<String, VarValue>);

impl VarMap {
  pub fn new() -> Self {
    Self(IndexMap::new())
  }

  /// Bind `name`, replacing any previous value in place.
  pub fn insert(&mut self, name: impl Into<String>, value: impl Into<VarValue>) -> Option<VarValue> {
    self.0.insert(name.into(), value.into())
  }

  /// Builder-style [`VarMap::insert`].
  pub fn with(mut self, name: impl Into<String>, value: impl Into<VarValue>) -> Self {
    self.insert(name, value);
    self
  }

  pub fn get(&self, name: &str) -> Option<&VarValue> {
    self.0.get(name)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &VarValue)> {
    self.0.iter()
  }

  /// A new map with `overlay`'s bindings applied on top of this one.
  pub fn overlay(&self, overlay: &VarMap) -> VarMap {
    let mut merged = self.clone();
    for (name, value) in overlay.iter() {
      merged.insert(name.clone(), value.clone());
    }
    merged
  }

  /// Collect the variables of a JSON object (one per top-level key).
  ///
  /// Non-object values produce an empty map.
  pub fn from_json_object(value: &Value) -> VarMap {
    let mut vars = VarMap::new();
    if let Value::Object(map) = value {
      for (key, value) in map {
        if let Some(v) = VarValue::from_json(value) {
          vars.insert(key.clone(), v);
        }
      }
    }
    vars
  }
}

impl<K: Into<String>, V: Into<VarValue>> FromIterator<(K, V)> for VarMap {
  fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
    let mut vars = VarMap::new();
    for (k, v) in iter {
      vars.insert(k, v);
    }
    vars
  }
}
