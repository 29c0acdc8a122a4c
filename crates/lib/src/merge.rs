//! JSON document merging.
//!
//! A merge starts from an optional `base` document, deep-merges every source
//! document in order and finally deep-merges `extend` on top. Objects merge
//! field-wise; any other value (including arrays) replaces what was there.
//! Filters then reshape the merged document.
//!
//! Inputs must be acyclic trees (always true for parsed JSON). Nesting deeper
//! than [`MAX_MERGE_DEPTH`] fails with [`MergeError::DepthExceeded`].

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, trace};

use crate::consts::{MAX_MERGE_DEPTH, SPLICE_PREFIX};
use crate::files::{FilesError, expand_sources};
use crate::path::{PathSpec, resolve};
use crate::placeholder::expand;
use crate::vars::VarMap;

/// Errors produced while loading or merging JSON documents.
#[derive(Debug, Error)]
pub enum MergeError {
  #[error("failed to parse JSON from {origin}: {message}")]
  Parse { origin: String, message: String },

  #[error("merge exceeded maximum nesting depth of {max}")]
  DepthExceeded { max: usize },

  #[error(transparent)]
  Files(#[from] FilesError),
}

/// Where the documents of a JSON merge come from.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonSource {
  /// An in-memory document.
  Literal(Value),
  /// Files located by a path spec; every resolved entry may be a glob.
  Path(PathSpec),
  /// Raw JSON text.
  Text(String),
}

impl JsonSource {
  /// Interpret a declarative value: strings and string lists are paths,
  /// anything else is a literal document.
  pub fn from_value(value: Value) -> Self {
    match value {
      Value::String(path) => JsonSource::Path(PathSpec::Single(path)),
      Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_string) => {
        let paths = items
          .into_iter()
          .filter_map(|v| v.as_str().map(str::to_string))
          .collect();
        JsonSource::Path(PathSpec::Many(paths))
      }
      other => JsonSource::Literal(other),
    }
  }

  /// The path spec of a file-based source.
  pub fn path(&self) -> Option<&PathSpec> {
    match self {
      JsonSource::Path(spec) => Some(spec),
      _ => None,
    }
  }
}

impl fmt::Display for JsonSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      JsonSource::Literal(_) => write!(f, "<literal>"),
      JsonSource::Path(spec) => write!(f, "{spec}"),
      JsonSource::Text(_) => write!(f, "<text>"),
    }
  }
}

impl From<Value> for JsonSource {
  fn from(value: Value) -> Self {
    JsonSource::Literal(value)
  }
}

impl From<&str> for JsonSource {
  fn from(path: &str) -> Self {
    JsonSource::Path(path.into())
  }
}

impl From<PathSpec> for JsonSource {
  fn from(spec: PathSpec) -> Self {
    JsonSource::Path(spec)
  }
}

/// Projection applied to the merged document.
pub type ProjectFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// A reshaping step applied after merging.
#[derive(Clone)]
pub enum JsonFilter {
  /// Arbitrary projection of the whole document.
  Project(ProjectFn),
  /// Keep only the named top-level fields. A name prefixed with `<` splices
  /// the fields of that nested object into the top level instead.
  Fields(Vec<String>),
}

impl JsonFilter {
  pub fn project(f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
    JsonFilter::Project(Arc::new(f))
  }

  pub fn fields<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    JsonFilter::Fields(names.into_iter().map(Into::into).collect())
  }

  /// Apply this filter. Non-object documents pass through a field filter.
  pub fn apply(&self, value: Value) -> Value {
    match self {
      JsonFilter::Project(f) => f(value),
      JsonFilter::Fields(names) => {
        let Value::Object(source) = value else {
          return value;
        };
        let mut out = Map::new();
        for name in names {
          if let Some(nested) = name.strip_prefix(SPLICE_PREFIX) {
            match source.get(nested) {
              Some(Value::Object(fields)) => {
                for (k, v) in fields {
                  out.insert(k.clone(), v.clone());
                }
              }
              Some(_) => debug!(field = %nested, "splice target is not an object"),
              None => {}
            }
          } else if let Some(v) = source.get(name) {
            out.insert(name.clone(), v.clone());
          }
        }
        Value::Object(out)
      }
    }
  }
}

impl fmt::Debug for JsonFilter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      JsonFilter::Project(_) => f.write_str("Project(..)"),
      JsonFilter::Fields(names) => f.debug_tuple("Fields").field(names).finish(),
    }
  }
}

/// Options of one merge.
///
/// Substitution is on by default.
#[derive(Debug, Clone)]
pub struct MergeOptions {
  pub base: Option<Value>,
  pub extend: Option<Value>,
  pub filter: Vec<JsonFilter>,
  /// Substitute `%name` references in string leaves of source documents.
  pub substitute_vars: bool,
}

impl Default for MergeOptions {
  fn default() -> Self {
    Self {
      base: None,
      extend: None,
      filter: Vec::new(),
      substitute_vars: true,
    }
  }
}

impl MergeOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn base(mut self, base: Value) -> Self {
    self.base = Some(base);
    self
  }

  pub fn extend(mut self, extend: Value) -> Self {
    self.extend = Some(extend);
    self
  }

  pub fn filter(mut self, filter: JsonFilter) -> Self {
    self.filter.push(filter);
    self
  }

  pub fn substitute_vars(mut self, on: bool) -> Self {
    self.substitute_vars = on;
    self
  }
}

/// One parsed input document and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
  pub origin: String,
  pub value: Value,
}

/// Parse JSON text, naming `origin` in the error.
pub fn parse_document(origin: &str, text: &str) -> Result<Value, MergeError> {
  serde_json::from_str(text).map_err(|e| MergeError::Parse {
    origin: origin.to_string(),
    message: e.to_string(),
  })
}

/// Resolve and parse the documents of `source`.
///
/// A file-based source that resolves to nothing, or whose patterns match no
/// files, yields no documents.
pub async fn load_sources(source: &JsonSource, vars: &VarMap) -> Result<Vec<SourceDocument>, MergeError> {
  match source {
    JsonSource::Literal(value) => Ok(vec![SourceDocument {
      origin: "<literal>".to_string(),
      value: value.clone(),
    }]),
    JsonSource::Text(text) => Ok(vec![SourceDocument {
      origin: "<text>".to_string(),
      value: parse_document("<text>", text)?,
    }]),
    JsonSource::Path(spec) => {
      let Some(patterns) = resolve(spec, vars) else {
        return Ok(Vec::new());
      };
      let mut docs = Vec::new();
      for file in expand_sources(&patterns)? {
        let origin = file.path.display().to_string();
        let text = tokio::fs::read_to_string(&file.path)
          .await
          .map_err(|source| FilesError::Read {
            path: file.path.clone(),
            source,
          })?;
        let value = parse_document(&origin, &text)?;
        docs.push(SourceDocument { origin, value });
      }
      Ok(docs)
    }
  }
}

/// Deep-merge `overlay` into `target`.
pub fn deep_merge(target: &mut Value, overlay: &Value) -> Result<(), MergeError> {
  merge_at(target, overlay, 0)
}

fn merge_at(target: &mut Value, overlay: &Value, depth: usize) -> Result<(), MergeError> {
  if depth > MAX_MERGE_DEPTH {
    return Err(MergeError::DepthExceeded { max: MAX_MERGE_DEPTH });
  }

  match (target, overlay) {
    (Value::Object(target), Value::Object(overlay)) => {
      for (key, value) in overlay {
        match target.get_mut(key) {
          Some(existing) if existing.is_object() && value.is_object() => {
            merge_at(existing, value, depth + 1)?;
          }
          _ => {
            target.insert(key.clone(), value.clone());
          }
        }
      }
    }
    (target, overlay) => *target = overlay.clone(),
  }
  Ok(())
}

/// Substitute `%name` references in every string leaf.
///
/// A leaf expanding to one candidate stays a string; several candidates
/// become an array; none becomes an empty array.
pub fn substitute_leaves(value: Value, vars: &VarMap) -> Value {
  match value {
    Value::String(s) => {
      let mut candidates = expand(&s, vars);
      if candidates.len() == 1 {
        Value::String(candidates.remove(0))
      } else {
        Value::Array(candidates.into_iter().map(Value::String).collect())
      }
    }
    Value::Array(items) => Value::Array(items.into_iter().map(|v| substitute_leaves(v, vars)).collect()),
    Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, substitute_leaves(v, vars))).collect()),
    other => other,
  }
}

/// Merge `docs` according to `options`.
///
/// Without a base the first document becomes the starting point, so merging a
/// single document with no options returns it unchanged.
pub fn merge(docs: &[SourceDocument], options: &MergeOptions, vars: &VarMap) -> Result<Value, MergeError> {
  let mut merged = options.base.clone().unwrap_or(Value::Null);

  for doc in docs {
    trace!(origin = %doc.origin, "merging document");
    if options.substitute_vars && !vars.is_empty() {
      deep_merge(&mut merged, &substitute_leaves(doc.value.clone(), vars))?;
    } else {
      deep_merge(&mut merged, &doc.value)?;
    }
  }

  if let Some(extend) = &options.extend {
    deep_merge(&mut merged, extend)?;
  }

  for filter in &options.filter {
    merged = filter.apply(merged);
  }

  Ok(merged)
}

/// Serialize a merged document: compact when minifying, two-space indented
/// otherwise.
pub fn render_json(value: &Value, minify: bool) -> String {
  let rendered = if minify {
    serde_json::to_string(value)
  } else {
    serde_json::to_string_pretty(value)
  };
  rendered.unwrap_or_else(|_| value.to_string())
}
