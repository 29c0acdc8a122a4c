//! Path specifications and their resolution.
//!
//! A [`PathSpec`] is one path or an ordered list of paths, each of which may
//! contain `%name` placeholders. [`resolve`] turns a spec into concrete
//! candidates. `None` means "no input": callers treat it as a no-op rather
//! than an error.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::consts::NULL_PATH;
use crate::placeholder::{dedup_stable, expand};
use crate::vars::VarMap;

/// One path or a list of paths, possibly containing `%name` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSpec {
  Single(String),
  Many(Vec<String>),
}

impl PathSpec {
  /// True when the spec has nothing to resolve.
  pub fn is_empty(&self) -> bool {
    match self {
      PathSpec::Single(p) => p.is_empty(),
      PathSpec::Many(list) => list.is_empty(),
    }
  }

  /// True when the spec is a list of more than one path.
  pub fn is_many(&self) -> bool {
    matches!(self, PathSpec::Many(list) if list.len() > 1)
  }

  pub fn entries(&self) -> Vec<&str> {
    match self {
      PathSpec::Single(p) => vec![p.as_str()],
      PathSpec::Many(list) => list.iter().map(String::as_str).collect(),
    }
  }
}

impl std::fmt::Display for PathSpec {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      PathSpec::Single(p) => write!(f, "{p}"),
      PathSpec::Many(list) => write!(f, "[{}]", list.join(", ")),
    }
  }
}

impl From<&str> for PathSpec {
  fn from(path: &str) -> Self {
    PathSpec::Single(path.to_string())
  }
}

impl From<String> for PathSpec {
  fn from(path: String) -> Self {
    PathSpec::Single(path)
  }
}

impl From<&String> for PathSpec {
  fn from(path: &String) -> Self {
    PathSpec::Single(path.clone())
  }
}

impl From<Vec<&str>> for PathSpec {
  fn from(paths: Vec<&str>) -> Self {
    PathSpec::Many(paths.into_iter().map(str::to_string).collect())
  }
}

impl From<Vec<String>> for PathSpec {
  fn from(paths: Vec<String>) -> Self {
    PathSpec::Many(paths)
  }
}

/// Resolve a path specification against `vars`.
///
/// - An empty spec resolves to `None`.
/// - Each path is expanded with [`expand`]; results are flattened and
///   de-duplicated in first-seen order.
/// - `"null"` entries (produced by unset variables) and empty strings are
///   dropped. If nothing remains the result is `None`, never an empty list.
/// - With no variables the spec is returned as written.
pub fn resolve(spec: &PathSpec, vars: &VarMap) -> Option<Vec<String>> {
  if spec.is_empty() {
    return None;
  }

  let candidates = spec.entries().into_iter().flat_map(|path| {
    if vars.is_empty() {
      vec![path.to_string()]
    } else {
      expand(path, vars)
    }
  });

  let resolved: Vec<String> = dedup_stable(candidates)
    .into_iter()
    .filter(|p| !p.is_empty() && p != NULL_PATH)
    .collect();

  trace!(spec = %spec, resolved = ?resolved, "resolved path spec");

  if resolved.is_empty() { None } else { Some(resolved) }
}

/// Resolve and return the first concrete path.
pub fn resolve_first(spec: &PathSpec, vars: &VarMap) -> Option<String> {
  resolve(spec, vars).and_then(|paths| paths.into_iter().next())
}

/// True when the last path component has an extension (`app.js`, not `.vscode`).
pub fn has_extension(path: &str) -> bool {
  Path::new(path).extension().is_some()
}

/// The directory part of a path that names a file, or the path itself.
pub fn dir_of(path: &str) -> String {
  if !has_extension(path) {
    return path.to_string();
  }
  match Path::new(path).parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().to_string(),
    _ => ".".to_string(),
  }
}

/// The file name of a path that names a file explicitly.
pub fn explicit_file_name(path: &str) -> Option<String> {
  if !has_extension(path) {
    return None;
  }
  Path::new(path).file_name().map(|n| n.to_string_lossy().to_string())
}

/// Lexically normalize a path: drop `.` and fold `..` where possible.
pub fn normalize(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
        if can_pop {
          out.pop();
        } else {
          out.push("..");
        }
      }
      other => out.push(other.as_os_str()),
    }
  }
  out
}

/// Relative path leading from directory `from` to `to`, computed lexically.
///
/// Both paths should be of the same kind (both absolute or both relative to
/// the same base). Identical directories yield an empty string.
pub fn relative_path(from: &Path, to: &Path) -> String {
  let from = normalize(from);
  let to = normalize(to);
  let from: Vec<_> = from.components().collect();
  let to: Vec<_> = to.components().collect();

  let common = from.iter().zip(to.iter()).take_while(|(a, b)| a == b).count();

  let mut rel = PathBuf::new();
  for _ in common..from.len() {
    rel.push("..");
  }
  for component in &to[common..] {
    rel.push(component.as_os_str());
  }
  rel.to_string_lossy().replace('\\', "/")
}
