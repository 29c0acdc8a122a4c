//! Java classpath bookkeeping.
//!
//! Every dependency declared by a java entry (and every jar it produces) is
//! recorded once in a [`ClassPath`]. JSON merges see the whole set as
//! `%classPath` (sorted) and the editor-seeded part as `%vscClassPath`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{CLASSPATH_VAR, VSC_CLASSPATH_VAR};
use crate::path::normalize;
use crate::placeholder::expand_first;
use crate::vars::VarMap;

/// One classpath entry or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassPathSpec {
  One(String),
  Many(Vec<String>),
}

impl ClassPathSpec {
  pub fn into_vec(self) -> Vec<String> {
    match self {
      ClassPathSpec::One(path) => vec![path],
      ClassPathSpec::Many(paths) => paths,
    }
  }
}

impl From<&str> for ClassPathSpec {
  fn from(path: &str) -> Self {
    ClassPathSpec::One(path.to_string())
  }
}

impl From<Vec<&str>> for ClassPathSpec {
  fn from(paths: Vec<&str>) -> Self {
    ClassPathSpec::Many(paths.into_iter().map(str::to_string).collect())
  }
}

impl From<Vec<String>> for ClassPathSpec {
  fn from(paths: Vec<String>) -> Self {
    ClassPathSpec::Many(paths)
  }
}

/// Resolve a classpath entry to an absolute path.
///
/// Placeholders are expanded first (first candidate wins); a relative result
/// is then anchored at `prj`. An entry whose expansion is empty falls back to
/// its literal text.
pub fn resolve_entry(entry: &str, prj: &Path, vars: &VarMap) -> String {
  let expanded = expand_first(entry, vars).unwrap_or_else(|| entry.to_string());
  normalize(&prj.join(expanded)).to_string_lossy().to_string()
}

/// Resolve every entry of `spec`, keeping its shape.
pub fn resolve_classpath(spec: &ClassPathSpec, prj: &Path, vars: &VarMap) -> ClassPathSpec {
  match spec {
    ClassPathSpec::One(path) => ClassPathSpec::One(resolve_entry(path, prj, vars)),
    ClassPathSpec::Many(paths) => ClassPathSpec::Many(paths.iter().map(|p| resolve_entry(p, prj, vars)).collect()),
  }
}

/// Ordered set of resolved classpath entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassPath {
  editor: Vec<String>,
  entries: Vec<String>,
}

impl ClassPath {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record entries that came from the editor settings.
  ///
  /// They are also part of the full set.
  pub fn seed_from_editor(&mut self, paths: impl IntoIterator<Item = String>) {
    for path in paths {
      if !self.editor.contains(&path) {
        self.editor.push(path.clone());
      }
      self.add(path);
    }
  }

  /// Add one entry. Returns `false` if it was already present.
  pub fn add(&mut self, path: impl Into<String>) -> bool {
    let path = path.into();
    if self.entries.contains(&path) {
      return false;
    }
    debug!(path = %path, "add classpath entry");
    self.entries.push(path);
    true
  }

  /// Add several entries; returns how many were new.
  pub fn extend(&mut self, paths: impl IntoIterator<Item = String>) -> usize {
    paths.into_iter().filter(|p| self.add(p.clone())).count()
  }

  pub fn contains(&self, path: &str) -> bool {
    self.entries.iter().any(|p| p == path)
  }

  /// Entries in insertion order.
  pub fn entries(&self) -> &[String] {
    &self.entries
  }

  pub fn editor_entries(&self) -> &[String] {
    &self.editor
  }

  pub fn sorted(&self) -> Vec<String> {
    let mut sorted = self.entries.clone();
    sorted.sort();
    sorted
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// `%vscClassPath` and the sorted `%classPath`.
  pub fn vars(&self) -> VarMap {
    VarMap::new()
      .with(VSC_CLASSPATH_VAR, self.editor.clone())
      .with(CLASSPATH_VAR, self.sorted())
  }
}
