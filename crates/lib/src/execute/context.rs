//! The view of a build that handlers and custom tasks work with.

use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::Adapters;
use crate::classpath::ClassPath;
use crate::config::ConfigHandle;
use crate::path::{PathSpec, resolve, resolve_first};
use crate::vars::VarMap;

/// Shared state of a running build.
///
/// Cheap to clone. Variables are read from the live configuration on every
/// call, so an entry sees every configuration change made before it.
#[derive(Debug, Clone)]
pub struct BuildContext {
  config: ConfigHandle,
  class_path: Arc<ClassPath>,
  adapters: Arc<Adapters>,
}

impl BuildContext {
  pub fn new(config: ConfigHandle, class_path: ClassPath, adapters: Arc<Adapters>) -> Self {
    Self {
      config,
      class_path: Arc::new(class_path),
      adapters,
    }
  }

  pub fn config(&self) -> &ConfigHandle {
    &self.config
  }

  pub fn class_path(&self) -> &ClassPath {
    &self.class_path
  }

  pub fn adapters(&self) -> &Adapters {
    &self.adapters
  }

  /// Variables from the live configuration.
  pub fn vars(&self) -> VarMap {
    self.config.vars()
  }

  /// Configuration variables plus `%vscClassPath` and `%classPath`.
  pub fn json_vars(&self) -> VarMap {
    self.vars().overlay(&self.class_path.vars())
  }

  pub fn resolve(&self, spec: &PathSpec) -> Option<Vec<String>> {
    resolve(spec, &self.vars())
  }

  pub fn resolve_first(&self, spec: &PathSpec) -> Option<String> {
    resolve_first(spec, &self.vars())
  }

  pub fn prj(&self) -> PathBuf {
    self.config.read(|c| c.prj())
  }

  pub fn minify(&self) -> bool {
    self.config.read(|c| c.minify())
  }

  pub fn sourcemaps(&self) -> bool {
    self.config.read(|c| c.sourcemaps())
  }
}
