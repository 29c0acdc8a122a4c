//! Build declaration and execution.
//!
//! A [`Build`] accumulates content entries in declaration order and runs
//! them with [`Build::run`]. Every build owns a handle to its configuration;
//! builds of a [`BuildSeries`] share one handle, so configuration changes made
//! by one build are seen by the builds after it.
//!
//! # Submodules
//!
//! - [`series`] - Sequences of builds over one configuration

pub mod series;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::adapters::Adapters;
use crate::classpath::{ClassPath, ClassPathSpec, resolve_classpath, resolve_entry};
use crate::config::{BuildConfig, BuildEnv, ConfigHandle};
use crate::content::{
  BuildContent, ConfigContent, ContentError, ContentRegistry, CustomContent, CustomError, FileContent, FileText,
  JavaContent, JsonContent, ScssContent, StaticContent, TemplateContent, TemplateData, TypescriptContent,
};
use crate::execute::{BuildContext, BuildError, RunReport, run_entries};
use crate::merge::{JsonSource, MergeOptions};
use crate::path::{PathSpec, resolve, resolve_first};
use crate::placeholder::dedup_stable;
use crate::settings::{EditorSettings, parse_json_lenient};
use crate::vars::VarMap;

pub use series::BuildSeries;

/// An ordered set of content entries plus the configuration they run with.
#[derive(Debug)]
pub struct Build {
  config: ConfigHandle,
  registry: ContentRegistry,
  class_path: ClassPath,
  settings: Option<EditorSettings>,
  adapters: Arc<Adapters>,
}

impl Build {
  /// Create a build from the process environment and `overrides`.
  ///
  /// `overrides` must be a JSON object (or `null`); it is deep-merged over
  /// the defaults.
  pub fn new(overrides: Value) -> Result<Self, BuildError> {
    Self::with_env(overrides, &BuildEnv::from_env())
  }

  pub fn with_env(overrides: Value, env: &BuildEnv) -> Result<Self, BuildError> {
    let config = initial_config(overrides, env)?;
    Self::attach(ConfigHandle::new(config), Arc::new(Adapters::default()))
  }

  /// Create a build over an existing configuration handle.
  ///
  /// Reads the editor settings of the configured project and seeds the
  /// classpath from them.
  pub(crate) fn attach(config: ConfigHandle, adapters: Arc<Adapters>) -> Result<Self, BuildError> {
    let prj = config.read(|c| c.prj());
    let settings = EditorSettings::load(&prj)?;

    let mut class_path = ClassPath::new();
    if let Some(settings) = &settings {
      let vars = config.vars();
      let seeded: Vec<String> = settings
        .class_path()
        .iter()
        .map(|entry| resolve_entry(entry, &prj, &vars))
        .collect();
      if !seeded.is_empty() {
        info!(entries = ?seeded, "add editor classpath");
      }
      class_path.seed_from_editor(seeded);
    }

    Ok(Self {
      config,
      registry: ContentRegistry::new(),
      class_path,
      settings,
      adapters,
    })
  }

  /// Replace the external tool adapters.
  pub fn with_adapters(mut self, adapters: Adapters) -> Self {
    self.adapters = Arc::new(adapters);
    self
  }

  pub fn config(&self) -> &ConfigHandle {
    &self.config
  }

  pub(crate) fn adapters(&self) -> &Arc<Adapters> {
    &self.adapters
  }

  /// Variables of the live configuration.
  pub fn vars(&self) -> VarMap {
    self.config.vars()
  }

  /// Variables available to JSON substitution, classpath included.
  pub fn json_vars(&self) -> VarMap {
    self.vars().overlay(&self.class_path.vars())
  }

  pub fn class_path(&self) -> &ClassPath {
    &self.class_path
  }

  /// Editor settings read at construction, if the project has any.
  pub fn settings(&self) -> Option<&EditorSettings> {
    self.settings.as_ref()
  }

  pub fn entries(&self) -> &[BuildContent] {
    self.registry.entries()
  }

  /// Copy files matching `src` into every destination.
  pub fn add_static(
    &mut self,
    src: impl Into<PathSpec>,
    dest: impl Into<PathSpec>,
  ) -> Result<&mut Self, ContentError> {
    self.add_entry(BuildContent::Static(StaticContent {
      src: src.into(),
      dest: dest.into(),
    }))
  }

  /// Write `content` as `filename` into every destination.
  pub fn add_file(
    &mut self,
    content: impl Into<FileText>,
    filename: impl Into<String>,
    dest: impl Into<PathSpec>,
  ) -> Result<&mut Self, ContentError> {
    self.add_entry(BuildContent::File(FileContent {
      content: content.into(),
      filename: filename.into(),
      dest: dest.into(),
    }))
  }

  /// Render templates matching `src`, looking up includes in `path`.
  pub fn add_tpl(
    &mut self,
    src: impl Into<PathSpec>,
    path: impl Into<PathSpec>,
    dest: impl Into<PathSpec>,
    data: TemplateData,
  ) -> Result<&mut Self, ContentError> {
    self.add_entry(BuildContent::Template(TemplateContent {
      src: src.into(),
      path: path.into(),
      dest: dest.into(),
      data,
    }))
  }

  /// Merge JSON documents into `dest`.
  pub fn add_json(
    &mut self,
    src: impl Into<JsonSource>,
    dest: impl Into<PathSpec>,
    merge: MergeOptions,
  ) -> Result<&mut Self, ContentError> {
    self.add_json_with_vars(src, dest, merge, VarMap::new())
  }

  /// Like [`Build::add_json`], with extra substitution variables.
  pub fn add_json_with_vars(
    &mut self,
    src: impl Into<JsonSource>,
    dest: impl Into<PathSpec>,
    merge: MergeOptions,
    vars: VarMap,
  ) -> Result<&mut Self, ContentError> {
    self.add_entry(BuildContent::Json(JsonContent {
      src: src.into(),
      dest: dest.into(),
      merge,
      vars,
    }))
  }

  /// Merge JSON documents into the live configuration when the entry runs.
  ///
  /// With `property`, the result replaces that top-level property instead.
  pub fn add_config(
    &mut self,
    src: impl Into<JsonSource>,
    property: Option<&str>,
    merge: MergeOptions,
  ) -> Result<&mut Self, ContentError> {
    self.add_entry(BuildContent::Config(ConfigContent {
      src: src.into(),
      property: property.map(str::to_string),
      merge,
    }))
  }

  pub fn add_ts(
    &mut self,
    src: impl Into<PathSpec>,
    js: impl Into<String>,
    dts: Option<&str>,
    sourcemap: Option<Value>,
    options: Option<Value>,
  ) -> Result<&mut Self, ContentError> {
    self.add_entry(BuildContent::Typescript(TypescriptContent {
      src: src.into(),
      js: js.into(),
      dts: dts.map(str::to_string),
      sourcemap,
      options,
    }))
  }

  pub fn add_scss(
    &mut self,
    src: impl Into<PathSpec>,
    css: impl Into<String>,
    sourcemap: Option<Value>,
    options: Option<Value>,
  ) -> Result<&mut Self, ContentError> {
    self.add_entry(BuildContent::Scss(ScssContent {
      src: src.into(),
      css: css.into(),
      sourcemap,
      options,
    }))
  }

  /// Compile java sources into `jar`.
  ///
  /// The entry compiles against the editor classpath plus `class_path`.
  /// Both the dependencies and the jar itself join the build classpath.
  pub fn add_java(
    &mut self,
    src: impl Into<PathSpec>,
    jar: impl Into<String>,
    class_path: Option<ClassPathSpec>,
    options: Option<Value>,
  ) -> Result<&mut Self, ContentError> {
    let jar = jar.into();
    let prj = self.config.read(|c| c.prj());
    let vars = self.vars();
    let deps = class_path
      .map(|spec| resolve_classpath(&spec, &prj, &vars).into_vec())
      .unwrap_or_default();

    let compile_path = dedup_stable(self.class_path.editor_entries().iter().chain(&deps).cloned());

    self.registry.push(BuildContent::Java(JavaContent {
      src: src.into(),
      jar: jar.clone(),
      class_path: compile_path,
      options,
    }))?;

    let resolved_jar = resolve_entry(&jar, &prj, &vars);
    info!(jar = %resolved_jar, "add classpath");
    self.class_path.add(resolved_jar);
    if !deps.is_empty() {
      info!(entries = ?deps, "add classpath");
      self.class_path.extend(deps);
    }
    Ok(self)
  }

  /// Run `task` with the build context when the entry is reached.
  pub fn add_custom<F, Fut>(&mut self, name: impl Into<String>, task: F) -> Result<&mut Self, ContentError>
  where
    F: Fn(BuildContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CustomError>> + Send + 'static,
  {
    self.add_entry(BuildContent::Custom(CustomContent::new(name, task)))
  }

  /// Append a pre-built entry.
  pub fn add_entry(&mut self, entry: BuildContent) -> Result<&mut Self, ContentError> {
    self.registry.push(entry)?;
    Ok(self)
  }

  /// Resolve `spec` against the current variables.
  pub fn resolve(&self, spec: impl Into<PathSpec>) -> Option<Vec<String>> {
    resolve(&spec.into(), &self.vars())
  }

  pub fn resolve_first(&self, spec: impl Into<PathSpec>) -> Option<String> {
    resolve_first(&spec.into(), &self.vars())
  }

  /// Read the file `path` resolves to.
  pub fn read(&self, path: &str) -> Result<String, BuildError> {
    let resolved = self
      .resolve_first(path)
      .ok_or_else(|| BuildError::InvalidConfig(format!("path '{path}' resolves to nothing")))?;
    Ok(std::fs::read_to_string(PathBuf::from(resolved))?)
  }

  /// Read a JSON file, tolerating comments and trailing commas.
  pub fn read_json(&self, path: &str) -> Result<Value, BuildError> {
    let text = self.read(path)?;
    parse_json_lenient(&text).map_err(|e| BuildError::InvalidConfig(format!("'{path}' is not valid JSON: {e}")))
  }

  /// Run every entry in declaration order.
  ///
  /// Stops at the first failing entry and returns its error; outputs written
  /// by earlier entries stay on disk.
  pub async fn run(&self) -> Result<RunReport, BuildError> {
    let ctx = BuildContext::new(self.config.clone(), self.class_path.clone(), Arc::clone(&self.adapters));
    run_entries(self.registry.entries(), &ctx).await
  }
}

/// Defaults from `env` with `overrides` merged on top.
pub(crate) fn initial_config(overrides: Value, env: &BuildEnv) -> Result<BuildConfig, BuildError> {
  let cwd = dunce::canonicalize(std::env::current_dir()?)?;
  let mut config = BuildConfig::defaults(env, &cwd);
  match &overrides {
    Value::Null => {}
    Value::Object(_) => config.merge(&overrides)?,
    other => {
      return Err(BuildError::InvalidConfig(format!(
        "build overrides must be a JSON object, got {other}"
      )));
    }
  }
  Ok(config)
}
