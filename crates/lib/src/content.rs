//! Build content entries.
//!
//! A build is an ordered list of [`BuildContent`] entries. Each variant
//! describes one kind of work: copying files, writing generated text,
//! rendering templates, merging JSON, updating the live configuration,
//! compiling sources or running a custom task. Entries are validated when
//! they are registered and never change afterwards.

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

use crate::execute::BuildContext;
use crate::merge::{JsonSource, MergeOptions};
use crate::path::{PathSpec, has_extension};
use crate::vars::VarMap;

/// Error type returned by custom tasks.
pub type CustomError = Box<dyn std::error::Error + Send + Sync>;

/// Produces file text from the build state at run time.
pub type TextFn = Arc<dyn Fn(&BuildContext) -> String + Send + Sync>;

/// Produces template data for one template file.
pub type DataFn = Arc<dyn Fn(&Path) -> Value + Send + Sync>;

/// A custom task. Completion of the returned future ends the entry.
pub type CustomTask = Arc<dyn Fn(BuildContext) -> BoxFuture<'static, Result<(), CustomError>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
  Static,
  File,
  Template,
  Json,
  Config,
  Typescript,
  Scss,
  Java,
  Custom,
}

impl fmt::Display for ContentKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ContentKind::Static => "static",
      ContentKind::File => "file",
      ContentKind::Template => "template",
      ContentKind::Json => "json",
      ContentKind::Config => "config",
      ContentKind::Typescript => "typescript",
      ContentKind::Scss => "scss",
      ContentKind::Java => "java",
      ContentKind::Custom => "custom",
    };
    f.write_str(name)
  }
}

/// Invalid content declarations, reported at registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
  #[error("{kind} content is missing required field '{field}'")]
  MissingField { kind: ContentKind, field: &'static str },

  #[error("{kind} content has invalid field '{field}': {reason}")]
  InvalidField {
    kind: ContentKind,
    field: &'static str,
    reason: String,
  },
}

/// Copy files as they are (minified when the build minifies).
#[derive(Debug, Clone, PartialEq)]
pub struct StaticContent {
  pub src: PathSpec,
  pub dest: PathSpec,
}

/// Text of a generated file.
#[derive(Clone)]
pub enum FileText {
  Literal(String),
  Generated(TextFn),
}

impl fmt::Debug for FileText {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FileText::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
      FileText::Generated(_) => f.write_str("Generated(..)"),
    }
  }
}

impl From<&str> for FileText {
  fn from(text: &str) -> Self {
    FileText::Literal(text.to_string())
  }
}

impl From<String> for FileText {
  fn from(text: String) -> Self {
    FileText::Literal(text)
  }
}

/// Write generated text to a named file in each destination.
#[derive(Debug, Clone)]
pub struct FileContent {
  pub content: FileText,
  pub filename: String,
  pub dest: PathSpec,
}

/// Data handed to the template renderer.
#[derive(Clone)]
pub enum TemplateData {
  Static(Value),
  PerFile(DataFn),
}

impl Default for TemplateData {
  fn default() -> Self {
    TemplateData::Static(Value::Object(Default::default()))
  }
}

impl fmt::Debug for TemplateData {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TemplateData::Static(value) => f.debug_tuple("Static").field(value).finish(),
      TemplateData::PerFile(_) => f.write_str("PerFile(..)"),
    }
  }
}

/// Render templates into HTML.
#[derive(Debug, Clone)]
pub struct TemplateContent {
  pub src: PathSpec,
  /// Template search path (includes and parents). Empty means the directory
  /// of each template.
  pub path: PathSpec,
  pub dest: PathSpec,
  pub data: TemplateData,
}

/// Merge JSON documents into a file.
#[derive(Debug, Clone)]
pub struct JsonContent {
  pub src: JsonSource,
  pub dest: PathSpec,
  pub merge: MergeOptions,
  /// Extra substitution variables layered over the build variables.
  pub vars: VarMap,
}

/// Merge JSON documents into the live configuration.
#[derive(Debug, Clone)]
pub struct ConfigContent {
  pub src: JsonSource,
  /// Replace this top-level property instead of merging into the root.
  pub property: Option<String>,
  pub merge: MergeOptions,
}

/// Compile TypeScript sources.
#[derive(Debug, Clone, PartialEq)]
pub struct TypescriptContent {
  pub src: PathSpec,
  /// Script destination: an explicit `.js` file bundles, a directory keeps
  /// one output per input.
  pub js: String,
  /// Declaration destination; enables declaration output.
  pub dts: Option<String>,
  /// Overrides of the default source map options.
  pub sourcemap: Option<Value>,
  pub options: Option<Value>,
}

/// Compile SCSS sources.
#[derive(Debug, Clone, PartialEq)]
pub struct ScssContent {
  pub src: PathSpec,
  pub css: String,
  pub sourcemap: Option<Value>,
  pub options: Option<Value>,
}

/// Compile java sources into a jar.
#[derive(Debug, Clone, PartialEq)]
pub struct JavaContent {
  pub src: PathSpec,
  pub jar: String,
  /// Resolved classpath the sources compile against.
  pub class_path: Vec<String>,
  pub options: Option<Value>,
}

/// A named custom task.
#[derive(Clone)]
pub struct CustomContent {
  pub name: String,
  task: CustomTask,
}

impl CustomContent {
  pub fn new<F, Fut>(name: impl Into<String>, task: F) -> Self
  where
    F: Fn(BuildContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CustomError>> + Send + 'static,
  {
    Self {
      name: name.into(),
      task: Arc::new(move |ctx| task(ctx).boxed()),
    }
  }

  /// Start the task.
  pub fn start(&self, ctx: BuildContext) -> BoxFuture<'static, Result<(), CustomError>> {
    (self.task)(ctx)
  }
}

impl fmt::Debug for CustomContent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CustomContent").field("name", &self.name).finish_non_exhaustive()
  }
}

/// One unit of build work.
#[derive(Debug, Clone)]
pub enum BuildContent {
  Static(StaticContent),
  File(FileContent),
  Template(TemplateContent),
  Json(JsonContent),
  Config(ConfigContent),
  Typescript(TypescriptContent),
  Scss(ScssContent),
  Java(JavaContent),
  Custom(CustomContent),
}

impl BuildContent {
  pub fn kind(&self) -> ContentKind {
    match self {
      BuildContent::Static(_) => ContentKind::Static,
      BuildContent::File(_) => ContentKind::File,
      BuildContent::Template(_) => ContentKind::Template,
      BuildContent::Json(_) => ContentKind::Json,
      BuildContent::Config(_) => ContentKind::Config,
      BuildContent::Typescript(_) => ContentKind::Typescript,
      BuildContent::Scss(_) => ContentKind::Scss,
      BuildContent::Java(_) => ContentKind::Java,
      BuildContent::Custom(_) => ContentKind::Custom,
    }
  }

  /// Short description used in logs and reports.
  pub fn label(&self) -> String {
    match self {
      BuildContent::Static(c) => format!("{} -> {}", c.src, c.dest),
      BuildContent::File(c) => format!("{} -> {}", c.filename, c.dest),
      BuildContent::Template(c) => format!("{} -> {}", c.src, c.dest),
      BuildContent::Json(c) => format!("{} -> {}", c.src, c.dest),
      BuildContent::Config(c) => match &c.property {
        Some(property) => format!("{} -> config.{property}", c.src),
        None => format!("{} -> config", c.src),
      },
      BuildContent::Typescript(c) => format!("{} -> {}", c.src, c.js),
      BuildContent::Scss(c) => format!("{} -> {}", c.src, c.css),
      BuildContent::Java(c) => format!("{} -> {}", c.src, c.jar),
      BuildContent::Custom(c) => c.name.clone(),
    }
  }

  /// Check the declaration for missing or malformed fields.
  pub fn validate(&self) -> Result<(), ContentError> {
    let kind = self.kind();
    let missing = |field| ContentError::MissingField { kind, field };

    match self {
      BuildContent::Static(c) => {
        require_spec(&c.src, || missing("src"))?;
        require_spec(&c.dest, || missing("dest"))?;
      }
      BuildContent::File(c) => {
        require_str(&c.filename, || missing("filename"))?;
        require_spec(&c.dest, || missing("dest"))?;
      }
      BuildContent::Template(c) => {
        require_spec(&c.src, || missing("src"))?;
        require_spec(&c.dest, || missing("dest"))?;
      }
      BuildContent::Json(c) => {
        require_source(&c.src, || missing("src"))?;
        require_spec(&c.dest, || missing("dest"))?;
      }
      BuildContent::Config(c) => {
        require_source(&c.src, || missing("src"))?;
        if c.property.as_deref() == Some("") {
          return Err(ContentError::InvalidField {
            kind,
            field: "property",
            reason: "property name is empty".to_string(),
          });
        }
      }
      BuildContent::Typescript(c) => {
        require_spec(&c.src, || missing("src"))?;
        require_str(&c.js, || missing("js"))?;
        if c.dts.as_deref() == Some("") {
          return Err(missing("dts"));
        }
        require_object(kind, "options", c.options.as_ref())?;
        require_object(kind, "sourcemap", c.sourcemap.as_ref())?;
      }
      BuildContent::Scss(c) => {
        require_spec(&c.src, || missing("src"))?;
        require_str(&c.css, || missing("css"))?;
        require_object(kind, "options", c.options.as_ref())?;
        require_object(kind, "sourcemap", c.sourcemap.as_ref())?;
      }
      BuildContent::Java(c) => {
        require_spec(&c.src, || missing("src"))?;
        require_str(&c.jar, || missing("jar"))?;
        if !has_extension(&c.jar) {
          return Err(ContentError::InvalidField {
            kind,
            field: "jar",
            reason: format!("'{}' does not name an archive file", c.jar),
          });
        }
        require_object(kind, "options", c.options.as_ref())?;
      }
      BuildContent::Custom(c) => {
        require_str(&c.name, || missing("name"))?;
      }
    }
    Ok(())
  }
}

fn require_spec(spec: &PathSpec, err: impl FnOnce() -> ContentError) -> Result<(), ContentError> {
  if spec.is_empty() || spec.entries().iter().all(|p| p.is_empty()) {
    return Err(err());
  }
  Ok(())
}

fn require_str(value: &str, err: impl FnOnce() -> ContentError) -> Result<(), ContentError> {
  if value.is_empty() { Err(err()) } else { Ok(()) }
}

fn require_source(source: &JsonSource, err: impl FnOnce() -> ContentError) -> Result<(), ContentError> {
  match source {
    JsonSource::Path(spec) => require_spec(spec, err),
    JsonSource::Text(text) if text.trim().is_empty() => Err(err()),
    _ => Ok(()),
  }
}

fn require_object(kind: ContentKind, field: &'static str, value: Option<&Value>) -> Result<(), ContentError> {
  match value {
    None | Some(Value::Object(_)) => Ok(()),
    Some(other) => Err(ContentError::InvalidField {
      kind,
      field,
      reason: format!("expected an object, got {other}"),
    }),
  }
}

/// Ordered, append-only list of validated entries.
#[derive(Debug, Clone, Default)]
pub struct ContentRegistry {
  entries: Vec<BuildContent>,
}

impl ContentRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Validate and append an entry.
  pub fn push(&mut self, entry: BuildContent) -> Result<(), ContentError> {
    entry.validate()?;
    self.entries.push(entry);
    Ok(())
  }

  pub fn entries(&self) -> &[BuildContent] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
