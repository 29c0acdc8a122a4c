//! Adapters for external transformation tools.
//!
//! Compilers, minifiers and the template engine are reached through narrow
//! traits. The build never implements a transformation itself: it hands
//! input files and an option bag to an adapter and gets output artifacts
//! back (or an error).
//!
//! [`Adapters::default`] wires command-line tools (`tsc`, `sass`, `javac` +
//! `jar`, `uglifyjs`, `uglifycss`, `html-minifier`) and the built-in
//! [`TeraRenderer`]. Tests and embedders swap in their own implementations.

pub mod command;
pub mod template;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::files::{Artifact, SourceFile};

pub use command::{CommandMinifier, JavacCompiler, SassCompiler, TscCompiler, ToolCommand, run_tool};
pub use template::TeraRenderer;

/// Errors reported by adapters.
#[derive(Debug, Error)]
pub enum AdapterError {
  /// The tool could not be started.
  #[error("failed to start {program}: {source}")]
  Spawn { program: String, source: std::io::Error },

  /// The tool ran and reported failure.
  #[error("{program} failed with exit code {code:?}: {stderr}")]
  ToolFailed {
    program: String,
    code: Option<i32>,
    stderr: String,
  },

  /// A template could not be loaded or rendered.
  #[error("template {template}: {message}")]
  Template { template: String, message: String },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("{0}")]
  Other(String),
}

/// Which compiler a content entry needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilerKind {
  Typescript,
  Scss,
  Java,
}

impl fmt::Display for CompilerKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CompilerKind::Typescript => f.write_str("typescript"),
      CompilerKind::Scss => f.write_str("scss"),
      CompilerKind::Java => f.write_str("java"),
    }
  }
}

/// Role of a compiler output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
  Script,
  Declaration,
  SourceMap,
  Style,
  Archive,
  Other,
}

impl ArtifactKind {
  /// Classify an output by file name.
  pub fn from_path(path: &Path) -> Self {
    let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    if name.ends_with(".d.ts") {
      return ArtifactKind::Declaration;
    }
    match path.extension().and_then(|e| e.to_str()) {
      Some("js") | Some("mjs") => ArtifactKind::Script,
      Some("map") => ArtifactKind::SourceMap,
      Some("css") => ArtifactKind::Style,
      Some("jar") | Some("zip") => ArtifactKind::Archive,
      _ => ArtifactKind::Other,
    }
  }
}

/// One compiler output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
  pub kind: ArtifactKind,
  pub file: Artifact,
}

/// Input of one compiler invocation.
#[derive(Debug, Clone, Default)]
pub struct CompileRequest {
  pub inputs: Vec<SourceFile>,
  /// Merged option bag, forwarded verbatim.
  pub options: Value,
  /// Bundle all output into this file name.
  pub output_name: Option<String>,
  pub class_path: Vec<String>,
  /// Source map options; `None` disables source maps.
  pub sourcemap: Option<Value>,
}

#[async_trait]
pub trait Compiler: Send + Sync {
  async fn compile(&self, request: CompileRequest) -> Result<Vec<CompiledArtifact>, AdapterError>;
}

/// Minifier input class, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinifyKind {
  Script,
  Style,
  Markup,
}

impl MinifyKind {
  pub fn from_path(path: &Path) -> Option<Self> {
    match path.extension().and_then(|e| e.to_str()) {
      Some("js") => Some(MinifyKind::Script),
      Some("css") => Some(MinifyKind::Style),
      Some("html") | Some("htm") => Some(MinifyKind::Markup),
      _ => None,
    }
  }
}

#[async_trait]
pub trait Minifier: Send + Sync {
  async fn minify(&self, kind: MinifyKind, artifact: Artifact) -> Result<Artifact, AdapterError>;
}

pub trait TemplateRenderer: Send + Sync {
  /// Render `template` with `data`; `search_path` lists the directories
  /// included or inherited templates are looked up in.
  fn render(&self, template: &Path, search_path: &[PathBuf], data: &Value) -> Result<String, AdapterError>;
}

/// The set of adapters a build runs with.
#[derive(Clone)]
pub struct Adapters {
  typescript: Arc<dyn Compiler>,
  scss: Arc<dyn Compiler>,
  java: Arc<dyn Compiler>,
  minifier: Option<Arc<dyn Minifier>>,
  templates: Arc<dyn TemplateRenderer>,
}

impl Default for Adapters {
  fn default() -> Self {
    Self {
      typescript: Arc::new(TscCompiler::default()),
      scss: Arc::new(SassCompiler::default()),
      java: Arc::new(JavacCompiler::default()),
      minifier: Some(Arc::new(CommandMinifier::default())),
      templates: Arc::new(TeraRenderer),
    }
  }
}

impl fmt::Debug for Adapters {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Adapters")
      .field("minifier", &self.minifier.is_some())
      .finish_non_exhaustive()
  }
}

impl Adapters {
  pub fn with_compiler(mut self, kind: CompilerKind, compiler: impl Compiler + 'static) -> Self {
    let compiler: Arc<dyn Compiler> = Arc::new(compiler);
    match kind {
      CompilerKind::Typescript => self.typescript = compiler,
      CompilerKind::Scss => self.scss = compiler,
      CompilerKind::Java => self.java = compiler,
    }
    self
  }

  pub fn with_minifier(mut self, minifier: impl Minifier + 'static) -> Self {
    self.minifier = Some(Arc::new(minifier));
    self
  }

  /// Copy content unchanged even when the build minifies.
  pub fn without_minifier(mut self) -> Self {
    self.minifier = None;
    self
  }

  pub fn with_template_renderer(mut self, renderer: impl TemplateRenderer + 'static) -> Self {
    self.templates = Arc::new(renderer);
    self
  }

  pub fn compiler(&self, kind: CompilerKind) -> &Arc<dyn Compiler> {
    match kind {
      CompilerKind::Typescript => &self.typescript,
      CompilerKind::Scss => &self.scss,
      CompilerKind::Java => &self.java,
    }
  }

  pub fn minifier(&self) -> Option<&Arc<dyn Minifier>> {
    self.minifier.as_ref()
  }

  pub fn templates(&self) -> &Arc<dyn TemplateRenderer> {
    &self.templates
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn artifact_kinds_by_name() {
    assert_eq!(ArtifactKind::from_path(Path::new("out/app.d.ts")), ArtifactKind::Declaration);
    assert_eq!(ArtifactKind::from_path(Path::new("out/app.js")), ArtifactKind::Script);
    assert_eq!(ArtifactKind::from_path(Path::new("out/app.js.map")), ArtifactKind::SourceMap);
    assert_eq!(ArtifactKind::from_path(Path::new("site.css")), ArtifactKind::Style);
    assert_eq!(ArtifactKind::from_path(Path::new("app.jar")), ArtifactKind::Archive);
    assert_eq!(ArtifactKind::from_path(Path::new("README")), ArtifactKind::Other);
  }

  #[test]
  fn minify_kind_by_extension() {
    assert_eq!(MinifyKind::from_path(Path::new("a.js")), Some(MinifyKind::Script));
    assert_eq!(MinifyKind::from_path(Path::new("a.css")), Some(MinifyKind::Style));
    assert_eq!(MinifyKind::from_path(Path::new("a.htm")), Some(MinifyKind::Markup));
    assert_eq!(MinifyKind::from_path(Path::new("a.png")), None);
  }

  #[test]
  fn minifier_can_be_removed() {
    let adapters = Adapters::default().without_minifier();
    assert!(adapters.minifier().is_none());
  }
}
