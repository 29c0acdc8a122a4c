//! Test utilities for webuild-lib.
//!
//! Builds run contexts over temporary projects and provides adapter fakes
//! that stand in for external tools.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::adapters::{
  AdapterError, Adapters, ArtifactKind, CompileRequest, CompiledArtifact, Compiler, Minifier, MinifyKind,
};
use crate::classpath::ClassPath;
use crate::config::{BuildConfig, ConfigHandle};
use crate::execute::{BuildContext, Operation, Outcome};
use crate::files::Artifact;

/// A context for a project rooted at `prj`, with `extra` merged into the
/// configuration.
pub fn context(prj: &Path, extra: Value, adapters: Adapters) -> BuildContext {
  let mut config = BuildConfig::from_value(json!({
    "prj": prj.to_string_lossy(),
    "minify": false,
    "sourcemaps": false,
  }))
  .unwrap();
  config.merge(&extra).unwrap();
  BuildContext::new(ConfigHandle::new(config), ClassPath::new(), Arc::new(adapters))
}

/// Await a task operation, failing the test on an empty operation or error.
pub async fn run_op(op: Operation) -> Outcome {
  match op {
    Operation::Task(task) => task.await.unwrap(),
    Operation::Empty { reason } => panic!("unexpected empty operation: {reason}"),
  }
}

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write(root: &Path, rel: &str, contents: &str) {
  let path = root.join(rel);
  std::fs::create_dir_all(path.parent().unwrap()).unwrap();
  std::fs::write(path, contents).unwrap();
}

pub fn read(root: &Path, rel: &str) -> String {
  std::fs::read_to_string(root.join(rel)).unwrap()
}

/// Minifier that upper-cases content.
pub struct UpperMinifier;

#[async_trait]
impl Minifier for UpperMinifier {
  async fn minify(&self, _kind: MinifyKind, artifact: Artifact) -> Result<Artifact, AdapterError> {
    let text = String::from_utf8_lossy(&artifact.contents).to_uppercase();
    Ok(Artifact {
      contents: text.into_bytes(),
      ..artifact
    })
  }
}

/// Compiler that records its requests and returns canned artifacts.
#[derive(Clone, Default)]
pub struct RecordingCompiler {
  pub requests: Arc<Mutex<Vec<CompileRequest>>>,
  pub outputs: Vec<(&'static str, &'static str)>,
  pub fail: bool,
}

impl RecordingCompiler {
  pub fn returning(outputs: Vec<(&'static str, &'static str)>) -> Self {
    Self {
      outputs,
      ..Default::default()
    }
  }

  pub fn failing() -> Self {
    Self {
      fail: true,
      ..Default::default()
    }
  }

  pub fn requests(&self) -> Vec<CompileRequest> {
    self.requests.lock().unwrap().clone()
  }
}

#[async_trait]
impl Compiler for RecordingCompiler {
  async fn compile(&self, request: CompileRequest) -> Result<Vec<CompiledArtifact>, AdapterError> {
    self.requests.lock().unwrap().push(request);
    if self.fail {
      return Err(AdapterError::ToolFailed {
        program: "fake".to_string(),
        code: Some(1),
        stderr: "syntax error".to_string(),
      });
    }
    Ok(
      self
        .outputs
        .iter()
        .map(|(name, contents)| CompiledArtifact {
          kind: ArtifactKind::from_path(Path::new(name)),
          file: Artifact::new(*name, *contents),
        })
        .collect(),
    )
  }
}
