//! Command-line tool adapters.
//!
//! Each adapter runs an external program through `tokio::process`, working
//! in a scratch directory so outputs can be collected as artifacts before
//! they are written to their destinations.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{AdapterError, ArtifactKind, CompileRequest, CompiledArtifact, Compiler, Minifier, MinifyKind};
use crate::files::Artifact;

/// A program plus the arguments it always receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
  pub program: String,
  pub args: Vec<String>,
}

impl ToolCommand {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }
}

/// Run a tool and return its stdout.
///
/// # Arguments
///
/// * `tool` - Program and fixed arguments
/// * `extra_args` - Arguments appended for this invocation
/// * `cwd` - Optional working directory
/// * `stdin` - Optional bytes fed to the program's standard input
///
/// # Returns
///
/// The raw stdout on success. A non-zero exit is reported with the tool's
/// stderr.
pub async fn run_tool(
  tool: &ToolCommand,
  extra_args: &[String],
  cwd: Option<&Path>,
  stdin: Option<&[u8]>,
) -> Result<Vec<u8>, AdapterError> {
  info!(program = %tool.program, "running tool");

  let mut command = Command::new(&tool.program);
  command
    .args(&tool.args)
    .args(extra_args)
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() });
  if let Some(dir) = cwd {
    command.current_dir(dir);
  }

  debug!(program = %tool.program, args = ?extra_args, "spawning process");

  let mut child = command.spawn().map_err(|source| AdapterError::Spawn {
    program: tool.program.clone(),
    source,
  })?;

  // Feed stdin while stdout and stderr are drained, or a tool that streams
  // its output blocks on a full pipe.
  let pipe = child.stdin.take();
  let feed = async move {
    if let (Some(input), Some(mut pipe)) = (stdin, pipe) {
      pipe.write_all(input).await?;
      pipe.shutdown().await?;
    }
    Ok::<(), std::io::Error>(())
  };
  let (fed, output) = tokio::join!(feed, child.wait_with_output());
  let output = output?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "tool stdout");
    }
    return Err(AdapterError::ToolFailed {
      program: tool.program.clone(),
      code: output.status.code(),
      stderr,
    });
  }
  fed?;

  Ok(output.stdout)
}

/// Translate an option bag into command-line flags.
///
/// `true` becomes a bare flag, `false` and `null` are dropped, scalars take
/// one value and arrays a comma-separated list. Nested objects and keys in
/// `skip` are ignored.
pub fn option_flags(options: &Value, prefix: &str, skip: &[&str]) -> Vec<String> {
  let Value::Object(map) = options else {
    return Vec::new();
  };

  let mut flags = Vec::new();
  for (key, value) in map {
    if skip.contains(&key.as_str()) {
      continue;
    }
    let flag = format!("{prefix}{key}");
    match value {
      Value::Bool(true) => flags.push(flag),
      Value::Bool(false) | Value::Null => {}
      Value::String(s) => flags.extend([flag, s.clone()]),
      Value::Number(n) => flags.extend([flag, n.to_string()]),
      Value::Array(items) => {
        let list: Vec<String> = items
          .iter()
          .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
          .collect();
        flags.extend([flag, list.join(",")]);
      }
      Value::Object(_) => debug!(option = %key, "ignoring nested option"),
    }
  }
  flags
}

/// Read every file below `dir` as a compiler artifact.
async fn collect_outputs(dir: &Path) -> Result<Vec<CompiledArtifact>, AdapterError> {
  let mut artifacts = Vec::new();
  for entry in WalkDir::new(dir).sort_by_file_name() {
    let entry = entry.map_err(|e| AdapterError::Other(e.to_string()))?;
    if !entry.file_type().is_file() {
      continue;
    }
    let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path()).to_path_buf();
    let contents = tokio::fs::read(entry.path()).await?;
    artifacts.push(CompiledArtifact {
      kind: ArtifactKind::from_path(&relative),
      file: Artifact::new(relative, contents),
    });
  }
  Ok(artifacts)
}

fn display(path: &Path) -> String {
  path.to_string_lossy().to_string()
}

fn include_content(sourcemap: &Value) -> bool {
  sourcemap.get("includeContent").and_then(Value::as_bool).unwrap_or(false)
}

/// TypeScript through `tsc`.
#[derive(Debug, Clone)]
pub struct TscCompiler {
  pub tool: ToolCommand,
}

impl Default for TscCompiler {
  fn default() -> Self {
    Self {
      tool: ToolCommand::new("tsc"),
    }
  }
}

#[async_trait]
impl Compiler for TscCompiler {
  async fn compile(&self, request: CompileRequest) -> Result<Vec<CompiledArtifact>, AdapterError> {
    let scratch = tempfile::tempdir()?;
    let mut args = option_flags(
      &request.options,
      "--",
      &["out", "outFile", "outDir", "sourceMap", "sourceRoot", "inlineSources"],
    );

    match &request.output_name {
      Some(name) => args.extend(["--outFile".to_string(), display(&scratch.path().join(name))]),
      None => args.extend(["--outDir".to_string(), display(scratch.path())]),
    }

    if let Some(map) = &request.sourcemap {
      args.push("--sourceMap".to_string());
      if let Some(root) = map.get("sourceRoot").and_then(Value::as_str) {
        args.extend(["--sourceRoot".to_string(), root.to_string()]);
      }
      if include_content(map) {
        args.push("--inlineSources".to_string());
      }
    }

    args.extend(request.inputs.iter().map(|f| display(&f.path)));
    run_tool(&self.tool, &args, None, None).await?;
    collect_outputs(scratch.path()).await
  }
}

/// SCSS through dart-sass (`sass`).
#[derive(Debug, Clone)]
pub struct SassCompiler {
  pub tool: ToolCommand,
}

impl Default for SassCompiler {
  fn default() -> Self {
    Self {
      tool: ToolCommand::new("sass"),
    }
  }
}

#[async_trait]
impl Compiler for SassCompiler {
  async fn compile(&self, request: CompileRequest) -> Result<Vec<CompiledArtifact>, AdapterError> {
    let scratch = tempfile::tempdir()?;
    let mut args = option_flags(&request.options, "--", &["includePaths", "sourceMap"]);

    if let Some(Value::Array(paths)) = request.options.get("includePaths") {
      for path in paths.iter().filter_map(Value::as_str) {
        args.extend(["--load-path".to_string(), path.to_string()]);
      }
    }

    match &request.sourcemap {
      Some(map) => {
        args.push("--source-map".to_string());
        if include_content(map) {
          args.push("--embed-sources".to_string());
        }
      }
      None => args.push("--no-source-map".to_string()),
    }

    let mut pairs = 0;
    for input in &request.inputs {
      let is_partial = input
        .path
        .file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('_'));
      if is_partial {
        continue;
      }
      let out: PathBuf = scratch.path().join(&input.relative).with_extension("css");
      if let Some(parent) = out.parent() {
        tokio::fs::create_dir_all(parent).await?;
      }
      args.push(format!("{}:{}", display(&input.path), display(&out)));
      pairs += 1;
    }

    if pairs == 0 {
      debug!("no scss entry points");
      return Ok(Vec::new());
    }

    run_tool(&self.tool, &args, None, None).await?;
    collect_outputs(scratch.path()).await
  }
}

/// Java through `javac`, packaged with `jar`.
#[derive(Debug, Clone)]
pub struct JavacCompiler {
  pub javac: ToolCommand,
  pub jar: ToolCommand,
}

impl Default for JavacCompiler {
  fn default() -> Self {
    Self {
      javac: ToolCommand::new("javac"),
      jar: ToolCommand::new("jar"),
    }
  }
}

#[async_trait]
impl Compiler for JavacCompiler {
  async fn compile(&self, request: CompileRequest) -> Result<Vec<CompiledArtifact>, AdapterError> {
    let scratch = tempfile::tempdir()?;
    let classes = scratch.path().join("classes");
    tokio::fs::create_dir_all(&classes).await?;

    let mut args = option_flags(&request.options, "-", &["d", "cp", "classpath"]);
    if !request.class_path.is_empty() {
      let separator = if cfg!(windows) { ";" } else { ":" };
      args.extend(["-cp".to_string(), request.class_path.join(separator)]);
    }
    args.extend(["-d".to_string(), display(&classes)]);
    args.extend(request.inputs.iter().map(|f| display(&f.path)));
    run_tool(&self.javac, &args, None, None).await?;

    let name = request.output_name.clone().unwrap_or_else(|| "classes.jar".to_string());
    let archive = scratch.path().join(&name);
    let jar_args = vec![
      "cf".to_string(),
      display(&archive),
      "-C".to_string(),
      display(&classes),
      ".".to_string(),
    ];
    run_tool(&self.jar, &jar_args, None, None).await?;

    let contents = tokio::fs::read(&archive).await?;
    Ok(vec![CompiledArtifact {
      kind: ArtifactKind::Archive,
      file: Artifact::new(name, contents),
    }])
  }
}

/// Minification through stdin/stdout filters.
#[derive(Debug, Clone)]
pub struct CommandMinifier {
  pub script: ToolCommand,
  pub style: ToolCommand,
  pub markup: ToolCommand,
}

impl Default for CommandMinifier {
  fn default() -> Self {
    Self {
      script: ToolCommand::new("uglifyjs").args(["-c", "-m"]),
      style: ToolCommand::new("uglifycss"),
      markup: ToolCommand::new("html-minifier").args(["--collapse-whitespace", "--remove-comments"]),
    }
  }
}

impl CommandMinifier {
  /// One filter for every kind.
  pub fn uniform(tool: ToolCommand) -> Self {
    Self {
      script: tool.clone(),
      style: tool.clone(),
      markup: tool,
    }
  }
}

#[async_trait]
impl Minifier for CommandMinifier {
  async fn minify(&self, kind: MinifyKind, artifact: Artifact) -> Result<Artifact, AdapterError> {
    let tool = match kind {
      MinifyKind::Script => &self.script,
      MinifyKind::Style => &self.style,
      MinifyKind::Markup => &self.markup,
    };
    debug!(file = ?artifact.relative, ?kind, "minifying");
    let contents = run_tool(tool, &[], None, Some(artifact.contents.as_slice())).await?;
    Ok(Artifact { contents, ..artifact })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::files::SourceFile;
  use serde_json::json;

  #[test]
  fn option_flags_follow_value_types() {
    let options = json!({
      "strict": true,
      "noEmit": false,
      "target": "es2017",
      "maxNodeModuleJsDepth": 2,
      "lib": ["dom", "es2017"],
      "paths": { "a": ["b"] },
      "outDir": "ignored"
    });

    assert_eq!(
      option_flags(&options, "--", &["outDir"]),
      vec![
        "--strict",
        "--target",
        "es2017",
        "--maxNodeModuleJsDepth",
        "2",
        "--lib",
        "dom,es2017"
      ]
    );
  }

  #[test]
  fn option_flags_of_non_object_is_empty() {
    assert!(option_flags(&Value::Null, "-", &[]).is_empty());
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn run_tool_pipes_stdin_to_stdout() {
    let out = run_tool(&ToolCommand::new("cat"), &[], None, Some(b"hello".as_slice())).await.unwrap();
    assert_eq!(out, b"hello");
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn run_tool_streams_input_larger_than_pipe_buffer() {
    let input = vec![b'a'; 1 << 20];
    let out = tokio::time::timeout(
      std::time::Duration::from_secs(10),
      run_tool(&ToolCommand::new("cat"), &[], None, Some(&input)),
    )
    .await
    .expect("run_tool did not finish")
    .unwrap();
    assert_eq!(out.len(), input.len());
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn run_tool_reports_failure_with_stderr() {
    let tool = ToolCommand::new("sh").args(["-c", "echo broken >&2; exit 3"]);
    let err = run_tool(&tool, &[], None, None).await.unwrap_err();
    match err {
      AdapterError::ToolFailed { code, stderr, .. } => {
        assert_eq!(code, Some(3));
        assert_eq!(stderr, "broken");
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[tokio::test]
  async fn missing_program_is_a_spawn_error() {
    let tool = ToolCommand::new("webuild-no-such-program");
    let err = run_tool(&tool, &[], None, None).await.unwrap_err();
    assert!(matches!(err, AdapterError::Spawn { .. }));
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn minifier_replaces_contents() {
    let minifier = CommandMinifier::uniform(ToolCommand::new("tr").args(["-d", " "]));
    let out = minifier
      .minify(MinifyKind::Script, Artifact::new("a.js", "var a = 1;"))
      .await
      .unwrap();
    assert_eq!(out.contents, b"vara=1;");
    assert_eq!(out.relative, PathBuf::from("a.js"));
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn tsc_outputs_are_collected_and_classified() {
    // Stand-in for tsc: writes a script and its map into --outDir.
    let script = r#"
      while [ $# -gt 0 ]; do
        if [ "$1" = "--outDir" ]; then out="$2"; fi
        shift
      done
      echo 'var a;' > "$out/a.js"
      echo '{}' > "$out/a.js.map"
    "#;
    let compiler = TscCompiler {
      tool: ToolCommand::new("sh").args(["-c", script, "tsc"]),
    };
    let request = CompileRequest {
      inputs: vec![SourceFile {
        path: PathBuf::from("src/a.ts"),
        relative: PathBuf::from("a.ts"),
      }],
      sourcemap: Some(json!({ "sourceRoot": "../src" })),
      ..Default::default()
    };

    let artifacts = compiler.compile(request).await.unwrap();
    let kinds: Vec<_> = artifacts.iter().map(|a| (a.file.relative.clone(), a.kind)).collect();

    assert_eq!(
      kinds,
      vec![
        (PathBuf::from("a.js"), ArtifactKind::Script),
        (PathBuf::from("a.js.map"), ArtifactKind::SourceMap),
      ]
    );
  }
}
