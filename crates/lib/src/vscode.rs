//! Editor project files.
//!
//! [`VSCode`] collects debuggers, tasks and settings and writes them to
//! `.vscode/launch.json`, `tasks.json` and `settings.json` through JSON
//! entries of an ordinary [`Build`]. New settings are merged over the
//! existing settings file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::build::Build;
use crate::consts::{SETTINGS_CLASSPATH_KEY, SETTINGS_EXCLUDE_KEY};
use crate::execute::{BuildError, RunReport};
use crate::merge::{JsonSource, MergeOptions};
use crate::placeholder::dedup_stable;

pub const LAUNCH_JSON_VERSION: &str = "0.2.0";
pub const TASKS_JSON_VERSION: &str = "2.0.0";

const LAUNCH_FILE: &str = "%prj/.vscode/launch.json";
const TASKS_FILE: &str = "%prj/.vscode/tasks.json";
const SETTINGS_PATH: &str = "%prj/.vscode/settings.json";

/// A launch configuration in `launch.json`.
///
/// Unknown attributes go into `other` and are written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VSCodeDebugger {
  #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
  pub kind: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub request: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub pre_launch_task: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub program: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub args: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub env: Option<Map<String, Value>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cwd: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub protocol: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub port: Option<u16>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub console: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_maps: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub out_files: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub skip_files: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub runtime_executable: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub runtime_args: Option<Vec<String>>,
  #[serde(flatten)]
  pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
  Shell,
  Process,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskGroup {
  Build,
  Test,
  None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reveal {
  Never,
  Silent,
  Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
  Shared,
  Dedicated,
  New,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPresentation {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reveal: Option<Reveal>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub echo: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub focus: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub panel: Option<Panel>,
}

/// A task in `tasks.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VSCodeTask {
  pub label: String,
  #[serde(rename = "type")]
  pub kind: TaskType,
  pub command: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_background: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub args: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub group: Option<TaskGroup>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub presentation: Option<TaskPresentation>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub problem_matcher: Option<Value>,
}

impl VSCodeTask {
  /// A shell task that reveals its output in a new panel.
  pub fn shell(label: impl Into<String>, command: impl Into<String>, args: Vec<String>, group: TaskGroup) -> Self {
    Self {
      label: label.into(),
      kind: TaskType::Shell,
      command: command.into(),
      is_background: None,
      args: Some(args),
      group: Some(group),
      presentation: Some(TaskPresentation {
        reveal: Some(Reveal::Always),
        panel: Some(Panel::New),
        ..Default::default()
      }),
      problem_matcher: Some(json!([])),
    }
  }
}

/// Debugger presets.
pub mod debuggers {
  use serde_json::{Map, Value, json};

  use super::VSCodeDebugger;

  /// Launch a node script relative to the workspace root.
  ///
  /// `env` is merged over the defaults (`TS_NODE_CACHE_DIRECTORY`, `LOG`).
  pub fn node(name: &str, js: &str, args: Vec<String>, env: Map<String, Value>) -> VSCodeDebugger {
    let mut merged = Map::new();
    merged.insert("TS_NODE_CACHE_DIRECTORY".to_string(), json!("${workspaceRoot}/.node"));
    merged.insert("LOG".to_string(), json!("debug"));
    merged.extend(env);

    VSCodeDebugger {
      kind: Some("node".to_string()),
      request: Some("launch".to_string()),
      name: Some(name.to_string()),
      program: Some(format!("${{workspaceRoot}}/{js}")),
      args: Some(args),
      cwd: Some("${workspaceRoot}".to_string()),
      source_maps: Some(true),
      out_files: Some(vec!["${workspaceRoot}/.node".to_string()]),
      env: Some(merged),
      protocol: Some("inspector".to_string()),
      console: Some("integratedTerminal".to_string()),
      ..Default::default()
    }
  }

  /// Run a node web application from `bin` (default `${workspaceRoot}/bin`),
  /// starting `start` (default `www.js`).
  pub fn node_web_application(bin: Option<&str>, start: Option<&str>) -> VSCodeDebugger {
    let bin = bin.unwrap_or("${workspaceRoot}/bin");
    let start = start.unwrap_or("www.js");
    let mut env = Map::new();
    env.insert("DEBUG".to_string(), json!("express:*"));

    VSCodeDebugger {
      kind: Some("node".to_string()),
      request: Some("launch".to_string()),
      name: Some("Run web application".to_string()),
      program: Some(format!("{bin}/{start}")),
      cwd: Some("${workspaceRoot}".to_string()),
      source_maps: Some(true),
      out_files: Some(vec![format!("{bin}/**/*.js")]),
      env: Some(env),
      protocol: Some("inspector".to_string()),
      console: Some("integratedTerminal".to_string()),
      ..Default::default()
    }
  }
}

/// Generator for the editor files of one project.
#[derive(Debug)]
pub struct VSCode {
  build: Build,
  debuggers: Vec<VSCodeDebugger>,
  tasks: Vec<VSCodeTask>,
  settings: Map<String, Value>,
}

impl VSCode {
  /// Generate files for `prj`, or the working directory.
  pub fn new(prj: Option<&Path>) -> Result<Self, BuildError> {
    let overrides = match prj {
      Some(prj) => json!({ "prj": prj.to_string_lossy() }),
      None => Value::Null,
    };
    Ok(Self::with_build(Build::new(overrides)?))
  }

  /// Generate files through an existing build.
  pub fn with_build(build: Build) -> Self {
    Self {
      build,
      debuggers: Vec::new(),
      tasks: Vec::new(),
      settings: Map::new(),
    }
  }

  pub fn build(&self) -> &Build {
    &self.build
  }

  pub fn add_debugger(&mut self, debugger: VSCodeDebugger) -> &mut Self {
    self.debuggers.push(debugger);
    self
  }

  pub fn add_task(&mut self, task: VSCodeTask) -> &mut Self {
    self.tasks.push(task);
    self
  }

  pub fn add_tasks(&mut self, tasks: impl IntoIterator<Item = VSCodeTask>) -> &mut Self {
    self.tasks.extend(tasks);
    self
  }

  /// Add java dependencies to `java.classPath`.
  pub fn add_java_classpath<I, S>(&mut self, dependencies: I) -> &mut Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let entry = self
      .settings
      .entry(SETTINGS_CLASSPATH_KEY)
      .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(items) = entry {
      items.extend(dependencies.into_iter().map(|d| Value::String(d.into())));
    }
    self
  }

  /// Hide paths in the editor. Each path is resolved first.
  pub fn exclude<I, S>(&mut self, paths: I) -> &mut Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let resolved: Vec<String> = paths
      .into_iter()
      .filter_map(|p| self.build.resolve(p.as_ref()))
      .flatten()
      .collect();

    let entry = self
      .settings
      .entry(SETTINGS_EXCLUDE_KEY)
      .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(map) = entry {
      for path in resolved {
        debug!(path = %path, "exclude from editor");
        map.insert(path, Value::Bool(true));
      }
    }
    self
  }

  /// Hide every path listed in the project's `.gitignore`.
  ///
  /// Comments, `.vscode` and the paths in `except` stay visible. A missing
  /// `.gitignore` changes nothing.
  pub fn exclude_gitignores(&mut self, except: &[&str]) -> Result<&mut Self, BuildError> {
    let path = self.build.config().read(|c| c.prj()).join(".gitignore");
    if !path.is_file() {
      return Ok(self);
    }
    let text = std::fs::read_to_string(&path)?;
    let lines: Vec<String> = text
      .lines()
      .map(str::trim)
      .filter(|l| !l.is_empty() && !l.starts_with('#') && *l != ".vscode" && !except.contains(l))
      .map(str::to_string)
      .collect();
    Ok(self.exclude(lines))
  }

  /// Register the JSON entries for the collected files and run the build.
  pub async fn run(mut self) -> Result<RunReport, BuildError> {
    if !self.debuggers.is_empty() {
      info!(count = self.debuggers.len(), "add debuggers to .vscode/launch.json");
      let launch = json!({ "version": LAUNCH_JSON_VERSION, "configurations": self.debuggers });
      self.build.add_json(JsonSource::Literal(launch), LAUNCH_FILE, MergeOptions::new())?;
    }

    if !self.tasks.is_empty() {
      info!(count = self.tasks.len(), "add tasks to .vscode/tasks.json");
      let tasks = json!({ "version": TASKS_JSON_VERSION, "tasks": self.tasks });
      self.build.add_json(JsonSource::Literal(tasks), TASKS_FILE, MergeOptions::new())?;
    }

    if !self.settings.is_empty() {
      info!("add settings.json");
      let existing = self.build.settings().map(|s| s.raw().clone()).unwrap_or_else(|| json!({}));
      let settings = union_class_path(&existing, self.settings);
      self.build.add_json(
        JsonSource::Literal(existing),
        SETTINGS_PATH,
        MergeOptions::new().extend(Value::Object(settings)),
      )?;
    }

    self.build.run().await
  }
}

/// Keep existing `java.classPath` entries in front of the new ones; merging
/// would otherwise replace the array.
fn union_class_path(existing: &Value, mut settings: Map<String, Value>) -> Map<String, Value> {
  let (Some(Value::Array(old)), Some(Value::Array(new))) =
    (existing.get(SETTINGS_CLASSPATH_KEY), settings.get(SETTINGS_CLASSPATH_KEY))
  else {
    return settings;
  };
  let merged = dedup_stable(old.iter().chain(new).filter_map(|v| v.as_str().map(str::to_string)));
  settings.insert(
    SETTINGS_CLASSPATH_KEY.to_string(),
    Value::Array(merged.into_iter().map(Value::String).collect()),
  );
  settings
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::BuildEnv;
  use tempfile::TempDir;

  fn vscode_in(prj: &Path) -> VSCode {
    let build = Build::with_env(json!({ "prj": prj.to_string_lossy() }), &BuildEnv::default()).unwrap();
    VSCode::with_build(build)
  }

  fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
  }

  #[test]
  fn debugger_serializes_camel_case_without_empty_fields() {
    let dbg = debuggers::node_web_application(None, None);
    let value = serde_json::to_value(&dbg).unwrap();
    assert_eq!(value["type"], json!("node"));
    assert_eq!(value["program"], json!("${workspaceRoot}/bin/www.js"));
    assert_eq!(value["sourceMaps"], json!(true));
    assert_eq!(value["outFiles"], json!(["${workspaceRoot}/bin/**/*.js"]));
    assert!(value.get("args").is_none());
  }

  #[test]
  fn node_preset_merges_environment() {
    let mut env = Map::new();
    env.insert("LOG".to_string(), json!("silly"));
    let dbg = debuggers::node("Build", "build.js", vec!["--dist".to_string()], env);
    let env = dbg.env.unwrap();
    assert_eq!(env["LOG"], json!("silly"));
    assert_eq!(env["TS_NODE_CACHE_DIRECTORY"], json!("${workspaceRoot}/.node"));
    assert_eq!(dbg.program.as_deref(), Some("${workspaceRoot}/build.js"));
  }

  #[test]
  fn shell_task_serializes_type_and_presentation() {
    let task = VSCodeTask::shell("build", "webuild", vec!["run".to_string()], TaskGroup::Build);
    let value = serde_json::to_value(&task).unwrap();
    assert_eq!(
      value,
      json!({
        "label": "build",
        "type": "shell",
        "command": "webuild",
        "args": ["run"],
        "group": "build",
        "presentation": { "reveal": "always", "panel": "new" },
        "problemMatcher": [],
      })
    );
  }

  #[tokio::test]
  async fn writes_launch_tasks_and_merged_settings() {
    let temp = TempDir::new().unwrap();
    let settings_file = temp.path().join(".vscode/settings.json");
    std::fs::create_dir_all(settings_file.parent().unwrap()).unwrap();
    std::fs::write(
      &settings_file,
      r#"{ "editor.tabSize": 2, "java.classPath": ["lib/a.jar"] }"#,
    )
    .unwrap();
    std::fs::write(temp.path().join(".gitignore"), "# build\nnode_modules\n.vscode\nbin\n").unwrap();

    let mut vscode = vscode_in(temp.path());
    vscode
      .add_debugger(debuggers::node_web_application(None, None))
      .add_task(VSCodeTask::shell("build", "webuild", vec!["run".to_string()], TaskGroup::Build))
      .add_java_classpath(["lib/b.jar"]);
    vscode.exclude_gitignores(&["bin"]).unwrap();
    vscode.run().await.unwrap();

    let launch = read_json(&temp.path().join(".vscode/launch.json"));
    assert_eq!(launch["version"], json!("0.2.0"));
    assert_eq!(launch["configurations"][0]["name"], json!("Run web application"));

    let tasks = read_json(&temp.path().join(".vscode/tasks.json"));
    assert_eq!(tasks["version"], json!("2.0.0"));
    assert_eq!(tasks["tasks"][0]["label"], json!("build"));

    let settings = read_json(&settings_file);
    assert_eq!(settings["editor.tabSize"], json!(2));
    assert_eq!(settings["java.classPath"], json!(["lib/a.jar", "lib/b.jar"]));
    assert_eq!(settings["files.exclude"], json!({ "node_modules": true }));
  }

  #[tokio::test]
  async fn nothing_collected_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let report = vscode_in(temp.path()).run().await.unwrap();
    assert!(report.entries.is_empty());
    assert!(!temp.path().join(".vscode").exists());
  }
}
