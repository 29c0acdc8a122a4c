//! Implementation of the `webuild vscode` command.
//!
//! Writes launch, task and settings files for a web application project.

use std::path::Path;

use anyhow::{Context, Result};

use webuild_lib::consts::APP_NAME;
use webuild_lib::vscode::{TaskGroup, VSCode, VSCodeTask, debuggers};

use crate::output::{display_path, print_output, print_success};

/// Execute the vscode command.
///
/// Adds a web application debugger, `run` and `run --dist` build tasks, and
/// hides the paths of the project's `.gitignore`.
pub fn cmd_vscode(prj: Option<&Path>) -> Result<()> {
  let prj = prj
    .map(dunce::canonicalize)
    .transpose()
    .context("Failed to resolve project directory")?;

  let mut vscode = VSCode::new(prj.as_deref()).context("Failed to create build")?;
  vscode
    .add_debugger(debuggers::node_web_application(None, None))
    .add_tasks([
      VSCodeTask::shell("build", APP_NAME, vec!["run".to_string()], TaskGroup::Build),
      VSCodeTask::shell(
        "build dist",
        APP_NAME,
        vec!["run".to_string(), "--dist".to_string()],
        TaskGroup::Build,
      ),
    ]);
  vscode.exclude_gitignores(&[]).context("Failed to read .gitignore")?;

  let root = vscode.build().config().read(|c| c.prj());
  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt.block_on(vscode.run()).context("Failed to write editor files")?;

  for output in report.outputs() {
    print_output(&display_path(output, &root));
  }
  print_success("Editor files updated");
  Ok(())
}
