//! Implementation of the `webuild run` command.
//!
//! Loads a build file, registers its content on a fresh build and runs it.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use webuild_lib::{Build, BuildEnv};

use crate::buildfile::BuildFile;
use crate::output::{display_path, format_duration, print_error, print_output, print_stat, print_success};

/// Execute the run command.
///
/// The project directory defaults to the directory holding the build file.
/// Prints the written files and a summary; a failing entry ends the command
/// with an error.
pub fn cmd_run(file: &Path, env: &BuildEnv) -> Result<()> {
  let build_file = BuildFile::load(file)?;
  debug!(file = %file.display(), entries = build_file.content.len(), "loaded build file");

  let mut config = build_file.config.clone();
  if !config.contains_key("prj") {
    let dir = file.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let prj = dunce::canonicalize(dir).with_context(|| format!("Failed to resolve project directory: {}", dir.display()))?;
    config.insert("prj".to_string(), Value::String(prj.to_string_lossy().to_string()));
  }

  let mut build = Build::with_env(Value::Object(config), env).context("Failed to create build")?;
  build_file.apply(&mut build)?;
  let prj = build.config().read(|c| c.prj());

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let started = Instant::now();
  let report = match rt.block_on(build.run()) {
    Ok(report) => report,
    Err(err) => {
      print_error(&format!("Build failed: {err}"));
      return Err(err).context("Build failed");
    }
  };

  for output in report.outputs() {
    print_output(&display_path(output, &prj));
  }
  print_success("Build complete");
  print_stat("Entries", &report.entries.len().to_string());
  print_stat("Finished", &report.finished().to_string());
  print_stat("Skipped", &report.skipped().to_string());
  print_stat("Files written", &report.outputs().count().to_string());
  print_stat("Elapsed", &format_duration(started.elapsed()));

  Ok(())
}
