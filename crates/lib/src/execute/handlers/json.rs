//! JSON entries: merge documents into a file or into the live configuration.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::content::{ConfigContent, JsonContent};
use crate::execute::{BuildContext, BuildError, Operation, Outcome};
use crate::files::{expand_sources, write_file};
use crate::merge::{JsonSource, load_sources, merge, render_json};
use crate::path::{PathSpec, explicit_file_name};
use crate::vars::VarMap;

/// Pin a file-based source to the files it matches now.
///
/// `Ok(None)` when nothing matches.
fn pin_source(source: &JsonSource, ctx: &BuildContext) -> Result<Option<JsonSource>, BuildError> {
  let JsonSource::Path(spec) = source else {
    return Ok(Some(source.clone()));
  };
  let Some(patterns) = ctx.resolve(spec) else {
    return Ok(None);
  };
  let files = expand_sources(&patterns)?;
  if files.is_empty() {
    return Ok(None);
  }
  let paths = files.into_iter().map(|f| f.path.to_string_lossy().to_string()).collect();
  Ok(Some(JsonSource::Path(PathSpec::Many(paths))))
}

fn first_file_name(source: &JsonSource) -> Option<String> {
  let spec = source.path()?;
  let first = spec.entries().into_iter().next()?;
  Path::new(first).file_name().map(|n| n.to_string_lossy().to_string())
}

pub fn prepare_json(content: &JsonContent, ctx: &BuildContext) -> Result<Operation, BuildError> {
  let Some(source) = pin_source(&content.src, ctx)? else {
    return Ok(Operation::empty(format!("no JSON sources match {}", content.src)));
  };
  let Some(dests) = ctx.resolve(&content.dest) else {
    return Ok(Operation::empty(format!("destination {} resolves to nothing", content.dest)));
  };

  let mut targets: Vec<PathBuf> = Vec::with_capacity(dests.len());
  for dest in &dests {
    if explicit_file_name(dest).is_some() {
      targets.push(PathBuf::from(dest));
      continue;
    }
    let name = first_file_name(&source).ok_or_else(|| BuildError::NoOutputName { dest: dest.clone() })?;
    targets.push(Path::new(dest).join(name));
  }

  let options = content.merge.clone();
  let extra = content.vars.clone();
  let ctx = ctx.clone();
  Ok(Operation::task(async move {
    let docs = load_sources(&source, &VarMap::new()).await?;
    let vars = ctx.json_vars().overlay(&extra);
    let merged = merge(&docs, &options, &vars)?;
    let text = render_json(&merged, ctx.minify());

    for target in &targets {
      debug!(path = ?target, "writing merged JSON");
      write_file(target, text.as_bytes()).await?;
    }
    Ok(Outcome::written(targets))
  }))
}

pub fn prepare_config(content: &ConfigContent, ctx: &BuildContext) -> Result<Operation, BuildError> {
  let Some(source) = pin_source(&content.src, ctx)? else {
    return Ok(Operation::empty(format!("no configuration sources match {}", content.src)));
  };

  let options = content.merge.clone();
  let property = content.property.clone();
  let ctx = ctx.clone();
  Ok(Operation::task(async move {
    let docs = load_sources(&source, &VarMap::new()).await?;
    let merged = merge(&docs, &options, &ctx.json_vars())?;

    match &property {
      Some(property) => {
        ctx.config().update(|cfg| cfg.set(property.clone(), merged));
        info!(property = %property, "configuration property replaced");
      }
      None => {
        if !matches!(merged, Value::Object(_)) {
          return Err(BuildError::InvalidConfig(
            "configuration source must be a JSON object".to_string(),
          ));
        }
        ctx.config().update(|cfg| cfg.merge(&merged))?;
        info!("configuration updated");
      }
    }
    Ok(Outcome::default())
  }))
}
