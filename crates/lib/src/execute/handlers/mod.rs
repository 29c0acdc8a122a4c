//! Per-variant entry handlers.
//!
//! A handler resolves the entry's paths against the live variables and
//! returns an [`Operation`]. Resolution happens at dispatch time; the
//! returned task owns everything it needs.

pub mod compile;
pub mod copy;
pub mod custom;
pub mod file;
pub mod json;
pub mod template;

use tracing::debug;

use crate::content::{BuildContent, ContentKind};
use crate::files::{Artifact, SourceFile, expand_sources};
use crate::path::PathSpec;

use super::{BuildContext, BuildError, Operation};
use crate::adapters::MinifyKind;

/// Dispatch an entry to its handler.
pub fn dispatch(entry: &BuildContent, ctx: &BuildContext) -> Result<Operation, BuildError> {
  match entry {
    BuildContent::Static(c) => copy::prepare(c, ctx),
    BuildContent::File(c) => file::prepare(c, ctx),
    BuildContent::Template(c) => template::prepare(c, ctx),
    BuildContent::Json(c) => json::prepare_json(c, ctx),
    BuildContent::Config(c) => json::prepare_config(c, ctx),
    BuildContent::Typescript(c) => compile::prepare_typescript(c, ctx),
    BuildContent::Scss(c) => compile::prepare_scss(c, ctx),
    BuildContent::Java(c) => compile::prepare_java(c, ctx),
    BuildContent::Custom(c) => custom::prepare(c, ctx),
  }
}

/// Resolve a source spec and expand its globs.
///
/// `None` when the spec resolves to nothing or no file matches.
pub(crate) fn match_sources(
  spec: &PathSpec,
  ctx: &BuildContext,
) -> Result<Option<(Vec<String>, Vec<SourceFile>)>, BuildError> {
  let Some(patterns) = ctx.resolve(spec) else {
    return Ok(None);
  };
  let files = expand_sources(&patterns)?;
  if files.is_empty() {
    debug!(patterns = ?patterns, "no files matched");
    return Ok(None);
  }
  Ok(Some((patterns, files)))
}

/// Resolve a destination that must name exactly one path.
pub(crate) fn single_destination(
  kind: ContentKind,
  dest: &str,
  ctx: &BuildContext,
) -> Result<Option<String>, BuildError> {
  let Some(mut resolved) = ctx.resolve(&PathSpec::from(dest)) else {
    return Ok(None);
  };
  if resolved.len() > 1 {
    return Err(BuildError::MultipleDestinations {
      kind,
      dest: dest.to_string(),
      resolved,
    });
  }
  Ok(Some(resolved.remove(0)))
}

/// Minify artifacts by extension when the build minifies.
///
/// Without a configured minifier, content passes through unchanged.
pub(crate) async fn minify_all(artifacts: Vec<Artifact>, ctx: &BuildContext) -> Result<Vec<Artifact>, BuildError> {
  if !ctx.minify() {
    return Ok(artifacts);
  }
  let Some(minifier) = ctx.adapters().minifier() else {
    debug!("no minifier configured, copying unchanged");
    return Ok(artifacts);
  };

  let mut out = Vec::with_capacity(artifacts.len());
  for artifact in artifacts {
    match MinifyKind::from_path(&artifact.relative) {
      Some(kind) => out.push(minifier.minify(kind, artifact).await?),
      None => out.push(artifact),
    }
  }
  Ok(out)
}
