//! Generated files: write text under a file name into each destination.

use crate::consts::NULL_PATH;
use crate::content::{FileContent, FileText};
use crate::execute::{BuildContext, BuildError, Operation, Outcome};
use crate::files::{Artifact, write_to_directories};
use crate::placeholder::expand;

pub fn prepare(content: &FileContent, ctx: &BuildContext) -> Result<Operation, BuildError> {
  let Some(dests) = ctx.resolve(&content.dest) else {
    return Ok(Operation::empty(format!("destination {} resolves to nothing", content.dest)));
  };
  // A list variable in the name yields one file per value.
  let mut filenames = expand(&content.filename, &ctx.vars());
  filenames.retain(|n| !n.is_empty() && n != NULL_PATH);
  if filenames.is_empty() {
    return Ok(Operation::empty(format!("file name {} resolves to nothing", content.filename)));
  }

  let text = match &content.content {
    FileText::Literal(text) => text.clone(),
    FileText::Generated(generate) => generate(ctx),
  };

  Ok(Operation::task(async move {
    let artifacts: Vec<Artifact> = filenames.into_iter().map(|name| Artifact::new(name, text.clone())).collect();
    let outputs = write_to_directories(&artifacts, &dests).await?;
    Ok(Outcome::written(outputs))
  }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::Adapters;
  use crate::util::testutil::{context, read, run_op};
  use serde_json::json;
  use std::sync::Arc;
  use tempfile::TempDir;

  #[tokio::test]
  async fn literal_text_lands_in_each_destination() {
    let temp = TempDir::new().unwrap();
    let ctx = context(temp.path(), json!({ "name": "robots" }), Adapters::default());
    let content = FileContent {
      content: "User-agent: *".into(),
      filename: "%name.txt".to_string(),
      dest: vec!["%prj/a", "%prj/b"].into(),
    };

    run_op(prepare(&content, &ctx).unwrap()).await;

    assert_eq!(read(temp.path(), "a/robots.txt"), "User-agent: *");
    assert_eq!(read(temp.path(), "b/robots.txt"), "User-agent: *");
  }

  #[tokio::test]
  async fn generated_text_sees_live_configuration() {
    let temp = TempDir::new().unwrap();
    let ctx = context(temp.path(), json!({ "version": "1.2.0" }), Adapters::default());
    let content = FileContent {
      content: FileText::Generated(Arc::new(|ctx: &BuildContext| {
        ctx.config().read(|c| format!("v{}", c.get("version").and_then(|v| v.as_str()).unwrap_or("?")))
      })),
      filename: "VERSION".to_string(),
      dest: "%prj".into(),
    };

    run_op(prepare(&content, &ctx).unwrap()).await;

    assert_eq!(read(temp.path(), "VERSION"), "v1.2.0");
  }

  #[test]
  fn null_file_name_is_empty() {
    let temp = TempDir::new().unwrap();
    let ctx = context(temp.path(), json!({ "name": null }), Adapters::default());
    let content = FileContent {
      content: "x".into(),
      filename: "%name".to_string(),
      dest: "%prj".into(),
    };
    assert!(prepare(&content, &ctx).unwrap().is_empty());
  }

  #[tokio::test]
  async fn list_variable_in_name_writes_one_file_per_value() {
    let temp = TempDir::new().unwrap();
    let ctx = context(temp.path(), json!({ "name": ["a", "b"] }), Adapters::default());
    let content = FileContent {
      content: "same".into(),
      filename: "%name.txt".to_string(),
      dest: "%prj/out".into(),
    };

    run_op(prepare(&content, &ctx).unwrap()).await;

    assert_eq!(read(temp.path(), "out/a.txt"), "same");
    assert_eq!(read(temp.path(), "out/b.txt"), "same");
  }
}
