//! Static content: copy matched files to every destination.

use tracing::debug;

use super::{match_sources, minify_all};
use crate::content::StaticContent;
use crate::execute::{BuildContext, BuildError, Operation, Outcome};
use crate::files::{read_sources, write_to_directories};

pub fn prepare(content: &StaticContent, ctx: &BuildContext) -> Result<Operation, BuildError> {
  let Some((_, files)) = match_sources(&content.src, ctx)? else {
    return Ok(Operation::empty(format!("no files match {}", content.src)));
  };
  let Some(dests) = ctx.resolve(&content.dest) else {
    return Ok(Operation::empty(format!("destination {} resolves to nothing", content.dest)));
  };

  debug!(files = files.len(), dests = ?dests, "copying static content");
  let ctx = ctx.clone();
  Ok(Operation::task(async move {
    let artifacts = read_sources(&files).await?;
    let artifacts = minify_all(artifacts, &ctx).await?;
    let outputs = write_to_directories(&artifacts, &dests).await?;
    Ok(Outcome::written(outputs))
  }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::Adapters;
  use crate::util::testutil::{UpperMinifier, context, read, run_op, write};
  use serde_json::json;
  use tempfile::TempDir;

  #[tokio::test]
  async fn copies_to_every_destination() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "web/index.html", "<p>hi</p>");
    let ctx = context(temp.path(), json!({}), Adapters::default());

    let content = StaticContent {
      src: "%prj/web/*.html".into(),
      dest: vec!["%prj/out/a", "%prj/out/b"].into(),
    };
    let outcome = run_op(prepare(&content, &ctx).unwrap()).await;

    assert_eq!(outcome.outputs.len(), 2);
    assert_eq!(read(temp.path(), "out/a/index.html"), "<p>hi</p>");
    assert_eq!(read(temp.path(), "out/b/index.html"), "<p>hi</p>");
  }

  #[tokio::test]
  async fn dotted_destination_is_a_directory() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "img/a.png", "PNG-A");
    write(temp.path(), "img/b.png", "PNG-B");
    let ctx = context(temp.path(), json!({}), Adapters::default());

    let content = StaticContent {
      src: "%prj/img/*".into(),
      dest: "%prj/bin/app-1.0".into(),
    };
    run_op(prepare(&content, &ctx).unwrap()).await;

    assert!(temp.path().join("bin/app-1.0").is_dir());
    assert_eq!(read(temp.path(), "bin/app-1.0/a.png"), "PNG-A");
    assert_eq!(read(temp.path(), "bin/app-1.0/b.png"), "PNG-B");
  }

  #[tokio::test]
  async fn minifies_by_extension_only_when_enabled() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "web/app.js", "var a;");
    write(temp.path(), "web/logo.txt", "logo");
    let ctx = context(
      temp.path(),
      json!({ "minify": true }),
      Adapters::default().with_minifier(UpperMinifier),
    );

    let content = StaticContent {
      src: "%prj/web/*".into(),
      dest: "%prj/out".into(),
    };
    run_op(prepare(&content, &ctx).unwrap()).await;

    assert_eq!(read(temp.path(), "out/app.js"), "VAR A;");
    assert_eq!(read(temp.path(), "out/logo.txt"), "logo");
  }

  #[tokio::test]
  async fn missing_minifier_copies_unchanged() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "web/app.js", "var a;");
    let ctx = context(temp.path(), json!({ "minify": true }), Adapters::default().without_minifier());

    let content = StaticContent {
      src: "%prj/web/app.js".into(),
      dest: "%prj/out".into(),
    };
    run_op(prepare(&content, &ctx).unwrap()).await;

    assert_eq!(read(temp.path(), "out/app.js"), "var a;");
  }

  #[test]
  fn unmatched_sources_are_empty() {
    let temp = TempDir::new().unwrap();
    let ctx = context(temp.path(), json!({}), Adapters::default());
    let content = StaticContent {
      src: "%prj/missing/*.js".into(),
      dest: "%prj/out".into(),
    };
    assert!(prepare(&content, &ctx).unwrap().is_empty());
  }

  #[test]
  fn null_destination_is_empty() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "web/a.js", "a");
    let ctx = context(temp.path(), json!({ "dist": null }), Adapters::default());
    let content = StaticContent {
      src: "%prj/web/*.js".into(),
      dest: "%dist".into(),
    };
    assert!(prepare(&content, &ctx).unwrap().is_empty());
  }
}
