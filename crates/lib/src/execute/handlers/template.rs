//! Templates: render each matched template and write it as HTML.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::match_sources;
use crate::adapters::AdapterError;
use crate::content::{TemplateContent, TemplateData};
use crate::execute::{BuildContext, BuildError, Operation, Outcome};
use crate::files::{Artifact, write_to_directories};

pub fn prepare(content: &TemplateContent, ctx: &BuildContext) -> Result<Operation, BuildError> {
  let Some((_, files)) = match_sources(&content.src, ctx)? else {
    return Ok(Operation::empty(format!("no templates match {}", content.src)));
  };
  let Some(dests) = ctx.resolve(&content.dest) else {
    return Ok(Operation::empty(format!("destination {} resolves to nothing", content.dest)));
  };
  let search: Vec<PathBuf> = ctx
    .resolve(&content.path)
    .unwrap_or_default()
    .into_iter()
    .map(PathBuf::from)
    .collect();

  let data = content.data.clone();
  let renderer = Arc::clone(ctx.adapters().templates());
  Ok(Operation::task(async move {
    // Rendering walks the search path and parses every template it finds.
    let artifacts = tokio::task::spawn_blocking(move || {
      let mut artifacts = Vec::with_capacity(files.len());
      for file in &files {
        let value = match &data {
          TemplateData::Static(value) => value.clone(),
          TemplateData::PerFile(data_for) => data_for(&file.path),
        };
        let search_path = if search.is_empty() {
          vec![file.path.parent().map(Path::to_path_buf).unwrap_or_default()]
        } else {
          search.clone()
        };
        debug!(template = ?file.path, "rendering template");
        let html = renderer.render(&file.path, &search_path, &value)?;
        artifacts.push(Artifact::new(file.relative.clone(), html).with_extension("html"));
      }
      Ok::<_, AdapterError>(artifacts)
    })
    .await
    .map_err(|e| AdapterError::Other(format!("template rendering aborted: {e}")))??;

    let outputs = write_to_directories(&artifacts, &dests).await?;
    Ok(Outcome::written(outputs))
  }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::{Adapters, TemplateRenderer};
  use crate::path::PathSpec;
  use crate::util::testutil::{context, read, run_op, write};
  use serde_json::{Value, json};
  use tempfile::TempDir;

  /// Renders through `Handle::block_on`, which panics on an async worker.
  struct BlockingRenderer;

  impl TemplateRenderer for BlockingRenderer {
    fn render(&self, template: &Path, _search_path: &[PathBuf], _data: &Value) -> Result<String, AdapterError> {
      let path = template.to_path_buf();
      tokio::runtime::Handle::current()
        .block_on(tokio::fs::read_to_string(path))
        .map_err(|e| AdapterError::Other(e.to_string()))
    }
  }

  #[tokio::test]
  async fn renders_into_every_destination_as_html() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "tpl/layout.html", "<h1>{{ title }}</h1>{% block main %}{% endblock main %}");
    write(
      temp.path(),
      "pages/about.njk",
      r#"{% extends "layout.html" %}{% block main %}about{% endblock main %}"#,
    );
    let ctx = context(temp.path(), json!({}), Adapters::default());

    let content = TemplateContent {
      src: "%prj/pages/*.njk".into(),
      path: "%prj/tpl".into(),
      dest: vec!["%prj/out/en", "%prj/out/de"].into(),
      data: TemplateData::Static(json!({ "title": "Site" })),
    };
    run_op(prepare(&content, &ctx).unwrap()).await;

    assert_eq!(read(temp.path(), "out/en/about.html"), "<h1>Site</h1>about");
    assert_eq!(read(temp.path(), "out/de/about.html"), "<h1>Site</h1>about");
  }

  #[tokio::test]
  async fn per_file_data_receives_template_path() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "pages/a.html", "{{ name }}");
    write(temp.path(), "pages/b.html", "{{ name }}");
    let ctx = context(temp.path(), json!({}), Adapters::default());

    let content = TemplateContent {
      src: "%prj/pages/*.html".into(),
      path: PathSpec::Many(vec![]),
      dest: "%prj/out".into(),
      data: TemplateData::PerFile(Arc::new(|path: &Path| {
        json!({ "name": path.file_stem().unwrap().to_string_lossy() })
      })),
    };
    run_op(prepare(&content, &ctx).unwrap()).await;

    assert_eq!(read(temp.path(), "out/a.html"), "a");
    assert_eq!(read(temp.path(), "out/b.html"), "b");
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
  async fn renders_off_the_async_workers() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "pages/a.html", "A");
    write(temp.path(), "pages/b.html", "B");
    let adapters = Adapters::default().with_template_renderer(BlockingRenderer);
    let ctx = context(temp.path(), json!({}), adapters);

    let content = TemplateContent {
      src: "%prj/pages/*.html".into(),
      path: PathSpec::Many(vec![]),
      dest: "%prj/out".into(),
      data: TemplateData::default(),
    };
    run_op(prepare(&content, &ctx).unwrap()).await;

    assert_eq!(read(temp.path(), "out/a.html"), "A");
    assert_eq!(read(temp.path(), "out/b.html"), "B");
  }
}
