//! Template rendering with Tera.

use std::error::Error as _;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tera::{Context, Tera};
use tracing::debug;
use walkdir::WalkDir;

use super::{AdapterError, TemplateRenderer};

/// Extensions loaded from the template search path.
const TEMPLATE_EXTENSIONS: &[&str] = &["html", "htm", "njk", "nunjucks", "tera", "j2", "jinja", "jinja2", "txt"];

/// Renders templates with Tera (Jinja2/Nunjucks-style syntax).
///
/// Every template file found below the search path directories is
/// registered under its path relative to that directory, so
/// `{% extends "layout.html" %}` and `{% include "parts/nav.html" %}` work.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeraRenderer;

impl TemplateRenderer for TeraRenderer {
  fn render(&self, template: &Path, search_path: &[PathBuf], data: &Value) -> Result<String, AdapterError> {
    let name = template
      .file_name()
      .map(|n| n.to_string_lossy().to_string())
      .unwrap_or_else(|| template.to_string_lossy().to_string());

    let mut files: Vec<(PathBuf, Option<String>)> = Vec::new();
    for dir in search_path {
      for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() || !is_template(entry.path()) {
          continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
          continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        files.push((entry.path().to_path_buf(), Some(relative)));
      }
    }
    files.push((template.to_path_buf(), Some(name.clone())));
    debug!(template = %name, registered = files.len(), "loading templates");

    let mut tera = Tera::default();
    tera.add_template_files(files).map_err(|e| template_error(template, &e))?;

    let context = match data {
      Value::Object(_) => Context::from_value(data.clone()).map_err(|e| template_error(template, &e))?,
      _ => Context::new(),
    };

    tera.render(&name, &context).map_err(|e| template_error(template, &e))
  }
}

fn is_template(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
}

/// Flatten a Tera error chain into one message.
fn template_error(template: &Path, error: &tera::Error) -> AdapterError {
  let mut messages = vec![error.to_string()];
  let mut current = error.source();
  while let Some(err) = current {
    messages.push(err.to_string());
    current = err.source();
  }
  AdapterError::Template {
    template: template.to_string_lossy().to_string(),
    message: messages.join(": "),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use tempfile::TempDir;

  #[test]
  fn renders_with_layout_from_search_path() {
    let temp = TempDir::new().unwrap();
    let layouts = temp.path().join("layouts");
    let pages = temp.path().join("pages");
    std::fs::create_dir_all(&layouts).unwrap();
    std::fs::create_dir_all(&pages).unwrap();
    std::fs::write(
      layouts.join("base.html"),
      "<title>{{ title }}</title>{% block body %}{% endblock body %}",
    )
    .unwrap();
    std::fs::write(
      pages.join("index.njk"),
      r#"{% extends "base.html" %}{% block body %}<p>{{ title | upper }}</p>{% endblock body %}"#,
    )
    .unwrap();

    let html = TeraRenderer
      .render(&pages.join("index.njk"), &[layouts], &json!({ "title": "home" }))
      .unwrap();

    assert_eq!(html, "<title>home</title><p>HOME</p>");
  }

  #[test]
  fn syntax_error_names_the_template() {
    let temp = TempDir::new().unwrap();
    let page = temp.path().join("broken.html");
    std::fs::write(&page, "{% if %}").unwrap();

    let err = TeraRenderer.render(&page, &[], &Value::Null).unwrap_err();

    match err {
      AdapterError::Template { template, .. } => assert!(template.ends_with("broken.html")),
      other => panic!("unexpected error: {other:?}"),
    }
  }
}
