//! Declarative build files.
//!
//! A build file is a JSON document (comments and trailing commas allowed):
//!
//! ```json
//! {
//!   "config": { "out": "%prj/www", "langs": ["en", "de"] },
//!   "content": [
//!     { "type": "static", "src": "%prj/src/img/*", "dest": "%out/img" },
//!     { "type": "json", "src": "%prj/src/i18n/%langs.json", "dest": "%out/%langs" }
//!   ]
//! }
//! ```
//!
//! Each `content` item maps onto one `Build::add_*` call, in order.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

use webuild_lib::classpath::ClassPathSpec;
use webuild_lib::content::TemplateData;
use webuild_lib::settings::parse_json_lenient;
use webuild_lib::{Build, ContentError, JsonFilter, JsonSource, MergeOptions, PathSpec, VarMap};

#[derive(Debug, Default, Deserialize)]
pub struct BuildFile {
  /// Configuration overrides, merged over the defaults.
  #[serde(default)]
  pub config: Map<String, Value>,
  #[serde(default)]
  pub content: Vec<ContentDecl>,
}

/// Merge options as written in a build file.
#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MergeDecl {
  pub base: Option<Value>,
  pub extend: Option<Value>,
  /// Top-level fields to keep; `<name` splices a nested object.
  pub fields: Option<Vec<String>>,
  pub substitute_vars: bool,
}

impl Default for MergeDecl {
  fn default() -> Self {
    Self {
      base: None,
      extend: None,
      fields: None,
      substitute_vars: true,
    }
  }
}

impl MergeDecl {
  fn into_options(self) -> MergeOptions {
    let mut options = MergeOptions::new().substitute_vars(self.substitute_vars);
    options.base = self.base;
    options.extend = self.extend;
    if let Some(fields) = self.fields {
      options = options.filter(JsonFilter::fields(fields));
    }
    options
  }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentDecl {
  Static {
    src: PathSpec,
    dest: PathSpec,
  },
  File {
    content: String,
    filename: String,
    dest: PathSpec,
  },
  Template {
    src: PathSpec,
    #[serde(default = "empty_spec")]
    path: PathSpec,
    dest: PathSpec,
    #[serde(default)]
    data: Option<Value>,
  },
  Json {
    src: Value,
    dest: PathSpec,
    #[serde(flatten)]
    merge: MergeDecl,
    #[serde(default)]
    vars: Option<Value>,
  },
  Config {
    src: Value,
    #[serde(default)]
    property: Option<String>,
    #[serde(flatten)]
    merge: MergeDecl,
  },
  Typescript {
    src: PathSpec,
    js: String,
    #[serde(default)]
    dts: Option<String>,
    #[serde(default)]
    sourcemap: Option<Value>,
    #[serde(default)]
    options: Option<Value>,
  },
  Scss {
    src: PathSpec,
    css: String,
    #[serde(default)]
    sourcemap: Option<Value>,
    #[serde(default)]
    options: Option<Value>,
  },
  Java {
    src: PathSpec,
    jar: String,
    #[serde(default, rename = "classPath")]
    class_path: Option<ClassPathSpec>,
    #[serde(default)]
    options: Option<Value>,
  },
}

fn empty_spec() -> PathSpec {
  PathSpec::Many(Vec::new())
}

impl ContentDecl {
  /// Register this declaration on `build`.
  pub fn apply(self, build: &mut Build) -> Result<(), ContentError> {
    match self {
      ContentDecl::Static { src, dest } => build.add_static(src, dest)?,
      ContentDecl::File {
        content,
        filename,
        dest,
      } => build.add_file(content, filename, dest)?,
      ContentDecl::Template { src, path, dest, data } => {
        let data = data.map(TemplateData::Static).unwrap_or_default();
        build.add_tpl(src, path, dest, data)?
      }
      ContentDecl::Json { src, dest, merge, vars } => {
        let vars = vars.as_ref().map(VarMap::from_json_object).unwrap_or_default();
        build.add_json_with_vars(JsonSource::from_value(src), dest, merge.into_options(), vars)?
      }
      ContentDecl::Config { src, property, merge } => {
        build.add_config(JsonSource::from_value(src), property.as_deref(), merge.into_options())?
      }
      ContentDecl::Typescript {
        src,
        js,
        dts,
        sourcemap,
        options,
      } => build.add_ts(src, js, dts.as_deref(), sourcemap, options)?,
      ContentDecl::Scss {
        src,
        css,
        sourcemap,
        options,
      } => build.add_scss(src, css, sourcemap, options)?,
      ContentDecl::Java {
        src,
        jar,
        class_path,
        options,
      } => build.add_java(src, jar, class_path, options)?,
    };
    Ok(())
  }
}

impl BuildFile {
  pub fn load(path: &Path) -> Result<Self> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read build file: {}", path.display()))?;
    let value = parse_json_lenient(&text).with_context(|| format!("Invalid JSON in build file: {}", path.display()))?;
    serde_json::from_value(value).with_context(|| format!("Invalid build file: {}", path.display()))
  }

  /// Register every content declaration on `build`, in order.
  pub fn apply(self, build: &mut Build) -> Result<()> {
    for (index, decl) in self.content.into_iter().enumerate() {
      decl.apply(build).with_context(|| format!("Invalid content #{index}"))?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use webuild_lib::{BuildEnv, ContentKind};

  fn build_in(prj: &Path) -> Build {
    Build::with_env(json!({ "prj": prj.to_string_lossy() }), &BuildEnv::default()).unwrap()
  }

  #[test]
  fn parses_tagged_content_with_comments() {
    let text = r#"{
      // project settings
      "config": { "out": "%prj/www" },
      "content": [
        { "type": "static", "src": "%prj/img/*", "dest": "%out/img" },
        { "type": "json", "src": ["a.json", "b.json"], "dest": "%out", "fields": ["name"], },
      ]
    }"#;
    let file: BuildFile = serde_json::from_value(parse_json_lenient(text).unwrap()).unwrap();

    assert_eq!(file.config.get("out"), Some(&json!("%prj/www")));
    assert_eq!(file.content.len(), 2);
    let ContentDecl::Json { merge, .. } = &file.content[1] else {
      panic!("expected json content");
    };
    assert_eq!(merge.fields.as_deref(), Some(&["name".to_string()][..]));
  }

  #[test]
  fn applies_declarations_in_order() {
    let temp = tempfile::TempDir::new().unwrap();
    let file: BuildFile = serde_json::from_value(json!({
      "content": [
        { "type": "file", "content": "hi", "filename": "a.txt", "dest": "%prj/out" },
        { "type": "config", "src": { "name": "x" } },
        { "type": "java", "src": "%prj/src/**/*.java", "jar": "%prj/out/app.jar", "classPath": "lib/dep.jar" }
      ]
    }))
    .unwrap();

    let mut build = build_in(temp.path());
    file.apply(&mut build).unwrap();

    let kinds: Vec<ContentKind> = build.entries().iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec![ContentKind::File, ContentKind::Config, ContentKind::Java]);
    assert_eq!(build.class_path().entries().len(), 2);
  }

  #[test]
  fn substitution_defaults_on_and_can_be_disabled() {
    let file: BuildFile = serde_json::from_value(json!({
      "content": [
        { "type": "json", "src": "a.json", "dest": "%prj/out" },
        { "type": "config", "src": "b.json", "substituteVars": false }
      ]
    }))
    .unwrap();

    let flags: Vec<bool> = file
      .content
      .iter()
      .map(|decl| match decl {
        ContentDecl::Json { merge, .. } | ContentDecl::Config { merge, .. } => merge.substitute_vars,
        _ => panic!("expected json or config content"),
      })
      .collect();
    assert_eq!(flags, vec![true, false]);
  }

  #[test]
  fn unknown_content_type_is_rejected() {
    let result = serde_json::from_value::<BuildFile>(json!({
      "content": [{ "type": "rsync", "src": "a", "dest": "b" }]
    }));
    assert!(result.is_err());
  }

  #[test]
  fn invalid_declaration_names_its_index() {
    let temp = tempfile::TempDir::new().unwrap();
    let file: BuildFile = serde_json::from_value(json!({
      "content": [
        { "type": "static", "src": "%prj/a", "dest": "%prj/b" },
        { "type": "file", "content": "x", "filename": "", "dest": "%prj/out" }
      ]
    }))
    .unwrap();

    let err = file.apply(&mut build_in(temp.path())).unwrap_err();
    assert!(err.to_string().contains("Invalid content #1"));
  }
}
