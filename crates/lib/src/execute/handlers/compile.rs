//! Compiled variants: TypeScript, SCSS and Java.
//!
//! Each handler merges the global option bag with the entry's overrides,
//! hands the matched sources to the compiler adapter and sorts the returned
//! artifacts into their destinations. Compiled destinations must resolve to
//! a single path.

use std::path::Path;

use serde_json::{Value, json};
use tracing::debug;

use super::{match_sources, minify_all, single_destination};
use crate::adapters::{ArtifactKind, CompileRequest, CompiledArtifact, CompilerKind};
use crate::content::{ContentKind, JavaContent, ScssContent, TypescriptContent};
use crate::execute::{BuildContext, BuildError, Operation, Outcome};
use crate::files::{Artifact, glob_base, write_artifacts, write_to_directories};
use crate::merge::deep_merge;
use crate::path::{dir_of, explicit_file_name, normalize, relative_path};

/// Global options under `key` with the entry's overrides merged on top.
fn merged_options(ctx: &BuildContext, key: &str, overrides: Option<&Value>) -> Result<Value, BuildError> {
  let mut options = ctx.config().read(|c| c.options(key));
  if let Some(overrides) = overrides {
    deep_merge(&mut options, overrides)?;
  }
  Ok(options)
}

/// Source map options, or `None` when the build writes no source maps.
///
/// `sourceRoot` defaults to the path from the output directory back to the
/// first source pattern's base directory.
fn sourcemap_options(
  ctx: &BuildContext,
  dest_dir: &str,
  patterns: &[String],
  overrides: Option<&Value>,
) -> Result<Option<Value>, BuildError> {
  if !ctx.sourcemaps() {
    return Ok(None);
  }
  let src_dir = patterns.first().map(|p| glob_base(p)).unwrap_or_default();
  let mut map = json!({
    "includeContent": false,
    "sourceRoot": relative_path(Path::new(dest_dir), &src_dir),
    "dest": "./",
  });
  if let Some(overrides) = overrides {
    deep_merge(&mut map, overrides)?;
  }
  Ok(Some(map))
}

fn map_dir(dest_dir: &str, sourcemap: &Value) -> String {
  let dest = sourcemap.get("dest").and_then(Value::as_str).unwrap_or("./");
  normalize(&Path::new(dest_dir).join(dest)).to_string_lossy().to_string()
}

#[derive(Default)]
struct Sorted {
  scripts: Vec<Artifact>,
  declarations: Vec<Artifact>,
  maps: Vec<Artifact>,
  styles: Vec<Artifact>,
  archives: Vec<Artifact>,
  other: Vec<Artifact>,
}

fn sort_artifacts(artifacts: Vec<CompiledArtifact>) -> Sorted {
  let mut sorted = Sorted::default();
  for artifact in artifacts {
    let bucket = match artifact.kind {
      ArtifactKind::Script => &mut sorted.scripts,
      ArtifactKind::Declaration => &mut sorted.declarations,
      ArtifactKind::SourceMap => &mut sorted.maps,
      ArtifactKind::Style => &mut sorted.styles,
      ArtifactKind::Archive => &mut sorted.archives,
      ArtifactKind::Other => &mut sorted.other,
    };
    bucket.push(artifact.file);
  }
  sorted
}

pub fn prepare_typescript(content: &TypescriptContent, ctx: &BuildContext) -> Result<Operation, BuildError> {
  let kind = ContentKind::Typescript;
  let Some((patterns, files)) = match_sources(&content.src, ctx)? else {
    return Ok(Operation::empty(format!("no typescript sources match {}", content.src)));
  };
  let Some(js) = single_destination(kind, &content.js, ctx)? else {
    return Ok(Operation::empty(format!("script destination {} resolves to nothing", content.js)));
  };
  let dts = match &content.dts {
    Some(dts) => single_destination(kind, dts, ctx)?,
    None => None,
  };

  let mut options = merged_options(ctx, "tsc", content.options.as_ref())?;
  if dts.is_some()
    && let Value::Object(map) = &mut options
  {
    map.insert("declaration".to_string(), Value::Bool(true));
  }

  let js_dir = dir_of(&js);
  let sourcemap = sourcemap_options(ctx, &js_dir, &patterns, content.sourcemap.as_ref())?;
  let request = CompileRequest {
    inputs: files,
    options,
    output_name: explicit_file_name(&js),
    class_path: Vec::new(),
    sourcemap: sourcemap.clone(),
  };

  let ctx = ctx.clone();
  Ok(Operation::task(async move {
    debug!(inputs = request.inputs.len(), js = %js, "compiling typescript");
    let compiled = ctx.adapters().compiler(CompilerKind::Typescript).compile(request).await?;
    let sorted = sort_artifacts(compiled);

    let scripts = minify_all(sorted.scripts, &ctx).await?;
    let mut outputs = write_artifacts(&scripts, std::slice::from_ref(&js)).await?;

    let dts_dest = dts.unwrap_or_else(|| js_dir.clone());
    outputs.extend(write_artifacts(&sorted.declarations, &[dts_dest]).await?);

    if let Some(map) = &sourcemap {
      outputs.extend(write_to_directories(&sorted.maps, &[map_dir(&js_dir, map)]).await?);
    }
    outputs.extend(write_to_directories(&sorted.other, &[js_dir]).await?);
    Ok(Outcome::written(outputs))
  }))
}

pub fn prepare_scss(content: &ScssContent, ctx: &BuildContext) -> Result<Operation, BuildError> {
  let Some((patterns, files)) = match_sources(&content.src, ctx)? else {
    return Ok(Operation::empty(format!("no scss sources match {}", content.src)));
  };
  let Some(css) = single_destination(ContentKind::Scss, &content.css, ctx)? else {
    return Ok(Operation::empty(format!("style destination {} resolves to nothing", content.css)));
  };

  let options = merged_options(ctx, "scss", content.options.as_ref())?;
  let css_dir = dir_of(&css);
  let sourcemap = sourcemap_options(ctx, &css_dir, &patterns, content.sourcemap.as_ref())?;
  let request = CompileRequest {
    inputs: files,
    options,
    output_name: explicit_file_name(&css),
    class_path: Vec::new(),
    sourcemap: sourcemap.clone(),
  };

  let ctx = ctx.clone();
  Ok(Operation::task(async move {
    debug!(inputs = request.inputs.len(), css = %css, "compiling scss");
    let compiled = ctx.adapters().compiler(CompilerKind::Scss).compile(request).await?;
    let sorted = sort_artifacts(compiled);

    let styles = minify_all(sorted.styles, &ctx).await?;
    let mut outputs = write_artifacts(&styles, std::slice::from_ref(&css)).await?;
    if let Some(map) = &sourcemap {
      outputs.extend(write_to_directories(&sorted.maps, &[map_dir(&css_dir, map)]).await?);
    }
    Ok(Outcome::written(outputs))
  }))
}

pub fn prepare_java(content: &JavaContent, ctx: &BuildContext) -> Result<Operation, BuildError> {
  let Some((_, files)) = match_sources(&content.src, ctx)? else {
    return Ok(Operation::empty(format!("no java sources match {}", content.src)));
  };
  let Some(jar) = single_destination(ContentKind::Java, &content.jar, ctx)? else {
    return Ok(Operation::empty(format!("jar destination {} resolves to nothing", content.jar)));
  };
  let name = explicit_file_name(&jar).ok_or_else(|| BuildError::NoOutputName { dest: jar.clone() })?;

  let request = CompileRequest {
    inputs: files,
    options: merged_options(ctx, "javac", content.options.as_ref())?,
    output_name: Some(name),
    class_path: content.class_path.clone(),
    sourcemap: None,
  };

  let ctx = ctx.clone();
  Ok(Operation::task(async move {
    debug!(inputs = request.inputs.len(), jar = %jar, "compiling java");
    let compiled = ctx.adapters().compiler(CompilerKind::Java).compile(request).await?;
    let sorted = sort_artifacts(compiled);
    let outputs = write_artifacts(&sorted.archives, &[jar]).await?;
    Ok(Outcome::written(outputs))
  }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::Adapters;
  use crate::path::PathSpec;
  use crate::util::testutil::{RecordingCompiler, UpperMinifier, context, read, run_op, write};
  use tempfile::TempDir;

  fn ts_entry(js: &str, dts: Option<&str>) -> TypescriptContent {
    TypescriptContent {
      src: "%prj/src/*.ts".into(),
      js: js.to_string(),
      dts: dts.map(str::to_string),
      sourcemap: None,
      options: Some(json!({ "target": "es2017" })),
    }
  }

  #[tokio::test]
  async fn typescript_merges_options_and_splits_outputs() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/app.ts", "let a = 1;");
    let compiler = RecordingCompiler::returning(vec![("app.js", "var a = 1;"), ("app.d.ts", "declare var a;")]);
    let ctx = context(
      temp.path(),
      json!({ "minify": true, "tsc": { "strict": true, "target": "es5" } }),
      Adapters::default()
        .with_compiler(CompilerKind::Typescript, compiler.clone())
        .with_minifier(UpperMinifier),
    );

    let entry = ts_entry("%prj/out/js/app.js", Some("%prj/out/types"));
    run_op(prepare_typescript(&entry, &ctx).unwrap()).await;

    let requests = compiler.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
      requests[0].options,
      json!({ "strict": true, "target": "es2017", "declaration": true })
    );
    assert_eq!(requests[0].output_name.as_deref(), Some("app.js"));
    assert!(requests[0].sourcemap.is_none());

    assert_eq!(read(temp.path(), "out/js/app.js"), "VAR A = 1;");
    assert_eq!(read(temp.path(), "out/types/app.d.ts"), "declare var a;");
  }

  #[tokio::test]
  async fn typescript_source_maps_point_back_to_sources() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/app.ts", "let a = 1;");
    let compiler = RecordingCompiler::returning(vec![("app.js", "var a;"), ("app.js.map", "{}")]);
    let ctx = context(
      temp.path(),
      json!({ "sourcemaps": true }),
      Adapters::default().with_compiler(CompilerKind::Typescript, compiler.clone()),
    );

    let mut entry = ts_entry("%prj/out/js", None);
    entry.sourcemap = Some(json!({ "includeContent": true, "dest": "../maps" }));
    run_op(prepare_typescript(&entry, &ctx).unwrap()).await;

    let map = compiler.requests()[0].sourcemap.clone().unwrap();
    assert_eq!(
      map,
      json!({ "includeContent": true, "sourceRoot": "../../src", "dest": "../maps" })
    );
    assert_eq!(read(temp.path(), "out/js/app.js"), "var a;");
    assert_eq!(read(temp.path(), "out/maps/app.js.map"), "{}");
  }

  #[test]
  fn multi_valued_destination_is_an_error() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/app.ts", "let a = 1;");
    let ctx = context(temp.path(), json!({ "out": ["/a", "/b"] }), Adapters::default());

    let entry = ts_entry("%out", None);
    let err = prepare_typescript(&entry, &ctx).unwrap_err();
    match err {
      BuildError::MultipleDestinations { kind, resolved, .. } => {
        assert_eq!(kind, ContentKind::Typescript);
        assert_eq!(resolved, vec!["/a".to_string(), "/b".to_string()]);
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn compiler_failure_surfaces_as_adapter_error() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/app.ts", "let a = ;");
    let ctx = context(
      temp.path(),
      json!({}),
      Adapters::default().with_compiler(CompilerKind::Typescript, RecordingCompiler::failing()),
    );

    let Operation::Task(task) = prepare_typescript(&ts_entry("%prj/out", None), &ctx).unwrap() else {
      panic!("expected a task");
    };
    assert!(matches!(task.await, Err(BuildError::Adapter(_))));
  }

  #[tokio::test]
  async fn scss_writes_styles_to_destination() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "styles/site.scss", "a { b: c }");
    let compiler = RecordingCompiler::returning(vec![("site.css", "a{b:c}"), ("site.css.map", "{}")]);
    let ctx = context(
      temp.path(),
      json!({ "scss": { "includePaths": ["lib"] } }),
      Adapters::default().with_compiler(CompilerKind::Scss, compiler.clone()),
    );

    let entry = ScssContent {
      src: "%prj/styles/*.scss".into(),
      css: "%prj/out/css".to_string(),
      sourcemap: None,
      options: None,
    };
    let outcome = run_op(prepare_scss(&entry, &ctx).unwrap()).await;

    assert_eq!(compiler.requests()[0].options, json!({ "includePaths": ["lib"] }));
    assert_eq!(outcome.outputs.len(), 1);
    assert_eq!(read(temp.path(), "out/css/site.css"), "a{b:c}");
    assert!(!temp.path().join("out/css/site.css.map").exists());
  }

  #[tokio::test]
  async fn java_packages_jar_with_classpath() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "java/Main.java", "class Main {}");
    let compiler = RecordingCompiler::returning(vec![("app.jar", "PK")]);
    let ctx = context(
      temp.path(),
      json!({}),
      Adapters::default().with_compiler(CompilerKind::Java, compiler.clone()),
    );

    let entry = JavaContent {
      src: PathSpec::from("%prj/java/**/*.java"),
      jar: "%prj/bin/app.jar".to_string(),
      class_path: vec!["/libs/dep.jar".to_string()],
      options: Some(json!({ "source": "11" })),
    };
    run_op(prepare_java(&entry, &ctx).unwrap()).await;

    let request = &compiler.requests()[0];
    assert_eq!(request.output_name.as_deref(), Some("app.jar"));
    assert_eq!(request.class_path, vec!["/libs/dep.jar".to_string()]);
    assert_eq!(request.options, json!({ "source": "11" }));
    assert_eq!(read(temp.path(), "bin/app.jar"), "PK");
  }
}
