//! Source expansion and destination writing.
//!
//! Resolved source paths may be glob patterns. Each matched file keeps its
//! path relative to the pattern's glob base (`src/**/*.js` has base `src`),
//! and that relative layout is reproduced below every destination directory.
//! Compiled outputs may also name an explicit file (a destination with an
//! extension), which receives every artifact concatenated under that name.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

use crate::path::{dir_of, explicit_file_name, normalize};

/// Errors raised while reading sources or writing outputs.
#[derive(Debug, Error)]
pub enum FilesError {
  #[error("invalid glob pattern '{pattern}': {message}")]
  Pattern { pattern: String, message: String },

  #[error("failed to read {path}: {source}")]
  Read { path: PathBuf, source: std::io::Error },

  #[error("failed to write {path}: {source}")]
  Write { path: PathBuf, source: std::io::Error },
}

/// A matched input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
  /// Path as matched on disk.
  pub path: PathBuf,
  /// Path relative to the glob base of the pattern that matched it.
  pub relative: PathBuf,
}

/// An output file held in memory until written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
  /// Path relative to the destination directory.
  pub relative: PathBuf,
  pub contents: Vec<u8>,
}

impl Artifact {
  pub fn new(relative: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
    Self {
      relative: relative.into(),
      contents: contents.into(),
    }
  }

  /// Same contents under a different relative path.
  pub fn renamed(mut self, relative: impl Into<PathBuf>) -> Self {
    self.relative = relative.into();
    self
  }

  /// Replace the extension of the relative path.
  pub fn with_extension(mut self, ext: &str) -> Self {
    self.relative.set_extension(ext);
    self
  }
}

/// True when `pattern` contains glob metacharacters.
pub fn is_glob(pattern: &str) -> bool {
  pattern.contains(['*', '?', '['])
}

/// The leading directory of a pattern that contains no glob metacharacters.
///
/// For a plain file path this is its parent directory.
pub fn glob_base(pattern: &str) -> PathBuf {
  let path = Path::new(pattern);
  if !is_glob(pattern) {
    return path.parent().map(Path::to_path_buf).unwrap_or_default();
  }

  let mut base = PathBuf::new();
  for component in path.components() {
    if is_glob(&component.as_os_str().to_string_lossy()) {
      break;
    }
    base.push(component.as_os_str());
  }
  base
}

fn relative_to(path: &Path, base: &Path) -> PathBuf {
  if let Ok(rel) = path.strip_prefix(base) {
    return rel.to_path_buf();
  }
  let (path_n, base_n) = (normalize(path), normalize(base));
  match path_n.strip_prefix(&base_n) {
    Ok(rel) => rel.to_path_buf(),
    Err(_) => path.file_name().map(PathBuf::from).unwrap_or_default(),
  }
}

/// Expand resolved source patterns into matched files.
///
/// Patterns without glob characters match the named file if it exists.
/// Directories are never matched. Missing inputs are not an error; the result
/// is simply empty, which callers treat as a no-op.
pub fn expand_sources(patterns: &[String]) -> Result<Vec<SourceFile>, FilesError> {
  let mut files: Vec<SourceFile> = Vec::new();

  for pattern in patterns {
    let base = glob_base(pattern);

    if !is_glob(pattern) {
      let path = PathBuf::from(pattern);
      if path.is_file() {
        let relative = relative_to(&path, &base);
        push_unique(&mut files, SourceFile { path, relative });
      } else {
        debug!(path = %pattern, "source not found");
      }
      continue;
    }

    let paths = glob::glob(pattern).map_err(|e| FilesError::Pattern {
      pattern: pattern.clone(),
      message: e.to_string(),
    })?;

    for entry in paths {
      let path = match entry {
        Ok(path) => path,
        Err(e) => {
          debug!(pattern = %pattern, error = %e, "skipping unreadable glob entry");
          continue;
        }
      };
      if !path.is_file() {
        continue;
      }
      let relative = relative_to(&path, &base);
      push_unique(&mut files, SourceFile { path, relative });
    }
  }

  trace!(count = files.len(), "expanded sources");
  Ok(files)
}

fn push_unique(files: &mut Vec<SourceFile>, file: SourceFile) {
  if !files.iter().any(|f| f.path == file.path) {
    files.push(file);
  }
}

/// Read matched sources into artifacts, keeping their relative layout.
pub async fn read_sources(files: &[SourceFile]) -> Result<Vec<Artifact>, FilesError> {
  let mut artifacts = Vec::with_capacity(files.len());
  for file in files {
    let contents = tokio::fs::read(&file.path).await.map_err(|source| FilesError::Read {
      path: file.path.clone(),
      source,
    })?;
    artifacts.push(Artifact::new(file.relative.clone(), contents));
  }
  Ok(artifacts)
}

/// Write compiler outputs to every destination.
///
/// A destination with an extension is an explicit file: all artifacts are
/// concatenated (newline separated) into it. Otherwise the destination is a
/// directory and each artifact lands at its relative path below it.
///
/// Returns the written paths in order.
pub async fn write_artifacts(artifacts: &[Artifact], dests: &[String]) -> Result<Vec<PathBuf>, FilesError> {
  let mut written = Vec::new();
  if artifacts.is_empty() {
    return Ok(written);
  }

  for dest in dests {
    if let Some(name) = explicit_file_name(dest) {
      let target = PathBuf::from(dir_of(dest)).join(name);
      let mut contents = Vec::new();
      for (i, artifact) in artifacts.iter().enumerate() {
        if i > 0 {
          contents.push(b'\n');
        }
        contents.extend_from_slice(&artifact.contents);
      }
      write_file(&target, &contents).await?;
      written.push(target);
    } else {
      written.extend(write_to_directories(artifacts, std::slice::from_ref(dest)).await?);
    }
  }

  Ok(written)
}

/// Write artifacts below every destination directory.
///
/// Destinations are always directories, dotted names included
/// (`bin/app-1.0`, `www.example.com`). Each artifact keeps its relative path.
pub async fn write_to_directories(artifacts: &[Artifact], dests: &[String]) -> Result<Vec<PathBuf>, FilesError> {
  let mut written = Vec::with_capacity(artifacts.len() * dests.len());
  for dest in dests {
    for artifact in artifacts {
      let target = Path::new(dest).join(&artifact.relative);
      write_file(&target, &artifact.contents).await?;
      written.push(target);
    }
  }
  Ok(written)
}

/// Write one file, creating parent directories.
pub async fn write_file(target: &Path, contents: &[u8]) -> Result<(), FilesError> {
  if let Some(parent) = target.parent()
    && !parent.as_os_str().is_empty()
  {
    tokio::fs::create_dir_all(parent).await.map_err(|source| FilesError::Write {
      path: parent.to_path_buf(),
      source,
    })?;
  }
  trace!(path = ?target, bytes = contents.len(), "writing file");
  tokio::fs::write(target, contents).await.map_err(|source| FilesError::Write {
    path: target.to_path_buf(),
    source,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn touch(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
  }

  #[test]
  fn glob_base_stops_at_first_wildcard() {
    assert_eq!(glob_base("src/**/*.js"), PathBuf::from("src"));
    assert_eq!(glob_base("/p/web/*.html"), PathBuf::from("/p/web"));
    assert_eq!(glob_base("*.js"), PathBuf::new());
    assert_eq!(glob_base("src/app.ts"), PathBuf::from("src"));
  }

  #[test]
  fn expand_keeps_layout_below_glob_base() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "web/index.html", "<p/>");
    touch(temp.path(), "web/css/site.css", "p{}");
    touch(temp.path(), "other/x.txt", "x");

    let pattern = format!("{}/web/**/*", temp.path().display());
    let files = expand_sources(&[pattern]).unwrap();
    let rels: Vec<_> = files.iter().map(|f| f.relative.clone()).collect();

    assert!(rels.contains(&PathBuf::from("index.html")));
    assert!(rels.contains(&PathBuf::from("css/site.css")));
    assert_eq!(rels.len(), 2);
  }

  #[test]
  fn plain_path_matches_existing_file_only() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "a.json", "{}");

    let hit = expand_sources(&[temp.path().join("a.json").display().to_string()]).unwrap();
    assert_eq!(hit.len(), 1);
    assert_eq!(hit[0].relative, PathBuf::from("a.json"));

    let miss = expand_sources(&[temp.path().join("missing.json").display().to_string()]).unwrap();
    assert!(miss.is_empty());

    let dir = expand_sources(&[temp.path().display().to_string()]).unwrap();
    assert!(dir.is_empty());
  }

  #[test]
  fn overlapping_patterns_match_once() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), "a.js", "a");
    let p1 = format!("{}/*.js", temp.path().display());
    let p2 = temp.path().join("a.js").display().to_string();
    assert_eq!(expand_sources(&[p1, p2]).unwrap().len(), 1);
  }

  #[tokio::test]
  async fn write_to_directories_replicates_layout() {
    let temp = TempDir::new().unwrap();
    let d1 = temp.path().join("d1").display().to_string();
    let d2 = temp.path().join("d2").display().to_string();
    let artifacts = vec![Artifact::new("css/site.css", "p{}")];

    let written = write_artifacts(&artifacts, &[d1, d2]).await.unwrap();

    assert_eq!(written.len(), 2);
    assert_eq!(std::fs::read_to_string(temp.path().join("d1/css/site.css")).unwrap(), "p{}");
    assert_eq!(std::fs::read_to_string(temp.path().join("d2/css/site.css")).unwrap(), "p{}");
  }

  #[tokio::test]
  async fn dotted_directory_destination_stays_a_directory() {
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("bin/app-1.0").display().to_string();
    let artifacts = vec![Artifact::new("a.png", "PNG-A"), Artifact::new("b.png", "PNG-B")];

    write_to_directories(&artifacts, &[dest]).await.unwrap();

    assert!(temp.path().join("bin/app-1.0").is_dir());
    assert_eq!(std::fs::read_to_string(temp.path().join("bin/app-1.0/a.png")).unwrap(), "PNG-A");
    assert_eq!(std::fs::read_to_string(temp.path().join("bin/app-1.0/b.png")).unwrap(), "PNG-B");
  }

  #[tokio::test]
  async fn write_to_explicit_file_concatenates() {
    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("out/bundle.js").display().to_string();
    let artifacts = vec![Artifact::new("a.js", "var a;"), Artifact::new("b.js", "var b;")];

    write_artifacts(&artifacts, &[dest]).await.unwrap();

    assert_eq!(
      std::fs::read_to_string(temp.path().join("out/bundle.js")).unwrap(),
      "var a;\nvar b;"
    );
  }

  #[test]
  fn artifact_extension_swap() {
    let a = Artifact::new("pages/index.njk", "x").with_extension("html");
    assert_eq!(a.relative, PathBuf::from("pages/index.html"));
  }
}
